//! Fetch request value with a fluent builder API.
//!
//! # Example
//!
//! ```rust
//! use chainfetch_core::{ChunkProgress, FetchRequest, RangeEnd};
//!
//! let request: FetchRequest<&str, u64> = FetchRequest::new("Transfer", 8_661_240, 8_662_230u64)
//!     .chunk_size(61)
//!     .progress_fn(|p: &ChunkProgress, _records: &[u64]| {
//!         println!("{}/{} ({}%)", p.completed, p.total, p.percentage);
//!     });
//! assert_eq!(request.to_block, RangeEnd::Block(8_662_230));
//! ```

use std::sync::Arc;

use crate::progress::{self, ChunkProgress, ProgressSink};
use crate::query::RangeEnd;

/// One invocation of a chunked fetch.
pub struct FetchRequest<F, R> {
    /// First block of the range.
    pub from_block: u64,
    /// End of the range; `Latest` needs a resolver on the fetcher.
    pub to_block: RangeEnd,
    /// Blocks per chunk; `None` uses the fetcher's default.
    pub chunk_size: Option<u64>,
    /// Passed unmodified to the range query for every chunk.
    pub filter: F,
    /// Notified after every completed chunk.
    pub progress: Option<Arc<dyn ProgressSink<R>>>,
}

impl<F, R> FetchRequest<F, R> {
    pub fn new(filter: F, from_block: u64, to_block: impl Into<RangeEnd>) -> Self {
        Self {
            from_block,
            to_block: to_block.into(),
            chunk_size: None,
            filter,
            progress: None,
        }
    }

    /// Fetch from `from_block` up to the resolved chain head.
    pub fn latest(filter: F, from_block: u64) -> Self {
        Self::new(filter, from_block, RangeEnd::Latest)
    }

    /// Set the number of blocks per chunk.
    pub fn chunk_size(mut self, size: u64) -> Self {
        self.chunk_size = Some(size);
        self
    }

    /// Attach a progress sink.
    pub fn progress(mut self, sink: Arc<dyn ProgressSink<R>>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Attach a plain closure as the progress sink.
    pub fn progress_fn<C>(self, f: C) -> Self
    where
        R: Sync + 'static,
        C: Fn(&ChunkProgress, &[R]) + Send + Sync + 'static,
    {
        self.progress(Arc::new(progress::from_fn::<R, C>(f)))
    }
}

impl<F: std::fmt::Debug, R> std::fmt::Debug for FetchRequest<F, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchRequest")
            .field("from_block", &self.from_block)
            .field("to_block", &self.to_block)
            .field("chunk_size", &self.chunk_size)
            .field("filter", &self.filter)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
