//! Progress reporting for chunked fetches.
//!
//! A sink is invoked once per completed chunk, in ascending chunk order, and
//! runs to completion before the next chunk is queried. It is never invoked
//! for a chunk whose query failed, nor after cancellation took effect.
//!
//! A sink that returns an error aborts the fetch the same way a failing chunk
//! query does: no further chunks run and the error is returned with chunk
//! context attached.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::chunk::ChunkSpan;
use crate::error::FetchError;

/// Progress snapshot after one chunk has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkProgress {
    /// Chunks completed so far, including this one (1-based).
    pub completed: u64,
    /// Total chunks in the fetch.
    pub total: u64,
    /// `floor(100 * completed / total)`. Advisory; may repeat on large plans.
    pub percentage: u8,
    /// The chunk that just completed.
    pub span: ChunkSpan,
}

impl ChunkProgress {
    pub fn is_last(&self) -> bool {
        self.completed == self.total
    }
}

/// Receives progress after every completed chunk.
#[async_trait]
pub trait ProgressSink<R>: Send + Sync {
    async fn on_chunk(&self, progress: &ChunkProgress, records: &[R]) -> Result<(), FetchError>;
}

// ─── FnSink ───────────────────────────────────────────────────────────────────

/// Adapts a plain synchronous closure into a [`ProgressSink`].
pub struct FnSink<F> {
    f: F,
}

/// Wrap `f` as a progress sink.
pub fn from_fn<R, F>(f: F) -> FnSink<F>
where
    F: Fn(&ChunkProgress, &[R]) + Send + Sync,
{
    FnSink { f }
}

#[async_trait]
impl<R, F> ProgressSink<R> for FnSink<F>
where
    R: Sync + 'static,
    F: Fn(&ChunkProgress, &[R]) + Send + Sync,
{
    async fn on_chunk(&self, progress: &ChunkProgress, records: &[R]) -> Result<(), FetchError> {
        (self.f)(progress, records);
        Ok(())
    }
}

// ─── ChannelSink ──────────────────────────────────────────────────────────────

/// One progress message as delivered through a [`ChannelSink`].
#[derive(Debug, Clone)]
pub struct ProgressUpdate<R> {
    pub progress: ChunkProgress,
    /// Records returned by the chunk that just completed.
    pub records: Vec<R>,
}

/// Forwards progress into an unbounded channel the caller drains.
///
/// A closed receiver is not an error: the caller simply stopped listening.
pub struct ChannelSink<R> {
    tx: mpsc::UnboundedSender<ProgressUpdate<R>>,
}

impl<R> ChannelSink<R> {
    /// Create a sink together with the receiving half of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate<R>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: mpsc::UnboundedSender<ProgressUpdate<R>>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl<R> ProgressSink<R> for ChannelSink<R>
where
    R: Clone + Send + Sync + 'static,
{
    async fn on_chunk(&self, progress: &ChunkProgress, records: &[R]) -> Result<(), FetchError> {
        let update = ProgressUpdate {
            progress: *progress,
            records: records.to_vec(),
        };
        if self.tx.send(update).is_err() {
            tracing::debug!(
                completed = progress.completed,
                total = progress.total,
                "Progress receiver dropped; update discarded"
            );
        }
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
