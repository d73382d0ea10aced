//! The chunked fetcher — splits a block range into chunks and queries them
//! one after another.
//!
//! # Cancellation
//! Cancellation is a flag on the fetcher, not a per-call token. `cancel()` sets
//! it; the running fetch observes and clears it at the start of its next chunk
//! and returns an empty result, discarding everything it had accumulated. A
//! query already in flight is never interrupted. When no fetch is running the
//! flag stays set and cancels the next fetch before its first chunk.
//!
//! # Single fetch at a time
//! One fetcher runs at most one fetch at a time. A second `fetch` started while
//! another is in progress fails with [`FetchError::AlreadyRunning`] instead of
//! sharing, and racing on, the cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::chunk::{percentage, ChunkPlan};
use crate::config::FetcherConfig;
use crate::error::FetchError;
use crate::progress::ChunkProgress;
use crate::query::{HeadResolver, RangeEnd, RangeQuery};
use crate::request::FetchRequest;

#[derive(Debug, Default)]
struct FetcherFlags {
    cancel_requested: AtomicBool,
    running: AtomicBool,
}

/// Requests cancellation of a fetcher from another task.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flags: Arc<FetcherFlags>,
}

impl CancelHandle {
    /// Same as [`ChunkedFetcher::cancel`].
    pub fn cancel(&self) {
        self.flags.cancel_requested.store(true, Ordering::SeqCst);
    }
}

/// How a fetch ended, when the caller needs to tell cancellation apart from an
/// empty range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<R> {
    /// Every chunk ran; records are in chunk order.
    Complete(Vec<R>),
    /// Cancelled at a chunk boundary; all results were discarded.
    Cancelled {
        completed_chunks: u64,
        total_chunks: u64,
    },
}

impl<R> FetchOutcome<R> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The records of a complete fetch, or nothing if it was cancelled.
    pub fn into_records(self) -> Vec<R> {
        match self {
            Self::Complete(records) => records,
            Self::Cancelled { .. } => Vec::new(),
        }
    }
}

/// Releases the running flag on every exit path of a fetch.
struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Result<Self, FetchError> {
        running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| FetchError::AlreadyRunning)?;
        Ok(Self { running })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Range-chunked, cancellable fetcher.
#[derive(Default)]
pub struct ChunkedFetcher {
    config: FetcherConfig,
    resolver: Option<Arc<dyn HeadResolver>>,
    flags: Arc<FetcherFlags>,
}

impl ChunkedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` as is. A zero default chunk size is only reported by the
    /// first fetch that relies on it; see [`try_with_config`](Self::try_with_config).
    pub fn with_config(config: FetcherConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Like [`with_config`](Self::with_config), but rejects an invalid config up front.
    pub fn try_with_config(config: FetcherConfig) -> Result<Self, FetchError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    /// Wire a resolver for requests ending at [`RangeEnd::Latest`].
    pub fn with_resolver(mut self, resolver: Arc<dyn HeadResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Request early termination of the running (or next) fetch.
    pub fn cancel(&self) {
        self.flags.cancel_requested.store(true, Ordering::SeqCst);
    }

    /// A cloneable handle that cancels this fetcher.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flags: self.flags.clone(),
        }
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.flags.cancel_requested.load(Ordering::SeqCst)
    }

    /// Returns `true` while a fetch is in progress.
    pub fn is_running(&self) -> bool {
        self.flags.running.load(Ordering::SeqCst)
    }

    /// Fetch every record in the request range.
    ///
    /// Returns the concatenation of all chunk results in chunk order, or an
    /// empty vector if the fetch was cancelled. Any query or progress sink
    /// failure aborts the fetch and no partial result is returned.
    pub async fn fetch<Q>(
        &self,
        query: &Q,
        request: FetchRequest<Q::Filter, Q::Record>,
    ) -> Result<Vec<Q::Record>, FetchError>
    where
        Q: RangeQuery + ?Sized,
    {
        self.fetch_outcome(query, request)
            .await
            .map(FetchOutcome::into_records)
    }

    /// Like [`fetch`](Self::fetch), but reports whether the fetch was cancelled.
    pub async fn fetch_outcome<Q>(
        &self,
        query: &Q,
        request: FetchRequest<Q::Filter, Q::Record>,
    ) -> Result<FetchOutcome<Q::Record>, FetchError>
    where
        Q: RangeQuery + ?Sized,
    {
        let FetchRequest {
            from_block,
            to_block,
            chunk_size,
            filter,
            progress,
        } = request;

        let chunk_size = chunk_size.unwrap_or(self.config.default_chunk_size);
        self.precheck(from_block, to_block, chunk_size)?;

        let _guard = RunGuard::acquire(&self.flags.running)?;

        let end = self.resolve_end(to_block).await?;
        let plan = ChunkPlan::new(from_block, end, chunk_size)?;
        let total = plan.len();

        tracing::info!(
            from = from_block,
            to = end,
            chunk_size,
            chunks = total,
            "Starting chunked fetch"
        );

        let mut records = Vec::new();
        for span in plan.iter() {
            if self.flags.cancel_requested.swap(false, Ordering::SeqCst) {
                tracing::info!(
                    completed = span.index,
                    total,
                    "Fetch cancelled, discarding partial results"
                );
                return Ok(FetchOutcome::Cancelled {
                    completed_chunks: span.index,
                    total_chunks: total,
                });
            }

            let chunk = query
                .query(&filter, span.from, span.to)
                .await
                .map_err(|e| {
                    tracing::warn!(
                        chunk = span.index,
                        from = span.from,
                        to = span.to,
                        error = %e,
                        "Chunk query failed"
                    );
                    e.in_chunk(span.index, span.from, span.to)
                })?;

            tracing::debug!(
                chunk = span.index,
                from = span.from,
                to = span.to,
                records = chunk.len(),
                "Chunk complete"
            );

            if let Some(sink) = &progress {
                let completed = span.index + 1;
                let report = ChunkProgress {
                    completed,
                    total,
                    percentage: percentage(completed, total),
                    span,
                };
                sink.on_chunk(&report, &chunk).await.map_err(|e| {
                    tracing::warn!(chunk = span.index, error = %e, "Progress sink failed");
                    e.in_chunk(span.index, span.from, span.to)
                })?;
            }

            records.extend(chunk);
        }

        tracing::info!(chunks = total, records = records.len(), "Chunked fetch complete");
        Ok(FetchOutcome::Complete(records))
    }

    /// Reject a request before it has any side effect.
    fn precheck(&self, from: u64, to: RangeEnd, chunk_size: u64) -> Result<(), FetchError> {
        match to {
            RangeEnd::Block(end) => ChunkPlan::new(from, end, chunk_size).map(|_| ()),
            RangeEnd::Latest if self.resolver.is_none() => Err(FetchError::InvalidConfig(
                "range end `latest` requires a head resolver".into(),
            )),
            RangeEnd::Latest if chunk_size == 0 => Err(FetchError::InvalidConfig(
                "chunk_size must be positive".into(),
            )),
            RangeEnd::Latest => Ok(()),
        }
    }

    /// Resolve the range end once, before the chunk count is computed.
    async fn resolve_end(&self, to: RangeEnd) -> Result<u64, FetchError> {
        match (to, &self.resolver) {
            (RangeEnd::Block(end), _) => Ok(end),
            (RangeEnd::Latest, Some(resolver)) => {
                let end = resolver.resolve_latest().await?;
                tracing::debug!(end, "Resolved latest range end");
                Ok(end)
            }
            (RangeEnd::Latest, None) => Err(FetchError::InvalidConfig(
                "range end `latest` requires a head resolver".into(),
            )),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
