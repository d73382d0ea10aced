//! Error types for the chunked fetch pipeline.

use thiserror::Error;

/// Errors that can occur during a chunked fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Rejected before any query was issued (zero chunk size, inverted range, ...).
    #[error("Invalid fetch configuration: {0}")]
    InvalidConfig(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    /// The `latest` range end could not be resolved.
    #[error("Range end resolution failed: {0}")]
    Resolve(String),

    #[error("Progress sink error: {0}")]
    Progress(String),

    /// A second `fetch` was started on a fetcher that is already running one.
    #[error("A fetch is already in progress on this fetcher")]
    AlreadyRunning,

    /// A query or progress sink failed while processing one chunk.
    #[error("Chunk {index} [{from}, {to}) failed: {source}")]
    Chunk {
        index: u64,
        from: u64,
        to: u64,
        #[source]
        source: Box<FetchError>,
    },
}

impl FetchError {
    /// Returns `true` if the fetch was rejected before doing any work.
    pub fn is_invalid_config(&self) -> bool {
        matches!(self.root_cause(), Self::InvalidConfig(_))
    }

    /// The error with all chunk context stripped.
    pub fn root_cause(&self) -> &FetchError {
        match self {
            Self::Chunk { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Index of the chunk that failed, if the error carries chunk context.
    pub fn chunk_index(&self) -> Option<u64> {
        match self {
            Self::Chunk { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub(crate) fn in_chunk(self, index: u64, from: u64, to: u64) -> Self {
        Self::Chunk {
            index,
            from,
            to,
            source: Box::new(self),
        }
    }
}
