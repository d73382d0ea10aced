//! Fetcher configuration.

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Chunk size used when a request does not set one.
pub const DEFAULT_CHUNK_SIZE: u64 = 100;

/// Configuration for a `ChunkedFetcher` instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Blocks per chunk for requests without an explicit `chunk_size`.
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: u64,
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl FetcherConfig {
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.default_chunk_size == 0 {
            return Err(FetchError::InvalidConfig(
                "default_chunk_size must be positive".into(),
            ));
        }
        Ok(())
    }
}
