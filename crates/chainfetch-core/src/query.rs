//! Collaborator traits: the per-chunk range query and the `latest` resolver.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Retrieves every record matching a filter inside one chunk.
///
/// The fetcher hands over the chunk bounds as computed by the plan
/// (`to = min(from + chunk_size, range_end)`); whether `to` is exclusive or
/// inclusive is the implementation's own convention.
#[async_trait]
pub trait RangeQuery: Send + Sync {
    /// Opaque filter passed through unmodified on every call.
    type Filter: Send + Sync;
    /// Record type returned per chunk.
    type Record: Send + Sync;

    async fn query(
        &self,
        filter: &Self::Filter,
        from: u64,
        to: u64,
    ) -> Result<Vec<Self::Record>, FetchError>;
}

/// Maps the symbolic `latest` range end to a concrete block number.
#[async_trait]
pub trait HeadResolver: Send + Sync {
    async fn resolve_latest(&self) -> Result<u64, FetchError>;
}

/// The end of a fetch range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeEnd {
    /// A concrete block number.
    Block(u64),
    /// The current chain head, resolved once before chunking.
    Latest,
}

impl From<u64> for RangeEnd {
    fn from(block: u64) -> Self {
        Self::Block(block)
    }
}

impl std::fmt::Display for RangeEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Block(n) => write!(f, "{n}"),
            Self::Latest => write!(f, "latest"),
        }
    }
}
