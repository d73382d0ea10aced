//! Resolves a `latest` range end from the chain head.

use std::sync::Arc;

use async_trait::async_trait;

use chainfetch_core::error::FetchError;
use chainfetch_core::query::HeadResolver;

use crate::fetcher::{EvmRpcClient, ToBound};

/// [`HeadResolver`] backed by `eth_blockNumber`.
///
/// The resolved end is the head minus `confirmation_depth`; under
/// [`ToBound::Exclusive`] one is added so the confirmed head block itself is
/// part of the last chunk.
pub struct BlockHeadResolver<C> {
    client: Arc<C>,
    confirmation_depth: u64,
    bounds: ToBound,
}

impl<C: EvmRpcClient> BlockHeadResolver<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            confirmation_depth: 0,
            bounds: ToBound::default(),
        }
    }

    /// Stay `depth` blocks behind the head.
    pub fn confirmation_depth(mut self, depth: u64) -> Self {
        self.confirmation_depth = depth;
        self
    }

    /// Must match the bounds of the query the resolved end is used with.
    pub fn bounds(mut self, bounds: ToBound) -> Self {
        self.bounds = bounds;
        self
    }
}

#[async_trait]
impl<C: EvmRpcClient> HeadResolver for BlockHeadResolver<C> {
    async fn resolve_latest(&self) -> Result<u64, FetchError> {
        let head = self
            .client
            .get_block_number()
            .await
            .map_err(|e| FetchError::Resolve(e.to_string()))?;
        let confirmed = head.saturating_sub(self.confirmation_depth);
        let end = match self.bounds {
            ToBound::Exclusive => confirmed.saturating_add(1),
            ToBound::Inclusive => confirmed,
        };
        tracing::debug!(head, confirmed, end, "Resolved latest block");
        Ok(end)
    }
}
