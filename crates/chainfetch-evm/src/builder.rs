//! Fluent builder API for creating EVM event fetchers.
//!
//! # Example
//!
//! ```rust,ignore
//! use chainfetch_evm::{EventFetcherBuilder, ToBound};
//!
//! let fetcher = EventFetcherBuilder::new(client)
//!     .chunk_size(500)
//!     .confirmation_depth(12)
//!     .bounds(ToBound::Exclusive)
//!     .build()?;
//! ```

use std::sync::Arc;

use chainfetch_core::config::FetcherConfig;
use chainfetch_core::error::FetchError;
use chainfetch_core::fetcher::ChunkedFetcher;

use crate::events::EventFetcher;
use crate::fetcher::{EvmLogQuery, EvmRpcClient, ToBound};
use crate::resolver::BlockHeadResolver;

/// Fluent builder for [`EventFetcher`].
pub struct EventFetcherBuilder<C> {
    client: Arc<C>,
    config: FetcherConfig,
    confirmation_depth: u64,
    bounds: ToBound,
}

impl<C: EvmRpcClient + 'static> EventFetcherBuilder<C> {
    pub fn new(client: C) -> Self {
        Self::shared(Arc::new(client))
    }

    /// Build on a client that is also used elsewhere.
    pub fn shared(client: Arc<C>) -> Self {
        Self {
            client,
            config: FetcherConfig::default(),
            confirmation_depth: 0,
            bounds: ToBound::default(),
        }
    }

    /// Set the default number of blocks per `eth_getLogs` call.
    pub fn chunk_size(mut self, size: u64) -> Self {
        self.config.default_chunk_size = size;
        self
    }

    /// Replace the whole fetcher config.
    pub fn config(mut self, config: FetcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Blocks to stay behind the head when resolving `latest`.
    pub fn confirmation_depth(mut self, depth: u64) -> Self {
        self.confirmation_depth = depth;
        self
    }

    /// Set how chunk end bounds map onto `toBlock`.
    pub fn bounds(mut self, bounds: ToBound) -> Self {
        self.bounds = bounds;
        self
    }

    /// Build the fetcher, rejecting a zero chunk size.
    pub fn build(self) -> Result<EventFetcher<C>, FetchError> {
        self.config.validate()?;
        Ok(self.assemble())
    }

    /// Build without validating the config.
    pub(crate) fn assemble(self) -> EventFetcher<C> {
        let resolver = BlockHeadResolver::new(self.client.clone())
            .confirmation_depth(self.confirmation_depth)
            .bounds(self.bounds);
        let fetcher = ChunkedFetcher::with_config(self.config).with_resolver(Arc::new(resolver));
        let query = EvmLogQuery::shared(self.client).with_bounds(self.bounds);
        EventFetcher::from_parts(query, fetcher)
    }
}
