//! EVM log query for the chunked fetcher.
//!
//! Each chunk becomes one `eth_getLogs` call over an inclusive block range;
//! [`ToBound`] decides how the chunk's end bound maps onto it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use chainfetch_core::error::FetchError;
use chainfetch_core::query::RangeQuery;

use crate::filter::LogFilter;

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    #[serde(rename = "data")]
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "blockHash")]
    pub block_hash: String,
    #[serde(rename = "transactionHash")]
    pub tx_hash: String,
    #[serde(rename = "logIndex")]
    pub log_index: String,
    #[serde(rename = "removed")]
    pub removed: Option<bool>,
}

impl RawLog {
    /// Returns the block number, or `None` if it is not valid hex.
    pub fn block_number_u64(&self) -> Option<u64> {
        parse_hex_u64(&self.block_number)
    }

    /// Returns the log index, or `None` if it is not valid hex or exceeds u32.
    pub fn log_index_u32(&self) -> Option<u32> {
        parse_hex_u64(&self.log_index).and_then(|i| u32::try_from(i).ok())
    }

    /// Returns `true` if this log was removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }
}

/// Trait for fetching EVM data from a JSON-RPC provider.
#[async_trait]
pub trait EvmRpcClient: Send + Sync {
    async fn get_block_number(&self) -> Result<u64, FetchError>;
    /// `eth_getLogs` over the inclusive range `[from, to]`.
    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        filter: &LogFilter,
    ) -> Result<Vec<RawLog>, FetchError>;
}

/// How a chunk's `to` bound maps onto `eth_getLogs`' inclusive `toBlock`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToBound {
    /// Chunk `[from, to)` queries `from..=to - 1`. Chunks never share a block.
    #[default]
    Exclusive,
    /// Chunk `to` is passed through as `toBlock`, so adjacent chunks both
    /// query their seam block.
    Inclusive,
}

impl ToBound {
    /// Inclusive `toBlock` for the chunk `[from, to)`.
    pub fn last_block(self, from: u64, to: u64) -> u64 {
        match self {
            Self::Exclusive => to.saturating_sub(1).max(from),
            Self::Inclusive => to,
        }
    }
}

/// [`RangeQuery`] issuing one `eth_getLogs` call per chunk.
pub struct EvmLogQuery<C> {
    client: Arc<C>,
    bounds: ToBound,
}

impl<C: EvmRpcClient> EvmLogQuery<C> {
    pub fn new(client: C) -> Self {
        Self::shared(Arc::new(client))
    }

    pub fn shared(client: Arc<C>) -> Self {
        Self {
            client,
            bounds: ToBound::default(),
        }
    }

    pub fn with_bounds(mut self, bounds: ToBound) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn bounds(&self) -> ToBound {
        self.bounds
    }
}

#[async_trait]
impl<C: EvmRpcClient> RangeQuery for EvmLogQuery<C> {
    type Filter = LogFilter;
    type Record = RawLog;

    async fn query(
        &self,
        filter: &LogFilter,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, FetchError> {
        let last = self.bounds.last_block(from, to);
        tracing::trace!(
            event = filter.event.as_deref().unwrap_or("*"),
            from,
            to = last,
            "eth_getLogs"
        );
        self.client.get_logs(from, last, filter).await
    }
}

/// Parse a hex-encoded string (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> Option<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).ok()
}
