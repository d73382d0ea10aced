//! Contract event fetcher: a chunked fetcher pre-wired to one RPC client.

use chainfetch_core::config::FetcherConfig;
use chainfetch_core::error::FetchError;
use chainfetch_core::fetcher::{CancelHandle, ChunkedFetcher, FetchOutcome};
use chainfetch_core::request::FetchRequest;

use crate::builder::EventFetcherBuilder;
use crate::fetcher::{EvmLogQuery, EvmRpcClient, RawLog, ToBound};
use crate::filter::LogFilter;

/// Request type accepted by [`EventFetcher`].
pub type EventRequest = FetchRequest<LogFilter, RawLog>;

/// Fetches the logs of one contract event over a block range, chunk by chunk.
///
/// Same contract as [`ChunkedFetcher`]: one fetch at a time, cancellation
/// discards everything fetched so far.
pub struct EventFetcher<C> {
    query: EvmLogQuery<C>,
    fetcher: ChunkedFetcher,
}

impl<C: EvmRpcClient + 'static> EventFetcher<C> {
    /// Fetcher with default settings; see [`EventFetcherBuilder`] for options.
    pub fn new(client: C) -> Self {
        EventFetcherBuilder::new(client).assemble()
    }

    pub fn builder(client: C) -> EventFetcherBuilder<C> {
        EventFetcherBuilder::new(client)
    }
}

impl<C: EvmRpcClient> EventFetcher<C> {
    pub(crate) fn from_parts(query: EvmLogQuery<C>, fetcher: ChunkedFetcher) -> Self {
        Self { query, fetcher }
    }

    /// Fetch every matching log in the request range.
    pub async fn fetch(&self, request: EventRequest) -> Result<Vec<RawLog>, FetchError> {
        self.fetch_outcome(request)
            .await
            .map(FetchOutcome::into_records)
    }

    pub async fn fetch_outcome(
        &self,
        request: EventRequest,
    ) -> Result<FetchOutcome<RawLog>, FetchError> {
        let event = request
            .filter
            .event
            .clone()
            .unwrap_or_else(|| "*".to_string());
        tracing::debug!(
            %event,
            address = request.filter.address.as_deref().unwrap_or("*"),
            from = request.from_block,
            to = %request.to_block,
            "Fetching contract events"
        );
        let outcome = self.fetcher.fetch_outcome(&self.query, request).await?;
        if let FetchOutcome::Complete(logs) = &outcome {
            tracing::debug!(%event, logs = logs.len(), "Contract events fetched");
        }
        Ok(outcome)
    }

    pub fn cancel(&self) {
        self.fetcher.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.fetcher.cancel_handle()
    }

    pub fn is_running(&self) -> bool {
        self.fetcher.is_running()
    }

    pub fn config(&self) -> &FetcherConfig {
        self.fetcher.config()
    }

    pub fn bounds(&self) -> ToBound {
        self.query.bounds()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
