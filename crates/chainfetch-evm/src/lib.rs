//! chainfetch-evm — `eth_getLogs` collaborators for the chunked fetcher.
//!
//! ```text
//! EventFetcher
//!   ├── ChunkedFetcher     (chainfetch-core)
//!   ├── EvmLogQuery        (one eth_getLogs per chunk)
//!   └── BlockHeadResolver  (eth_blockNumber for `latest`)
//! ```

pub mod builder;
pub mod events;
pub mod fetcher;
pub mod filter;
pub mod resolver;

pub use builder::EventFetcherBuilder;
pub use events::{EventFetcher, EventRequest};
pub use fetcher::{EvmLogQuery, EvmRpcClient, RawLog, ToBound};
pub use filter::{IndexedTopic, LogFilter};
pub use resolver::BlockHeadResolver;
