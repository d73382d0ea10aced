//! chainfetch-core — range-chunked, cancellable log fetching.
//!
//! # Architecture
//!
//! ```text
//! FetchRequest → ChunkedFetcher
//!                    ├── HeadResolver   (optional, resolves `Latest` once)
//!                    ├── ChunkPlan      ([from, to) spans of ≤ chunk_size)
//!                    ├── RangeQuery     (one call per chunk, sequential)
//!                    └── ProgressSink   (one call per completed chunk)
//! ```
//!
//! A fetch either returns every chunk's records concatenated in chunk order,
//! returns an empty result because it was cancelled, or fails with no partial
//! data.

pub mod chunk;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod progress;
pub mod query;
pub mod request;

pub use chunk::{ChunkPlan, ChunkSpan};
pub use config::{FetcherConfig, DEFAULT_CHUNK_SIZE};
pub use error::FetchError;
pub use fetcher::{CancelHandle, ChunkedFetcher, FetchOutcome};
pub use logging::{init_tracing, LogConfig};
pub use progress::{ChannelSink, ChunkProgress, FnSink, ProgressSink, ProgressUpdate};
pub use query::{HeadResolver, RangeEnd, RangeQuery};
pub use request::FetchRequest;
