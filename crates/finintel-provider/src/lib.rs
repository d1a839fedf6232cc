//! Upstream market data for the FinIntel gateway.
//!
//! - `MarketDataSource`: blocking provider interface (Yahoo, static fixtures)
//! - `WorkerPool`: bounded offload of blocking calls off the async runtime
//! - `MarketDataClient`: async facade dispatching source calls to the pool
//! - `normalize`: typed mapping from provider field maps to `NormalizedRecord`
//! - `classify`: silent-failure detection over upstream responses

pub mod client;
pub mod config;
pub mod detect;
pub mod error;
pub mod fixture;
pub mod normalize;
pub mod pool;
pub mod source;
pub mod yahoo;

pub use client::MarketDataClient;
pub use config::ProviderConfig;
pub use detect::{classify, MIN_RESPONSE_FIELDS, PRICE_FIELDS};
pub use error::{MappingError, PoolError, ProviderError, ProviderResult, RetrievalError, SourceError};
pub use fixture::StaticSource;
pub use normalize::{normalize, SANE_BOUND};
pub use pool::WorkerPool;
pub use source::{FieldMap, MarketDataSource, OwnershipSnapshot};
pub use yahoo::YahooSource;
