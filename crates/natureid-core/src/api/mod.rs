//! Remote taxa service: transport, throttling, backoff, and response cache.

pub mod cache;
pub mod client;
pub mod retry;
pub mod throttle;
pub mod transport;

pub use cache::ApiCache;
pub use client::{QueryValue, RemoteName, RemoteTaxon, RemoteTaxonClient, TaxaResponse};
pub use throttle::Throttle;
pub use transport::{HttpTransport, TaxaTransport, TransportError, TransportResponse};
