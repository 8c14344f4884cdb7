//! Request coordinator
//!
//! Every call to the remote API goes through [`RequestCoordinator`], which
//! attaches the bearer credential, serves idempotent reads from the tiered
//! cache, collapses concurrent identical reads into one network call, and on
//! a 401 asks its [`CredentialProvider`] to renew before retrying once.

pub mod coordinator;
pub mod credential;
pub mod inflight;
pub mod response;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;


pub use coordinator::RequestCoordinator;
pub use credential::{
    CredentialProvider, RenewalOutcome, StaticCredentials, expiry_claim, is_well_formed,
};
pub use inflight::InflightRegistry;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};
pub use types::{CacheMode, HttpMethod, RequestOptions};
