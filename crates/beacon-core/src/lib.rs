//! Beacon data-access layer
//!
//! Client-side plumbing for the campaign dashboard: a tiered cache in front
//! of the remote API, a request coordinator that deduplicates reads and
//! recovers from expired credentials, and a session manager that keeps the
//! credential alive.

pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use cache::{CacheOptions, CacheStatistics, Scope, TieredCache};
pub use client::{
    CacheMode, CredentialProvider, HttpMethod, HttpTransport, RenewalOutcome, RequestCoordinator,
    RequestOptions,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, ConfigLoader, load_config};
pub use context::{DataLayer, DataLayerBuilder};
pub use error::{BeaconError, BeaconResult};
pub use lifecycle::PageLifecycle;
pub use session::{SessionManager, SessionState, User};
