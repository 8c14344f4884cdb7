//! Session management
//!
//! [`SessionManager`] owns the bearer credential and its renewal credential,
//! keeps a persisted mirror of both in the synchronous store, renews
//! proactively before expiry, and is the single renewal entrypoint for
//! reactive (401) recovery through [`CredentialProvider`].
//!
//! Every session transition purges the whole cache and switches its scope.
//!
//! [`CredentialProvider`]: crate::client::CredentialProvider

mod manager;
mod mirror;
mod renewal;
mod types;

#[cfg(test)]
mod tests;

pub use manager::SessionManager;
pub use mirror::{MirrorState, SessionMirror};
pub use types::{AuthResponse, Session, SessionState, User};
