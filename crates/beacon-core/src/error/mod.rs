//! Error types for the Beacon data-access layer
//!
//! Every fallible operation in the crate returns [`BeaconResult`]. The error
//! enum is `Clone` so a single failed fetch can be handed to every caller
//! that was waiting on it.
//!
//! All variants implement [`UnifiedError`], which provides:
//! - error_code: a stable identifier for programmatic handling
//! - message: the raw message carried by the variant
//! - context: optional additional context

mod classifiers;
mod constructors;
mod conversions;
mod types;
mod unified_error;

pub use types::{BeaconError, BeaconResult, UnifiedError};
