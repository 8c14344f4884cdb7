//! Classification helpers used by the request pipeline and the UI boundary

use super::types::{BeaconError, UnifiedError};

impl BeaconError {
    /// Whether this error means the remote API rejected the credential.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Unauthorized { .. } => true,
            Self::Api { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// Errors that must not be shown to the user.
    ///
    /// Only failures caused by the owning context tearing down qualify.
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// HTTP status carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    /// The single message string shown for a failed call.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            Self::Unauthorized { message } | Self::Api { message, .. } => message.clone(),
            Self::Aborted => String::new(),
            other => other.message().to_string(),
        }
    }
}
