//! UnifiedError trait implementation for BeaconError

use super::types::{BeaconError, UnifiedError};

impl UnifiedError for BeaconError {
    fn error_code(&self) -> &str {
        match self {
            Self::Config { .. } => "BEACON_CONFIG",
            Self::Network { .. } => "BEACON_NETWORK",
            Self::Unauthorized { .. } => "BEACON_UNAUTHORIZED",
            Self::Api { .. } => "BEACON_API",
            Self::Aborted => "BEACON_ABORTED",
            Self::Json { .. } => "BEACON_JSON",
            Self::Io { .. } => "BEACON_IO",
            Self::Storage { .. } => "BEACON_STORAGE",
            Self::InvalidInput { .. } => "BEACON_INVALID_INPUT",
            Self::Internal { .. } => "BEACON_INTERNAL",
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Config { message, .. } => message,
            Self::Network { message, .. } => message,
            Self::Unauthorized { message } => message,
            Self::Api { message, .. } => message,
            Self::Aborted => "Request aborted during teardown",
            Self::Json { message, .. } => message,
            Self::Io { message, .. } => message,
            Self::Storage { message } => message,
            Self::InvalidInput { message, .. } => message,
            Self::Internal { message } => message,
        }
    }

    fn context(&self) -> Option<&str> {
        match self {
            Self::Config { context, .. } => context.as_deref(),
            Self::Json { context, .. } => context.as_deref(),
            Self::Network { url, .. } => url.as_deref(),
            Self::Io { path, .. } => path.as_deref(),
            Self::InvalidInput { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Api { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }
}
