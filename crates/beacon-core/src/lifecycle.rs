//! Teardown tracking for the data-access context
//!
//! Once teardown begins, in-flight and new requests resolve to
//! [`BeaconError::Aborted`](crate::error::BeaconError::Aborted), which callers
//! treat as suppressed rather than as a failure worth reporting.

use tokio_util::sync::CancellationToken;

/// Cloneable teardown flag shared by everything in one context
#[derive(Debug, Clone, Default)]
pub struct PageLifecycle {
    token: CancellationToken,
}

impl PageLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the context as shutting down; idempotent
    pub fn begin_teardown(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("Page lifecycle entering teardown");
        }
        self.token.cancel();
    }

    pub fn is_tearing_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once teardown has begun
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
