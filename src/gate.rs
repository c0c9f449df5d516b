//! Readiness signal for callers that must not query before the engine exists.

use tokio::sync::watch;

use crate::error::{MecabError, Result};
use crate::lifecycle::{EngineState, EngineStatus};

/// Cloneable handle that resolves once the engine is ready.
///
/// Waiting is repeatable: after a reload the gate resolves again on the next
/// `Ready`, and it resolves immediately while the engine is ready.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    status: watch::Receiver<EngineStatus>,
}

impl ReadinessGate {
    pub(crate) fn new(status: watch::Receiver<EngineStatus>) -> Self {
        Self { status }
    }

    /// Waits until the engine is in [`EngineState::Ready`].
    ///
    /// Resolves on the current state, not on readiness ever having been
    /// reached: once a reload or shutdown withdraws `Ready`, new waits stay
    /// pending until the next `Ready`, so a resolved wait always means a
    /// query can be served.
    ///
    /// Fails with [`MecabError::Closed`] if the owning client is dropped
    /// first. Load failures do not resolve the wait; a retrying loader keeps
    /// it pending.
    pub async fn wait_ready(&self) -> Result<()> {
        let mut status = self.status.clone();
        status
            .wait_for(|status| status.state == EngineState::Ready)
            .await
            .map(|_| ())
            .map_err(|_| MecabError::Closed)
    }

    /// Whether the engine is ready right now.
    pub fn is_ready(&self) -> bool {
        self.status.borrow().state == EngineState::Ready
    }

    /// Current status snapshot.
    pub fn status(&self) -> EngineStatus {
        self.status.borrow().clone()
    }
}
