use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use b2c_core::AuthError;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// What a second caller does while an acquisition for the same key runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InFlightPolicy {
    /// Wait for the running acquisition, then proceed.
    Wait,
    /// Fail immediately with `AcquisitionInProgress`.
    Reject,
}

/// One async mutex per acquisition key.
#[derive(Default)]
pub(crate) struct FlightGuards {
    guards: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

pub(crate) struct FlightPermit {
    _guard: OwnedMutexGuard<()>,
    pub(crate) waited: bool,
}

impl FlightGuards {
    pub(crate) async fn enter(
        &self,
        key: &str,
        policy: InFlightPolicy,
    ) -> Result<FlightPermit, AuthError> {
        let lock = {
            let mut guards = self.guards.lock().unwrap_or_else(PoisonError::into_inner);
            guards.retain(|_, lock| Arc::strong_count(lock) > 1);
            guards.entry(key.to_string()).or_default().clone()
        };
        if let Ok(guard) = lock.clone().try_lock_owned() {
            return Ok(FlightPermit {
                _guard: guard,
                waited: false,
            });
        }
        match policy {
            InFlightPolicy::Reject => Err(AuthError::AcquisitionInProgress(key.to_string())),
            InFlightPolicy::Wait => Ok(FlightPermit {
                _guard: lock.lock_owned().await,
                waited: true,
            }),
        }
    }
}
