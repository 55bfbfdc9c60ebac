//! Health gate: a shared breaker that fails conversions fast when the
//! service is known-unreachable (expired key, wrong endpoint).
//!
//! The gate is a value, not a process-wide global: construct one, hand
//! clones to every [`crate::convert::Converter`] that should share fate,
//! and keep separate gates for tenants with separate credentials. Clones
//! share the underlying flag.
//!
//! Only two things move the flag: a [`crate::convert::Converter::probe`]
//! call (both directions) and a job-creation attempt that discovers an
//! authorization failure mid-flight (unhealthy only). Transient network
//! trouble never opens the gate — retries handle that.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

/// Shared health flag. Cheap to clone; clones observe each other's writes.
#[derive(Debug, Clone)]
pub struct HealthGate {
    healthy: Arc<AtomicBool>,
}

impl HealthGate {
    pub fn new(healthy: bool) -> Self {
        Self {
            healthy: Arc::new(AtomicBool::new(healthy)),
        }
    }

    /// Current verdict. `false` means conversions fail before any network I/O.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    /// Record a new verdict. Transitions are logged; repeats are silent.
    pub fn set_healthy(&self, healthy: bool) {
        let was = self.healthy.swap(healthy, Ordering::SeqCst);
        if was != healthy {
            if healthy {
                info!("conversion service health gate closed, calls resume");
            } else {
                warn!("conversion service health gate opened, calls will fail fast");
            }
        }
    }
}

/// Starts healthy: the first conversion is allowed to try the network
/// even if no probe has run yet.
impl Default for HealthGate {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_healthy() {
        assert!(HealthGate::default().is_healthy());
    }

    #[test]
    fn set_healthy_flips_state() {
        let gate = HealthGate::new(true);
        gate.set_healthy(false);
        assert!(!gate.is_healthy());
        gate.set_healthy(true);
        assert!(gate.is_healthy());
    }

    #[test]
    fn clones_share_the_flag() {
        let gate = HealthGate::new(true);
        let other = gate.clone();
        other.set_healthy(false);
        assert!(!gate.is_healthy());
    }
}
