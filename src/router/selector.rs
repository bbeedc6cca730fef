// src/router/selector.rs
use crate::registry::ServiceRecord;

/// Picks the service a request goes to. Implementations are pure: no I/O, no
/// state, only the snapshot they are handed.
pub trait ServiceSelector: Send + Sync {
    fn select(&self, healthy: &[ServiceRecord]) -> Option<ServiceRecord>;

    fn name(&self) -> &'static str;
}
