// src/router/priority.rs
use crate::registry::ServiceRecord;
use crate::router::ServiceSelector;

/// Lowest priority value wins; equal priorities fall back to id order.
#[derive(Debug, Default, Clone, Copy)]
pub struct PriorityRouter;

impl PriorityRouter {
    pub fn new() -> Self {
        Self
    }
}

impl ServiceSelector for PriorityRouter {
    fn select(&self, healthy: &[ServiceRecord]) -> Option<ServiceRecord> {
        healthy
            .iter()
            .filter(|record| record.healthy)
            .min_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)))
            .cloned()
    }

    fn name(&self) -> &'static str {
        "priority"
    }
}
