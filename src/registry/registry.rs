// src/registry/registry.rs
use super::record::{Candidate, ServiceRecord};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Authoritative set of known backends, keyed by discovery id.
///
/// Every operation is one short critical section under a single mutex; callers
/// get owned copies back so no lock is held across their I/O.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    records: Mutex<HashMap<String, ServiceRecord>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Each critical section leaves the map consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ServiceRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a newly seen service (unhealthy) or refresh a known one. Health is
    /// never touched here. Returns `true` when the id was new.
    pub fn upsert(&self, candidate: Candidate, seen_at: DateTime<Utc>) -> bool {
        let mut records = self.lock();

        match records.get_mut(&candidate.id) {
            Some(existing) => {
                if existing.address != candidate.address || existing.port != candidate.port {
                    info!(
                        "Service {} moved from {} to {}:{}",
                        existing.id,
                        existing.url(),
                        candidate.address,
                        candidate.port
                    );
                    existing.address = candidate.address;
                    existing.port = candidate.port;
                }
                existing.priority = candidate.priority;
                if seen_at > existing.last_seen {
                    existing.last_seen = seen_at;
                }
                false
            }
            None => {
                let record = ServiceRecord::discovered(candidate, seen_at);
                info!(
                    "Found service: {} at {} (priority {})",
                    record.id,
                    record.url(),
                    record.priority
                );
                records.insert(record.id.clone(), record);
                true
            }
        }
    }

    /// Remove every record whose age exceeds `ttl`. Returns the removed ids.
    pub fn evict_stale(&self, now: DateTime<Utc>, ttl: Duration) -> Vec<String> {
        let mut records = self.lock();

        let stale: Vec<String> = records
            .values()
            .filter(|record| record.age(now).to_std().map_or(false, |age| age > ttl))
            .map(|record| record.id.clone())
            .collect();

        for id in &stale {
            records.remove(id);
            info!("Removing stale service: {}", id);
        }

        stale
    }

    /// Record a health probe result. Returns `true` only when the flag changed.
    pub fn set_health(&self, id: &str, healthy: bool) -> bool {
        let mut records = self.lock();

        let Some(record) = records.get_mut(id) else {
            debug!("Health result for unknown service {} dropped", id);
            return false;
        };

        if record.healthy == healthy {
            return false;
        }

        record.healthy = healthy;
        if healthy {
            info!("Service {} is now healthy", id);
        } else {
            warn!("Service {} is now unhealthy", id);
        }
        true
    }

    pub fn get(&self, id: &str) -> Option<ServiceRecord> {
        self.lock().get(id).cloned()
    }

    /// Copy of every record, healthy or not, ordered by id.
    pub fn snapshot(&self) -> Vec<ServiceRecord> {
        let mut all: Vec<ServiceRecord> = self.lock().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Healthy records by ascending priority; equal priorities order by id.
    pub fn list_healthy(&self) -> Vec<ServiceRecord> {
        let mut healthy: Vec<ServiceRecord> = self
            .lock()
            .values()
            .filter(|record| record.healthy)
            .cloned()
            .collect();
        healthy.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        healthy
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
