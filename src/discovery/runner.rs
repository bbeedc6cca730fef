// src/discovery/runner.rs
use super::provider::DiscoveryProvider;
use crate::config::DiscoveryConfig;
use crate::metrics::MetricsCollector;
use crate::registry::{Candidate, ServiceRegistry};
use crate::shutdown::Shutdown;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Periodic discovery + eviction. Each cycle upserts whatever the provider
/// reports, then sweeps records older than the TTL.
pub struct DiscoveryLoop {
    config: DiscoveryConfig,
    provider: Arc<dyn DiscoveryProvider>,
    registry: Arc<ServiceRegistry>,
    metrics: Option<Arc<MetricsCollector>>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub discovered: usize,
    pub added: usize,
    pub evicted: Vec<String>,
}

impl DiscoveryLoop {
    pub fn new(
        config: DiscoveryConfig,
        provider: Arc<dyn DiscoveryProvider>,
        registry: Arc<ServiceRegistry>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            config,
            provider,
            registry,
            metrics,
        }
    }

    pub async fn start(self: Arc<Self>, shutdown: Shutdown) {
        let mut ticker = interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Starting discovery via {} with interval {:?}, ttl {:?}",
            self.provider.name(),
            self.config.interval(),
            self.config.ttl()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let candidates = self.provider.discover().await;
                    self.apply(candidates, Utc::now());
                }
                _ = shutdown.wait() => {
                    info!("Discovery loop shutting down");
                    break;
                }
            }
        }
    }

    /// One full cycle against an explicit clock.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let candidates = self.provider.discover().await;
        self.apply(candidates, now)
    }

    fn apply(&self, candidates: Vec<Candidate>, now: DateTime<Utc>) -> CycleReport {
        let discovered = candidates.len();
        let mut added = 0;
        for candidate in candidates {
            if self.registry.upsert(candidate, now) {
                added += 1;
            }
        }

        let evicted = self.registry.evict_stale(now, self.config.ttl());

        if let Some(metrics) = &self.metrics {
            for id in &evicted {
                metrics.remove_service(id);
            }
            metrics.update_service_counts(self.registry.list_healthy().len(), self.registry.len());
        }

        debug!(
            "Discovery cycle: {} seen, {} new, {} evicted, {} known",
            discovered,
            added,
            evicted.len(),
            self.registry.len()
        );

        CycleReport {
            discovered,
            added,
            evicted,
        }
    }
}
