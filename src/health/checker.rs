// src/health/checker.rs
use crate::config::HealthCheckConfig;
use crate::metrics::MetricsCollector;
use crate::registry::{ServiceRecord, ServiceRegistry};
use crate::shutdown::Shutdown;
use reqwest::Client;
use std::sync::Arc;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info};

pub struct HealthMonitor {
    config: HealthCheckConfig,
    registry: Arc<ServiceRegistry>,
    client: Client,
    metrics: Option<Arc<MetricsCollector>>,
}

#[derive(Debug)]
pub struct HealthCheckResult {
    pub service_id: String,
    pub healthy: bool,
    pub response_time_ms: u64,
    /// Failure of the last path tried, when no path succeeded.
    pub error: Option<String>,
}

impl HealthMonitor {
    pub fn new(
        config: HealthCheckConfig,
        registry: Arc<ServiceRegistry>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            config,
            registry,
            client,
            metrics,
        })
    }

    pub async fn start(self: Arc<Self>, shutdown: Shutdown) {
        let mut ticker = interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Starting health monitor with interval: {:?}",
            self.config.interval()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.wait() => {
                    info!("Health monitor shutting down");
                    break;
                }
            }
        }
    }

    /// Probe every known service, healthy or not, one at a time, and write each
    /// result back to the registry.
    pub async fn check_all(&self) -> Vec<HealthCheckResult> {
        let services = self.registry.snapshot();
        let mut results = Vec::with_capacity(services.len());

        for service in &services {
            let result = self.check_service(service).await;
            self.registry.set_health(&result.service_id, result.healthy);

            if let Some(metrics) = &self.metrics {
                metrics.update_service_health(&result.service_id, result.healthy);
            }
            if result.healthy {
                debug!(
                    "Service {} healthy ({}ms)",
                    result.service_id, result.response_time_ms
                );
            } else {
                debug!(
                    "Service {} failed health check after {}ms: {:?}",
                    result.service_id, result.response_time_ms, result.error
                );
            }
            results.push(result);
        }

        let healthy_count = self.registry.list_healthy().len();
        if let Some(metrics) = &self.metrics {
            metrics.update_service_counts(healthy_count, self.registry.len());
        }

        debug!(
            "Health check complete: {} checked, {} healthy",
            results.len(),
            healthy_count
        );

        results
    }

    /// Healthy iff any configured path answers with a success status.
    pub async fn check_service(&self, service: &ServiceRecord) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let mut error = None;

        for path in &self.config.paths {
            match self.probe(service, path).await {
                Ok(()) => {
                    return HealthCheckResult {
                        service_id: service.id.clone(),
                        healthy: true,
                        response_time_ms: start.elapsed().as_millis() as u64,
                        error: None,
                    };
                }
                Err(e) => error = Some(format!("{}: {}", path, e)),
            }
        }

        HealthCheckResult {
            service_id: service.id.clone(),
            healthy: false,
            response_time_ms: start.elapsed().as_millis() as u64,
            error,
        }
    }

    async fn probe(&self, service: &ServiceRecord, path: &str) -> Result<(), String> {
        let url = service.endpoint(path).map_err(|e| e.to_string())?;

        match timeout(self.config.timeout(), self.client.get(url).send()).await {
            Ok(Ok(response)) if response.status().is_success() => Ok(()),
            Ok(Ok(response)) => Err(format!("HTTP {}", response.status())),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("Request timeout".to_string()),
        }
    }
}
