// src/metrics/collector.rs
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Client-facing requests
    pub requests_total: IntCounterVec,
    pub request_duration_seconds: HistogramVec,

    // Outbound calls to services
    pub backend_requests_total: IntCounterVec,

    // Registry state
    pub service_health: IntGaugeVec,
    pub services_healthy: IntGauge,
    pub services_total: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("zcp_requests_total", "Total number of proxied requests"),
            &["route", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "zcp_request_duration_seconds",
                "Request duration in seconds",
            ),
            &["route"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let backend_requests_total = IntCounterVec::new(
            Opts::new("zcp_backend_requests_total", "Total calls forwarded to services"),
            &["service", "outcome"],
        )?;
        registry.register(Box::new(backend_requests_total.clone()))?;

        let service_health = IntGaugeVec::new(
            Opts::new(
                "zcp_service_health",
                "Service health (1=healthy, 0=unhealthy)",
            ),
            &["service"],
        )?;
        registry.register(Box::new(service_health.clone()))?;

        let services_healthy =
            IntGauge::new("zcp_services_healthy", "Number of healthy services")?;
        registry.register(Box::new(services_healthy.clone()))?;

        let services_total = IntGauge::new("zcp_services_total", "Number of known services")?;
        registry.register(Box::new(services_total.clone()))?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
            backend_requests_total,
            service_health,
            services_healthy,
            services_total,
        })
    }

    pub fn record_request(&self, route: &str, status_code: u16, duration: std::time::Duration) {
        let status = status_code.to_string();
        self.requests_total
            .with_label_values(&[route, &status])
            .inc();

        self.request_duration_seconds
            .with_label_values(&[route])
            .observe(duration.as_secs_f64());
    }

    pub fn record_backend_request(&self, service: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.backend_requests_total
            .with_label_values(&[service, outcome])
            .inc();
    }

    pub fn update_service_health(&self, service: &str, healthy: bool) {
        let value = if healthy { 1 } else { 0 };
        self.service_health
            .with_label_values(&[service])
            .set(value);
    }

    /// Drop the per-service series of an evicted service.
    pub fn remove_service(&self, service: &str) {
        let _ = self.service_health.remove_label_values(&[service]);
    }

    pub fn update_service_counts(&self, healthy: usize, total: usize) {
        self.services_healthy.set(healthy as i64);
        self.services_total.set(total as i64);
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
