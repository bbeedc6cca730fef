// src/config/models.rs
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub discovery: DiscoveryConfig,
    pub health_check: HealthCheckConfig,
    pub proxy: ProxyConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Reported as `provider` by `GET /health`.
    pub provider_name: String,
    pub enable_cors: bool,
    /// Fixed delay between starting the background loops and accepting traffic.
    pub warmup_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            provider_name: "ZeroconfAI Proxy".to_string(),
            enable_cors: true,
            warmup_secs: 2,
        }
    }
}

impl ServerConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub interval_secs: u64,
    pub ttl_secs: u64,
    pub probe_timeout_secs: u64,
    pub probes: Vec<ProbeTarget>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            ttl_secs: 30,
            probe_timeout_secs: 2,
            probes: vec![ProbeTarget::default()],
        }
    }
}

impl DiscoveryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// A well-known endpoint the local probe provider checks every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTarget {
    pub id: String,
    pub address: String,
    pub port: u16,
    pub priority: i32,
    pub path: String,
}

impl Default for ProbeTarget {
    fn default() -> Self {
        Self {
            id: "ollama-localhost".to_string(),
            address: "127.0.0.1".to_string(),
            port: 11434,
            priority: 10,
            path: "/api/tags".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    pub interval_secs: u64,
    pub timeout_secs: u64,
    /// Probed in order; the first success marks the service healthy.
    pub paths: Vec<String>,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            timeout_secs: 3,
            paths: vec!["/api/tags".to_string(), "/v1/models".to_string()],
        }
    }
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub models_timeout_secs: u64,
    pub chat_timeout_secs: u64,
    pub owned_by: String,
    pub completion_id: String,
    pub default_model: String,
    /// Client request bodies larger than this are refused with 413.
    pub max_body_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            models_timeout_secs: 5,
            chat_timeout_secs: 120,
            owned_by: "zeroconfai".to_string(),
            completion_id: "chatcmpl-zeroconfai".to_string(),
            default_model: "llama2".to_string(),
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

impl ProxyConfig {
    pub fn models_timeout(&self) -> Duration {
        Duration::from_secs(self.models_timeout_secs)
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
            path: "/metrics".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbose: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { verbose: true }
    }
}

/// Values taken from the command line; they win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub quiet: bool,
}

impl Config {
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if overrides.quiet {
            self.logging.verbose = false;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            bail!("server.host must not be empty");
        }
        if self.server.port == 0 {
            bail!("server.port must be non-zero");
        }

        if self.discovery.interval_secs == 0 || self.discovery.probe_timeout_secs == 0 {
            bail!("discovery interval and probe timeout must be non-zero");
        }
        if self.discovery.ttl_secs <= self.discovery.interval_secs {
            bail!(
                "discovery.ttl_secs ({}) must exceed discovery.interval_secs ({})",
                self.discovery.ttl_secs,
                self.discovery.interval_secs
            );
        }
        let mut seen = HashSet::new();
        for probe in &self.discovery.probes {
            if probe.id.trim().is_empty() {
                bail!("discovery probe id must not be empty");
            }
            if probe.port == 0 {
                bail!("discovery probe {} has port 0", probe.id);
            }
            if !probe.path.starts_with('/') {
                bail!("discovery probe {} path must start with '/'", probe.id);
            }
            if !seen.insert(probe.id.as_str()) {
                bail!("duplicate discovery probe id: {}", probe.id);
            }
        }

        if self.health_check.interval_secs == 0 || self.health_check.timeout_secs == 0 {
            bail!("health_check interval and timeout must be non-zero");
        }
        if self.health_check.paths.is_empty() {
            bail!("health_check.paths must list at least one path");
        }
        if let Some(path) = self.health_check.paths.iter().find(|p| !p.starts_with('/')) {
            bail!("health check path {:?} must start with '/'", path);
        }

        if self.proxy.models_timeout_secs == 0 || self.proxy.chat_timeout_secs == 0 {
            bail!("proxy timeouts must be non-zero");
        }
        if self.proxy.max_body_bytes == 0 {
            bail!("proxy.max_body_bytes must be non-zero");
        }

        if self.metrics.enabled {
            if self.metrics.port == self.server.port {
                bail!("metrics.port must differ from server.port");
            }
            if !self.metrics.path.starts_with('/') {
                bail!("metrics.path must start with '/'");
            }
        }

        Ok(())
    }
}
