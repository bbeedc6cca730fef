// src/discovery/provider.rs
use crate::config::ProbeTarget;
use crate::registry::{Candidate, SCHEME};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Source of candidate backends. Implementations may use any transport; the
/// registry only sees the returned list.
#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    /// Endpoints observable right now. Failures are not errors: an endpoint that
    /// could not be reached is simply absent from the list.
    async fn discover(&self) -> Vec<Candidate>;

    fn name(&self) -> &'static str;
}

/// Probes a fixed set of well-known endpoints and reports those answering 200.
pub struct LocalProbeProvider {
    targets: Vec<ProbeTarget>,
    client: Client,
}

impl LocalProbeProvider {
    pub fn new(targets: Vec<ProbeTarget>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { targets, client })
    }

    async fn probe(&self, target: &ProbeTarget) -> bool {
        let url = format!("{}://{}:{}{}", SCHEME, target.address, target.port, target.path);
        match self.client.get(&url).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => true,
            Ok(response) => {
                debug!("Discovery probe {} returned {}", url, response.status());
                false
            }
            Err(e) => {
                debug!("Discovery probe {} failed: {}", url, e);
                false
            }
        }
    }
}

#[async_trait]
impl DiscoveryProvider for LocalProbeProvider {
    async fn discover(&self) -> Vec<Candidate> {
        let mut found = Vec::new();
        for target in &self.targets {
            if self.probe(target).await {
                found.push(Candidate::new(
                    target.id.clone(),
                    target.address.clone(),
                    target.port,
                    target.priority,
                ));
            }
        }
        found
    }

    fn name(&self) -> &'static str {
        "local_probe"
    }
}
