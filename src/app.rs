// src/app.rs
use crate::{
    config::Config,
    discovery::{DiscoveryLoop, DiscoveryProvider, LocalProbeProvider},
    health::HealthMonitor,
    metrics::{start_metrics_server, MetricsRegistry},
    proxy::Proxy,
    registry::ServiceRegistry,
    router::PriorityRouter,
    server::{bind_tcp, resolve, RequestHandler, ServerBuilder},
    shutdown::Shutdown,
};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Start discovery and health loops, wait out the warm-up, then serve until
/// `shutdown` fires. Configuration and bind errors surface before any loop runs.
pub async fn run(config: Config, shutdown: Shutdown) -> Result<()> {
    let provider = Arc::new(
        LocalProbeProvider::new(
            config.discovery.probes.clone(),
            config.discovery.probe_timeout(),
        )
        .context("Failed to create discovery client")?,
    );
    run_with_provider(config, provider, shutdown).await
}

pub async fn run_with_provider(
    config: Config,
    provider: Arc<dyn DiscoveryProvider>,
    shutdown: Shutdown,
) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let metrics_registry = if config.metrics.enabled {
        Some(MetricsRegistry::new().context("Failed to create metrics registry")?)
    } else {
        None
    };
    let metrics = metrics_registry.as_ref().map(|registry| registry.collector());

    let registry = Arc::new(ServiceRegistry::new());

    let discovery = Arc::new(DiscoveryLoop::new(
        config.discovery.clone(),
        provider,
        registry.clone(),
        metrics.clone(),
    ));
    let monitor = Arc::new(
        HealthMonitor::new(config.health_check.clone(), registry.clone(), metrics.clone())
            .context("Failed to create health check client")?,
    );
    let proxy = Arc::new(
        Proxy::new(&config, registry, Arc::new(PriorityRouter::new()), metrics)
            .context("Failed to create backend client")?,
    );

    let addr = resolve(&config.server.host, config.server.port)
        .await
        .with_context(|| format!("Invalid listen address {}", config.server.host))?;
    let listener = bind_tcp(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let metrics_task = match metrics_registry {
        Some(registry) => {
            let metrics_addr = SocketAddr::new(addr.ip(), config.metrics.port);
            Some(start_metrics_server(
                metrics_addr,
                registry,
                config.metrics.path.clone(),
                shutdown.clone(),
            )?)
        }
        None => None,
    };

    let discovery_task = tokio::spawn(discovery.start(shutdown.clone()));
    let health_task = tokio::spawn(monitor.start(shutdown.clone()));

    info!("Waiting {:?} for service discovery...", config.server.warmup());
    tokio::select! {
        _ = tokio::time::sleep(config.server.warmup()) => {}
        _ = shutdown.wait() => {}
    }

    info!("OpenAI-compatible API: http://{}/v1", addr);
    let result = ServerBuilder::new()
        .with_handler(RequestHandler::new(proxy))
        .serve_listener(listener, shutdown.clone())
        .await;

    // The server may have stopped on its own; make sure the loops follow.
    shutdown.trigger();
    for (name, task) in [("discovery", discovery_task), ("health", health_task)] {
        if let Err(e) = task.await {
            warn!("{} loop ended abnormally: {}", name, e);
        }
    }
    if let Some(task) = metrics_task {
        if let Err(e) = task.await {
            warn!("metrics server ended abnormally: {}", e);
        }
    }

    info!("Proxy stopped");
    result
}
