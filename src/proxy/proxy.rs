// ────────────────────────────────
// src/proxy/proxy.rs
// Routes client requests to the selected service and translates both ways.
// ────────────────────────────────

use super::client::BackendClient;
use super::error::{json_response, ProxyError};
use crate::config::{Config, ProxyConfig};
use crate::metrics::{MetricsCollector, Timer};
use crate::registry::{ServiceRecord, ServiceRegistry};
use crate::router::ServiceSelector;
use crate::translate::{ProtocolTranslator, NATIVE_CHAT_PATH, NATIVE_MODELS_PATH};
use chrono::Utc;
use hyper::header::{self, HeaderValue};
use hyper::body::{Bytes, HttpBody};
use hyper::{Body, Method, Request, Response, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Health,
    Models,
    ChatCompletions,
}

impl Route {
    /// Accepts each path bare or under the `/v1` prefix.
    fn parse(path: &str) -> Option<Self> {
        let path = path
            .strip_prefix("/v1")
            .filter(|rest| rest.starts_with('/'))
            .unwrap_or(path);

        match path {
            "/health" => Some(Route::Health),
            "/models" => Some(Route::Models),
            "/chat/completions" => Some(Route::ChatCompletions),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Route::Health => "health",
            Route::Models => "models",
            Route::ChatCompletions => "chat_completions",
        }
    }
}

pub struct Proxy {
    provider_name: String,
    enable_cors: bool,
    config: ProxyConfig,
    registry: Arc<ServiceRegistry>,
    selector: Arc<dyn ServiceSelector>,
    translator: ProtocolTranslator,
    client: BackendClient,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Proxy {
    pub fn new(
        config: &Config,
        registry: Arc<ServiceRegistry>,
        selector: Arc<dyn ServiceSelector>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            provider_name: config.server.provider_name.clone(),
            enable_cors: config.server.enable_cors,
            config: config.proxy.clone(),
            registry,
            selector,
            translator: ProtocolTranslator::new(&config.proxy),
            client: BackendClient::new()?,
            metrics,
        })
    }

    /// Every outcome, including failures, becomes a response.
    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let timer = Timer::new();
        let span = info_span!(
            "request",
            id = %Uuid::new_v4(),
            method = %req.method(),
            path = %req.uri().path(),
        );

        let (label, mut response) = self.dispatch(req).instrument(span).await;

        if self.enable_cors {
            add_cors_headers(&mut response);
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_request(label, response.status().as_u16(), timer.elapsed());
        }

        response
    }

    async fn dispatch(&self, req: Request<Body>) -> (&'static str, Response<Body>) {
        if self.enable_cors && req.method() == Method::OPTIONS {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::NO_CONTENT;
            return ("preflight", response);
        }

        let Some(route) = Route::parse(req.uri().path()) else {
            return ("unknown", ProxyError::NotFound.into());
        };

        let result = match (req.method(), route) {
            (&Method::GET, Route::Health) => Ok(self.health()),
            (&Method::GET, Route::Models) => self.models().await,
            (&Method::POST, Route::ChatCompletions) => self.chat_completions(req).await,
            _ => Err(ProxyError::MethodNotAllowed),
        };

        let response = result.unwrap_or_else(|e| {
            match &e {
                ProxyError::Internal(_) | ProxyError::InvalidRequest(_) => error!("{}", e),
                _ => debug!("{}", e),
            }
            e.into()
        });

        (route.label(), response)
    }

    fn health(&self) -> Response<Body> {
        let services = self.registry.list_healthy().len();
        let (status, code) = if services == 0 {
            ("no_services", StatusCode::SERVICE_UNAVAILABLE)
        } else {
            ("ok", StatusCode::OK)
        };

        json_response(
            code,
            &json!({
                "status": status,
                "provider": self.provider_name,
                "services": services,
            }),
        )
    }

    fn select(&self) -> Result<ServiceRecord, ProxyError> {
        let healthy = self.registry.list_healthy();
        let chosen = self
            .selector
            .select(&healthy)
            .ok_or(ProxyError::NoHealthyServices)?;
        debug!(
            "{} selector chose {} out of {} healthy",
            self.selector.name(),
            chosen.id,
            healthy.len()
        );
        Ok(chosen)
    }

    fn record_backend(&self, service: &str, success: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_backend_request(service, success);
        }
    }

    async fn models(&self) -> Result<Response<Body>, ProxyError> {
        let target = self.select()?;
        debug!("Fetching models from {}", target.id);

        let url = target
            .endpoint(NATIVE_MODELS_PATH)
            .map_err(|e| ProxyError::Internal(e.to_string()))?;

        let response = match self.client.get(url, self.config.models_timeout()).await {
            Ok(response) if response.status.is_success() => response,
            Ok(response) => {
                self.record_backend(&target.id, false);
                warn!("{} answered model listing with {}", target.id, response.status);
                return Err(ProxyError::BackendUnavailable("Failed to fetch models".into()));
            }
            Err(e) => {
                self.record_backend(&target.id, false);
                warn!("Model listing from {} failed: {}", target.id, e);
                return Err(ProxyError::BackendUnavailable("Failed to fetch models".into()));
            }
        };
        self.record_backend(&target.id, true);

        let list = self
            .translator
            .models_from_native(&response.body)
            .map_err(|e| ProxyError::ModelListParse(e.to_string()))?;

        Ok(json_response(StatusCode::OK, &list))
    }

    async fn chat_completions(&self, req: Request<Body>) -> Result<Response<Body>, ProxyError> {
        // No healthy service means no outbound call and no body parsing.
        let target = self.select()?;
        debug!("Routing chat completion to {}", target.id);

        let body = read_body(req, self.config.max_body_bytes).await?;
        let native = self
            .translator
            .chat_request_to_native(&body)
            .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;

        let url = target
            .endpoint(NATIVE_CHAT_PATH)
            .map_err(|e| ProxyError::Internal(e.to_string()))?;

        let response = match self
            .client
            .post_json(url, &native, self.config.chat_timeout())
            .await
        {
            Ok(response) if response.status.is_server_error() => {
                self.record_backend(&target.id, false);
                warn!("{} answered chat with {}", target.id, response.status);
                return Err(ProxyError::BackendUnavailable("Backend service unavailable".into()));
            }
            Ok(response) => response,
            Err(e) => {
                self.record_backend(&target.id, false);
                warn!("Chat request to {} failed: {}", target.id, e);
                return Err(ProxyError::BackendUnavailable("Backend service unavailable".into()));
            }
        };
        self.record_backend(&target.id, true);

        match self.translator.chat_response_from_native(
            &response.body,
            &native.model,
            Utc::now().timestamp(),
        ) {
            Ok(completion) => Ok(json_response(StatusCode::OK, &completion)),
            Err(e) => {
                debug!("Passing backend response through untranslated: {}", e);
                let mut passthrough = Response::new(Body::from(response.body));
                *passthrough.status_mut() = response.status;
                passthrough.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                Ok(passthrough)
            }
        }
    }
}

fn add_cors_headers(response: &mut Response<Body>) {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}

/// Collect the request body, refusing anything over `limit` bytes.
async fn read_body(req: Request<Body>, limit: usize) -> Result<Bytes, ProxyError> {
    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared.map_or(false, |len| len > limit) {
        return Err(ProxyError::PayloadTooLarge(limit));
    }

    let mut body = req.into_body();
    let mut buf = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;
        if buf.len() + chunk.len() > limit {
            return Err(ProxyError::PayloadTooLarge(limit));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buf))
}
