// tests/proxy_tests.rs
use chrono::Utc;
use hyper::{Body, Method, Request, StatusCode};
use mockito::Matcher;
use serde_json::{json, Value};
use std::sync::Arc;
use zeroconf_proxy::config::Config;
use zeroconf_proxy::proxy::Proxy;
use zeroconf_proxy::registry::{Candidate, ServiceRegistry};
use zeroconf_proxy::router::PriorityRouter;

fn proxy_for(registry: Arc<ServiceRegistry>) -> Proxy {
    Proxy::new(
        &Config::default(),
        registry,
        Arc::new(PriorityRouter::new()),
        None,
    )
    .unwrap()
}

fn add_healthy(registry: &ServiceRegistry, id: &str, host_port: &str, priority: i32) {
    let (address, port) = host_port.rsplit_once(':').unwrap();
    registry.upsert(
        Candidate::new(id, address, port.parse().unwrap(), priority),
        Utc::now(),
    );
    registry.set_health(id, true);
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

struct Reply {
    status: StatusCode,
    headers: hyper::HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

async fn call(proxy: &Proxy, method: Method, path: &str, body: &str) -> Reply {
    let req = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = proxy.handle(req).await;
    let status = response.status();
    let headers = response.headers().clone();
    let body = hyper::body::to_bytes(response.into_body())
        .await
        .unwrap()
        .to_vec();
    Reply {
        status,
        headers,
        body,
    }
}

const CHAT_BODY: &str = r#"{"model":"llama3","messages":[{"role":"user","content":"Hello"}]}"#;

#[tokio::test]
async fn test_health_without_services_is_503() {
    let proxy = proxy_for(Arc::new(ServiceRegistry::new()));

    let reply = call(&proxy, Method::GET, "/health", "").await;

    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    let body = reply.json();
    assert_eq!(body["status"], "no_services");
    assert_eq!(body["services"], 0);
    assert_eq!(body["provider"], "ZeroconfAI Proxy");
}

#[tokio::test]
async fn test_health_counts_only_healthy_services() {
    let registry = Arc::new(ServiceRegistry::new());
    add_healthy(&registry, "a", "127.0.0.1:9001", 10);
    add_healthy(&registry, "b", "127.0.0.1:9002", 5);
    registry.upsert(Candidate::new("c", "127.0.0.1", 9003, 1), Utc::now());
    let proxy = proxy_for(registry);

    let reply = call(&proxy, Method::GET, "/v1/health", "").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({"status": "ok", "provider": "ZeroconfAI Proxy", "services": 2}));
}

#[tokio::test]
async fn test_models_without_services_is_503() {
    let proxy = proxy_for(Arc::new(ServiceRegistry::new()));
    let reply = call(&proxy, Method::GET, "/v1/models", "").await;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(reply.json()["error"].is_string());
}

#[tokio::test]
async fn test_models_translated_from_backend() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"models":[{"name":"llama3:8b"},{"name":"phi3:mini"}]}"#)
        .create_async()
        .await;

    let registry = Arc::new(ServiceRegistry::new());
    add_healthy(&registry, "ollama", &server.host_with_port(), 10);
    let proxy = proxy_for(registry);

    let reply = call(&proxy, Method::GET, "/v1/models", "").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.json(),
        json!({
            "object": "list",
            "data": [
                {"id": "llama3:8b", "object": "model", "created": 0, "owned_by": "zeroconfai"},
                {"id": "phi3:mini", "object": "model", "created": 0, "owned_by": "zeroconfai"}
            ]
        })
    );
}

#[tokio::test]
async fn test_models_backend_error_status_is_502() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(404)
        .create_async()
        .await;

    let registry = Arc::new(ServiceRegistry::new());
    add_healthy(&registry, "ollama", &server.host_with_port(), 10);
    let proxy = proxy_for(registry);

    let reply = call(&proxy, Method::GET, "/models", "").await;
    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_models_backend_unreachable_is_502() {
    let registry = Arc::new(ServiceRegistry::new());
    add_healthy(&registry, "gone", &format!("127.0.0.1:{}", closed_port()), 10);
    let proxy = proxy_for(registry);

    let reply = call(&proxy, Method::GET, "/models", "").await;
    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_models_unparseable_backend_body_is_500() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body("this is not json")
        .create_async()
        .await;

    let registry = Arc::new(ServiceRegistry::new());
    add_healthy(&registry, "ollama", &server.host_with_port(), 10);
    let proxy = proxy_for(registry);

    let reply = call(&proxy, Method::GET, "/models", "").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(reply.json()["error"]
        .as_str()
        .unwrap()
        .starts_with("Parse error"));
}

#[tokio::test]
async fn test_chat_without_services_is_503_and_no_outbound_call() {
    let mut server = mockito::Server::new_async().await;
    let chat = server
        .mock("POST", "/api/chat")
        .expect(0)
        .create_async()
        .await;

    let registry = Arc::new(ServiceRegistry::new());
    // Known but unhealthy: must not be used.
    registry.upsert(Candidate::new("ollama", "127.0.0.1", 1, 10), Utc::now());
    let proxy = proxy_for(registry);

    let reply = call(&proxy, Method::POST, "/v1/chat/completions", CHAT_BODY).await;

    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(reply.json()["error"], "No healthy ZeroconfAI services available");
    chat.assert_async().await;
}

#[tokio::test]
async fn test_chat_translated_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let chat = server
        .mock("POST", "/api/chat")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "model": "llama3",
            "messages": [{"role": "user", "content": "Hello"}],
            "stream": false
        })))
        .with_status(200)
        .with_body(
            r#"{"model":"llama3","message":{"role":"assistant","content":"Hi there"},"done":true}"#,
        )
        .create_async()
        .await;

    let registry = Arc::new(ServiceRegistry::new());
    add_healthy(&registry, "ollama", &server.host_with_port(), 10);
    let proxy = proxy_for(registry);

    let before = Utc::now().timestamp();
    let reply = call(&proxy, Method::POST, "/v1/chat/completions", CHAT_BODY).await;

    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["id"], "chatcmpl-zeroconfai");
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], "llama3");
    assert!(body["created"].as_i64().unwrap() >= before);
    assert_eq!(
        body["choices"],
        json!([{
            "index": 0,
            "message": {"role": "assistant", "content": "Hi there"},
            "finish_reason": "stop"
        }])
    );
    assert_eq!(
        body["usage"],
        json!({"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0})
    );
    chat.assert_async().await;
}

#[tokio::test]
async fn test_chat_backend_500_is_502_without_retry() {
    let mut server = mockito::Server::new_async().await;
    let chat = server
        .mock("POST", "/api/chat")
        .with_status(500)
        .with_body(r#"{"error":"out of memory"}"#)
        .expect(1)
        .create_async()
        .await;

    let registry = Arc::new(ServiceRegistry::new());
    add_healthy(&registry, "ollama", &server.host_with_port(), 10);
    let proxy = proxy_for(registry);

    let reply = call(&proxy, Method::POST, "/chat/completions", CHAT_BODY).await;

    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
    assert_eq!(reply.json()["error"], "Backend service unavailable");
    chat.assert_async().await;
}

#[tokio::test]
async fn test_chat_backend_unreachable_is_502() {
    let registry = Arc::new(ServiceRegistry::new());
    add_healthy(&registry, "gone", &format!("127.0.0.1:{}", closed_port()), 10);
    let proxy = proxy_for(registry);

    let reply = call(&proxy, Method::POST, "/chat/completions", CHAT_BODY).await;
    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_chat_untranslatable_response_passes_through() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(404)
        .with_body(r#"{"error":"model 'nope' not found"}"#)
        .create_async()
        .await;

    let registry = Arc::new(ServiceRegistry::new());
    add_healthy(&registry, "ollama", &server.host_with_port(), 10);
    let proxy = proxy_for(registry);

    let reply = call(
        &proxy,
        Method::POST,
        "/v1/chat/completions",
        r#"{"model":"nope","messages":[]}"#,
    )
    .await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, br#"{"error":"model 'nope' not found"}"#.to_vec());
}

#[tokio::test]
async fn test_chat_streamed_backend_body_passes_through() {
    let ndjson = "{\"message\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"done\":false}\n{\"done\":true}\n";
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_body(ndjson)
        .create_async()
        .await;

    let registry = Arc::new(ServiceRegistry::new());
    add_healthy(&registry, "ollama", &server.host_with_port(), 10);
    let proxy = proxy_for(registry);

    let reply = call(
        &proxy,
        Method::POST,
        "/v1/chat/completions",
        r#"{"model":"llama3","messages":[],"stream":true}"#,
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, ndjson.as_bytes().to_vec());
}

#[tokio::test]
async fn test_chat_malformed_client_body_is_500() {
    let registry = Arc::new(ServiceRegistry::new());
    add_healthy(&registry, "ollama", "127.0.0.1:9", 10);
    let proxy = proxy_for(registry);

    let reply = call(&proxy, Method::POST, "/v1/chat/completions", "{not json").await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(reply.json()["error"]
        .as_str()
        .unwrap()
        .starts_with("Proxy error"));
}

#[tokio::test]
async fn test_chat_oversized_body_is_413_without_backend_call() {
    let mut server = mockito::Server::new_async().await;
    let chat = server
        .mock("POST", "/api/chat")
        .with_status(200)
        .expect(0)
        .create_async()
        .await;

    let registry = Arc::new(ServiceRegistry::new());
    add_healthy(&registry, "ollama", &server.host_with_port(), 10);
    let mut config = Config::default();
    config.proxy.max_body_bytes = 64;
    let proxy = Proxy::new(&config, registry, Arc::new(PriorityRouter::new()), None).unwrap();

    let long = format!(
        r#"{{"model":"llama3","messages":[{{"role":"user","content":"{}"}}]}}"#,
        "x".repeat(200)
    );
    let reply = call(&proxy, Method::POST, "/v1/chat/completions", &long).await;

    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        reply.json()["error"],
        "Proxy error: request body exceeds 64 bytes"
    );
    chat.assert_async().await;
}

#[tokio::test]
async fn test_chat_goes_to_lowest_priority_service() {
    let mut preferred = mockito::Server::new_async().await;
    let mut fallback = mockito::Server::new_async().await;

    let hit = preferred
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_body(r#"{"message":{"role":"assistant","content":"from preferred"}}"#)
        .expect(1)
        .create_async()
        .await;
    let missed = fallback
        .mock("POST", "/api/chat")
        .expect(0)
        .create_async()
        .await;

    let registry = Arc::new(ServiceRegistry::new());
    add_healthy(&registry, "A", &fallback.host_with_port(), 10);
    add_healthy(&registry, "B", &preferred.host_with_port(), 5);
    let proxy = proxy_for(registry);

    let reply = call(&proxy, Method::POST, "/v1/chat/completions", CHAT_BODY).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["choices"][0]["message"]["content"], "from preferred");
    hit.assert_async().await;
    missed.assert_async().await;
}

#[tokio::test]
async fn test_cors_headers_and_preflight() {
    let proxy = proxy_for(Arc::new(ServiceRegistry::new()));

    let preflight = call(&proxy, Method::OPTIONS, "/v1/chat/completions", "").await;
    assert_eq!(preflight.status, StatusCode::NO_CONTENT);
    assert_eq!(preflight.headers["access-control-allow-origin"], "*");

    let reply = call(&proxy, Method::GET, "/v1/health", "").await;
    assert_eq!(
        reply.headers["access-control-allow-headers"],
        "Content-Type, Authorization"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let mut config = Config::default();
    config.server.enable_cors = false;
    let proxy = Proxy::new(
        &config,
        Arc::new(ServiceRegistry::new()),
        Arc::new(PriorityRouter::new()),
        None,
    )
    .unwrap();

    let reply = call(&proxy, Method::GET, "/health", "").await;
    assert!(reply.headers.get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_unknown_path_and_wrong_method() {
    let proxy = proxy_for(Arc::new(ServiceRegistry::new()));

    let reply = call(&proxy, Method::GET, "/v1/embeddings", "").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = call(&proxy, Method::GET, "/v1/chat/completions", "").await;
    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
}
