// src/proxy/error.rs
use hyper::{Body, Response, StatusCode};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("No healthy ZeroconfAI services available")]
    NoHealthyServices,

    #[error("{0}")]
    BackendUnavailable(String),

    #[error("Parse error: {0}")]
    ModelListParse(String),

    #[error("Proxy error: {0}")]
    InvalidRequest(String),

    #[error("Proxy error: {0}")]
    Internal(String),

    #[error("Proxy error: request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoHealthyServices => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::ModelListParse(_)
            | ProxyError::InvalidRequest(_)
            | ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::NotFound => StatusCode::NOT_FOUND,
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

// Convert ProxyError to a JSON error response
impl From<ProxyError> for Response<Body> {
    fn from(err: ProxyError) -> Self {
        json_response(err.status(), &json!({ "error": err.to_string() }))
    }
}

pub(crate) fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response<Body> {
    let (status, body) = match serde_json::to_vec(value) {
        Ok(body) => (status, body),
        Err(e) => {
            tracing::error!("Failed to serialize response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"error":"Proxy error: response serialization failed"}"#.to_vec(),
            )
        }
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}
