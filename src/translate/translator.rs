// src/translate/translator.rs
use super::types::*;
use crate::config::ProxyConfig;

/// Backend path returning the native model list.
pub const NATIVE_MODELS_PATH: &str = "/api/tags";
/// Backend path accepting native chat requests.
pub const NATIVE_CHAT_PATH: &str = "/api/chat";

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("malformed model list: {0}")]
    ModelList(serde_json::Error),

    #[error("malformed chat request: {0}")]
    ChatRequest(serde_json::Error),

    #[error("malformed chat response: {0}")]
    ChatResponse(serde_json::Error),
}

/// Maps public request/response shapes to and from the backend's. Pure: the
/// only inputs are the bodies and the values fixed at construction.
#[derive(Debug, Clone)]
pub struct ProtocolTranslator {
    owned_by: String,
    completion_id: String,
    default_model: String,
}

impl ProtocolTranslator {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            owned_by: config.owned_by.clone(),
            completion_id: config.completion_id.clone(),
            default_model: config.default_model.clone(),
        }
    }

    pub fn models_from_native(&self, body: &[u8]) -> Result<ModelList, TranslateError> {
        let native: NativeModelList =
            serde_json::from_slice(body).map_err(TranslateError::ModelList)?;

        let data = native
            .models
            .into_iter()
            .map(|model| ModelObject {
                id: model.name,
                object: "model".to_string(),
                created: 0,
                owned_by: self.owned_by.clone(),
            })
            .collect();

        Ok(ModelList {
            object: "list".to_string(),
            data,
        })
    }

    /// Messages are forwarded verbatim; `stream` defaults to false.
    pub fn chat_request_to_native(&self, body: &[u8]) -> Result<NativeChatRequest, TranslateError> {
        let request: ChatCompletionRequest =
            serde_json::from_slice(body).map_err(TranslateError::ChatRequest)?;

        Ok(NativeChatRequest {
            model: request.model.unwrap_or_else(|| self.default_model.clone()),
            messages: request.messages,
            stream: request.stream.unwrap_or(false),
            options: request
                .max_tokens
                .map(|num_predict| NativeOptions { num_predict }),
        })
    }

    /// Wrap the backend's single message in a completion object. Fails when the
    /// body has no `message` object; callers pass such bodies through untouched.
    pub fn chat_response_from_native(
        &self,
        body: &[u8],
        model: &str,
        created: i64,
    ) -> Result<ChatCompletion, TranslateError> {
        let native: NativeChatResponse =
            serde_json::from_slice(body).map_err(TranslateError::ChatResponse)?;

        Ok(ChatCompletion {
            id: self.completion_id.clone(),
            object: "chat.completion".to_string(),
            created,
            model: model.to_string(),
            choices: vec![Choice {
                index: 0,
                message: serde_json::Value::Object(native.message),
                finish_reason: "stop".to_string(),
            }],
            usage: Usage::default(),
        })
    }
}
