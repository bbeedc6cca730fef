// src/translate/types.rs
//! Wire shapes on both sides of the proxy: the OpenAI-style public API and the
//! backend's native (Ollama-style) API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---- native side ----

#[derive(Debug, Deserialize)]
pub struct NativeModelList {
    #[serde(default)]
    pub models: Vec<NativeModel>,
}

#[derive(Debug, Deserialize)]
pub struct NativeModel {
    #[serde(default = "unknown_model")]
    pub name: String,
}

fn unknown_model() -> String {
    "unknown".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeChatRequest {
    pub model: String,
    pub messages: Vec<Value>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<NativeOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeOptions {
    pub num_predict: u32,
}

#[derive(Debug, Deserialize)]
pub struct NativeChatResponse {
    pub message: Map<String, Value>,
}

// ---- public side ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelObject {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelObject>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<Value>,
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: Value,
    pub finish_reason: String,
}

/// Token counts are not computed; every field is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}
