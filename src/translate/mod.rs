// src/translate/mod.rs
mod translator;
mod types;

pub use translator::{ProtocolTranslator, TranslateError, NATIVE_CHAT_PATH, NATIVE_MODELS_PATH};
pub use types::*;
