//
// src/proxy/mod.rs
//
mod client;
mod error;
mod proxy;

pub use client::{BackendClient, BackendResponse};
pub use error::ProxyError;
pub use proxy::Proxy;
