// src/lib.rs
pub mod app;
pub mod config;
pub mod discovery;
pub mod health;
pub mod metrics;
pub mod proxy;
pub mod registry;
pub mod router;
pub mod server;
pub mod shutdown;
pub mod translate;
