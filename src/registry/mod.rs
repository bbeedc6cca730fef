//
// src/registry/mod.rs
//
mod record;
mod registry;

pub use record::{Candidate, ServiceRecord, SCHEME};
pub use registry::ServiceRegistry;
