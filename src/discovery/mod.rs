// src/discovery/mod.rs
mod provider;
mod runner;

pub use provider::{DiscoveryProvider, LocalProbeProvider};
pub use runner::{CycleReport, DiscoveryLoop};
