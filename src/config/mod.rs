// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use config::{Environment, File};
use std::path::Path;

/// Environment variables override the file, e.g. `ZEROCONF_PROXY__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "ZEROCONF_PROXY";

/// Load configuration: compiled defaults, then the file at `path` (YAML, JSON or
/// TOML by extension; a missing file is skipped), then the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    let layers = config::Config::builder()
        .add_source(
            config::Config::try_from(&Config::default())
                .context("Failed to serialize default config")?,
        )
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    let config: Config = layers
        .try_deserialize()
        .context("Failed to parse config")?;

    Ok(config)
}
