//! Subcommands and the configuration lookup they share.

pub mod batch;
pub mod config;
pub mod process;

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use einvoice_core::models::config::EinvoiceConfig;

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("einvoice")
        .join("config.json")
}

/// Load the configuration from `--config`, else from the default location if
/// present, else fall back to built-in defaults.
pub fn load_config(config_path: Option<&Path>) -> anyhow::Result<EinvoiceConfig> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_config_path();
            if !path.exists() {
                debug!("No config file at {}, using defaults", path.display());
                return Ok(EinvoiceConfig::default());
            }
            path
        }
    };

    debug!("Loading config from {}", path.display());
    EinvoiceConfig::from_file(&path)
        .with_context(|| format!("Failed to load config file {}", path.display()))
}
