//! File logging. The terminal belongs to the UI, so records go to
//! `<config root>/superspoty.log`.

use crate::config;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

pub const LOG_ENV: &str = "SUPERSPOTY_LOG";

pub fn default_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// Installs the global logger. `SUPERSPOTY_LOG` overrides the level filter.
pub fn init(config_root: &Path, verbose: bool) -> Result<PathBuf> {
    config::ensure_config_dir(config_root)?;
    let path = config::log_path(config_root);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(LOG_ENV, default_level(verbose)),
    )
    .target(env_logger::Target::Pipe(Box::new(file)))
    .format_timestamp_millis()
    .try_init()
    .context("logger already initialised")?;

    Ok(path)
}
