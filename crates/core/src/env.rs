// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.

use crate::config::{ClusterConfig, ConfigError};
use crate::time_fmt::parse_duration;
use std::path::PathBuf;

/// Resolve the config file: FERRY_CONFIG > <config_dir>/ferry/cluster.toml
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var("FERRY_CONFIG").ok().filter(|s| !s.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("ferry").join("cluster.toml"))
}

/// Log filter directive (default `warn`)
pub fn log_filter() -> String {
    std::env::var("FERRY_LOG").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "warn".to_string())
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Apply `FERRY_HOST`, `FERRY_USER`, `FERRY_WORKING_DIRECTORY` and
/// `FERRY_POLL_INTERVAL` on top of a loaded config.
pub fn apply_overrides(config: &mut ClusterConfig) -> Result<(), ConfigError> {
    if let Some(host) = var("FERRY_HOST") {
        config.host = host;
    }
    if let Some(user) = var("FERRY_USER") {
        config.user = Some(user);
    }
    if let Some(dir) = var("FERRY_WORKING_DIRECTORY") {
        config.working_directory = dir;
    }
    if let Some(raw) = var("FERRY_POLL_INTERVAL") {
        config.poll.interval = parse_duration(&raw)
            .map_err(|e| ConfigError::Invalid(format!("FERRY_POLL_INTERVAL: {}", e)))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
