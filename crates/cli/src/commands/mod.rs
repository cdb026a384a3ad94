// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod manifest;
pub mod pack;
pub mod run;
pub mod script;

use crate::exit_error::ExitError;
use ferry_capture::{CaptureManifest, ManifestBuilder, Registry};
use ferry_core::ClusterConfig;
use ferry_engine::DispatchError;
use std::path::{Path, PathBuf};

/// Load the cluster config from `--config`, `$FERRY_CONFIG`, or the
/// default location, with `FERRY_*` overrides applied.
pub fn load_config(path: Option<&Path>) -> Result<ClusterConfig, ExitError> {
    let path: PathBuf = match path {
        Some(p) => p.to_path_buf(),
        None => ferry_core::env::config_path()
            .ok_or_else(|| ExitError::usage("no --config given and no config directory found"))?,
    };
    tracing::debug!(path = %path.display(), "loading cluster config");
    ClusterConfig::load(&path).map_err(|e| ExitError::usage(e.to_string()))
}

pub fn load_units(path: &Path) -> Result<Registry, ExitError> {
    Registry::load(path).map_err(|e| ExitError::usage(format!("{}: {}", path.display(), e)))
}

pub fn build_manifest(registry: &Registry, target: &str) -> Result<CaptureManifest, ExitError> {
    ManifestBuilder::new(registry)
        .build(target)
        .map_err(|e| ExitError::from(DispatchError::from(e)))
}
