// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster configuration.
//!
//! A `ClusterConfig` is loaded once per session (TOML or HCL) and then copied
//! into every [`JobSpec`](crate::JobSpec), so concurrent submissions never
//! share mutable configuration.
//!
//! ```toml
//! backend = "batch"
//! host = "login.hpc.example.org"
//! user = "alice"
//! working_directory = "/scratch/alice/ferry"
//!
//! [default_resources]
//! cores = 4
//! memory = "8G"
//! time_limit = "2h"
//!
//! [backend_directives]
//! dialect = "slurm"
//! partition = "short"
//!
//! [poll]
//! interval = "10s"
//! backoff_cap = "5m"
//! ```

use crate::resources::ResourceRequest;
use crate::time_fmt::serde_duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Host value selecting the local transport instead of SSH.
pub const LOCAL_HOST: &str = "local";

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format} config: {message}")]
    Parse { format: ConfigFormat, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// On-disk configuration syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Hcl,
}

crate::simple_display! {
    ConfigFormat {
        Toml => "toml",
        Hcl => "hcl",
    }
}

impl ConfigFormat {
    /// Pick the format from a file extension (`.hcl` → HCL, anything else TOML).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("hcl") => Self::Hcl,
            _ => Self::Toml,
        }
    }

    /// Deserialize `content` in this format.
    pub fn parse<T: serde::de::DeserializeOwned>(self, content: &str) -> Result<T, ConfigError> {
        match self {
            Self::Toml => toml::from_str(content)
                .map_err(|e| ConfigError::Parse { format: self, message: e.to_string() }),
            Self::Hcl => hcl::from_str(content)
                .map_err(|e| ConfigError::Parse { format: self, message: e.to_string() }),
        }
    }

    /// Read and deserialize a file, choosing the format from its extension.
    pub fn load<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_path(path).parse(&content)
    }
}

/// Which scheduler adapter handles submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Directive-based batch scheduler (Slurm, PBS)
    #[serde(alias = "batch_queue", alias = "slurm", alias = "pbs")]
    Batch,
    /// No queue: a background process on the host
    #[serde(alias = "direct_shell", alias = "ssh")]
    Shell,
    /// Kubernetes `batch/v1` Jobs
    #[serde(alias = "kubernetes", alias = "k8s")]
    Orchestrator,
}

crate::simple_display! {
    BackendKind {
        Batch => "batch",
        Shell => "shell",
        Orchestrator => "orchestrator",
    }
}

/// Poll cadence for in-flight jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    #[serde(with = "serde_duration")]
    pub interval: Duration,
    /// Upper bound for the interval while polls keep returning `Unknown`
    #[serde(with = "serde_duration")]
    pub backoff_cap: Duration,
    /// Lower bound for any poll interval, protecting shared scheduler front-ends
    #[serde(with = "serde_duration")]
    pub floor: Duration,
    /// Consecutive `Unknown` polls tolerated before the job is failed
    pub max_consecutive_unknown: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            backoff_cap: Duration::from_secs(120),
            floor: Duration::from_secs(1),
            max_consecutive_unknown: 120,
        }
    }
}

impl PollPolicy {
    /// Base interval, raised to the floor.
    pub fn base_interval(&self) -> Duration {
        self.interval.max(self.floor)
    }

    /// Interval to use after `unknown_streak` consecutive `Unknown` polls.
    pub fn interval_after(&self, unknown_streak: u32) -> Duration {
        let base = self.base_interval();
        let cap = self.backoff_cap.max(base);
        let factor = 2u32.saturating_pow(unknown_streak.min(16));
        base.saturating_mul(factor).min(cap)
    }
}

/// Bounded exponential retry for transient submission errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    #[serde(with = "serde_duration")]
    pub base_delay: Duration,
    #[serde(with = "serde_duration")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based: the delay after the
    /// first failed attempt is `delay_for(1)`).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Remote-shell connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Concurrent sessions multiplexed over one control connection
    pub max_connections_per_host: usize,
    #[serde(with = "serde_duration")]
    pub connect_timeout: Duration,
    /// Deadline for one remote command, including any stdin transfer
    #[serde(with = "serde_duration")]
    pub command_timeout: Duration,
    /// SSH client binary
    pub ssh_program: String,
    /// Directory for control sockets (defaults to the system temp dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_dir: Option<PathBuf>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            max_connections_per_host: 4,
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(300),
            ssh_program: "ssh".to_string(),
            control_dir: None,
        }
    }
}

/// Connection parameters, resource defaults and backend overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(alias = "backend_kind")]
    pub backend: BackendKind,
    /// Remote host; [`LOCAL_HOST`] runs commands on this machine
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Opaque credential reference (identity file path) passed to the transport
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_ref: Option<String>,
    /// Absolute remote root for bundles and job directories
    pub working_directory: String,
    #[serde(default)]
    pub default_resources: ResourceRequest,
    /// Free-form backend overrides (partition, account, image, namespace, ...)
    #[serde(default)]
    pub backend_directives: BTreeMap<String, String>,
    #[serde(default)]
    pub poll: PollPolicy,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub transport: TransportSettings,
}

impl ClusterConfig {
    pub fn new(
        backend: BackendKind,
        host: impl Into<String>,
        working_directory: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            host: host.into(),
            port: None,
            user: None,
            credentials_ref: None,
            working_directory: working_directory.into(),
            default_resources: ResourceRequest::default(),
            backend_directives: BTreeMap::new(),
            poll: PollPolicy::default(),
            retry: RetryPolicy::default(),
            transport: TransportSettings::default(),
        }
    }

    crate::setters! {
        set {
            default_resources: ResourceRequest,
            poll: PollPolicy,
            retry: RetryPolicy,
        }
        option {
            port: u16,
            user: String,
            credentials_ref: String,
        }
    }

    /// Add or replace one backend directive.
    pub fn directive(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.backend_directives.insert(key.into(), value.into());
        self
    }

    /// Look up a backend directive.
    pub fn get_directive(&self, key: &str) -> Option<&str> {
        self.backend_directives.get(key).map(String::as_str)
    }

    pub fn is_local(&self) -> bool {
        self.host == LOCAL_HOST
    }

    /// Load from a TOML/HCL file, apply `FERRY_*` overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = ConfigFormat::load(path)?;
        crate::env::apply_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from a string without reading the environment.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: Self = format.parse(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if !self.working_directory.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "working_directory must be absolute, got {:?}",
                self.working_directory
            )));
        }
        self.default_resources
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("default_resources: {}", e)))?;
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".to_string()));
        }
        if self.transport.command_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "transport.command_timeout must be greater than zero".to_string(),
            ));
        }
        if self.transport.max_connections_per_host == 0 {
            return Err(ConfigError::Invalid(
                "transport.max_connections_per_host must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
