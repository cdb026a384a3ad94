// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler backends.
//!
//! # Module layout
//!
//! - [`batch`]: Slurm and PBS batch queues
//! - [`shell`]: background process on a login host
//! - [`orchestrator`]: Kubernetes `batch/v1` Jobs
//! - `fake`: scripted adapter for engine tests (test-support)
//!
//! Adapters never see the bundle or arguments: the engine uploads those
//! before calling [`SchedulerAdapter::submit`], which only writes the
//! submission script and hands it to the backend.

mod batch;
mod orchestrator;
mod shell;

pub use batch::{BatchQueueAdapter, Dialect, EmptyQueuePolicy};
pub use orchestrator::OrchestratorAdapter;
pub use shell::DirectShellAdapter;

use crate::layout::{self, in_dir, RemoteLayout};
use crate::script::ScriptParams;
use crate::transport::{LocalTransport, SshPool, SshTransport, Transport, TransportError};
use async_trait::async_trait;
use ferry_core::{
    parse_duration, BackendKind, BackendStatus, ClusterConfig, ConfigError, JobId, JobSpec,
    MemorySize, ResourceRequest, SubmissionErrorKind,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A submission the backend refused or never received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SubmissionError {
    pub kind: SubmissionErrorKind,
    pub message: String,
}

impl SubmissionError {
    pub fn new(kind: SubmissionErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn quota(message: impl Into<String>) -> Self {
        Self::new(SubmissionErrorKind::QuotaExceeded, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(SubmissionErrorKind::InvalidResourceRequest, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(SubmissionErrorKind::TransientNetwork, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<TransportError> for SubmissionError {
    fn from(e: TransportError) -> Self {
        let kind = match e {
            TransportError::Auth { .. } => SubmissionErrorKind::AuthFailure,
            _ => SubmissionErrorKind::TransientNetwork,
        };
        Self::new(kind, e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CancelError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("cancel failed: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("no result artifact yet")]
    NotReady,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Raw contents of the artifact the entry point (or script) left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultArtifact {
    /// `result.out`
    Value(Vec<u8>),
    /// `error.out`
    Error(Vec<u8>),
}

/// Backend-side identity of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Scheduler job id, pid, or Kubernetes Job name
    pub backend_id: String,
    pub job_id: JobId,
    pub job_dir: String,
}

/// Everything an adapter needs to submit one job.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub job_id: JobId,
    pub spec: JobSpec,
    pub job_dir: String,
    pub bundle_path: String,
    /// Shared virtualenv, when the bundle declares packages
    pub env_dir: Option<String>,
    pub interpreter: String,
}

impl SubmitRequest {
    pub fn new(job_id: JobId, spec: JobSpec) -> Self {
        let layout = RemoteLayout::new(&spec.config.working_directory);
        Self {
            job_dir: layout.job_dir(&job_id),
            bundle_path: layout.bundle_path(&spec.bundle_id),
            env_dir: None,
            interpreter: "python3".to_string(),
            job_id,
            spec,
        }
    }

    ferry_core::setters! {
        into {
            interpreter: String,
        }
        option {
            env_dir: String,
        }
    }

    pub fn resources(&self) -> &ResourceRequest {
        &self.spec.resource_request
    }

    pub fn script_path(&self) -> String {
        in_dir(&self.job_dir, layout::SCRIPT_FILE)
    }

    /// Script parameters with everything but backend directives filled in.
    pub fn script_params(&self) -> ScriptParams {
        let params = ScriptParams::new(&self.job_dir, &self.bundle_path)
            .interpreter(self.interpreter.as_str());
        match &self.env_dir {
            Some(env) => params.env_dir(env.as_str()),
            None => params,
        }
    }

    pub fn handle(&self, backend_id: impl Into<String>) -> JobHandle {
        JobHandle {
            backend_id: backend_id.into(),
            job_id: self.job_id.clone(),
            job_dir: self.job_dir.clone(),
        }
    }
}

/// Site limits read from `backend_directives` (`max_cores`, `max_memory`,
/// `max_time`). Checked before any I/O.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Limits {
    pub max_cores: Option<u32>,
    pub max_memory: Option<MemorySize>,
    pub max_time: Option<Duration>,
}

impl Limits {
    pub fn from_config(config: &ClusterConfig) -> Result<Self, ConfigError> {
        let invalid = |key: &str, e: String| {
            ConfigError::Invalid(format!("backend_directives.{}: {}", key, e))
        };
        let max_cores = config
            .get_directive("max_cores")
            .map(|v| v.trim().parse::<u32>().map_err(|e| invalid("max_cores", e.to_string())))
            .transpose()?;
        let max_memory = config
            .get_directive("max_memory")
            .map(|v| v.parse::<MemorySize>().map_err(|e| invalid("max_memory", e)))
            .transpose()?;
        let max_time = config
            .get_directive("max_time")
            .map(|v| parse_duration(v).map_err(|e| invalid("max_time", e)))
            .transpose()?;
        Ok(Self { max_cores, max_memory, max_time })
    }

    /// Reject malformed requests as `InvalidResourceRequest` and requests
    /// over a limit as `QuotaExceeded`.
    pub fn check(&self, request: &ResourceRequest) -> Result<(), SubmissionError> {
        request.validate().map_err(SubmissionError::invalid)?;
        if let Some(max) = self.max_cores {
            if request.cores > max {
                return Err(SubmissionError::quota(format!(
                    "{} cores requested, limit is {}",
                    request.cores, max
                )));
            }
        }
        if let Some(max) = self.max_memory {
            if request.memory > max {
                return Err(SubmissionError::quota(format!(
                    "{} memory requested, limit is {}",
                    request.memory, max
                )));
            }
        }
        if let Some(max) = self.max_time {
            if request.time_limit > max {
                return Err(SubmissionError::quota(format!(
                    "{} time limit requested, limit is {}",
                    ferry_core::format_duration(request.time_limit),
                    ferry_core::format_duration(max)
                )));
            }
        }
        Ok(())
    }
}

/// A compute backend.
///
/// `poll` never fails: transient trouble is reported as
/// [`BackendStatus::Unknown`] so the caller's backoff decides what happens.
#[async_trait]
pub trait SchedulerAdapter: Send + Sync + 'static {
    fn kind(&self) -> BackendKind;

    /// Check `request` against site limits. No I/O.
    fn validate(&self, request: &ResourceRequest) -> Result<(), SubmissionError>;

    /// The submission script this adapter would write for `request`.
    fn render_script(&self, request: &SubmitRequest) -> String;

    async fn submit(&self, request: &SubmitRequest) -> Result<JobHandle, SubmissionError>;

    async fn poll(&self, handle: &JobHandle) -> BackendStatus;

    /// Stop the job. Cancelling a job that already finished succeeds.
    async fn cancel(&self, handle: &JobHandle) -> Result<(), CancelError>;

    async fn fetch_result(&self, handle: &JobHandle) -> Result<ResultArtifact, FetchError>;

    /// Exit status recorded by the script wrapper, if any.
    async fn exit_code(&self, handle: &JobHandle) -> Option<i32>;
}

/// Read `result.out`, falling back to `error.out`.
pub async fn fetch_artifacts(
    transport: &dyn Transport,
    job_dir: &str,
) -> Result<Option<ResultArtifact>, TransportError> {
    if let Some(bytes) = transport.download(&in_dir(job_dir, layout::RESULT_FILE)).await? {
        return Ok(Some(ResultArtifact::Value(bytes)));
    }
    if let Some(bytes) = transport.download(&in_dir(job_dir, layout::ERROR_FILE)).await? {
        return Ok(Some(ResultArtifact::Error(bytes)));
    }
    Ok(None)
}

pub(crate) async fn fetch_result_from(
    transport: &dyn Transport,
    job_dir: &str,
) -> Result<ResultArtifact, FetchError> {
    fetch_artifacts(transport, job_dir).await?.ok_or(FetchError::NotReady)
}

pub(crate) async fn read_exit_code(transport: &dyn Transport, job_dir: &str) -> Option<i32> {
    match transport.download(&in_dir(job_dir, layout::EXIT_CODE_FILE)).await {
        Ok(Some(bytes)) => String::from_utf8_lossy(&bytes).trim().parse().ok(),
        Ok(None) => None,
        Err(e) => {
            tracing::debug!(job_dir, error = %e, "failed to read exit code");
            None
        }
    }
}

/// What the artifacts alone say about a job the backend no longer reports.
pub(crate) async fn status_from_artifacts(
    transport: &dyn Transport,
    job_dir: &str,
) -> Result<Option<BackendStatus>, TransportError> {
    if transport.exists(&in_dir(job_dir, layout::RESULT_FILE)).await? {
        return Ok(Some(BackendStatus::Completed));
    }
    if transport.exists(&in_dir(job_dir, layout::ERROR_FILE)).await? {
        return Ok(Some(BackendStatus::failed("entry point reported an error")));
    }
    Ok(None)
}

/// A connected backend: the scheduler adapter plus the transport that
/// reaches its working directory.
#[derive(Clone)]
pub struct Backend {
    pub adapter: Arc<dyn SchedulerAdapter>,
    pub transport: Arc<dyn Transport>,
}

impl Backend {
    pub fn new(adapter: Arc<dyn SchedulerAdapter>, transport: Arc<dyn Transport>) -> Self {
        Self { adapter, transport }
    }
}

/// Build the backend `config` describes. No network I/O happens here; SSH
/// and Kubernetes connections are opened by the first command.
pub fn connect(config: &ClusterConfig, pool: Arc<SshPool>) -> Result<Backend, ConfigError> {
    let transport: Arc<dyn Transport> = if config.is_local() {
        Arc::new(LocalTransport::with_timeout(config.transport.command_timeout))
    } else {
        Arc::new(SshTransport::from_config(config, pool))
    };
    let adapter: Arc<dyn SchedulerAdapter> = match config.backend {
        BackendKind::Batch => Arc::new(BatchQueueAdapter::new(config, Arc::clone(&transport))?),
        BackendKind::Shell => Arc::new(DirectShellAdapter::new(config, Arc::clone(&transport))?),
        BackendKind::Orchestrator => {
            Arc::new(OrchestratorAdapter::new(config, Arc::clone(&transport))?)
        }
    };
    tracing::debug!(
        backend = %config.backend,
        host = %transport.describe(),
        "connected scheduler backend"
    );
    Ok(Backend::new(adapter, transport))
}

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeAdapter, FakeCall};

#[cfg(test)]
#[path = "../scheduler_tests.rs"]
mod tests;
