// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes backend: each job is a `batch/v1` Job running the submission
//! script.
//!
//! # Module layout
//!
//! - [`job`]: Job spec construction and status mapping
//!
//! # Shared volume
//!
//! The working directory is a volume mounted into every pod at the
//! configured `working_directory` path, and is also reachable through the
//! transport (a login host mounting the same claim, or this machine for
//! hostPath on a single-node cluster). Bundles, arguments and artifacts
//! move through the transport; only the Job lifecycle goes through the
//! Kubernetes API.
//!
//! Directives: `namespace` (default `default`), `image` (default
//! `python:3.12-slim`), `volume_claim` (hostPath when absent),
//! `service_account`.

mod job;

use self::job::{build_job, job_name, job_status, JobParams, WorkVolume};
use super::{
    fetch_result_from, read_exit_code, status_from_artifacts, CancelError, FetchError, JobHandle,
    Limits, ResultArtifact, SchedulerAdapter, SubmissionError, SubmitRequest,
};
use crate::transport::Transport;
use async_trait::async_trait;
use ferry_core::{
    BackendKind, BackendStatus, ClusterConfig, ConfigError, FailReason, ResourceRequest,
    SubmissionErrorKind,
};
use k8s_openapi::api::batch::v1::Job;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::OnceCell;

const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_IMAGE: &str = "python:3.12-slim";
/// Deleted Job names remembered for poll-after-cancel
const RECENT_CANCELS: usize = 256;

pub struct OrchestratorAdapter {
    transport: Arc<dyn Transport>,
    limits: Limits,
    namespace: String,
    image: String,
    volume: WorkVolume,
    mount_path: String,
    service_account: Option<String>,
    /// Created on first use so building the adapter needs no kubeconfig
    client: OnceCell<Client>,
    /// Job names this process deleted and has not yet reported as cancelled
    cancelled: Mutex<VecDeque<String>>,
}

impl OrchestratorAdapter {
    pub fn new(config: &ClusterConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        let directive = |key: &str| {
            config.get_directive(key).map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
        };
        Ok(Self {
            transport,
            limits: Limits::from_config(config)?,
            namespace: directive("namespace").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            image: directive("image").unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
            volume: directive("volume_claim").map(WorkVolume::Claim).unwrap_or(WorkVolume::HostPath),
            mount_path: config.working_directory.clone(),
            service_account: directive("service_account"),
            client: OnceCell::new(),
            cancelled: Mutex::new(VecDeque::new()),
        })
    }

    async fn jobs(&self) -> Result<Api<Job>, kube::Error> {
        let client = self.client.get_or_try_init(Client::try_default).await?;
        Ok(Api::namespaced(client.clone(), &self.namespace))
    }

    fn job_params(&self, request: &SubmitRequest) -> JobParams {
        let res = request.resources();
        JobParams {
            name: job_name(request.job_id.as_str()),
            namespace: self.namespace.clone(),
            image: self.image.clone(),
            command: vec!["sh".to_string(), request.script_path()],
            cores: res.cores,
            memory_mib: res.memory.mib_ceil(),
            deadline_secs: i64::try_from(res.time_limit.as_secs().max(1)).unwrap_or(i64::MAX),
            volume: self.volume.clone(),
            mount_path: self.mount_path.clone(),
            service_account: self.service_account.clone(),
        }
    }

    fn remember_cancelled(&self, name: &str) {
        let mut cancelled = self.cancelled.lock();
        if !cancelled.iter().any(|n| n == name) {
            cancelled.push_back(name.to_string());
        }
        while cancelled.len() > RECENT_CANCELS {
            cancelled.pop_front();
        }
    }

    /// Drop `name` from the recent cancels, returning whether it was there.
    fn forget_cancelled(&self, name: &str) -> bool {
        let mut cancelled = self.cancelled.lock();
        match cancelled.iter().position(|n| n == name) {
            Some(at) => {
                cancelled.remove(at);
                true
            }
            None => false,
        }
    }

    /// Build the Job object `submit` would create.
    pub fn build(&self, request: &SubmitRequest) -> Job {
        build_job(&self.job_params(request))
    }
}

/// Classify a Job creation failure.
fn submission_error(e: kube::Error) -> SubmissionError {
    match &e {
        kube::Error::Api(resp) => {
            let kind = match resp.code {
                403 if resp.message.contains("exceeded quota") => SubmissionErrorKind::QuotaExceeded,
                401 | 403 => SubmissionErrorKind::AuthFailure,
                400 | 422 => SubmissionErrorKind::InvalidResourceRequest,
                _ => SubmissionErrorKind::TransientNetwork,
            };
            SubmissionError::new(kind, resp.message.clone())
        }
        kube::Error::InferConfig(_) | kube::Error::Auth(_) => {
            SubmissionError::new(SubmissionErrorKind::AuthFailure, e.to_string())
        }
        _ => SubmissionError::transient(e.to_string()),
    }
}

fn is_not_found(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(resp) if resp.code == 404)
}

#[async_trait]
impl SchedulerAdapter for OrchestratorAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Orchestrator
    }

    fn validate(&self, request: &ResourceRequest) -> Result<(), SubmissionError> {
        self.limits.check(request)
    }

    /// Resources and the deadline live on the Job, so the script carries no
    /// directives.
    fn render_script(&self, request: &SubmitRequest) -> String {
        request.script_params().render()
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<JobHandle, SubmissionError> {
        self.validate(request.resources())?;
        self.transport
            .upload(&request.script_path(), self.render_script(request).as_bytes())
            .await?;

        let job = self.build(request);
        let name = job.metadata.name.clone().unwrap_or_default();
        let jobs = self.jobs().await.map_err(submission_error)?;
        match jobs.create(&PostParams::default(), &job).await {
            Ok(_) => {}
            // An earlier attempt got through before its response was lost
            Err(kube::Error::Api(resp)) if resp.code == 409 => {
                tracing::debug!(job_id = %request.job_id, name = %name, "job already exists");
            }
            Err(e) => return Err(submission_error(e)),
        }
        tracing::info!(
            job_id = %request.job_id,
            name = %name,
            namespace = %self.namespace,
            "kubernetes job created"
        );
        Ok(request.handle(name))
    }

    async fn poll(&self, handle: &JobHandle) -> BackendStatus {
        // Reported once; the engine stops polling a cancelled job
        if self.forget_cancelled(&handle.backend_id) {
            return BackendStatus::Cancelled;
        }
        let jobs = match self.jobs().await {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::debug!(job_id = %handle.job_id, error = %e, "kubernetes client unavailable");
                return BackendStatus::Unknown;
            }
        };
        match jobs.get_opt(&handle.backend_id).await {
            Ok(Some(job)) => job_status(&job),
            Ok(None) => match status_from_artifacts(self.transport.as_ref(), &handle.job_dir).await
            {
                Ok(Some(status)) => status,
                Ok(None) => BackendStatus::Failed(FailReason::LostJob),
                Err(e) => {
                    tracing::debug!(job_id = %handle.job_id, error = %e, "artifact check failed");
                    BackendStatus::Unknown
                }
            },
            Err(e) => {
                tracing::debug!(job_id = %handle.job_id, error = %e, "job lookup failed");
                BackendStatus::Unknown
            }
        }
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<(), CancelError> {
        let jobs = self.jobs().await.map_err(|e| CancelError::Backend(e.to_string()))?;
        match jobs.delete(&handle.backend_id, &DeleteParams::background()).await {
            Ok(_) => {
                self.remember_cancelled(&handle.backend_id);
                Ok(())
            }
            Err(e) if is_not_found(&e) => {
                if self.cancelled.lock().contains(&handle.backend_id) {
                    Ok(())
                } else {
                    Err(CancelError::NotFound(handle.backend_id.clone()))
                }
            }
            Err(e) => {
                tracing::warn!(job_id = %handle.job_id, error = %e, "failed to delete job");
                Err(CancelError::Backend(e.to_string()))
            }
        }
    }

    async fn fetch_result(&self, handle: &JobHandle) -> Result<ResultArtifact, FetchError> {
        fetch_result_from(self.transport.as_ref(), &handle.job_dir).await
    }

    async fn exit_code(&self, handle: &JobHandle) -> Option<i32> {
        read_exit_code(self.transport.as_ref(), &handle.job_dir).await
    }
}

#[cfg(test)]
#[path = "../orchestrator_tests.rs"]
mod tests;
