// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Direct shell backend: the script runs as a detached background process
//! on the target host and its pid is the backend id.
//!
//! There is no scheduler to ask, so status comes from the job directory:
//! the `cancelled` marker, `exit_code`, a `kill -0` liveness probe, and
//! finally the artifacts. One probe command per poll keeps SSH round trips
//! down.

use super::{
    fetch_result_from, read_exit_code, CancelError, FetchError, JobHandle, Limits,
    ResultArtifact, SchedulerAdapter, SubmissionError, SubmitRequest,
};
use crate::layout::{CANCELLED_FILE, ERROR_FILE, EXIT_CODE_FILE, RESULT_FILE};
use crate::script::sh_escape;
use crate::transport::Transport;
use async_trait::async_trait;
use ferry_core::{
    BackendKind, BackendStatus, ClusterConfig, ConfigError, FailReason, ResourceRequest,
};
use std::sync::Arc;

/// Exit status the cancel command uses when the job directory is gone.
const MISSING_STATUS: i32 = 3;

pub struct DirectShellAdapter {
    transport: Arc<dyn Transport>,
    limits: Limits,
}

impl DirectShellAdapter {
    pub fn new(config: &ClusterConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        Ok(Self { transport, limits: Limits::from_config(config)? })
    }

    fn probe_command(handle: &JobHandle) -> String {
        let pid = sh_escape(&handle.backend_id);
        format!(
            "cd {dir} 2>/dev/null || {{ echo missing; exit 0; }}; \
             if [ -e {cancelled} ]; then echo cancelled; \
             elif [ -f {exit} ]; then echo \"exit $(cat {exit})\"; \
             elif kill -0 {pid} 2>/dev/null; then echo running; \
             elif [ -f {exit} ]; then echo \"exit $(cat {exit})\"; \
             elif [ -e {result} ]; then echo result; \
             elif [ -e {error} ]; then echo error; \
             else echo gone; fi",
            dir = sh_escape(&handle.job_dir),
            cancelled = CANCELLED_FILE,
            exit = EXIT_CODE_FILE,
            result = RESULT_FILE,
            error = ERROR_FILE,
            pid = pid,
        )
    }
}

/// Map the probe's one-line answer.
pub(crate) fn probe_status(answer: &str) -> BackendStatus {
    let answer = answer.trim();
    if let Some(code) = answer.strip_prefix("exit ") {
        return match code.trim().parse::<i32>() {
            Ok(0) => BackendStatus::Completed,
            Ok(n) => BackendStatus::failed(format!("exit status {}", n)),
            Err(_) => BackendStatus::Unknown,
        };
    }
    match answer {
        "running" => BackendStatus::Running,
        "cancelled" => BackendStatus::Cancelled,
        "result" => BackendStatus::Completed,
        "error" => BackendStatus::failed("entry point reported an error"),
        "missing" | "gone" => BackendStatus::Failed(FailReason::LostJob),
        _ => BackendStatus::Unknown,
    }
}

#[async_trait]
impl SchedulerAdapter for DirectShellAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Shell
    }

    fn validate(&self, request: &ResourceRequest) -> Result<(), SubmissionError> {
        self.limits.check(request)
    }

    fn render_script(&self, request: &SubmitRequest) -> String {
        request.script_params().time_limit(request.resources().time_limit).render()
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<JobHandle, SubmissionError> {
        self.validate(request.resources())?;
        let script = request.script_path();
        self.transport.upload(&script, self.render_script(request).as_bytes()).await?;

        let command = format!(
            "cd {} || exit 1; nohup sh {} >/dev/null 2>&1 </dev/null & echo $!",
            sh_escape(&request.job_dir),
            sh_escape(&script)
        );
        let out = self.transport.exec(&command).await?;
        let pid = out.stdout_text();
        if !out.success() || pid.parse::<u32>().is_err() {
            return Err(SubmissionError::invalid(format!(
                "failed to start job: {}",
                if out.stderr.is_empty() { pid } else { out.stderr_text() }
            )));
        }
        tracing::info!(
            job_id = %request.job_id,
            pid = %pid,
            host = %self.transport.describe(),
            "job started"
        );
        Ok(request.handle(pid))
    }

    async fn poll(&self, handle: &JobHandle) -> BackendStatus {
        match self.transport.exec(&Self::probe_command(handle)).await {
            Ok(out) if out.success() => probe_status(&out.stdout_text()),
            Ok(out) => {
                tracing::debug!(job_id = %handle.job_id, stderr = %out.stderr_text(), "probe failed");
                BackendStatus::Unknown
            }
            Err(e) => {
                tracing::debug!(job_id = %handle.job_id, error = %e, "probe unreachable");
                BackendStatus::Unknown
            }
        }
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<(), CancelError> {
        // The marker is only left for a job that has not recorded an exit code
        let command = format!(
            "cd {dir} 2>/dev/null || exit {missing}; \
             [ -f {exit} ] || touch {cancelled}; \
             kill -TERM {pid} 2>/dev/null; exit 0",
            dir = sh_escape(&handle.job_dir),
            missing = MISSING_STATUS,
            exit = EXIT_CODE_FILE,
            cancelled = CANCELLED_FILE,
            pid = sh_escape(&handle.backend_id),
        );
        let out =
            self.transport.exec(&command).await.map_err(|e| CancelError::Backend(e.to_string()))?;
        match out.status {
            Some(0) => Ok(()),
            Some(MISSING_STATUS) => Err(CancelError::NotFound(handle.backend_id.clone())),
            _ => Err(CancelError::Backend(out.stderr_text())),
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
#[path = "shell_tests.rs"]
mod tests;
