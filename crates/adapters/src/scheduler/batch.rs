// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directive-based batch queues: Slurm and PBS.
//!
//! Submission goes through `sbatch --parsable` / `qsub`; status through
//! `squeue` / `qstat -x -f`. A job missing from the queue is ambiguous (it
//! may have finished, been purged, or not reached the front-end yet) and is
//! resolved by [`EmptyQueuePolicy`].

use super::{
    fetch_result_from, read_exit_code, status_from_artifacts, CancelError, FetchError, JobHandle,
    Limits, ResultArtifact, SchedulerAdapter, SubmissionError, SubmitRequest,
};
use crate::layout::{in_dir, SCHEDULER_LOG_FILE};
use crate::script::sh_escape;
use crate::transport::{CommandOutput, Transport};
use async_trait::async_trait;
use ferry_core::time_fmt::{format_dhms, format_hms};
use ferry_core::{
    BackendKind, BackendStatus, ClusterConfig, ConfigError, FailReason, ResourceRequest,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Scheduler front-end messages that mean the job is not (or no longer) known.
const UNKNOWN_JOB_MARKERS: &[&str] = &["Invalid job id", "Unknown Job Id"];

const QUOTA_MARKERS: &[&str] = &[
    "QOSMax",
    "AssocGrp",
    "AssocMax",
    "quota",
    "exceeds",
    "would exceed",
    "Job violates accounting/QOS policy",
];

const TRANSIENT_MARKERS: &[&str] = &[
    "Unable to contact",
    "Socket timed out",
    "timed out",
    "Connection refused",
    "try again",
    "Pbs Server is currently too busy",
];

/// Which batch scheduler's commands and directives to use
/// (`backend_directives.dialect`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Slurm,
    Pbs,
}

impl Dialect {
    fn parse(value: Option<&str>) -> Result<Self, ConfigError> {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("slurm") => Ok(Self::Slurm),
            Some("pbs") | Some("pbspro") | Some("torque") => Ok(Self::Pbs),
            Some(other) => Err(ConfigError::Invalid(format!(
                "backend_directives.dialect: unknown batch dialect {:?}",
                other
            ))),
        }
    }
}

ferry_core::simple_display! {
    Dialect {
        Slurm => "slurm",
        Pbs => "pbs",
    }
}

/// How to read a job that has left the queue without a terminal state
/// (`backend_directives.empty_queue`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyQueuePolicy {
    /// Consult accounting, then artifacts; no artifacts means the job is lost
    #[default]
    Lost,
    /// As `Lost`, but keep waiting while no artifact exists
    Wait,
    /// Report completion and let result decoding classify a missing artifact
    Completed,
}

impl EmptyQueuePolicy {
    fn parse(value: Option<&str>) -> Result<Self, ConfigError> {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("lost") => Ok(Self::Lost),
            Some("wait") => Ok(Self::Wait),
            Some("completed") => Ok(Self::Completed),
            Some(other) => Err(ConfigError::Invalid(format!(
                "backend_directives.empty_queue: expected lost, wait or completed, got {:?}",
                other
            ))),
        }
    }
}

/// Slurm / PBS adapter.
pub struct BatchQueueAdapter {
    transport: Arc<dyn Transport>,
    dialect: Dialect,
    limits: Limits,
    empty_queue: EmptyQueuePolicy,
    /// Empty status results tolerated right after submission
    grace: u32,
    /// Ask `sacct` about jobs missing from `squeue`
    accounting: bool,
    queue: Option<String>,
    account: Option<String>,
    qos: Option<String>,
    /// Consecutive empty status results per backend id
    empty_polls: Mutex<HashMap<String, u32>>,
}

impl BatchQueueAdapter {
    pub fn new(config: &ClusterConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        let grace = match config.get_directive("empty_queue_grace") {
            Some(v) => v.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("backend_directives.empty_queue_grace: {:?}", v))
            })?,
            None => 1,
        };
        let accounting = match config.get_directive("accounting") {
            Some(v) => v.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("backend_directives.accounting: {:?}", v))
            })?,
            None => false,
        };
        let directive = |key: &str| config.get_directive(key).map(str::to_string);
        Ok(Self {
            transport,
            dialect: Dialect::parse(config.get_directive("dialect"))?,
            limits: Limits::from_config(config)?,
            empty_queue: EmptyQueuePolicy::parse(config.get_directive("empty_queue"))?,
            grace,
            accounting,
            queue: directive("partition").or_else(|| directive("queue")),
            account: directive("account"),
            qos: directive("qos"),
            empty_polls: Mutex::new(HashMap::new()),
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Directive header for `request`.
    pub fn directives(&self, request: &SubmitRequest) -> Vec<String> {
        let res = request.resources();
        let name = format!("ferry-{}", request.job_id.short(8));
        let output = in_dir(&request.job_dir, SCHEDULER_LOG_FILE);
        match self.dialect {
            Dialect::Slurm => {
                let mut lines = vec![
                    format!("#SBATCH --job-name={}", name),
                    format!("#SBATCH --output={}", output),
                    format!("#SBATCH --chdir={}", request.job_dir),
                    "#SBATCH --ntasks=1".to_string(),
                    format!("#SBATCH --cpus-per-task={}", res.cores),
                    format!("#SBATCH --mem={}M", res.memory.mib_ceil()),
                    format!("#SBATCH --time={}", format_dhms(res.time_limit)),
                ];
                if let Some(partition) = &self.queue {
                    lines.push(format!("#SBATCH --partition={}", partition));
                }
                if let Some(account) = &self.account {
                    lines.push(format!("#SBATCH --account={}", account));
                }
                if let Some(qos) = &self.qos {
                    lines.push(format!("#SBATCH --qos={}", qos));
                }
                lines
            }
            Dialect::Pbs => {
                let mut lines = vec![
                    format!("#PBS -N {}", name),
                    format!("#PBS -o {}", output),
                    "#PBS -j oe".to_string(),
                    format!(
                        "#PBS -l select=1:ncpus={}:mem={}mb",
                        res.cores,
                        res.memory.mib_ceil()
                    ),
                    format!("#PBS -l walltime={}", format_hms(res.time_limit)),
                ];
                if let Some(queue) = &self.queue {
                    lines.push(format!("#PBS -q {}", queue));
                }
                if let Some(account) = &self.account {
                    lines.push(format!("#PBS -A {}", account));
                }
                lines
            }
        }
    }

    fn submit_command(&self, script: &str) -> String {
        match self.dialect {
            Dialect::Slurm => format!("sbatch --parsable {}", sh_escape(script)),
            Dialect::Pbs => format!("qsub {}", sh_escape(script)),
        }
    }

    fn status_command(&self, backend_id: &str) -> String {
        match self.dialect {
            Dialect::Slurm => format!("squeue -h -j {} -o %T", sh_escape(backend_id)),
            Dialect::Pbs => format!("qstat -x -f {}", sh_escape(backend_id)),
        }
    }

    fn cancel_command(&self, backend_id: &str) -> String {
        match self.dialect {
            Dialect::Slurm => format!("scancel {}", sh_escape(backend_id)),
            Dialect::Pbs => format!("qdel {}", sh_escape(backend_id)),
        }
    }

    /// Map one status command result; `None` means the queue had nothing to
    /// say about the job.
    fn read_status(&self, out: &CommandOutput) -> Option<BackendStatus> {
        let stdout = out.stdout_text();
        if !out.success() {
            let stderr = out.stderr_text();
            if is_unknown_job(&stderr) || is_unknown_job(&stdout) {
                return None;
            }
            return Some(BackendStatus::Unknown);
        }
        match self.dialect {
            Dialect::Slurm => stdout.lines().map(str::trim).find(|l| !l.is_empty()).map(slurm_status),
            Dialect::Pbs => pbs_status(&stdout),
        }
    }

    /// Resolve a job that has left the queue.
    async fn resolve_empty(&self, handle: &JobHandle) -> BackendStatus {
        let streak = {
            let mut polls = self.empty_polls.lock();
            let n = polls.entry(handle.backend_id.clone()).or_insert(0);
            *n += 1;
            *n
        };
        if streak <= self.grace {
            tracing::debug!(
                job_id = %handle.job_id,
                backend_id = %handle.backend_id,
                streak,
                "job not in queue yet, within grace"
            );
            return BackendStatus::Unknown;
        }

        if self.accounting && self.dialect == Dialect::Slurm {
            if let Some(status) = self.accounting_status(&handle.backend_id).await {
                return status;
            }
        }

        if self.empty_queue == EmptyQueuePolicy::Completed {
            return BackendStatus::Completed;
        }
        match status_from_artifacts(self.transport.as_ref(), &handle.job_dir).await {
            Ok(Some(status)) => status,
            Ok(None) if self.empty_queue == EmptyQueuePolicy::Wait => BackendStatus::Unknown,
            Ok(None) => {
                tracing::warn!(
                    job_id = %handle.job_id,
                    backend_id = %handle.backend_id,
                    "job left the queue without a result"
                );
                BackendStatus::Failed(FailReason::LostJob)
            }
            Err(e) => {
                tracing::debug!(job_id = %handle.job_id, error = %e, "artifact check failed");
                BackendStatus::Unknown
            }
        }
    }

    /// Terminal state from `sacct`, if accounting knows one.
    async fn accounting_status(&self, backend_id: &str) -> Option<BackendStatus> {
        let command = format!("sacct -n -P -X -j {} -o State", sh_escape(backend_id));
        let out = match self.transport.exec(&command).await {
            Ok(out) if out.success() => out,
            Ok(out) => {
                tracing::debug!(backend_id, stderr = %out.stderr_text(), "sacct failed");
                return None;
            }
            Err(e) => {
                tracing::debug!(backend_id, error = %e, "sacct unreachable");
                return None;
            }
        };
        out.stdout_text()
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(slurm_status)
            .filter(BackendStatus::is_terminal)
    }
}

fn is_unknown_job(text: &str) -> bool {
    UNKNOWN_JOB_MARKERS.iter().any(|m| text.contains(m))
}

/// Classify a rejected `sbatch` / `qsub`.
pub(crate) fn classify_submit_failure(stderr: &str) -> SubmissionError {
    let lower = stderr.to_ascii_lowercase();
    if QUOTA_MARKERS.iter().any(|m| stderr.contains(m) || lower.contains(&m.to_ascii_lowercase())) {
        SubmissionError::quota(stderr)
    } else if TRANSIENT_MARKERS.iter().any(|m| lower.contains(&m.to_ascii_lowercase())) {
        SubmissionError::transient(stderr)
    } else {
        SubmissionError::invalid(stderr)
    }
}

/// Map a Slurm `%T` state name. `CANCELLED by <uid>` counts as `CANCELLED`.
pub(crate) fn slurm_status(state: &str) -> BackendStatus {
    let name = state.split_whitespace().next().unwrap_or("").trim_end_matches('+');
    match name {
        "PENDING" | "CONFIGURING" | "REQUEUED" | "REQUEUE_HOLD" | "REQUEUE_FED" | "RESV_DEL_HOLD"
        | "SPECIAL_EXIT" => BackendStatus::Queued,
        "RUNNING" | "COMPLETING" | "SUSPENDED" | "STAGE_OUT" | "SIGNALING" | "RESIZING"
        | "STOPPED" => BackendStatus::Running,
        "COMPLETED" => BackendStatus::Completed,
        "CANCELLED" | "REVOKED" => BackendStatus::Cancelled,
        "FAILED" | "TIMEOUT" | "OUT_OF_MEMORY" | "NODE_FAIL" | "BOOT_FAIL" | "DEADLINE"
        | "PREEMPTED" => BackendStatus::failed(name),
        _ => BackendStatus::Unknown,
    }
}

/// Map `qstat -x -f` output via `job_state` and, for finished jobs,
/// `Exit_status`.
pub(crate) fn pbs_status(output: &str) -> Option<BackendStatus> {
    let field = |name: &str| {
        output.lines().find_map(|line| {
            let (key, value) = line.split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
    };
    let state = field("job_state")?;
    let status = match state.as_str() {
        "Q" | "H" | "W" | "T" | "M" => BackendStatus::Queued,
        "R" | "E" | "S" | "U" | "B" => BackendStatus::Running,
        "F" | "X" | "C" => match field("Exit_status").and_then(|v| v.parse::<i32>().ok()) {
            Some(0) => BackendStatus::Completed,
            Some(code) => BackendStatus::failed(format!("exit status {}", code)),
            None => return None,
        },
        _ => BackendStatus::Unknown,
    };
    Some(status)
}

#[async_trait]
impl SchedulerAdapter for BatchQueueAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Batch
    }

    fn validate(&self, request: &ResourceRequest) -> Result<(), SubmissionError> {
        self.limits.check(request)
    }

    fn render_script(&self, request: &SubmitRequest) -> String {
        request.script_params().directives(self.directives(request)).render()
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<JobHandle, SubmissionError> {
        self.validate(request.resources())?;
        let script = request.script_path();
        self.transport.upload(&script, self.render_script(request).as_bytes()).await?;

        let out = self.transport.exec(&self.submit_command(&script)).await?;
        if !out.success() {
            let stderr = out.stderr_text();
            tracing::warn!(
                job_id = %request.job_id,
                dialect = %self.dialect,
                stderr = %stderr,
                "batch submission rejected"
            );
            return Err(classify_submit_failure(&stderr));
        }
        // `sbatch --parsable` prints `id` or `id;cluster`; `qsub` prints `id.server`
        let stdout = out.stdout_text();
        let backend_id = stdout.lines().last().unwrap_or("").split(';').next().unwrap_or("").trim();
        if backend_id.is_empty() {
            return Err(SubmissionError::transient("scheduler returned no job id"));
        }
        tracing::info!(
            job_id = %request.job_id,
            backend_id,
            dialect = %self.dialect,
            "batch job submitted"
        );
        Ok(request.handle(backend_id))
    }

    async fn poll(&self, handle: &JobHandle) -> BackendStatus {
        let out = match self.transport.exec(&self.status_command(&handle.backend_id)).await {
            Ok(out) => out,
            Err(e) => {
                tracing::debug!(job_id = %handle.job_id, error = %e, "status command failed");
                return BackendStatus::Unknown;
            }
        };
        match self.read_status(&out) {
            Some(status) => {
                self.empty_polls.lock().remove(&handle.backend_id);
                status
            }
            None => {
                let status = self.resolve_empty(handle).await;
                if status.is_terminal() {
                    self.empty_polls.lock().remove(&handle.backend_id);
                }
                status
            }
        }
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<(), CancelError> {
        // Nobody polls a job after cancelling it
        self.empty_polls.lock().remove(&handle.backend_id);
        let out = self
            .transport
            .exec(&self.cancel_command(&handle.backend_id))
            .await
            .map_err(|e| CancelError::Backend(e.to_string()))?;
        if out.success() {
            return Ok(());
        }
        let stderr = out.stderr_text();
        if is_unknown_job(&stderr) {
            return Err(CancelError::NotFound(handle.backend_id.clone()));
        }
        // qdel refuses jobs that already finished
        if stderr.contains("Job has finished") || stderr.contains("Request invalid for state") {
            return Ok(());
        }
        Err(CancelError::Backend(stderr))
    }

    async fn fetch_result(&self, handle: &JobHandle) -> Result<ResultArtifact, FetchError> {
        fetch_result_from(self.transport.as_ref(), &handle.job_dir).await
    }

    async fn exit_code(&self, handle: &JobHandle) -> Option<i32> {
        read_exit_code(self.transport.as_ref(), &handle.job_dir).await
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
