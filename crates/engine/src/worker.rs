// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job task: stage, submit with retries, poll until terminal, collect.
//!
//! The worker owns its [`Job`] and is the only writer. Every transition is
//! published through the watch channel, and the final [`JobResult`] is
//! published exactly once when the task ends.

use crate::future::JobSnapshot;
use crate::manager::{JobRequest, UploadSet};
use crate::result_channel;
use ferry_adapters::{
    layout, Backend, CancelError, FetchError, JobHandle, RemoteLayout, ResultArtifact,
    SubmissionError, SubmitRequest,
};
use ferry_capture::EnvironmentSpec;
use ferry_core::{
    BackendStatus, Clock, ErrorKind, Job, JobError, JobId, JobResult, JobSpec, JobState,
    Transition,
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Why the worker stopped before reaching the poll loop.
enum Interrupt {
    Cancelled,
    Rejected(SubmissionError),
}

pub(crate) struct Worker<C: Clock> {
    pub(crate) job: Job,
    pub(crate) request: JobRequest,
    pub(crate) backend: Backend,
    pub(crate) uploads: Arc<UploadSet>,
    pub(crate) clock: C,
    pub(crate) tx: watch::Sender<JobSnapshot>,
    pub(crate) cancel: CancellationToken,
}

/// The adapter-facing request for `job_id`.
pub(crate) fn submit_request(
    job_id: &JobId,
    spec: &JobSpec,
    environment: &EnvironmentSpec,
) -> SubmitRequest {
    let request = SubmitRequest::new(job_id.clone(), spec.clone())
        .interpreter(environment.interpreter_command());
    if environment.packages.is_empty() {
        request
    } else {
        let layout = RemoteLayout::new(&spec.config.working_directory);
        request.env_dir(layout.env_dir(&spec.bundle_id))
    }
}

impl<C: Clock> Worker<C> {
    pub(crate) async fn run(mut self) {
        let result = self.drive().await;
        match result.error() {
            Some(e) => tracing::info!(
                job_id = %self.job.id,
                state = %self.job.state,
                error = %e,
                "job settled"
            ),
            None => tracing::info!(job_id = %self.job.id, state = %self.job.state, "job settled"),
        }
        self.tx.send_replace(JobSnapshot { job: self.job.clone(), result: Some(result) });
    }

    async fn drive(&mut self) -> JobResult {
        if self.cancel.is_cancelled() {
            return self.cancelled(None).await;
        }
        let begun = self.job.begin_submit(&self.clock);
        self.publish(begun);

        let request = submit_request(&self.job.id, &self.job.spec, &self.request.environment);
        let handle = match self.submit(&request).await {
            Ok(handle) => handle,
            Err(Interrupt::Cancelled) => return self.cancelled(None).await,
            Err(Interrupt::Rejected(e)) => {
                let failed = self.job.submission_failed(&self.clock);
                self.publish(failed);
                return JobResult::failure(
                    JobError::new(ErrorKind::Submission(e.kind), e.message),
                    BackendStatus::Unknown,
                );
            }
        };

        let submitted = self.job.submitted(handle.backend_id.clone(), &self.clock);
        self.publish(submitted);
        if self.cancel.is_cancelled() {
            return self.cancelled(Some(&handle)).await;
        }
        self.poll_until_terminal(&handle).await
    }

    /// Stage the bundle and arguments, then submit, retrying transient
    /// failures with backoff. Quota and invalid-request errors get one try.
    async fn submit(&self, request: &SubmitRequest) -> Result<JobHandle, Interrupt> {
        let retry = &self.job.spec.config.retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let error = match self.stage_and_submit(request).await {
                Ok(handle) => return Ok(handle),
                Err(e) => e,
            };
            if !error.is_retryable() || attempt >= max_attempts {
                tracing::warn!(
                    job_id = %self.job.id,
                    attempt,
                    error = %error,
                    "submission failed"
                );
                return Err(Interrupt::Rejected(error));
            }

            let delay = retry.delay_for(attempt);
            tracing::info!(
                job_id = %self.job.id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "submission failed, retrying"
            );
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Interrupt::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    async fn stage_and_submit(&self, request: &SubmitRequest) -> Result<JobHandle, SubmissionError> {
        let transport = self.backend.transport.as_ref();
        // Site limits first, so an oversized request never causes an upload
        self.backend.adapter.validate(request.resources())?;
        self.uploads
            .ensure(transport, &self.job.spec.config.working_directory, &self.request.bundle)
            .await?;

        let args = self
            .request
            .arguments
            .to_json()
            .map_err(|e| SubmissionError::invalid(format!("arguments are not JSON: {}", e)))?;
        transport.upload(&layout::in_dir(&request.job_dir, layout::ARGS_FILE), &args).await?;

        self.backend.adapter.submit(request).await
    }

    async fn poll_until_terminal(&mut self, handle: &JobHandle) -> JobResult {
        let policy = self.job.spec.config.poll.clone();
        let max_unknown = policy.max_consecutive_unknown.max(1);
        let mut unknown_streak = 0u32;
        loop {
            let delay = policy.interval_after(unknown_streak);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(Some(handle)).await,
                _ = tokio::time::sleep(delay) => {}
            }

            // A backend that stops answering must not pin a cancelled job
            let status = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(Some(handle)).await,
                status = self.backend.adapter.poll(handle) => status,
            };
            let observed = self.job.observe(&status, &self.clock);
            self.publish(observed);

            if status == BackendStatus::Unknown {
                unknown_streak += 1;
                tracing::debug!(
                    job_id = %self.job.id,
                    backend_id = %handle.backend_id,
                    unknown_streak,
                    "backend status unknown"
                );
                if unknown_streak >= max_unknown {
                    let settled = self.job.settle(JobState::Failed, &self.clock);
                    self.publish(settled);
                    return JobResult::failure(
                        JobError::new(
                            ErrorKind::BackendUnreachable,
                            format!("no status from the backend after {} polls", unknown_streak),
                        ),
                        status,
                    );
                }
                continue;
            }
            unknown_streak = 0;

            if self.job.is_terminal() {
                // The job already ended remotely, so there is nothing to
                // cancel; only the download is abandoned.
                return tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        tracing::info!(job_id = %self.job.id, "cancelled while collecting the result");
                        JobResult::failure(
                            JobError::new(
                                ErrorKind::Cancelled,
                                "cancelled before the result was collected",
                            ),
                            status,
                        )
                    }
                    result = self.collect(handle, status.clone()) => result,
                };
            }
        }
    }

    /// Fetch artifacts for a terminal job and decode them.
    async fn collect(&self, handle: &JobHandle, status: BackendStatus) -> JobResult {
        let retry = &self.job.spec.config.retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 1;
        let artifact: Option<ResultArtifact> = loop {
            match self.backend.adapter.fetch_result(handle).await {
                Ok(artifact) => break Some(artifact),
                Err(FetchError::NotReady) => break None,
                Err(FetchError::Transport(e)) if attempt < max_attempts => {
                    tracing::debug!(job_id = %self.job.id, attempt, error = %e, "result download failed");
                    tokio::time::sleep(retry.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(FetchError::Transport(e)) => {
                    let exit_code = self.backend.adapter.exit_code(handle).await;
                    return JobResult::failure(
                        JobError::new(
                            ErrorKind::ResultMissing,
                            format!("could not download the result: {}", e),
                        ),
                        status,
                    )
                    .with_exit_code(exit_code);
                }
            }
        };
        let exit_code = self.backend.adapter.exit_code(handle).await;
        result_channel::decode(artifact, status, exit_code)
    }

    /// Cancel the remote job (when one exists) and settle `Cancelled`.
    async fn cancelled(&mut self, handle: Option<&JobHandle>) -> JobResult {
        if let Some(handle) = handle {
            match self.backend.adapter.cancel(handle).await {
                Ok(()) => {
                    tracing::info!(job_id = %self.job.id, backend_id = %handle.backend_id, "job cancelled")
                }
                Err(CancelError::NotFound(id)) => {
                    tracing::debug!(job_id = %self.job.id, backend_id = %id, "job already gone")
                }
                Err(e) => tracing::warn!(job_id = %self.job.id, error = %e, "backend cancel failed"),
            }
        }
        let cancelled = self.job.cancel(&self.clock);
        self.publish(cancelled);
        result_channel::decode(None, BackendStatus::Cancelled, None)
    }

    fn publish(&self, transition: Option<Transition>) {
        let Some(t) = transition else {
            return;
        };
        tracing::debug!(job_id = %self.job.id, from = %t.from, to = %t.to, "job transition");
        self.tx.send_replace(JobSnapshot { job: self.job.clone(), result: None });
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
