// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-side handle to an in-flight job.

use ferry_core::{Job, JobId, JobResult, JobState};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    /// The wait ran out; the job itself keeps running.
    #[error("no result after {}", ferry_core::format_duration(*.0))]
    Timeout(Duration),
    /// The worker stopped without settling the job.
    #[error("job worker stopped before producing a result")]
    Abandoned,
}

/// What the worker publishes after every change.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job: Job,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}

/// Returned by `submit_async`. Dropping it does not cancel the job.
#[derive(Clone)]
pub struct JobFuture {
    id: JobId,
    rx: watch::Receiver<JobSnapshot>,
    cancel: CancellationToken,
}

impl JobFuture {
    pub(crate) fn new(
        id: JobId,
        rx: watch::Receiver<JobSnapshot>,
        cancel: CancellationToken,
    ) -> Self {
        Self { id, rx, cancel }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Lifecycle state as last observed on the backend.
    ///
    /// This says how the remote job ended, not whether the call succeeded:
    /// a `Completed` job whose result could not be read or decoded settles
    /// with a failure result. The [`JobResult`] is authoritative.
    pub fn state(&self) -> JobState {
        self.rx.borrow().job.state
    }

    /// Copy of the job as last published by its worker.
    pub fn snapshot(&self) -> Job {
        self.rx.borrow().job.clone()
    }

    /// The result, if the job has settled.
    pub fn try_result(&self) -> Option<JobResult> {
        self.rx.borrow().result.clone()
    }

    /// Ask the worker to cancel the job. Idempotent, and a no-op once the
    /// result is published. Between a terminal state and the result, it
    /// abandons the download.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(job_id = %self.id, "cancel requested");
        }
        self.cancel.cancel();
    }

    /// Wait for the result. `timeout` bounds only this wait.
    pub async fn await_result(&self, timeout: Option<Duration>) -> Result<JobResult, WaitError> {
        let mut rx = self.rx.clone();
        let wait = async move {
            match rx.wait_for(|snapshot| snapshot.result.is_some()).await {
                Ok(snapshot) => snapshot.result.clone().ok_or(WaitError::Abandoned),
                Err(_) => Err(WaitError::Abandoned),
            }
        };
        match timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .unwrap_or(Err(WaitError::Timeout(limit))),
            None => wait.await,
        }
    }
}

impl std::fmt::Debug for JobFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobFuture").field("id", &self.id).field("state", &self.state()).finish()
    }
}

#[cfg(test)]
#[path = "future_tests.rs"]
mod tests;
