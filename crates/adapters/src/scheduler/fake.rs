// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted scheduler adapter for engine tests.
//!
//! Polls return queued statuses in order and then keep repeating the last
//! one (`Running` if nothing was scripted). A cancelled job reports
//! `Cancelled` from then on. Polls and fetches can be made to hang, which
//! stands in for a backend that stopped answering.

use super::{
    CancelError, FetchError, JobHandle, Limits, ResultArtifact, SchedulerAdapter,
    SubmissionError, SubmitRequest,
};
use async_trait::async_trait;
use ferry_core::{BackendKind, BackendStatus, JobId, ResourceRequest};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Recorded adapter call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Submit(JobId),
    Poll(String),
    Cancel(String),
    FetchResult(String),
    ExitCode(String),
}

struct FakeState {
    limits: Limits,
    submit_errors: VecDeque<SubmissionError>,
    statuses: VecDeque<BackendStatus>,
    last_status: BackendStatus,
    artifact: Option<ResultArtifact>,
    exit_code: Option<i32>,
    cancel_error: Option<CancelError>,
    cancelled: HashSet<String>,
    hang_polls: bool,
    hang_fetches: bool,
    calls: Vec<FakeCall>,
    next_id: u64,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            submit_errors: VecDeque::new(),
            statuses: VecDeque::new(),
            last_status: BackendStatus::Running,
            artifact: None,
            exit_code: None,
            cancel_error: None,
            cancelled: HashSet::new(),
            hang_polls: false,
            hang_fetches: false,
            calls: Vec::new(),
            next_id: 1,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeAdapter {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses for upcoming polls, in order.
    pub fn push_statuses(&self, statuses: impl IntoIterator<Item = BackendStatus>) {
        self.inner.lock().statuses.extend(statuses);
    }

    /// Fail the next submit with `error`. Queued errors are used in order.
    pub fn fail_submit(&self, error: SubmissionError) {
        self.inner.lock().submit_errors.push_back(error);
    }

    pub fn set_limits(&self, limits: Limits) {
        self.inner.lock().limits = limits;
    }

    pub fn set_artifact(&self, artifact: ResultArtifact) {
        self.inner.lock().artifact = Some(artifact);
    }

    pub fn set_exit_code(&self, code: i32) {
        self.inner.lock().exit_code = Some(code);
    }

    pub fn fail_cancel(&self, error: CancelError) {
        self.inner.lock().cancel_error = Some(error);
    }

    /// Polls are recorded and then never return.
    pub fn hang_polls(&self) {
        self.inner.lock().hang_polls = true;
    }

    /// Result fetches are recorded and then never return.
    pub fn hang_fetches(&self) {
        self.inner.lock().hang_fetches = true;
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.inner.lock().calls.clone()
    }

    pub fn submit_count(&self) -> usize {
        self.count(|c| matches!(c, FakeCall::Submit(_)))
    }

    pub fn poll_count(&self) -> usize {
        self.count(|c| matches!(c, FakeCall::Poll(_)))
    }

    pub fn cancel_count(&self) -> usize {
        self.count(|c| matches!(c, FakeCall::Cancel(_)))
    }

    fn count(&self, f: impl Fn(&FakeCall) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| f(c)).count()
    }
}

#[async_trait]
impl SchedulerAdapter for FakeAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Shell
    }

    fn validate(&self, request: &ResourceRequest) -> Result<(), SubmissionError> {
        self.inner.lock().limits.check(request)
    }

    fn render_script(&self, request: &SubmitRequest) -> String {
        request.script_params().directives(vec!["# fake".to_string()]).render()
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<JobHandle, SubmissionError> {
        self.validate(request.resources())?;
        let mut state = self.inner.lock();
        state.calls.push(FakeCall::Submit(request.job_id.clone()));
        if let Some(error) = state.submit_errors.pop_front() {
            return Err(error);
        }
        let id = state.next_id;
        state.next_id += 1;
        Ok(request.handle(format!("fake-{}", id)))
    }

    async fn poll(&self, handle: &JobHandle) -> BackendStatus {
        let hang = {
            let mut state = self.inner.lock();
            state.calls.push(FakeCall::Poll(handle.backend_id.clone()));
            state.hang_polls
        };
        if hang {
            std::future::pending::<()>().await;
        }
        let mut state = self.inner.lock();
        if state.cancelled.contains(&handle.backend_id) {
            return BackendStatus::Cancelled;
        }
        if let Some(status) = state.statuses.pop_front() {
            state.last_status = status;
        }
        state.last_status.clone()
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<(), CancelError> {
        let mut state = self.inner.lock();
        state.calls.push(FakeCall::Cancel(handle.backend_id.clone()));
        if let Some(error) = state.cancel_error.take() {
            return Err(error);
        }
        state.cancelled.insert(handle.backend_id.clone());
        Ok(())
    }

    async fn fetch_result(&self, handle: &JobHandle) -> Result<ResultArtifact, FetchError> {
        let hang = {
            let mut state = self.inner.lock();
            state.calls.push(FakeCall::FetchResult(handle.backend_id.clone()));
            state.hang_fetches
        };
        if hang {
            std::future::pending::<()>().await;
        }
        let state = self.inner.lock();
        state.artifact.clone().ok_or(FetchError::NotReady)
    }

    async fn exit_code(&self, handle: &JobHandle) -> Option<i32> {
        let mut state = self.inner.lock();
        state.calls.push(FakeCall::ExitCode(handle.backend_id.clone()));
        state.exit_code
    }
}
