// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job specification and lifecycle state machine.
//!
//! ```text
//! Created ─► Submitting ─► Queued ─► Running ─► Completed
//!    │           │            │         │     ├► Failed
//!    │           └► Failed    │         │     ├► Cancelled
//!    └──────────────► Cancelled ◄───────┘     └► LostJob
//! ```
//!
//! States only move forward. Terminal states never transition, and poll
//! results are applied only while the job is `Queued` or `Running`.

use crate::clock::Clock;
use crate::config::ClusterConfig;
use crate::id::{BundleId, JobId};
use crate::resources::ResourceRequest;
use crate::status::{BackendStatus, FailReason};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Spec built, not yet handed to the backend
    Created,
    /// Submission RPC in flight
    Submitting,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    /// The backend lost track of the job before a result appeared
    LostJob,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled | Self::LostJob)
    }

    /// Whether the poll worker should query the backend in this state.
    pub fn is_pollable(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Position along the lifecycle; all terminal states share the last rank.
    pub fn rank(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Submitting => 1,
            Self::Queued => 2,
            Self::Running => 3,
            Self::Completed | Self::Failed | Self::Cancelled | Self::LostJob => 4,
        }
    }
}

crate::simple_display! {
    JobState {
        Created => "created",
        Submitting => "submitting",
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        LostJob => "lost",
    }
}

/// Everything needed to run one job. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub resource_request: ResourceRequest,
    pub bundle_id: BundleId,
    /// Name of the captured function the entry point invokes
    pub entry_reference: String,
    /// Snapshot of the cluster config taken at submission time
    pub config: ClusterConfig,
}

impl JobSpec {
    /// Build a spec using the config's default resources.
    pub fn new(config: &ClusterConfig, bundle_id: BundleId, entry: impl Into<String>) -> Self {
        Self {
            resource_request: config.default_resources.clone(),
            bundle_id,
            entry_reference: entry.into(),
            config: config.clone(),
        }
    }

    crate::setters! {
        set {
            resource_request: ResourceRequest,
        }
    }
}

/// A recorded state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: JobState,
    pub to: JobState,
    pub at_ms: u64,
}

/// A job instance, owned and mutated by its poll worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub spec: JobSpec,
    pub state: JobState,
    /// Identifier assigned by the backend (scheduler job id, pid, k8s name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_id: Option<String>,
    /// `<working_directory>/<job_id>` on the remote side
    pub remote_work_dir: String,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_polled_at_ms: Option<u64>,
    #[serde(default)]
    pub history: Vec<Transition>,
}

impl Job {
    pub fn new(id: JobId, spec: JobSpec, clock: &impl Clock) -> Self {
        let remote_work_dir =
            format!("{}/{}", spec.config.working_directory.trim_end_matches('/'), id);
        Self {
            id,
            spec,
            state: JobState::Created,
            backend_id: None,
            remote_work_dir,
            created_at_ms: clock.epoch_ms(),
            submitted_at_ms: None,
            last_polled_at_ms: None,
            history: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// `Created → Submitting`.
    pub fn begin_submit(&mut self, clock: &impl Clock) -> Option<Transition> {
        if self.state != JobState::Created {
            return None;
        }
        self.transition(JobState::Submitting, clock.epoch_ms())
    }

    /// `Submitting → Queued`, recording the backend's id.
    pub fn submitted(
        &mut self,
        backend_id: impl Into<String>,
        clock: &impl Clock,
    ) -> Option<Transition> {
        if self.state != JobState::Submitting {
            return None;
        }
        let now = clock.epoch_ms();
        self.backend_id = Some(backend_id.into());
        self.submitted_at_ms = Some(now);
        self.transition(JobState::Queued, now)
    }

    /// `Submitting → Failed`; the job never reaches `Queued`.
    pub fn submission_failed(&mut self, clock: &impl Clock) -> Option<Transition> {
        if self.state != JobState::Submitting {
            return None;
        }
        self.transition(JobState::Failed, clock.epoch_ms())
    }

    /// Apply a poll result.
    ///
    /// Ignored unless the job is `Queued` or `Running`. `Unknown` never
    /// changes state, and a status that would move the job backwards
    /// (`Queued` after `Running`) is dropped.
    pub fn observe(&mut self, status: &BackendStatus, clock: &impl Clock) -> Option<Transition> {
        if !self.state.is_pollable() {
            return None;
        }
        let now = clock.epoch_ms();
        self.last_polled_at_ms = Some(now);

        let next = match status {
            BackendStatus::Unknown | BackendStatus::Queued => return None,
            BackendStatus::Running => JobState::Running,
            BackendStatus::Completed => JobState::Completed,
            BackendStatus::Failed(FailReason::LostJob) => JobState::LostJob,
            BackendStatus::Failed(FailReason::Remote(_)) => JobState::Failed,
            BackendStatus::Cancelled => JobState::Cancelled,
        };
        self.transition(next, now)
    }

    /// Move any non-terminal job to `Cancelled`.
    pub fn cancel(&mut self, clock: &impl Clock) -> Option<Transition> {
        if self.is_terminal() {
            return None;
        }
        self.transition(JobState::Cancelled, clock.epoch_ms())
    }

    /// Force a terminal state decided outside a poll (unreachable backend,
    /// missing handle). No-op once terminal.
    pub fn settle(&mut self, state: JobState, clock: &impl Clock) -> Option<Transition> {
        if self.is_terminal() || !state.is_terminal() {
            return None;
        }
        self.transition(state, clock.epoch_ms())
    }

    fn transition(&mut self, to: JobState, at_ms: u64) -> Option<Transition> {
        if to == self.state || to.rank() < self.state.rank() || self.is_terminal() {
            return None;
        }
        let t = Transition { from: self.state, to, at_ms };
        self.state = to;
        self.history.push(t);
        Some(t)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
