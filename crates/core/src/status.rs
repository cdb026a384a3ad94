// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend-reported job status, normalized across schedulers.

use serde::{Deserialize, Serialize};

/// Why a backend considers a job failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum FailReason {
    /// The backend reported a failure state (scheduler state name, pod
    /// condition reason, non-zero exit, ...).
    Remote(String),
    /// The job left the scheduler's view without leaving a result artifact.
    LostJob,
}

/// Status as reported by a scheduler adapter's `poll`.
///
/// `Unknown` means "no new information" (status command unreachable or the
/// answer was ambiguous) and is never terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    Queued,
    Running,
    Completed,
    Failed(FailReason),
    Cancelled,
    Unknown,
}

impl BackendStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_) | Self::Cancelled)
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(FailReason::Remote(reason.into()))
    }
}

crate::simple_display! {
    BackendStatus {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed(..) => "failed",
        Cancelled => "cancelled",
        Unknown => "unknown",
    }
}
