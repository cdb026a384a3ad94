// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Final outcome of a job.
//!
//! Remote failures are data, not errors: a job that crashed, vanished from
//! the scheduler, or never produced a result still yields a `JobResult`.

use crate::status::BackendStatus;
use serde::{Deserialize, Serialize};

/// Why a submission was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionErrorKind {
    AuthFailure,
    QuotaExceeded,
    TransientNetwork,
    InvalidResourceRequest,
}

impl SubmissionErrorKind {
    /// Whether the submission is worth retrying.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::TransientNetwork | Self::AuthFailure)
    }
}

crate::simple_display! {
    SubmissionErrorKind {
        AuthFailure => "auth_failure",
        QuotaExceeded => "quota_exceeded",
        TransientNetwork => "transient_network",
        InvalidResourceRequest => "invalid_resource_request",
    }
}

/// Classification of a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum ErrorKind {
    Submission(SubmissionErrorKind),
    /// The remote function raised, or the job exited non-zero
    Execution,
    /// The backend reported completion but no artifact was found
    ResultMissing,
    /// `result.out` could not be decoded
    ResultMalformed,
    LostJob,
    Cancelled,
    /// Too many consecutive `Unknown` polls
    BackendUnreachable,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submission(kind) => write!(f, "submission:{}", kind),
            Self::Execution => f.write_str("execution"),
            Self::ResultMissing => f.write_str("result_missing"),
            Self::ResultMalformed => f.write_str("result_malformed"),
            Self::LostJob => f.write_str("lost_job"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::BackendUnreachable => f.write_str("backend_unreachable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
    /// Traceback or log excerpt, when one was available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), diagnostic: None }
    }

    crate::setters! {
        option {
            diagnostic: String,
        }
    }
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for JobError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success(serde_json::Value),
    Failure(JobError),
}

/// Produced at most once per job and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub backend_status_at_completion: BackendStatus,
}

impl JobResult {
    pub fn success(value: serde_json::Value, status: BackendStatus) -> Self {
        Self { outcome: Outcome::Success(value), exit_code: None, backend_status_at_completion: status }
    }

    pub fn failure(error: JobError, status: BackendStatus) -> Self {
        Self { outcome: Outcome::Failure(error), exit_code: None, backend_status_at_completion: status }
    }

    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn value(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            Outcome::Success(v) => Some(v),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&JobError> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(e) => Some(e),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(|e| e.kind)
    }

    /// Convert into a plain `Result`.
    pub fn into_result(self) -> Result<serde_json::Value, JobError> {
        match self.outcome {
            Outcome::Success(v) => Ok(v),
            Outcome::Failure(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
