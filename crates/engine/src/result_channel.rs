// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns a terminal job's artifacts into a [`JobResult`].
//!
//! An artifact always wins over the backend's status: a job the scheduler
//! calls failed may still have written `result.out` before being killed.

use ferry_adapters::ResultArtifact;
use ferry_core::{BackendStatus, ErrorKind, FailReason, JobError, JobResult};
use serde::Deserialize;
use serde_json::Value;

/// Longest diagnostic excerpt kept, in bytes. Longer text keeps its tail.
pub const DIAGNOSTIC_LIMIT: usize = 4096;

/// `error.out` as written by the entry point.
#[derive(Debug, Deserialize)]
struct RemoteError {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    diagnostic: Option<String>,
}

pub fn decode(
    artifact: Option<ResultArtifact>,
    status: BackendStatus,
    exit_code: Option<i32>,
) -> JobResult {
    let result = match artifact {
        Some(ResultArtifact::Value(bytes)) => match decode_value(&bytes) {
            Ok(value) => JobResult::success(value, status),
            Err(e) => JobResult::failure(
                JobError::new(ErrorKind::ResultMalformed, format!("result.out is not valid JSON: {}", e))
                    .diagnostic(excerpt(&String::from_utf8_lossy(&bytes))),
                status,
            ),
        },
        Some(ResultArtifact::Error(bytes)) => JobResult::failure(decode_error(&bytes), status),
        None => JobResult::failure(missing(&status, exit_code), status),
    };
    result.with_exit_code(exit_code)
}

/// `{"value": v}`, or a bare JSON document taken as the value itself.
fn decode_value(bytes: &[u8]) -> Result<Value, serde_json::Error> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("value") => {
            Ok(map.remove("value").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

fn decode_error(bytes: &[u8]) -> JobError {
    if let Ok(remote) = serde_json::from_slice::<RemoteError>(bytes) {
        let message = match (remote.kind.is_empty(), remote.message.is_empty()) {
            (true, _) => remote.message,
            (false, true) => remote.kind,
            (false, false) => format!("{}: {}", remote.kind, remote.message),
        };
        let error = JobError::new(ErrorKind::Execution, message);
        return match remote.diagnostic.filter(|d| !d.trim().is_empty()) {
            Some(d) => error.diagnostic(excerpt(&d)),
            None => error,
        };
    }

    // Plain text from the script's own fallback: first line is the message
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    let (message, rest) = match text.split_once('\n') {
        Some((first, rest)) => (first.trim(), rest.trim()),
        None => (text, ""),
    };
    let message = if message.is_empty() { "job failed without a message" } else { message };
    let error = JobError::new(ErrorKind::Execution, message);
    if rest.is_empty() {
        error
    } else {
        error.diagnostic(excerpt(rest))
    }
}

fn missing(status: &BackendStatus, exit_code: Option<i32>) -> JobError {
    match status {
        BackendStatus::Completed => JobError::new(
            ErrorKind::ResultMissing,
            "backend reported completion but no result artifact was found",
        ),
        BackendStatus::Failed(FailReason::LostJob) => JobError::new(
            ErrorKind::LostJob,
            "job left the backend without leaving a result",
        ),
        BackendStatus::Failed(FailReason::Remote(reason)) => {
            let message = match exit_code {
                Some(code) => format!("{} (exit code {})", reason, code),
                None => reason.clone(),
            };
            JobError::new(ErrorKind::Execution, message)
        }
        BackendStatus::Cancelled => JobError::new(ErrorKind::Cancelled, "job was cancelled"),
        BackendStatus::Queued | BackendStatus::Running | BackendStatus::Unknown => JobError::new(
            ErrorKind::ResultMissing,
            format!("job stopped while {} without a result", status),
        ),
    }
}

/// The last [`DIAGNOSTIC_LIMIT`] bytes of `text`, cut on a char boundary.
pub fn excerpt(text: &str) -> String {
    if text.len() <= DIAGNOSTIC_LIMIT {
        return text.to_string();
    }
    let mut start = text.len() - DIAGNOSTIC_LIMIT;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}

#[cfg(test)]
#[path = "result_channel_tests.rs"]
mod tests;
