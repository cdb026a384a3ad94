// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.

use ferry_core::ErrorKind;
use ferry_engine::DispatchError;
use std::fmt;

pub mod codes {
    pub const USAGE: i32 = 2;
    /// Local capture or packaging failure
    pub const ANALYSIS: i32 = 3;
    pub const SUBMISSION: i32 = 4;
    /// Remote error, missing/malformed result, unreachable backend
    pub const EXECUTION: i32 = 5;
    pub const LOST: i32 = 6;
    pub const CANCELLED: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(codes::USAGE, message)
    }
}

/// Exit code for a failed job.
pub fn code_for(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Submission(_) => codes::SUBMISSION,
        ErrorKind::Execution
        | ErrorKind::ResultMissing
        | ErrorKind::ResultMalformed
        | ErrorKind::BackendUnreachable => codes::EXECUTION,
        ErrorKind::LostJob => codes::LOST,
        ErrorKind::Cancelled => codes::CANCELLED,
    }
}

impl From<DispatchError> for ExitError {
    fn from(e: DispatchError) -> Self {
        let code = match e {
            DispatchError::Config(_) => codes::USAGE,
            DispatchError::Analysis(_) | DispatchError::Packaging(_) => codes::ANALYSIS,
        };
        Self::new(code, e.to_string())
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
