// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote command execution and file transfer.
//!
//! # Module layout
//!
//! - [`ssh`]: OpenSSH client with pooled control-master connections
//! - [`local`]: `sh -c` on this machine
//! - `memory`: in-memory fake (test-support)
//!
//! Every transport implements [`Transport::run`]; file operations are built
//! on top of it with plain POSIX shell so they work on any login node.

mod local;
mod ssh;

pub use local::LocalTransport;
pub use ssh::{SshPool, SshTarget, SshTransport};

use crate::script::sh_escape;
use async_trait::async_trait;
use thiserror::Error;

/// Exit status `download` uses for "no such file".
const MISSING_STATUS: i32 = 3;

/// Transport-level failures. A remote command that runs and exits non-zero
/// is not an error; see [`CommandOutput::status`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("authentication failed for {target}: {message}")]
    Auth { target: String, message: String },
    #[error("connection to {target} failed: {message}")]
    Connect { target: String, message: String },
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("failed to run command: {0}")]
    Spawn(String),
    #[error("remote file operation failed on {path}: {message}")]
    File { path: String, message: String },
}

/// Captured result of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status; `None` when the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self { status: Some(0), stdout: stdout.into(), stderr: Vec::new() }
    }

    pub fn failed(status: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self { status: Some(status), stdout: Vec::new(), stderr: stderr.into() }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Where commands run.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Short description for logs (`user@host:port`, `local`)
    fn describe(&self) -> String;

    /// Run `command` through the remote login shell, feeding `stdin` if given.
    async fn run(&self, command: &str, stdin: Option<&[u8]>)
        -> Result<CommandOutput, TransportError>;

    async fn exec(&self, command: &str) -> Result<CommandOutput, TransportError> {
        self.run(command, None).await
    }

    /// Write `data` to `path` atomically, creating parent directories.
    async fn upload(&self, path: &str, data: &[u8]) -> Result<(), TransportError> {
        let quoted = sh_escape(path);
        let command = format!(
            "mkdir -p \"$(dirname {p})\" && cat > {p}.tmp.$$ && mv -f {p}.tmp.$$ {p}",
            p = quoted
        );
        let out = self.run(&command, Some(data)).await?;
        if out.success() {
            Ok(())
        } else {
            Err(TransportError::File { path: path.to_string(), message: out.stderr_text() })
        }
    }

    /// Read `path`; `None` when it does not exist.
    async fn download(&self, path: &str) -> Result<Option<Vec<u8>>, TransportError> {
        let quoted = sh_escape(path);
        let command =
            format!("if [ -f {p} ]; then cat {p}; else exit {}; fi", MISSING_STATUS, p = quoted);
        let out = self.run(&command, None).await?;
        match out.status {
            Some(0) => Ok(Some(out.stdout)),
            Some(MISSING_STATUS) => Ok(None),
            _ => Err(TransportError::File { path: path.to_string(), message: out.stderr_text() }),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, TransportError> {
        let out = self.run(&format!("test -e {}", sh_escape(path)), None).await?;
        Ok(out.success())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod memory;

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryTransport;

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
