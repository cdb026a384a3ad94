// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs commands on this machine with `sh -c`.

use super::{CommandOutput, Transport, TransportError};
use async_trait::async_trait;
use ferry_core::TransportSettings;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Transport for `host = "local"`: commands run under `/bin/sh`.
#[derive(Debug, Clone, Copy)]
pub struct LocalTransport {
    command_timeout: Duration,
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self { command_timeout: TransportSettings::default().command_timeout }
    }
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn describe(&self) -> String {
        "local".to_string()
    }

    async fn run(
        &self,
        command: &str,
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput, TransportError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() });
        run_child(cmd, stdin, self.command_timeout).await
    }
}

/// Spawn `cmd`, feed `stdin` while collecting its output, and kill it if
/// it outlives `limit`.
///
/// A child may exit without draining stdin (ssh refusing authentication
/// does), so a broken pipe on the feed is not an error: the exit status
/// and stderr decide the outcome.
pub(super) async fn run_child(
    mut cmd: Command,
    stdin: Option<&[u8]>,
    limit: Duration,
) -> Result<CommandOutput, TransportError> {
    cmd.kill_on_drop(true);
    let mut child = cmd.spawn().map_err(|e| TransportError::Spawn(e.to_string()))?;
    let pipe = child.stdin.take();

    let feed = async move {
        let (Some(data), Some(mut pipe)) = (stdin, pipe) else {
            return Ok(());
        };
        pipe.write_all(data).await?;
        pipe.shutdown().await
    };

    // Dropping the child on timeout kills it.
    let (fed, output) =
        match tokio::time::timeout(limit, async { tokio::join!(feed, child.wait_with_output()) })
            .await
        {
            Ok(done) => done,
            Err(_) => return Err(TransportError::Timeout(limit)),
        };

    match fed {
        Err(e) if e.kind() != ErrorKind::BrokenPipe => {
            return Err(TransportError::Spawn(e.to_string()));
        }
        Err(e) => tracing::debug!(error = %e, "child closed stdin early"),
        Ok(()) => {}
    }
    let output = output.map_err(|e| TransportError::Spawn(e.to_string()))?;
    Ok(CommandOutput { status: output.status.code(), stdout: output.stdout, stderr: output.stderr })
}
