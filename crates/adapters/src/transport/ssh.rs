// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenSSH transport with pooled control-master connections.
//!
//! Each `(user, host, port)` gets one [`HostSlot`]: a control socket path
//! that OpenSSH multiplexes sessions over (`ControlMaster=auto`), and a
//! semaphore bounding concurrent sessions. A slot is evicted when a command
//! fails authentication, so the next command opens a fresh master instead of
//! reusing one established with stale credentials.

use super::local::run_child;
use super::{CommandOutput, Transport, TransportError};
use async_trait::async_trait;
use ferry_core::{ClusterConfig, TransportSettings};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Semaphore;

/// ssh's own exit status for connection-level failures.
const SSH_ERROR_STATUS: i32 = 255;

const AUTH_FAILURE_MARKERS: &[&str] = &[
    "Permission denied",
    "Authentication failed",
    "Too many authentication failures",
    "Host key verification failed",
];

/// Connection identity for one remote host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SshTarget {
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    /// Identity file passed as `-i`
    pub identity: Option<String>,
}

impl SshTarget {
    pub fn from_config(config: &ClusterConfig) -> Self {
        Self {
            user: config.user.clone(),
            host: config.host.clone(),
            port: config.port,
            identity: config.credentials_ref.clone(),
        }
    }

    fn key(&self) -> PoolKey {
        (self.user.clone(), self.host.clone(), self.port)
    }
}

impl std::fmt::Display for SshTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

type PoolKey = (Option<String>, String, Option<u16>);

/// One pooled connection.
#[derive(Debug)]
struct HostSlot {
    control_path: PathBuf,
    permits: Arc<Semaphore>,
}

/// Control-master slots shared by every transport in the process.
#[derive(Debug)]
pub struct SshPool {
    settings: TransportSettings,
    slots: Mutex<HashMap<PoolKey, Arc<HostSlot>>>,
    generation: AtomicU64,
}

impl SshPool {
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings, slots: Mutex::new(HashMap::new()), generation: AtomicU64::new(0) }
    }

    fn slot(&self, target: &SshTarget) -> Arc<HostSlot> {
        let mut slots = self.slots.lock();
        slots
            .entry(target.key())
            .or_insert_with(|| {
                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                Arc::new(HostSlot {
                    control_path: self.control_path(target, generation),
                    permits: Arc::new(Semaphore::new(self.settings.max_connections_per_host)),
                })
            })
            .clone()
    }

    /// Socket paths are length-limited, so the key is hashed.
    fn control_path(&self, target: &SshTarget, generation: u64) -> PathBuf {
        let digest = format!(
            "{:x}",
            Sha256::digest(format!("{}|{}|{}", target, std::process::id(), generation))
        );
        let dir = self.settings.control_dir.clone().unwrap_or_else(std::env::temp_dir);
        dir.join(format!("ferry-{}", &digest[..16]))
    }

    /// Drop `slot` if it is still the live slot for `target`, and ask its
    /// master to exit.
    fn evict(&self, target: &SshTarget, slot: &Arc<HostSlot>) {
        let removed = {
            let mut slots = self.slots.lock();
            match slots.get(&target.key()) {
                Some(current) if Arc::ptr_eq(current, slot) => slots.remove(&target.key()),
                _ => None,
            }
        };
        if let Some(slot) = removed {
            tracing::warn!(host = %target, "evicting ssh connection after authentication failure");
            let mut cmd = Command::new(&self.settings.ssh_program);
            cmd.arg("-O")
                .arg("exit")
                .arg("-o")
                .arg(format!("ControlPath={}", slot.control_path.display()))
                .arg(&target.host)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
            if let Err(e) = cmd.spawn() {
                tracing::debug!(host = %target, error = %e, "failed to stop control master");
            }
        }
    }

    /// Number of live slots (for diagnostics and tests).
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

/// Runs commands on a remote host through the system `ssh` client.
#[derive(Debug, Clone)]
pub struct SshTransport {
    target: SshTarget,
    pool: Arc<SshPool>,
}

impl SshTransport {
    pub fn new(target: SshTarget, pool: Arc<SshPool>) -> Self {
        Self { target, pool }
    }

    pub fn from_config(config: &ClusterConfig, pool: Arc<SshPool>) -> Self {
        Self::new(SshTarget::from_config(config), pool)
    }

    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    /// Full `ssh` argument list for `command` over `control_path`.
    pub(crate) fn ssh_args(&self, control_path: &std::path::Path, command: &str) -> Vec<String> {
        let settings = &self.pool.settings;
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", settings.connect_timeout.as_secs().max(1)),
            "-o".to_string(),
            "ControlMaster=auto".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", control_path.display()),
            "-o".to_string(),
            "ControlPersist=60".to_string(),
        ];
        if let Some(port) = self.target.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = &self.target.identity {
            args.push("-i".to_string());
            args.push(identity.clone());
        }
        if let Some(user) = &self.target.user {
            args.push("-l".to_string());
            args.push(user.clone());
        }
        args.push("--".to_string());
        args.push(self.target.host.clone());
        args.push(command.to_string());
        args
    }
}

/// Classify an ssh exit with status 255.
fn connection_error(target: &SshTarget, stderr: &str) -> TransportError {
    let message = stderr.trim().to_string();
    if AUTH_FAILURE_MARKERS.iter().any(|m| message.contains(m)) {
        TransportError::Auth { target: target.to_string(), message }
    } else {
        TransportError::Connect { target: target.to_string(), message }
    }
}

#[async_trait]
impl Transport for SshTransport {
    fn describe(&self) -> String {
        self.target.to_string()
    }

    async fn run(
        &self,
        command: &str,
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput, TransportError> {
        let slot = self.pool.slot(&self.target);
        let _permit = slot
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| TransportError::Spawn(e.to_string()))?;

        let mut cmd = Command::new(&self.pool.settings.ssh_program);
        cmd.args(self.ssh_args(&slot.control_path, command))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() });

        let out = run_child(cmd, stdin, self.pool.settings.command_timeout).await?;
        if out.status == Some(SSH_ERROR_STATUS) {
            let err = connection_error(&self.target, &out.stderr_text());
            if matches!(err, TransportError::Auth { .. }) {
                self.pool.evict(&self.target, &slot);
            }
            tracing::debug!(host = %self.target, error = %err, "ssh command failed");
            return Err(err);
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "ssh_tests.rs"]
mod tests;
