// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory transport for tests.
//!
//! Files live in a map. Commands are matched by substring against scripted
//! responses: one-shot responses are consumed first, then sticky ones, and
//! anything unmatched succeeds with empty output.

use super::{CommandOutput, Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

type Reply = Result<CommandOutput, TransportError>;

#[derive(Default)]
struct MemoryState {
    files: BTreeMap<String, Vec<u8>>,
    once: VecDeque<(String, Reply)>,
    sticky: Vec<(String, Reply)>,
    commands: Vec<String>,
    uploads: Vec<String>,
    /// One-shot failure for the next file operation
    file_error: Option<TransportError>,
}

/// Scriptable fake transport
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_file(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.inner.lock().files.insert(path.to_string(), data.into());
    }

    pub fn remove_file(&self, path: &str) {
        self.inner.lock().files.remove(path);
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.lock().files.get(path).cloned()
    }

    pub fn file_text(&self, path: &str) -> Option<String> {
        self.file(path).map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    /// Reply to every command containing `pattern`. Later calls take priority.
    pub fn respond(&self, pattern: &str, reply: CommandOutput) {
        self.inner.lock().sticky.insert(0, (pattern.to_string(), Ok(reply)));
    }

    /// Reply once to the next command containing `pattern`.
    pub fn respond_once(&self, pattern: &str, reply: Reply) {
        self.inner.lock().once.push_back((pattern.to_string(), reply));
    }

    /// Fail the next upload/download/exists call.
    pub fn fail_next_file_op(&self, error: TransportError) {
        self.inner.lock().file_error = Some(error);
    }

    /// Every command run, in order
    pub fn commands(&self) -> Vec<String> {
        self.inner.lock().commands.clone()
    }

    /// Commands containing `pattern`
    pub fn commands_matching(&self, pattern: &str) -> Vec<String> {
        self.inner.lock().commands.iter().filter(|c| c.contains(pattern)).cloned().collect()
    }

    /// Every uploaded path, in order
    pub fn uploads(&self) -> Vec<String> {
        self.inner.lock().uploads.clone()
    }

    fn take_file_error(&self) -> Result<(), TransportError> {
        match self.inner.lock().file_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn run(&self, command: &str, _stdin: Option<&[u8]>) -> Result<CommandOutput, TransportError> {
        let mut state = self.inner.lock();
        state.commands.push(command.to_string());
        if let Some(pos) = state.once.iter().position(|(p, _)| command.contains(p.as_str())) {
            if let Some((_, reply)) = state.once.remove(pos) {
                return reply;
            }
        }
        if let Some((_, reply)) = state.sticky.iter().find(|(p, _)| command.contains(p.as_str())) {
            return reply.clone();
        }
        Ok(CommandOutput::ok(""))
    }

    async fn upload(&self, path: &str, data: &[u8]) -> Result<(), TransportError> {
        self.take_file_error()?;
        let mut state = self.inner.lock();
        state.uploads.push(path.to_string());
        state.files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Option<Vec<u8>>, TransportError> {
        self.take_file_error()?;
        Ok(self.file(path))
    }

    async fn exists(&self, path: &str) -> Result<bool, TransportError> {
        self.take_file_error()?;
        let state = self.inner.lock();
        let prefix = format!("{}/", path.trim_end_matches('/'));
        Ok(state.files.contains_key(path) || state.files.keys().any(|k| k.starts_with(&prefix)))
    }
}
