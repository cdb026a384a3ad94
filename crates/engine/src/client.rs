// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! High-level client: capture, pack, submit, wait.

use crate::future::JobFuture;
use crate::manager::{JobManager, JobRequest};
use crate::worker::submit_request;
use ferry_adapters::{connect, Backend, SshPool};
use ferry_capture::{
    pack, AnalysisError, Bundle, CallArguments, CaptureManifest, ManifestBuilder, PackagingError,
    Registry,
};
use ferry_core::{ClusterConfig, ConfigError, JobId, JobResult};
use std::sync::Arc;
use thiserror::Error;

/// Local failures that stop a call before anything reaches the backend.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("packaging error: {0}")]
    Packaging(#[from] PackagingError),
}

/// A target captured and packed, ready to submit any number of times.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub manifest: CaptureManifest,
    pub bundle: Arc<Bundle>,
}

pub struct Ferry {
    config: ClusterConfig,
    registry: Registry,
    manager: JobManager,
}

impl Ferry {
    /// Validate `config` and build its backend. No network I/O.
    pub fn new(config: ClusterConfig, registry: Registry) -> Result<Self, DispatchError> {
        config.validate()?;
        let pool = Arc::new(SshPool::new(config.transport.clone()));
        let backend = connect(&config, pool)?;
        Ok(Self::with_backend(config, registry, backend))
    }

    pub fn with_backend(config: ClusterConfig, registry: Registry, backend: Backend) -> Self {
        Self { config, registry, manager: JobManager::new(backend) }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn manager(&self) -> &JobManager {
        &self.manager
    }

    /// Build the manifest for `target` and pack it.
    pub fn prepare(&self, target: &str) -> Result<Prepared, DispatchError> {
        let manifest = ManifestBuilder::new(&self.registry).build(target)?;
        let bundle = pack(&manifest)?;
        tracing::debug!(
            target_fn = %target,
            bundle_id = %bundle.id.short(),
            definitions = manifest.local_definitions.len(),
            size = bundle.size(),
            "target packed"
        );
        Ok(Prepared { manifest, bundle: Arc::new(bundle) })
    }

    pub fn request(&self, prepared: &Prepared, arguments: CallArguments) -> JobRequest {
        JobRequest::new(&self.config, Arc::clone(&prepared.bundle), &prepared.manifest.entry_reference)
            .arguments(arguments)
            .environment(prepared.manifest.environment_spec.clone())
    }

    /// Capture, pack and submit `target` without waiting.
    pub fn spawn(&self, target: &str, arguments: CallArguments) -> Result<JobFuture, DispatchError> {
        let prepared = self.prepare(target)?;
        Ok(self.manager.submit_async(self.request(&prepared, arguments)))
    }

    /// Capture, pack, submit and wait for `target`.
    ///
    /// Local problems are errors; everything that happens remotely comes
    /// back as a [`JobResult`].
    pub async fn run(&self, target: &str, arguments: CallArguments) -> Result<JobResult, DispatchError> {
        let prepared = self.prepare(target)?;
        Ok(self.manager.submit_sync(self.request(&prepared, arguments)).await)
    }

    /// The submission script a job for `target` would use.
    pub fn render_script(&self, target: &str) -> Result<String, DispatchError> {
        let prepared = self.prepare(target)?;
        let request = self.request(&prepared, CallArguments::default());
        let submit = submit_request(&JobId::new(), &request.spec, &request.environment);
        Ok(self.manager.backend().adapter.render_script(&submit))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
