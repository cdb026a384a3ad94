// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job Lifecycle Manager: turns requests into running workers.

use crate::future::{JobFuture, JobSnapshot};
use crate::worker::Worker;
use ferry_adapters::{Backend, RemoteLayout, Transport, TransportError};
use ferry_capture::{Bundle, CallArguments, EnvironmentSpec};
use ferry_core::{
    BackendStatus, BundleId, Clock, ClusterConfig, ErrorKind, Job, JobError, JobId, JobResult,
    JobSpec, ResourceRequest, SystemClock,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};
use tokio_util::sync::CancellationToken;

/// One function call to run remotely.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub spec: JobSpec,
    pub bundle: Arc<Bundle>,
    pub arguments: CallArguments,
    /// Interpreter and packages the job needs on the remote side
    pub environment: EnvironmentSpec,
}

impl JobRequest {
    /// A request using the config's default resources.
    pub fn new(config: &ClusterConfig, bundle: Arc<Bundle>, entry: impl Into<String>) -> Self {
        Self {
            spec: JobSpec::new(config, bundle.id.clone(), entry),
            bundle,
            arguments: CallArguments::default(),
            environment: EnvironmentSpec::default(),
        }
    }

    ferry_core::setters! {
        set {
            arguments: CallArguments,
            environment: EnvironmentSpec,
        }
    }

    pub fn resources(mut self, resources: ResourceRequest) -> Self {
        self.spec.resource_request = resources;
        self
    }
}

type UploadKey = (String, BundleId);

/// Bundles already present on a remote working directory.
///
/// Each `(working directory, fingerprint)` pair gets one cell, so
/// concurrent jobs sharing a bundle wait on a single upload. A failed
/// upload leaves the cell empty and the next job tries again.
#[derive(Default)]
pub(crate) struct UploadSet {
    cells: Mutex<HashMap<UploadKey, Arc<OnceCell<()>>>>,
}

impl UploadSet {
    pub(crate) async fn ensure(
        &self,
        transport: &dyn Transport,
        working_directory: &str,
        bundle: &Bundle,
    ) -> Result<(), TransportError> {
        let layout = RemoteLayout::new(working_directory);
        let key = (format!("{}:{}", transport.describe(), layout.root()), bundle.id.clone());
        let cell = Arc::clone(self.cells.lock().entry(key).or_default());
        cell.get_or_try_init(|| async {
            let path = layout.bundle_path(&bundle.id);
            if transport.exists(&path).await? {
                tracing::debug!(bundle_id = %bundle.id.short(), "bundle already on remote");
            } else {
                transport.upload(&path, &bundle.payload).await?;
                tracing::info!(
                    bundle_id = %bundle.id.short(),
                    size = bundle.size(),
                    host = %transport.describe(),
                    "bundle uploaded"
                );
            }
            Ok::<_, TransportError>(())
        })
        .await
        .map(|_| ())
    }
}

/// Submits jobs to one backend. Cheap to clone.
#[derive(Clone)]
pub struct JobManager<C: Clock = SystemClock> {
    backend: Backend,
    uploads: Arc<UploadSet>,
    clock: C,
}

impl JobManager<SystemClock> {
    pub fn new(backend: Backend) -> Self {
        Self::with_clock(backend, SystemClock)
    }
}

impl<C: Clock> JobManager<C> {
    pub fn with_clock(backend: Backend, clock: C) -> Self {
        Self { backend, uploads: Arc::new(UploadSet::default()), clock }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Start a job and return at once. Must be called inside a tokio
    /// runtime; no remote I/O happens on the caller's task.
    pub fn submit_async(&self, request: JobRequest) -> JobFuture {
        let job = Job::new(JobId::new(), request.spec.clone(), &self.clock);
        let id = job.id.clone();
        tracing::debug!(
            job_id = %id,
            bundle_id = %request.bundle.id.short(),
            entry = %request.spec.entry_reference,
            backend = %request.spec.config.backend,
            "job created"
        );

        let (tx, rx) = watch::channel(JobSnapshot { job: job.clone(), result: None });
        let cancel = CancellationToken::new();
        let worker = Worker {
            job,
            request,
            backend: self.backend.clone(),
            uploads: Arc::clone(&self.uploads),
            clock: self.clock.clone(),
            tx,
            cancel: cancel.clone(),
        };
        tokio::spawn(worker.run());
        JobFuture::new(id, rx, cancel)
    }

    /// Submit and wait for the result.
    pub async fn submit_sync(&self, request: JobRequest) -> JobResult {
        match self.submit_async(request).await_result(None).await {
            Ok(result) => result,
            Err(e) => JobResult::failure(
                JobError::new(ErrorKind::BackendUnreachable, e.to_string()),
                BackendStatus::Unknown,
            ),
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
