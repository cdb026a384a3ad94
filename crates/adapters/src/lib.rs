// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ferry-adapters: transports and scheduler backends
//!
//! # Module layout
//!
//! - [`transport`]: remote command execution and file transfer (SSH, local)
//! - [`scheduler`]: the [`SchedulerAdapter`] trait and its backends
//! - [`script`]: generated submission scripts
//! - [`layout`]: remote working directory layout

pub mod layout;
pub mod scheduler;
pub mod script;
pub mod transport;

pub use layout::RemoteLayout;
pub use scheduler::{
    connect, fetch_artifacts, Backend, BatchQueueAdapter, CancelError, Dialect, DirectShellAdapter,
    EmptyQueuePolicy, FetchError, JobHandle, Limits, OrchestratorAdapter, ResultArtifact,
    SchedulerAdapter, SubmissionError, SubmitRequest,
};
pub use script::{sh_escape, ScriptParams};
pub use transport::{
    CommandOutput, LocalTransport, SshPool, SshTarget, SshTransport, Transport, TransportError,
};

#[cfg(any(test, feature = "test-support"))]
pub use scheduler::{FakeAdapter, FakeCall};
#[cfg(any(test, feature = "test-support"))]
pub use transport::MemoryTransport;
