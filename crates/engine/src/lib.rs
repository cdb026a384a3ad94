// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ferry-engine: job lifecycle management
//!
//! [`JobManager::submit_async`] spawns one worker task per job. The worker
//! stages the bundle and arguments, submits through the backend's
//! [`SchedulerAdapter`](ferry_adapters::SchedulerAdapter), polls until a
//! terminal status, and decodes the artifacts with [`result_channel`].
//! Callers watch and cancel through the returned [`JobFuture`].

mod client;
mod future;
mod manager;
pub mod result_channel;
mod worker;

pub use client::{DispatchError, Ferry, Prepared};
pub use future::{JobFuture, JobSnapshot, WaitError};
pub use manager::{JobManager, JobRequest};
