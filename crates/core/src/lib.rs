// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ferry-core: shared data model for the Ferry remote dispatch engine
//!
//! Everything here is plain data plus the job state machine. No I/O other
//! than reading configuration files.

pub mod macros;

pub mod clock;
pub mod config;
pub mod env;
pub mod id;
pub mod job;
pub mod resources;
pub mod result;
pub mod status;
pub mod time_fmt;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    BackendKind, ClusterConfig, ConfigError, ConfigFormat, PollPolicy, RetryPolicy,
    TransportSettings,
};
pub use id::{short, BundleId, JobId};
pub use job::{Job, JobSpec, JobState, Transition};
pub use resources::{MemorySize, ResourceRequest};
pub use result::{ErrorKind, JobError, JobResult, Outcome, SubmissionErrorKind};
pub use status::{BackendStatus, FailReason};
pub use time_fmt::{format_duration, parse_duration};
