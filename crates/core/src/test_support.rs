// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{BackendKind, BundleId, ClusterConfig, JobSpec, PollPolicy, RetryPolicy};
use std::time::Duration;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::status::{BackendStatus, FailReason};
    use proptest::prelude::*;

    pub fn arb_backend_status() -> impl Strategy<Value = BackendStatus> {
        prop_oneof![
            Just(BackendStatus::Queued),
            Just(BackendStatus::Running),
            Just(BackendStatus::Completed),
            "[A-Z_]{1,12}".prop_map(BackendStatus::failed),
            Just(BackendStatus::Failed(FailReason::LostJob)),
            Just(BackendStatus::Cancelled),
            Just(BackendStatus::Unknown),
        ]
    }

    /// One step of a job's observed life: a poll result or a cancel request.
    #[derive(Debug, Clone)]
    pub enum Step {
        Poll(BackendStatus),
        Cancel,
    }

    pub fn arb_step() -> impl Strategy<Value = Step> {
        prop_oneof![
            8 => arb_backend_status().prop_map(Step::Poll),
            1 => Just(Step::Cancel),
        ]
    }
}

// ── Config and spec builders ────────────────────────────────────────────

/// A shell-backend config on the local host with fast polling.
pub fn test_config(working_directory: &str) -> ClusterConfig {
    ClusterConfig::new(BackendKind::Shell, crate::config::LOCAL_HOST, working_directory)
        .poll(PollPolicy {
            interval: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(8),
            floor: Duration::from_secs(1),
            max_consecutive_unknown: 5,
        })
        .retry(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        })
}

pub fn test_bundle_id() -> BundleId {
    BundleId::from_hex("ab".repeat(32))
}

pub fn test_spec(entry: &str) -> JobSpec {
    JobSpec::new(&test_config("/work"), test_bundle_id(), entry)
}
