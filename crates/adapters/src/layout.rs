// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote working directory layout.
//!
//! ```text
//! <root>/<fingerprint>/bundle.pkg
//! <root>/<fingerprint>/env/          virtualenv, when packages are declared
//! <root>/<job_id>/script
//! <root>/<job_id>/args.json
//! <root>/<job_id>/job.log
//! <root>/<job_id>/exit_code
//! <root>/<job_id>/result.out | error.out
//! ```

use ferry_core::{BundleId, JobId};

pub const BUNDLE_FILE: &str = "bundle.pkg";
pub const ENV_DIR: &str = "env";
pub const SCRIPT_FILE: &str = "script";
pub const ARGS_FILE: &str = "args.json";
pub const LOG_FILE: &str = "job.log";
/// Output file the batch scheduler itself writes (usually empty)
pub const SCHEDULER_LOG_FILE: &str = "scheduler.log";
pub const EXIT_CODE_FILE: &str = "exit_code";
pub const RESULT_FILE: &str = "result.out";
pub const ERROR_FILE: &str = "error.out";
/// Marker written by a direct-shell cancel
pub const CANCELLED_FILE: &str = "cancelled";

/// Paths under one remote working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    root: String,
}

impl RemoteLayout {
    pub fn new(root: &str) -> Self {
        let trimmed = root.trim_end_matches('/');
        Self { root: if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() } }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    fn join(&self, rest: &str) -> String {
        if self.root == "/" {
            format!("/{}", rest)
        } else {
            format!("{}/{}", self.root, rest)
        }
    }

    pub fn bundle_dir(&self, bundle: &BundleId) -> String {
        self.join(bundle.as_str())
    }

    pub fn bundle_path(&self, bundle: &BundleId) -> String {
        format!("{}/{}", self.bundle_dir(bundle), BUNDLE_FILE)
    }

    pub fn env_dir(&self, bundle: &BundleId) -> String {
        format!("{}/{}", self.bundle_dir(bundle), ENV_DIR)
    }

    pub fn job_dir(&self, job: &JobId) -> String {
        self.join(job.as_str())
    }
}

/// A file inside an already resolved job directory.
pub fn in_dir(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
