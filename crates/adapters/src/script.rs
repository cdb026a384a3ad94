// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generated submission scripts.
//!
//! Every backend runs the same POSIX shell body; only the directive header
//! differs. The body appends all output to `job.log`, unpacks the bundle,
//! prepares the interpreter (a shared virtualenv when packages are declared),
//! runs `entry.py`, and records `exit_code`. If anything fails before the
//! entry point could report, `fail` writes a plain-text `error.out` with the
//! tail of the log.

use crate::layout;
use std::fmt::Write as _;
use std::time::Duration;

/// Lines of `job.log` copied into a fallback `error.out`.
const LOG_TAIL_LINES: u32 = 50;

/// Seconds a job waits for another job to finish building the shared
/// virtualenv before giving up.
const ENV_WAIT_SECS: u32 = 900;

/// Exit status `timeout(1)` uses when the limit is hit.
const TIMEOUT_STATUS: i32 = 124;

/// Quote `s` for POSIX `sh`.
pub fn sh_escape(s: &str) -> String {
    if !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || "-_./=:@%+,".contains(c))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Inputs for one submission script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptParams {
    /// Backend directive lines, emitted right after the shebang
    pub directives: Vec<String>,
    pub job_dir: String,
    pub bundle_path: String,
    /// Shared virtualenv; `None` when no packages are declared
    pub env_dir: Option<String>,
    /// Interpreter command (`python3`, `python3.11`)
    pub interpreter: String,
    /// Enforced in the script itself (backends without a scheduler limit)
    pub time_limit: Option<Duration>,
}

impl ScriptParams {
    pub fn new(job_dir: impl Into<String>, bundle_path: impl Into<String>) -> Self {
        Self {
            directives: Vec::new(),
            job_dir: job_dir.into(),
            bundle_path: bundle_path.into(),
            env_dir: None,
            interpreter: "python3".to_string(),
            time_limit: None,
        }
    }

    ferry_core::setters! {
        into {
            interpreter: String,
        }
        set {
            directives: Vec<String>,
        }
        option {
            env_dir: String,
            time_limit: Duration,
        }
    }

    pub fn render(&self) -> String {
        let mut s = String::from("#!/bin/sh\n");
        for line in &self.directives {
            s.push_str(line);
            s.push('\n');
        }
        s.push_str("# Generated by ferry. Do not edit.\n\n");

        let _ = writeln!(s, "JOB_DIR={}", sh_escape(&self.job_dir));
        let _ = writeln!(s, "BUNDLE={}", sh_escape(&self.bundle_path));
        let _ = writeln!(s, "PYTHON={}", sh_escape(&self.interpreter));
        let _ = writeln!(s, "RESULT=\"$JOB_DIR/{}\"", layout::RESULT_FILE);
        let _ = writeln!(s, "ERROR=\"$JOB_DIR/{}\"", layout::ERROR_FILE);
        let _ = writeln!(s, "LOG=\"$JOB_DIR/{}\"", layout::LOG_FILE);
        let _ = writeln!(s, "EXIT_CODE=\"$JOB_DIR/{}\"", layout::EXIT_CODE_FILE);
        s.push('\n');

        let _ = write!(
            s,
            r#"fail() {{
    status=$1
    shift
    if [ ! -e "$RESULT" ] && [ ! -e "$ERROR" ]; then
        {{
            printf '%s\n' "$*"
            echo '--- job.log ---'
            tail -n {tail} "$LOG" 2>/dev/null
        }} > "$ERROR.tmp" && mv -f "$ERROR.tmp" "$ERROR"
    fi
    echo "$status" > "$EXIT_CODE"
    exit "$status"
}}

mkdir -p "$JOB_DIR" || exit 1
cd "$JOB_DIR" || exit 1
exec >> "$LOG" 2>&1

command -v "$PYTHON" >/dev/null 2>&1 || fail 127 "interpreter not found: $PYTHON"

mkdir -p "$JOB_DIR/src" && tar -xf "$BUNDLE" -C "$JOB_DIR/src" || fail 1 "failed to unpack bundle $BUNDLE"
"#,
            tail = LOG_TAIL_LINES
        );

        if let Some(env_dir) = &self.env_dir {
            let _ = writeln!(s, "\nENV_DIR={}", sh_escape(env_dir));
            let _ = write!(
                s,
                r#"if [ ! -f "$ENV_DIR/.ready" ]; then
    if mkdir "$ENV_DIR.lock" 2>/dev/null; then
        "$PYTHON" -m venv "$ENV_DIR" \
            && "$ENV_DIR/bin/python" -m pip install --quiet -r "$JOB_DIR/src/requirements.txt" \
            && touch "$ENV_DIR/.ready"
        rmdir "$ENV_DIR.lock"
    else
        waited=0
        while [ ! -f "$ENV_DIR/.ready" ] && [ -d "$ENV_DIR.lock" ] && [ "$waited" -lt {wait} ]; do
            sleep 2
            waited=$((waited + 2))
        done
    fi
    [ -f "$ENV_DIR/.ready" ] || fail 1 "environment setup failed in $ENV_DIR"
fi
PYTHON="$ENV_DIR/bin/python"
"#,
                wait = ENV_WAIT_SECS
            );
        }

        s.push_str("\nLIMIT=\n");
        if let Some(limit) = self.time_limit {
            let secs = limit.as_secs() + u64::from(limit.subsec_nanos() > 0);
            let _ = writeln!(
                s,
                "if command -v timeout >/dev/null 2>&1; then LIMIT=\"timeout {}\"; fi",
                secs.max(1)
            );
        }

        let _ = write!(
            s,
            r#"child=
trap 'if [ -n "$child" ]; then kill -TERM "$child" 2>/dev/null; fi; fail 143 "terminated by signal"' TERM INT
$LIMIT "$PYTHON" "$JOB_DIR/src/entry.py" "$JOB_DIR" &
child=$!
wait "$child"
status=$?
"#
        );

        if let Some(limit) = self.time_limit {
            let _ = writeln!(
                s,
                "[ -n \"$LIMIT\" ] && [ \"$status\" -eq {} ] && fail {} \"time limit of {} exceeded\"",
                TIMEOUT_STATUS,
                TIMEOUT_STATUS,
                ferry_core::format_duration(limit)
            );
        }

        s.push_str(
            r#"echo "$status" > "$EXIT_CODE"
if [ "$status" -ne 0 ]; then
    fail "$status" "entry point exited with status $status"
fi
exit 0
"#,
        );
        s
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
