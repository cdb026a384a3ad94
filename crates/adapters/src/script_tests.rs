// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;
use std::process::Command;

#[yare::parameterized(
    plain      = { "/work/job-1", "/work/job-1" },
    empty      = { "", "''" },
    space      = { "/my work", "'/my work'" },
    quote      = { "it's", "'it'\\''s'" },
    dollar     = { "$HOME", "'$HOME'" },
    semicolon  = { "a;rm -rf /", "'a;rm -rf /'" },
)]
fn escapes_for_sh(input: &str, expected: &str) {
    assert_eq!(sh_escape(input), expected);
}

#[test]
fn directives_follow_shebang() {
    let script = ScriptParams::new("/w/job-1", "/w/abc/bundle.pkg")
        .directives(vec!["#SBATCH --job-name=x".to_string(), "#SBATCH --cpus-per-task=2".to_string()])
        .render();
    let lines: Vec<_> = script.lines().take(3).collect();
    assert_eq!(lines, ["#!/bin/sh", "#SBATCH --job-name=x", "#SBATCH --cpus-per-task=2"]);
}

#[test]
fn virtualenv_only_when_packages_declared() {
    let bare = ScriptParams::new("/w/j", "/w/b/bundle.pkg").render();
    assert!(!bare.contains("venv"));

    let with_env = ScriptParams::new("/w/j", "/w/b/bundle.pkg").env_dir("/w/b/env").render();
    assert!(with_env.contains("ENV_DIR=/w/b/env"));
    assert!(with_env.contains("-m venv"));
    assert!(with_env.contains("pip install --quiet -r \"$JOB_DIR/src/requirements.txt\""));
}

#[test]
fn time_limit_uses_timeout_when_set() {
    let script = ScriptParams::new("/w/j", "/w/b/bundle.pkg").time_limit(Duration::from_secs(90)).render();
    assert!(script.contains("LIMIT=\"timeout 90\""));
    assert!(script.contains("time limit of 1m30s exceeded"));
    assert!(!ScriptParams::new("/w/j", "/w/b/bundle.pkg").render().contains("timeout"));
}

// ── Executing rendered scripts ──────────────────────────────────────────
//
// The interpreter is set to `sh`, so `entry.py` is a shell script standing
// in for the generated Python entry point.

struct Sandbox {
    _dir: tempfile::TempDir,
    job_dir: String,
    bundle: String,
}

fn sandbox(entry_body: &str) -> Sandbox {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("staging");
    std::fs::create_dir_all(&staging).unwrap();
    std::fs::write(staging.join("entry.py"), entry_body).unwrap();
    let bundle = dir.path().join("bundle.pkg");
    let status = Command::new("tar")
        .arg("-cf")
        .arg(&bundle)
        .arg("-C")
        .arg(&staging)
        .arg("entry.py")
        .status()
        .unwrap();
    assert!(status.success());
    Sandbox {
        job_dir: dir.path().join("job-1").display().to_string(),
        bundle: bundle.display().to_string(),
        _dir: dir,
    }
}

fn run(params: &ScriptParams) -> i32 {
    let path = Path::new(&params.job_dir).with_extension("sh");
    std::fs::write(&path, params.render()).unwrap();
    Command::new("sh").arg(&path).status().unwrap().code().unwrap_or(-1)
}

fn read(job_dir: &str, name: &str) -> Option<String> {
    std::fs::read_to_string(Path::new(job_dir).join(name)).ok()
}

#[test]
fn successful_run_writes_result_and_exit_code() {
    let sb = sandbox("echo working\nprintf '{\"value\": 42}' > \"$1/result.out\"\n");
    let params = ScriptParams::new(&sb.job_dir, &sb.bundle).interpreter("sh");
    assert_eq!(run(&params), 0);
    assert_eq!(read(&sb.job_dir, "result.out").unwrap(), "{\"value\": 42}");
    assert_eq!(read(&sb.job_dir, "exit_code").unwrap().trim(), "0");
    assert!(read(&sb.job_dir, "error.out").is_none());
    assert!(read(&sb.job_dir, "job.log").unwrap().contains("working"));
}

#[test]
fn missing_interpreter_reports_through_error_file() {
    let sb = sandbox("exit 0\n");
    let params = ScriptParams::new(&sb.job_dir, &sb.bundle).interpreter("ferry-no-such-python");
    assert_eq!(run(&params), 127);
    let error = read(&sb.job_dir, "error.out").unwrap();
    assert!(error.starts_with("interpreter not found: ferry-no-such-python"));
    assert_eq!(read(&sb.job_dir, "exit_code").unwrap().trim(), "127");
    assert!(read(&sb.job_dir, "result.out").is_none());
}

#[test]
fn silent_crash_includes_log_tail() {
    let sb = sandbox("echo 'segfault-ish noise'\nexit 3\n");
    let params = ScriptParams::new(&sb.job_dir, &sb.bundle).interpreter("sh");
    assert_eq!(run(&params), 3);
    let error = read(&sb.job_dir, "error.out").unwrap();
    assert!(error.contains("entry point exited with status 3"));
    assert!(error.contains("segfault-ish noise"));
    assert_eq!(read(&sb.job_dir, "exit_code").unwrap().trim(), "3");
}

#[test]
fn entry_error_file_is_not_overwritten() {
    let sb = sandbox("printf '{\"kind\":\"ValueError\",\"message\":\"bad\"}' > \"$1/error.out\"\nexit 1\n");
    let params = ScriptParams::new(&sb.job_dir, &sb.bundle).interpreter("sh");
    assert_eq!(run(&params), 1);
    assert_eq!(
        read(&sb.job_dir, "error.out").unwrap(),
        "{\"kind\":\"ValueError\",\"message\":\"bad\"}"
    );
}

#[test]
fn unreadable_bundle_fails_before_entry() {
    let sb = sandbox("exit 0\n");
    let params = ScriptParams::new(&sb.job_dir, format!("{}.missing", sb.bundle)).interpreter("sh");
    assert_eq!(run(&params), 1);
    assert!(read(&sb.job_dir, "error.out").unwrap().starts_with("failed to unpack bundle"));
}

#[test]
fn time_limit_is_enforced() {
    if Command::new("sh").arg("-c").arg("command -v timeout").status().map(|s| !s.success()).unwrap_or(true) {
        return;
    }
    let sb = sandbox("sleep 30\n");
    let params =
        ScriptParams::new(&sb.job_dir, &sb.bundle).interpreter("sh").time_limit(Duration::from_secs(1));
    assert_eq!(run(&params), 124);
    assert!(read(&sb.job_dir, "error.out").unwrap().contains("time limit of 1s exceeded"));
}
