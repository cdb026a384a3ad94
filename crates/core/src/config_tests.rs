// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::resources::MemorySize;
use serial_test::serial;

const TOML: &str = r#"
backend = "batch"
host = "login.hpc.example.org"
user = "alice"
working_directory = "/scratch/alice/ferry"

[default_resources]
cores = 4
memory = "8G"
time_limit = "2h"

[backend_directives]
dialect = "slurm"
partition = "short"

[poll]
interval = "10s"
backoff_cap = "5m"
"#;

const HCL: &str = r#"
backend = "shell"
host = "local"
working_directory = "/tmp/ferry"

default_resources = {
  cores = 2
  memory = "512M"
  time_limit = "30m"
}

retry = {
  max_attempts = 5
}
"#;

#[test]
fn parses_toml() {
    let config = ClusterConfig::parse(TOML, ConfigFormat::Toml).unwrap();
    assert_eq!(config.backend, BackendKind::Batch);
    assert_eq!(config.user.as_deref(), Some("alice"));
    assert_eq!(config.default_resources.cores, 4);
    assert_eq!(config.default_resources.memory, MemorySize::from_gib(8));
    assert_eq!(config.get_directive("partition"), Some("short"));
    assert_eq!(config.poll.interval, Duration::from_secs(10));
    assert_eq!(config.poll.backoff_cap, Duration::from_secs(300));
    // Unspecified poll fields keep their defaults
    assert_eq!(config.poll.floor, Duration::from_secs(1));
    assert_eq!(config.retry, RetryPolicy::default());
}

#[test]
fn parses_hcl() {
    let config = ClusterConfig::parse(HCL, ConfigFormat::Hcl).unwrap();
    assert_eq!(config.backend, BackendKind::Shell);
    assert!(config.is_local());
    assert_eq!(config.default_resources.time_limit, Duration::from_secs(1800));
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.base_delay, Duration::from_secs(1));
}

#[yare::parameterized(
    batch_queue  = { "batch_queue", BackendKind::Batch },
    slurm        = { "slurm", BackendKind::Batch },
    direct_shell = { "direct_shell", BackendKind::Shell },
    kubernetes   = { "kubernetes", BackendKind::Orchestrator },
)]
fn backend_aliases(name: &str, expected: BackendKind) {
    let content = format!("backend = \"{}\"\nhost = \"h\"\nworking_directory = \"/w\"\n", name);
    let config = ClusterConfig::parse(&content, ConfigFormat::Toml).unwrap();
    assert_eq!(config.backend, expected);
}

#[yare::parameterized(
    relative_dir = { "backend = \"shell\"\nhost = \"h\"\nworking_directory = \"work\"\n" },
    empty_host   = { "backend = \"shell\"\nhost = \"\"\nworking_directory = \"/w\"\n" },
    zero_retries = { "backend = \"shell\"\nhost = \"h\"\nworking_directory = \"/w\"\n[retry]\nmax_attempts = 0\n" },
    zero_cores   = { "backend = \"shell\"\nhost = \"h\"\nworking_directory = \"/w\"\n[default_resources]\ncores = 0\nmemory = \"1G\"\ntime_limit = \"1h\"\n" },
    zero_command_timeout = { "backend = \"shell\"\nhost = \"h\"\nworking_directory = \"/w\"\n[transport]\ncommand_timeout = \"0s\"\n" },
)]
fn rejects_invalid(content: &str) {
    let err = ClusterConfig::parse(content, ConfigFormat::Toml).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "got {err:?}");
}

#[test]
fn unknown_backend_is_parse_error() {
    let err = ClusterConfig::parse(
        "backend = \"cloud\"\nhost = \"h\"\nworking_directory = \"/w\"\n",
        ConfigFormat::Toml,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Parse { format: ConfigFormat::Toml, .. }));
}

#[test]
fn format_from_extension() {
    assert_eq!(ConfigFormat::from_path(Path::new("c.hcl")), ConfigFormat::Hcl);
    assert_eq!(ConfigFormat::from_path(Path::new("c.toml")), ConfigFormat::Toml);
    assert_eq!(ConfigFormat::from_path(Path::new("cluster")), ConfigFormat::Toml);
}

#[test]
#[serial]
fn load_reads_file_and_reports_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cluster.hcl");
    std::fs::write(&path, HCL).unwrap();
    let config = ClusterConfig::load(&path).unwrap();
    assert_eq!(config.working_directory, "/tmp/ferry");

    let err = ClusterConfig::load(&dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn poll_interval_doubles_up_to_cap() {
    let poll = PollPolicy {
        interval: Duration::from_secs(5),
        backoff_cap: Duration::from_secs(60),
        floor: Duration::from_secs(1),
        max_consecutive_unknown: 10,
    };
    assert_eq!(poll.interval_after(0), Duration::from_secs(5));
    assert_eq!(poll.interval_after(1), Duration::from_secs(10));
    assert_eq!(poll.interval_after(3), Duration::from_secs(40));
    assert_eq!(poll.interval_after(4), Duration::from_secs(60));
    assert_eq!(poll.interval_after(u32::MAX), Duration::from_secs(60));
}

#[test]
fn poll_interval_respects_floor() {
    let poll = PollPolicy {
        interval: Duration::from_millis(10),
        floor: Duration::from_secs(2),
        ..PollPolicy::default()
    };
    assert_eq!(poll.interval_after(0), Duration::from_secs(2));
}

#[test]
fn retry_delay_is_bounded_exponential() {
    let retry = RetryPolicy::default();
    assert_eq!(retry.delay_for(1), Duration::from_secs(1));
    assert_eq!(retry.delay_for(2), Duration::from_secs(2));
    assert_eq!(retry.delay_for(3), Duration::from_secs(4));
    assert_eq!(retry.delay_for(10), Duration::from_secs(30));
}

#[test]
fn serializes_back_to_toml() {
    let config = ClusterConfig::new(BackendKind::Orchestrator, "cluster", "/mnt/shared")
        .user("ci")
        .directive("namespace", "batch");
    let text = toml::to_string(&config).unwrap();
    let parsed = ClusterConfig::parse(&text, ConfigFormat::Toml).unwrap();
    assert_eq!(parsed, config);
}
