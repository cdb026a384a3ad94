// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::transport::{MemoryTransport, TransportError};
use ferry_core::test_support::test_bundle_id;
use ferry_core::{JobId, JobSpec, MemorySize, SubmissionErrorKind};
use std::time::Duration;

fn config() -> ClusterConfig {
    ClusterConfig::new(BackendKind::Batch, "login", "/work")
}

fn adapter(config: &ClusterConfig) -> (BatchQueueAdapter, MemoryTransport) {
    let transport = MemoryTransport::new();
    let adapter = BatchQueueAdapter::new(config, Arc::new(transport.clone())).unwrap();
    (adapter, transport)
}

fn request(config: &ClusterConfig) -> SubmitRequest {
    let spec = JobSpec::new(config, test_bundle_id(), "area").resource_request(
        ResourceRequest::new(4, MemorySize::from_gib(8), Duration::from_secs(90 * 60)),
    );
    SubmitRequest::new(JobId::from_string("job-abcdefgh1234"), spec)
}

fn handle(backend_id: &str) -> JobHandle {
    JobHandle {
        backend_id: backend_id.to_string(),
        job_id: JobId::from_string("job-abcdefgh1234"),
        job_dir: "/work/job-abcdefgh1234".to_string(),
    }
}

#[test]
fn slurm_directives() {
    let config = config().directive("partition", "short").directive("account", "proj42");
    let (adapter, _) = adapter(&config);
    assert_eq!(
        adapter.directives(&request(&config)),
        [
            "#SBATCH --job-name=ferry-abcdefgh",
            "#SBATCH --output=/work/job-abcdefgh1234/scheduler.log",
            "#SBATCH --chdir=/work/job-abcdefgh1234",
            "#SBATCH --ntasks=1",
            "#SBATCH --cpus-per-task=4",
            "#SBATCH --mem=8192M",
            "#SBATCH --time=01:30:00",
            "#SBATCH --partition=short",
            "#SBATCH --account=proj42",
        ]
    );
}

#[test]
fn pbs_directives() {
    let config = config().directive("dialect", "pbs").directive("queue", "workq");
    let (adapter, _) = adapter(&config);
    assert_eq!(adapter.dialect(), Dialect::Pbs);
    assert_eq!(
        adapter.directives(&request(&config)),
        [
            "#PBS -N ferry-abcdefgh",
            "#PBS -o /work/job-abcdefgh1234/scheduler.log",
            "#PBS -j oe",
            "#PBS -l select=1:ncpus=4:mem=8192mb",
            "#PBS -l walltime=01:30:00",
            "#PBS -q workq",
        ]
    );
}

#[test]
fn rendered_script_starts_with_directives() {
    let config = config();
    let (adapter, _) = adapter(&config);
    let script = adapter.render_script(&request(&config));
    assert!(script.starts_with("#!/bin/sh\n#SBATCH --job-name=ferry-abcdefgh\n"));
    assert!(script.contains("BUNDLE=/work/"));
}

#[yare::parameterized(
    dialect     = { "dialect", "lsf" },
    empty_queue = { "empty_queue", "sometimes" },
    grace       = { "empty_queue_grace", "-1" },
    accounting  = { "accounting", "maybe" },
    max_cores   = { "max_cores", "many" },
)]
fn rejects_bad_directives(key: &str, value: &str) {
    let config = config().directive(key, value);
    let result = BatchQueueAdapter::new(&config, Arc::new(MemoryTransport::new()));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[tokio::test]
async fn submit_uploads_script_and_parses_id() {
    let config = config();
    let (adapter, transport) = adapter(&config);
    transport.respond("sbatch", CommandOutput::ok("4242;cluster\n"));

    let handle = adapter.submit(&request(&config)).await.unwrap();
    assert_eq!(handle.backend_id, "4242");
    assert_eq!(handle.job_dir, "/work/job-abcdefgh1234");

    let script = transport.file_text("/work/job-abcdefgh1234/script").unwrap();
    assert!(script.contains("#SBATCH --cpus-per-task=4"));
    assert_eq!(
        transport.commands_matching("sbatch"),
        ["sbatch --parsable /work/job-abcdefgh1234/script"]
    );
}

#[tokio::test]
async fn qsub_id_is_kept_whole() {
    let config = config().directive("dialect", "pbs");
    let (adapter, transport) = adapter(&config);
    transport.respond("qsub", CommandOutput::ok("1234.pbs-server\n"));
    assert_eq!(adapter.submit(&request(&config)).await.unwrap().backend_id, "1234.pbs-server");
}

#[yare::parameterized(
    qos        = { "sbatch: error: QOSMaxCpuPerUserLimit", SubmissionErrorKind::QuotaExceeded },
    assoc      = { "sbatch: error: AssocGrpSubmitJobsLimit", SubmissionErrorKind::QuotaExceeded },
    contact    = { "sbatch: error: Unable to contact slurm controller", SubmissionErrorKind::TransientNetwork },
    partition  = { "sbatch: error: invalid partition specified: nope", SubmissionErrorKind::InvalidResourceRequest },
)]
fn classifies_rejections(stderr: &str, kind: SubmissionErrorKind) {
    assert_eq!(classify_submit_failure(stderr).kind, kind);
}

#[tokio::test]
async fn rejected_submission_is_classified() {
    let config = config();
    let (adapter, transport) = adapter(&config);
    transport.respond("sbatch", CommandOutput::failed(1, "sbatch: error: QOSMaxCpuPerUserLimit"));
    let err = adapter.submit(&request(&config)).await.unwrap_err();
    assert_eq!(err.kind, SubmissionErrorKind::QuotaExceeded);
}

#[tokio::test]
async fn limits_are_checked_before_io() {
    let config = config().directive("max_cores", "2");
    let (adapter, transport) = adapter(&config);
    let err = adapter.submit(&request(&config)).await.unwrap_err();
    assert_eq!(err.kind, SubmissionErrorKind::QuotaExceeded);
    assert!(transport.commands().is_empty());
    assert!(transport.uploads().is_empty());
}

#[tokio::test]
async fn unreachable_login_node_is_transient() {
    let config = config();
    let (adapter, transport) = adapter(&config);
    transport.fail_next_file_op(TransportError::Connect {
        target: "login".into(),
        message: "Connection refused".into(),
    });
    let err = adapter.submit(&request(&config)).await.unwrap_err();
    assert_eq!(err.kind, SubmissionErrorKind::TransientNetwork);
    assert!(err.is_retryable());
}

#[yare::parameterized(
    pending      = { "PENDING", BackendStatus::Queued },
    configuring  = { "CONFIGURING", BackendStatus::Queued },
    running      = { "RUNNING", BackendStatus::Running },
    completing   = { "COMPLETING", BackendStatus::Running },
    completed    = { "COMPLETED", BackendStatus::Completed },
    cancelled_by = { "CANCELLED by 1000", BackendStatus::Cancelled },
    timeout      = { "TIMEOUT", BackendStatus::failed("TIMEOUT") },
    oom          = { "OUT_OF_MEMORY", BackendStatus::failed("OUT_OF_MEMORY") },
    node_fail    = { "NODE_FAIL", BackendStatus::failed("NODE_FAIL") },
    gibberish    = { "WHATEVER", BackendStatus::Unknown },
)]
fn maps_slurm_states(state: &str, expected: BackendStatus) {
    assert_eq!(slurm_status(state), expected);
}

#[yare::parameterized(
    queued    = { "    job_state = Q\n", Some(BackendStatus::Queued) },
    running   = { "    job_state = R\n", Some(BackendStatus::Running) },
    finished  = { "    job_state = F\n    Exit_status = 0\n", Some(BackendStatus::Completed) },
    failed    = { "    job_state = F\n    Exit_status = 2\n", Some(BackendStatus::failed("exit status 2")) },
    no_status = { "    job_state = F\n", None },
    empty     = { "", None },
)]
fn maps_pbs_states(output: &str, expected: Option<BackendStatus>) {
    assert_eq!(pbs_status(output), expected);
}

#[tokio::test]
async fn poll_reads_queue_state() {
    let config = config();
    let (adapter, transport) = adapter(&config);
    transport.respond("squeue", CommandOutput::ok("RUNNING\n"));
    assert_eq!(adapter.poll(&handle("7")).await, BackendStatus::Running);
    assert_eq!(transport.commands(), ["squeue -h -j 7 -o %T"]);
}

#[tokio::test]
async fn poll_unreachable_is_unknown() {
    let config = config();
    let (adapter, transport) = adapter(&config);
    transport.respond_once(
        "squeue",
        Err(TransportError::Timeout(Duration::from_secs(10))),
    );
    transport.respond("squeue", CommandOutput::failed(1, "slurm_load_jobs error: Socket timed out"));
    assert_eq!(adapter.poll(&handle("7")).await, BackendStatus::Unknown);
    assert_eq!(adapter.poll(&handle("7")).await, BackendStatus::Unknown);
}

#[tokio::test]
async fn empty_queue_grace_then_artifacts() {
    let config = config();
    let (adapter, transport) = adapter(&config);
    transport.respond("squeue", CommandOutput::failed(1, "slurm_load_jobs error: Invalid job id specified"));

    // First empty answer falls inside the default grace of one poll
    assert_eq!(adapter.poll(&handle("7")).await, BackendStatus::Unknown);

    transport.put_file("/work/job-abcdefgh1234/result.out", "{\"value\": 1}");
    assert_eq!(adapter.poll(&handle("7")).await, BackendStatus::Completed);
}

#[tokio::test]
async fn empty_queue_error_artifact_is_failure() {
    let config = config().directive("empty_queue_grace", "0");
    let (adapter, transport) = adapter(&config);
    transport.put_file("/work/job-abcdefgh1234/error.out", "boom");
    assert!(matches!(
        adapter.poll(&handle("7")).await,
        BackendStatus::Failed(FailReason::Remote(_))
    ));
}

#[yare::parameterized(
    lost      = { "lost", BackendStatus::Failed(FailReason::LostJob) },
    wait      = { "wait", BackendStatus::Unknown },
    completed = { "completed", BackendStatus::Completed },
)]
fn empty_queue_without_artifacts(policy: &str, expected: BackendStatus) {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    rt.block_on(async {
        let config = config().directive("empty_queue", policy).directive("empty_queue_grace", "0");
        let (adapter, _transport) = adapter(&config);
        assert_eq!(adapter.poll(&handle("7")).await, expected);
    });
}

#[tokio::test]
async fn grace_resets_once_job_is_seen() {
    let config = config();
    let (adapter, transport) = adapter(&config);
    transport.respond_once("squeue", Ok(CommandOutput::ok("")));
    transport.respond_once("squeue", Ok(CommandOutput::ok("RUNNING")));
    transport.respond_once("squeue", Ok(CommandOutput::ok("")));

    assert_eq!(adapter.poll(&handle("7")).await, BackendStatus::Unknown);
    assert_eq!(adapter.poll(&handle("7")).await, BackendStatus::Running);
    assert_eq!(adapter.poll(&handle("7")).await, BackendStatus::Unknown);
}

#[tokio::test]
async fn settled_jobs_leave_no_grace_counters() {
    let config = config();
    let (adapter, transport) = adapter(&config);
    transport.respond("squeue", CommandOutput::ok(""));

    for id in ["7", "8", "9"] {
        assert_eq!(adapter.poll(&handle(id)).await, BackendStatus::Unknown);
    }
    assert_eq!(adapter.empty_polls.lock().len(), 3);

    transport.put_file("/work/job-abcdefgh1234/result.out", "{\"value\": 1}");
    assert_eq!(adapter.poll(&handle("7")).await, BackendStatus::Completed);
    assert_eq!(adapter.poll(&handle("8")).await, BackendStatus::Completed);
    adapter.cancel(&handle("9")).await.unwrap();
    assert!(adapter.empty_polls.lock().is_empty());
}

#[tokio::test]
async fn accounting_resolves_purged_jobs() {
    let config = config().directive("accounting", "true").directive("empty_queue_grace", "0");
    let (adapter, transport) = adapter(&config);
    transport.respond("sacct", CommandOutput::ok("TIMEOUT\n"));
    assert_eq!(adapter.poll(&handle("7")).await, BackendStatus::failed("TIMEOUT"));
    assert_eq!(transport.commands_matching("sacct"), ["sacct -n -P -X -j 7 -o State"]);
}

#[tokio::test]
async fn accounting_non_terminal_falls_back_to_artifacts() {
    let config = config().directive("accounting", "true").directive("empty_queue_grace", "0");
    let (adapter, transport) = adapter(&config);
    transport.respond("sacct", CommandOutput::ok("RUNNING\n"));
    transport.put_file("/work/job-abcdefgh1234/result.out", "{\"value\": 1}");
    assert_eq!(adapter.poll(&handle("7")).await, BackendStatus::Completed);
}

#[tokio::test]
async fn cancel_unknown_job_is_not_found() {
    let config = config();
    let (adapter, transport) = adapter(&config);
    transport.respond("scancel", CommandOutput::failed(1, "scancel: error: Invalid job id 7"));
    assert_eq!(adapter.cancel(&handle("7")).await, Err(CancelError::NotFound("7".to_string())));
}

#[tokio::test]
async fn cancel_runs_qdel_for_pbs() {
    let config = config().directive("dialect", "pbs");
    let (adapter, transport) = adapter(&config);
    adapter.cancel(&handle("12.server")).await.unwrap();
    assert_eq!(transport.commands(), ["qdel 12.server"]);
}

#[tokio::test]
async fn fetches_artifacts_and_exit_code() {
    let config = config();
    let (adapter, transport) = adapter(&config);
    assert_eq!(adapter.fetch_result(&handle("7")).await, Err(FetchError::NotReady));
    assert_eq!(adapter.exit_code(&handle("7")).await, None);

    transport.put_file("/work/job-abcdefgh1234/result.out", "42");
    transport.put_file("/work/job-abcdefgh1234/exit_code", "0\n");
    assert_eq!(
        adapter.fetch_result(&handle("7")).await,
        Ok(ResultArtifact::Value(b"42".to_vec()))
    );
    assert_eq!(adapter.exit_code(&handle("7")).await, Some(0));
}
