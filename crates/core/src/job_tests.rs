// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::strategies::*;
use crate::test_support::test_spec;
use crate::FakeClock;
use proptest::prelude::*;

fn queued_job(clock: &FakeClock) -> Job {
    let mut job = Job::new(JobId::new(), test_spec("main"), clock);
    job.begin_submit(clock);
    job.submitted("4242", clock);
    job
}

fn replay(statuses: &[BackendStatus]) -> Vec<JobState> {
    let clock = FakeClock::new();
    let mut job = queued_job(&clock);
    for status in statuses {
        job.observe(status, &clock);
    }
    job.history.iter().map(|t| t.to).collect()
}

#[test]
fn new_job_is_created_with_remote_dir() {
    let clock = FakeClock::new();
    let job = Job::new(JobId::new(), test_spec("main"), &clock);
    assert_eq!(job.state, JobState::Created);
    assert_eq!(job.remote_work_dir, format!("/work/{}", job.id));
    assert_eq!(job.created_at_ms, 1_000_000);
    assert!(job.history.is_empty());
}

#[test]
fn submit_records_backend_id_and_time() {
    let clock = FakeClock::new();
    let mut job = Job::new(JobId::new(), test_spec("main"), &clock);
    assert!(job.begin_submit(&clock).is_some());
    clock.advance(std::time::Duration::from_secs(2));
    let t = job.submitted("4242", &clock).unwrap();
    assert_eq!((t.from, t.to), (JobState::Submitting, JobState::Queued));
    assert_eq!(job.backend_id.as_deref(), Some("4242"));
    assert_eq!(job.submitted_at_ms, Some(1_002_000));
}

#[test]
fn submitted_requires_submitting() {
    let clock = FakeClock::new();
    let mut job = Job::new(JobId::new(), test_spec("main"), &clock);
    assert!(job.submitted("1", &clock).is_none());
    assert_eq!(job.state, JobState::Created);
}

#[test]
fn submission_failure_skips_queue() {
    let clock = FakeClock::new();
    let mut job = Job::new(JobId::new(), test_spec("main"), &clock);
    job.begin_submit(&clock);
    job.submission_failed(&clock);
    assert_eq!(job.state, JobState::Failed);
    assert!(job.submitted_at_ms.is_none());
}

#[yare::parameterized(
    running   = { BackendStatus::Running, JobState::Running },
    completed = { BackendStatus::Completed, JobState::Completed },
    remote    = { BackendStatus::failed("OUT_OF_MEMORY"), JobState::Failed },
    lost      = { BackendStatus::Failed(FailReason::LostJob), JobState::LostJob },
    cancelled = { BackendStatus::Cancelled, JobState::Cancelled },
)]
fn observe_maps_status(status: BackendStatus, expected: JobState) {
    let clock = FakeClock::new();
    let mut job = queued_job(&clock);
    job.observe(&status, &clock);
    assert_eq!(job.state, expected);
    assert_eq!(job.last_polled_at_ms, Some(clock.epoch_ms()));
}

#[test]
fn unknown_and_queued_keep_state() {
    let clock = FakeClock::new();
    let mut job = queued_job(&clock);
    assert!(job.observe(&BackendStatus::Unknown, &clock).is_none());
    assert!(job.observe(&BackendStatus::Queued, &clock).is_none());
    assert_eq!(job.state, JobState::Queued);
}

#[test]
fn queued_after_running_is_ignored() {
    let clock = FakeClock::new();
    let mut job = queued_job(&clock);
    job.observe(&BackendStatus::Running, &clock);
    job.observe(&BackendStatus::Queued, &clock);
    assert_eq!(job.state, JobState::Running);
}

#[test]
fn unknown_polls_do_not_change_history() {
    let with_unknown = replay(&[
        BackendStatus::Queued,
        BackendStatus::Unknown,
        BackendStatus::Unknown,
        BackendStatus::Running,
        BackendStatus::Completed,
    ]);
    let without =
        replay(&[BackendStatus::Queued, BackendStatus::Running, BackendStatus::Completed]);
    assert_eq!(with_unknown, without);
    assert_eq!(without.last(), Some(&JobState::Completed));
}

#[test]
fn polls_ignored_before_submission() {
    let clock = FakeClock::new();
    let mut job = Job::new(JobId::new(), test_spec("main"), &clock);
    assert!(job.observe(&BackendStatus::Completed, &clock).is_none());
    assert_eq!(job.state, JobState::Created);
    assert!(job.last_polled_at_ms.is_none());
}

#[test]
fn terminal_state_is_final() {
    let clock = FakeClock::new();
    let mut job = queued_job(&clock);
    job.observe(&BackendStatus::Completed, &clock);
    assert!(job.observe(&BackendStatus::failed("X"), &clock).is_none());
    assert!(job.cancel(&clock).is_none());
    assert!(job.settle(JobState::LostJob, &clock).is_none());
    assert_eq!(job.state, JobState::Completed);
}

#[test]
fn cancel_from_created() {
    let clock = FakeClock::new();
    let mut job = Job::new(JobId::new(), test_spec("main"), &clock);
    let t = job.cancel(&clock).unwrap();
    assert_eq!((t.from, t.to), (JobState::Created, JobState::Cancelled));
}

#[test]
fn cancel_is_idempotent() {
    let clock = FakeClock::new();
    let mut job = queued_job(&clock);
    assert!(job.cancel(&clock).is_some());
    assert!(job.cancel(&clock).is_none());
    assert_eq!(job.state, JobState::Cancelled);
}

#[test]
fn settle_rejects_non_terminal_target() {
    let clock = FakeClock::new();
    let mut job = queued_job(&clock);
    assert!(job.settle(JobState::Running, &clock).is_none());
    assert!(job.settle(JobState::Failed, &clock).is_some());
}

#[test]
fn lost_state_displays_as_lost() {
    assert_eq!(JobState::LostJob.to_string(), "lost");
    assert!(JobState::LostJob.is_terminal());
    assert!(!JobState::Submitting.is_pollable());
}

proptest! {
    #[test]
    fn state_never_moves_backwards(steps in proptest::collection::vec(arb_step(), 0..40)) {
        let clock = FakeClock::new();
        let mut job = queued_job(&clock);
        let mut rank = job.state.rank();
        let mut terminal_at: Option<JobState> = None;
        for step in steps {
            match step {
                Step::Poll(status) => { job.observe(&status, &clock); }
                Step::Cancel => { job.cancel(&clock); }
            }
            prop_assert!(job.state.rank() >= rank);
            rank = job.state.rank();
            if let Some(terminal) = terminal_at {
                prop_assert_eq!(job.state, terminal);
            } else if job.is_terminal() {
                terminal_at = Some(job.state);
            }
        }
        for pair in job.history.windows(2) {
            prop_assert_eq!(pair[0].to, pair[1].from);
        }
    }
}
