// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `batch/v1` Job construction and status mapping.

use ferry_core::BackendStatus;
use k8s_openapi::api::batch::v1::{Job, JobSpec, JobStatus};
use k8s_openapi::api::core::v1::{
    Container, HostPathVolumeSource, PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec,
    ResourceRequirements, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Kubernetes object names: DNS-1123 labels, at most 63 characters.
const MAX_NAME_LEN: usize = 63;

const WORK_VOLUME: &str = "ferry-work";

/// Where the shared working directory comes from inside the pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum WorkVolume {
    /// A PersistentVolumeClaim also reachable through the transport
    Claim(String),
    /// The node's own filesystem (single-node clusters)
    HostPath,
}

/// Parameters for building one Job.
pub(super) struct JobParams {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub command: Vec<String>,
    pub cores: u32,
    pub memory_mib: u64,
    pub deadline_secs: i64,
    pub volume: WorkVolume,
    /// Mount point, identical to the configured working directory
    pub mount_path: String,
    pub service_account: Option<String>,
}

/// Name for the Job running `job_id`.
pub(super) fn job_name(job_id: &str) -> String {
    let mut name: String = format!("ferry-{}", job_id)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    name.truncate(MAX_NAME_LEN);
    name.trim_end_matches('-').to_string()
}

pub(super) fn build_job(params: &JobParams) -> Job {
    let quantities: BTreeMap<String, Quantity> = [
        ("cpu".to_string(), Quantity(params.cores.to_string())),
        ("memory".to_string(), Quantity(format!("{}Mi", params.memory_mib))),
    ]
    .into_iter()
    .collect();

    let volume = match &params.volume {
        WorkVolume::Claim(claim) => Volume {
            name: WORK_VOLUME.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: claim.clone(),
                ..Default::default()
            }),
            ..Default::default()
        },
        WorkVolume::HostPath => Volume {
            name: WORK_VOLUME.to_string(),
            host_path: Some(HostPathVolumeSource {
                path: params.mount_path.clone(),
                type_: Some("DirectoryOrCreate".to_string()),
            }),
            ..Default::default()
        },
    };

    let container = Container {
        name: "job".to_string(),
        image: Some(params.image.clone()),
        command: Some(params.command.clone()),
        resources: Some(ResourceRequirements {
            requests: Some(quantities.clone()),
            limits: Some(quantities),
            ..Default::default()
        }),
        volume_mounts: Some(vec![VolumeMount {
            name: WORK_VOLUME.to_string(),
            mount_path: params.mount_path.clone(),
            ..Default::default()
        }]),
        ..Default::default()
    };

    let labels: BTreeMap<String, String> = [
        ("app".to_string(), "ferry".to_string()),
        ("ferry.dev/job".to_string(), params.name.clone()),
    ]
    .into_iter()
    .collect();

    Job {
        metadata: ObjectMeta {
            name: Some(params.name.clone()),
            namespace: Some(params.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(0),
            active_deadline_seconds: Some(params.deadline_secs),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta { labels: Some(labels), ..Default::default() }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: Some(vec![volume]),
                    restart_policy: Some("Never".to_string()),
                    service_account_name: params.service_account.clone(),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Map a Job's status to a [`BackendStatus`].
pub(super) fn job_status(job: &Job) -> BackendStatus {
    let Some(status) = job.status.as_ref() else {
        return BackendStatus::Queued;
    };
    if let Some(status) = condition_status(status) {
        return status;
    }
    if status.ready.unwrap_or(0) > 0 {
        return BackendStatus::Running;
    }
    if status.succeeded.unwrap_or(0) > 0 {
        return BackendStatus::Completed;
    }
    if status.failed.unwrap_or(0) > 0 {
        return BackendStatus::failed("pod failed");
    }
    BackendStatus::Queued
}

fn condition_status(status: &JobStatus) -> Option<BackendStatus> {
    let conditions = status.conditions.as_ref()?;
    conditions.iter().filter(|c| c.status == "True").find_map(|c| match c.type_.as_str() {
        "Complete" => Some(BackendStatus::Completed),
        "Failed" => {
            Some(BackendStatus::failed(c.reason.clone().unwrap_or_else(|| "Failed".to_string())))
        }
        _ => None,
    })
}
