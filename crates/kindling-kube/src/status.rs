//! Point-in-time health of a manifest
//!
//! Every rule here is a pure function of manifest content: the `status`
//! stanza is decoded into the typed `k8s-openapi` status object for the kind
//! and compared against the desired state from `spec`. Nothing talks to the
//! cluster.
//!
//! Readiness follows the same rules as a rollout wait:
//! - the controller has observed the latest generation
//! - all replicas are updated, ready and available

use k8s_openapi::api::apps::v1::{
    DaemonSetStatus, DeploymentStatus, ReplicaSetStatus, StatefulSetStatus,
};
use k8s_openapi::api::batch::v1::JobStatus;
use k8s_openapi::api::core::v1::{PersistentVolumeClaimStatus, PodStatus, ServiceStatus};
use kindling_core::Manifest;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coarse health of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Stable,
    Unstable,
    Failed,
}

/// Health evaluation of a single manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub health: Health,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Rollout paused by the user
    #[serde(default)]
    pub paused: bool,
}

impl Status {
    pub fn stable() -> Self {
        Self {
            health: Health::Stable,
            message: None,
            paused: false,
        }
    }

    pub fn unstable(message: impl Into<String>) -> Self {
        Self {
            health: Health::Unstable,
            message: Some(message.into()),
            paused: false,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            health: Health::Failed,
            message: Some(message.into()),
            paused: false,
        }
    }

    pub fn paused(message: impl Into<String>) -> Self {
        Self {
            health: Health::Stable,
            message: Some(message.into()),
            paused: true,
        }
    }

    pub fn is_stable(&self) -> bool {
        self.health == Health::Stable
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::stable()
    }
}

/// Advisory finding that does not affect health
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: String,
    pub message: String,
}

impl Warning {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

const GENERATION_PENDING: &str =
    "Waiting for status generation to match updated object generation";

/// Decode the `status` stanza into the typed status object
fn decode_status<T: DeserializeOwned>(manifest: &Manifest) -> Option<T> {
    manifest
        .get("status")
        .and_then(|status| serde_json::from_value(status.clone()).ok())
}

fn generation(manifest: &Manifest) -> Option<i64> {
    manifest.pointer("/metadata/generation").and_then(Value::as_i64)
}

fn desired_replicas(manifest: &Manifest) -> i32 {
    manifest
        .replicas()
        .and_then(|r| i32::try_from(r).ok())
        .unwrap_or(1)
}

/// Whether the controller has seen the latest spec
fn generation_observed(manifest: &Manifest, observed: Option<i64>) -> bool {
    match (generation(manifest), observed) {
        (Some(generation), Some(observed)) => observed >= generation,
        (Some(_), None) => false,
        (None, _) => true,
    }
}

pub fn deployment(manifest: &Manifest) -> Status {
    if manifest.pointer("/spec/paused").and_then(Value::as_bool) == Some(true) {
        return Status::paused("Deployment is paused");
    }

    let Some(status) = decode_status::<DeploymentStatus>(manifest) else {
        return Status::unstable("No status reported yet");
    };

    let conditions = status.conditions.as_deref().unwrap_or_default();
    if let Some(deadline) = conditions.iter().find(|c| {
        c.type_ == "Progressing" && c.reason.as_deref() == Some("ProgressDeadlineExceeded")
    }) {
        return Status::failed(
            deadline
                .message
                .clone()
                .unwrap_or_else(|| "Deployment exceeded its progress deadline".to_string()),
        );
    }

    if !generation_observed(manifest, status.observed_generation) {
        return Status::unstable(GENERATION_PENDING);
    }

    let desired = desired_replicas(manifest);
    let updated = status.updated_replicas.unwrap_or(0);
    let ready = status.ready_replicas.unwrap_or(0);
    let available = status.available_replicas.unwrap_or(0);

    if updated < desired {
        return Status::unstable(format!(
            "Waiting for all replicas to be updated: {updated}/{desired}"
        ));
    }
    if ready < desired || available < desired {
        let reasons: Vec<String> = conditions
            .iter()
            .filter(|c| c.status == "False")
            .filter_map(|c| c.message.as_ref().map(|m| format!("{}: {}", c.type_, m)))
            .collect();
        let mut message = format!(
            "Waiting for all replicas to be available: {ready}/{desired} ready, {available}/{desired} available"
        );
        if !reasons.is_empty() {
            message.push_str(&format!(" ({})", reasons.join("; ")));
        }
        return Status::unstable(message);
    }

    Status::stable()
}

pub fn stateful_set(manifest: &Manifest) -> Status {
    let Some(status) = decode_status::<StatefulSetStatus>(manifest) else {
        return Status::unstable("No status reported yet");
    };
    if !generation_observed(manifest, status.observed_generation) {
        return Status::unstable(GENERATION_PENDING);
    }

    let desired = desired_replicas(manifest);
    let ready = status.ready_replicas.unwrap_or(0);
    if ready < desired {
        return Status::unstable(format!("Waiting for replicas: {ready}/{desired} ready"));
    }

    if status.current_revision != status.update_revision {
        return Status::unstable("Waiting for rolling update to complete");
    }

    Status::stable()
}

pub fn daemon_set(manifest: &Manifest) -> Status {
    let Some(status) = decode_status::<DaemonSetStatus>(manifest) else {
        return Status::unstable("No status reported yet");
    };
    if !generation_observed(manifest, status.observed_generation) {
        return Status::unstable(GENERATION_PENDING);
    }

    let desired = status.desired_number_scheduled;
    let updated = status.updated_number_scheduled.unwrap_or(0);
    if updated < desired {
        return Status::unstable(format!(
            "Waiting for all pods to be updated: {updated}/{desired}"
        ));
    }
    if status.number_ready < desired {
        return Status::unstable(format!(
            "Waiting for all pods to be ready: {}/{desired}",
            status.number_ready
        ));
    }

    Status::stable()
}

pub fn replica_set(manifest: &Manifest) -> Status {
    let Some(status) = decode_status::<ReplicaSetStatus>(manifest) else {
        return Status::unstable("No status reported yet");
    };
    if !generation_observed(manifest, status.observed_generation) {
        return Status::unstable(GENERATION_PENDING);
    }

    let desired = desired_replicas(manifest);
    let ready = status.ready_replicas.unwrap_or(0);
    let available = status.available_replicas.unwrap_or(0);
    if ready < desired || available < desired {
        return Status::unstable(format!(
            "Waiting for replicas: {ready}/{desired} ready, {available}/{desired} available"
        ));
    }

    Status::stable()
}

pub fn job(manifest: &Manifest) -> Status {
    let status = decode_status::<JobStatus>(manifest).unwrap_or_default();
    let conditions = status.conditions.unwrap_or_default();
    let is_true = |type_: &str| {
        conditions
            .iter()
            .find(|c| c.type_ == type_ && c.status == "True")
    };

    if let Some(failed) = is_true("Failed") {
        return Status::failed(
            failed
                .message
                .clone()
                .unwrap_or_else(|| "Job failed".to_string()),
        );
    }
    if is_true("Complete").is_some() {
        return Status::stable();
    }
    Status::unstable("Job has not completed")
}

pub fn pod(manifest: &Manifest) -> Status {
    let status = decode_status::<PodStatus>(manifest).unwrap_or_default();
    match status.phase.as_deref() {
        Some("Failed") => Status::failed(
            status
                .message
                .unwrap_or_else(|| "Pod failed".to_string()),
        ),
        Some("Succeeded") => Status::stable(),
        Some("Running") => {
            let containers = status.container_statuses.unwrap_or_default();
            let not_ready: Vec<&str> = containers
                .iter()
                .filter(|c| !c.ready)
                .map(|c| c.name.as_str())
                .collect();
            if not_ready.is_empty() {
                Status::stable()
            } else {
                Status::unstable(format!("Containers not ready: {}", not_ready.join(", ")))
            }
        }
        Some(phase) => Status::unstable(format!("Pod is {phase}")),
        None => Status::unstable("No status reported yet"),
    }
}

pub fn persistent_volume_claim(manifest: &Manifest) -> Status {
    let status = decode_status::<PersistentVolumeClaimStatus>(manifest).unwrap_or_default();
    match status.phase.as_deref() {
        Some("Bound") => Status::stable(),
        Some("Lost") => Status::failed("Claim lost its underlying volume"),
        Some(phase) => Status::unstable(format!("Claim is {phase}")),
        None => Status::unstable("Claim is not bound"),
    }
}

pub fn service(manifest: &Manifest) -> Status {
    let is_load_balancer =
        manifest.pointer("/spec/type").and_then(Value::as_str) == Some("LoadBalancer");
    if !is_load_balancer {
        return Status::stable();
    }

    let status = decode_status::<ServiceStatus>(manifest).unwrap_or_default();
    let has_ingress = status
        .load_balancer
        .and_then(|lb| lb.ingress)
        .is_some_and(|ingress| !ingress.is_empty());
    if has_ingress {
        Status::stable()
    } else {
        Status::unstable("Waiting for load balancer ingress")
    }
}

/// Warn about containers whose image tag can move under the same name
pub fn mutable_image_warnings(manifest: &Manifest, pod_spec_pointer: &str) -> Vec<Warning> {
    let Some(spec) = manifest.pointer(pod_spec_pointer) else {
        return Vec::new();
    };

    ["containers", "initContainers"]
        .iter()
        .filter_map(|key| spec.get(key).and_then(Value::as_array))
        .flatten()
        .filter_map(|container| {
            let name = container.get("name").and_then(Value::as_str).unwrap_or("?");
            let image = container.get("image").and_then(Value::as_str)?;
            let reference = kindling_core::ImageReference::parse(image);
            let mutable = reference.digest.is_none()
                && reference.tag.as_deref().is_none_or(|tag| tag == "latest");
            mutable.then(|| {
                Warning::new(
                    "MutableImageTag",
                    format!("Container '{name}' uses image '{image}' without a pinned tag"),
                )
            })
        })
        .collect()
}

/// Warn about pod containers that have restarted
pub fn restart_warnings(manifest: &Manifest) -> Vec<Warning> {
    let status = decode_status::<PodStatus>(manifest).unwrap_or_default();
    status
        .container_statuses
        .unwrap_or_default()
        .into_iter()
        .filter(|c| c.restart_count > 0)
        .map(|c| {
            Warning::new(
                "ContainerRestarts",
                format!("Container '{}' restarted {} time(s)", c.name, c.restart_count),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(yaml: &str) -> Manifest {
        Manifest::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_deployment_ready() {
        let m = manifest(
            r#"
kind: Deployment
metadata: {name: web, generation: 2}
spec: {replicas: 2}
status:
  observedGeneration: 2
  replicas: 2
  updatedReplicas: 2
  readyReplicas: 2
  availableReplicas: 2
"#,
        );
        assert_eq!(deployment(&m), Status::stable());
    }

    #[test]
    fn test_deployment_generation_pending() {
        let m = manifest(
            r#"
kind: Deployment
metadata: {name: web, generation: 3}
spec: {replicas: 1}
status: {observedGeneration: 2, updatedReplicas: 1, readyReplicas: 1, availableReplicas: 1}
"#,
        );
        let status = deployment(&m);
        assert_eq!(status.health, Health::Unstable);
        assert_eq!(status.message.as_deref(), Some(GENERATION_PENDING));
    }

    #[test]
    fn test_deployment_rollout_in_progress() {
        let m = manifest(
            r#"
kind: Deployment
metadata: {name: web}
spec: {replicas: 3}
status:
  updatedReplicas: 3
  readyReplicas: 1
  availableReplicas: 1
  conditions:
    - type: Available
      status: "False"
      message: Deployment does not have minimum availability.
"#,
        );
        let status = deployment(&m);
        assert_eq!(status.health, Health::Unstable);
        let message = status.message.unwrap();
        assert!(message.contains("1/3 ready"));
        assert!(message.contains("minimum availability"));
    }

    #[test]
    fn test_deployment_deadline_exceeded_is_failed() {
        let m = manifest(
            r#"
kind: Deployment
metadata: {name: web}
status:
  conditions:
    - type: Progressing
      status: "False"
      reason: ProgressDeadlineExceeded
      message: ReplicaSet "web-1" has timed out progressing.
"#,
        );
        let status = deployment(&m);
        assert_eq!(status.health, Health::Failed);
        assert!(status.message.unwrap().contains("timed out"));
    }

    #[test]
    fn test_deployment_paused() {
        let m = manifest("kind: Deployment\nmetadata: {name: web}\nspec: {paused: true}\n");
        let status = deployment(&m);
        assert!(status.paused);
        assert!(status.is_stable());
    }

    #[test]
    fn test_stateful_set_revision_mismatch() {
        let m = manifest(
            r#"
kind: StatefulSet
metadata: {name: db}
spec: {replicas: 1}
status: {replicas: 1, readyReplicas: 1, currentRevision: db-1, updateRevision: db-2}
"#,
        );
        assert_eq!(stateful_set(&m).health, Health::Unstable);
    }

    #[test]
    fn test_daemon_set_ready() {
        let m = manifest(
            r#"
kind: DaemonSet
metadata: {name: agent}
status:
  currentNumberScheduled: 3
  desiredNumberScheduled: 3
  numberMisscheduled: 0
  numberReady: 3
  updatedNumberScheduled: 3
"#,
        );
        assert!(daemon_set(&m).is_stable());
    }

    #[test]
    fn test_job_conditions() {
        let complete = manifest(
            "kind: Job\nmetadata: {name: j}\nstatus:\n  conditions:\n    - {type: Complete, status: \"True\"}\n",
        );
        assert!(job(&complete).is_stable());

        let failed = manifest(
            "kind: Job\nmetadata: {name: j}\nstatus:\n  conditions:\n    - {type: Failed, status: \"True\", message: BackoffLimitExceeded}\n",
        );
        assert_eq!(job(&failed), Status::failed("BackoffLimitExceeded"));

        let running = manifest("kind: Job\nmetadata: {name: j}\nstatus: {active: 1}\n");
        assert_eq!(job(&running).health, Health::Unstable);
    }

    #[test]
    fn test_pod_phases() {
        let running = manifest(
            r#"
kind: Pod
metadata: {name: p}
status:
  phase: Running
  containerStatuses:
    - {name: app, image: app, imageID: "", ready: false, restartCount: 2}
"#,
        );
        assert_eq!(pod(&running).health, Health::Unstable);
        let warnings = restart_warnings(&running);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, "ContainerRestarts");

        let failed = manifest("kind: Pod\nmetadata: {name: p}\nstatus: {phase: Failed}\n");
        assert_eq!(pod(&failed).health, Health::Failed);
    }

    #[test]
    fn test_pvc_and_service() {
        let bound = manifest("kind: PersistentVolumeClaim\nmetadata: {name: c}\nstatus: {phase: Bound}\n");
        assert!(persistent_volume_claim(&bound).is_stable());
        let lost = manifest("kind: PersistentVolumeClaim\nmetadata: {name: c}\nstatus: {phase: Lost}\n");
        assert_eq!(persistent_volume_claim(&lost).health, Health::Failed);

        let cluster_ip = manifest("kind: Service\nmetadata: {name: s}\nspec: {type: ClusterIP}\n");
        assert!(service(&cluster_ip).is_stable());
        let pending_lb = manifest("kind: Service\nmetadata: {name: s}\nspec: {type: LoadBalancer}\n");
        assert_eq!(service(&pending_lb).health, Health::Unstable);
        let ready_lb = manifest(
            "kind: Service\nmetadata: {name: s}\nspec: {type: LoadBalancer}\nstatus:\n  loadBalancer:\n    ingress:\n      - ip: 10.0.0.1\n",
        );
        assert!(service(&ready_lb).is_stable());
    }

    #[test]
    fn test_mutable_image_warnings() {
        let m = manifest(
            r#"
kind: Deployment
metadata: {name: web}
spec:
  template:
    spec:
      containers:
        - {name: a, image: "app:latest"}
        - {name: b, image: "app"}
        - {name: c, image: "app:1.2.3"}
        - {name: d, image: "app@sha256:abc"}
"#,
        );
        let warnings = mutable_image_warnings(&m, "/spec/template/spec");
        let containers: Vec<_> = warnings
            .iter()
            .map(|w| w.message.split('\'').nth(1).unwrap())
            .collect();
        assert_eq!(containers, vec!["a", "b"]);
    }
}
