//! Per-field artifact replacement strategies

use std::collections::BTreeSet;

use kindling_core::artifact::types;
use kindling_core::{Artifact, ImageReference, Manifest};
use serde_json::Value;

use super::BindingMode;
use super::path::FieldPath;

/// Pod-spec roots the image and config replacers look under
const POD_TEMPLATE: &str = "spec.template.spec";
const POD: &str = "spec";
const CRON_JOB_TEMPLATE: &str = "spec.jobTemplate.spec.template.spec";

/// Only apply a replacer when a field holds an expected value
#[derive(Debug, Clone, PartialEq, Eq)]
struct Guard {
    pointer: &'static str,
    expected: &'static str,
}

/// How a field value is compared with a candidate artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Matching {
    /// Container image reference, matched under the binding mode
    Image,
    /// Object name, scoped to the target namespace and account
    ObjectName,
}

/// A strategy bound to one artifact type and a set of manifest fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacer {
    name: &'static str,
    artifact_type: &'static str,
    matching: Matching,
    paths: Vec<FieldPath>,
    guard: Option<Guard>,
}

impl Replacer {
    fn new(
        name: &'static str,
        artifact_type: &'static str,
        matching: Matching,
        paths: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name,
            artifact_type,
            matching,
            paths: paths.into_iter().map(|p| FieldPath::parse(&p)).collect(),
            guard: None,
        }
    }

    fn images(name: &'static str, root: &str) -> Self {
        Self::new(
            name,
            types::DOCKER_IMAGE,
            Matching::Image,
            ["containers", "initContainers"].map(|c| format!("{root}.{c}[*].image")),
        )
    }

    /// Images of a pod template (`spec.template.spec`)
    pub fn docker_image() -> Self {
        Self::images("docker-image", POD_TEMPLATE)
    }

    /// Images of a bare pod (`spec`)
    pub fn pod_docker_image() -> Self {
        Self::images("pod-docker-image", POD)
    }

    /// Images of a cron job's job template
    pub fn cron_job_docker_image() -> Self {
        Self::images("cron-job-docker-image", CRON_JOB_TEMPLATE)
    }

    pub fn config_map_volume(root: &str) -> Self {
        Self::new(
            "config-map-volume",
            types::CONFIG_MAP,
            Matching::ObjectName,
            [
                format!("{root}.volumes[*].configMap.name"),
                format!("{root}.volumes[*].projected.sources[*].configMap.name"),
            ],
        )
    }

    pub fn secret_volume(root: &str) -> Self {
        Self::new(
            "secret-volume",
            types::SECRET,
            Matching::ObjectName,
            [
                format!("{root}.volumes[*].secret.secretName"),
                format!("{root}.volumes[*].projected.sources[*].secret.name"),
            ],
        )
    }

    pub fn config_map_env(root: &str) -> Self {
        Self::new(
            "config-map-env",
            types::CONFIG_MAP,
            Matching::ObjectName,
            env_paths(root, "configMapRef", "configMapKeyRef"),
        )
    }

    pub fn secret_env(root: &str) -> Self {
        Self::new(
            "secret-env",
            types::SECRET,
            Matching::ObjectName,
            env_paths(root, "secretRef", "secretKeyRef"),
        )
    }

    /// `scaleTargetRef` of an autoscaler pointing at a Deployment
    pub fn hpa_deployment() -> Self {
        Self::scale_target("hpa-deployment", types::DEPLOYMENT, "Deployment")
    }

    /// `scaleTargetRef` of an autoscaler pointing at a ReplicaSet
    pub fn hpa_replica_set() -> Self {
        Self::scale_target("hpa-replica-set", types::REPLICA_SET, "ReplicaSet")
    }

    fn scale_target(name: &'static str, artifact_type: &'static str, kind: &'static str) -> Self {
        let mut replacer = Self::new(
            name,
            artifact_type,
            Matching::ObjectName,
            ["spec.scaleTargetRef.name".to_string()],
        );
        replacer.guard = Some(Guard {
            pointer: "/spec/scaleTargetRef/kind",
            expected: kind,
        });
        replacer
    }

    /// Image and config replacers for a pod spec rooted at `root`
    pub fn pod_spec_set(root: &str) -> Vec<Self> {
        let images = match root {
            POD => Self::pod_docker_image(),
            CRON_JOB_TEMPLATE => Self::cron_job_docker_image(),
            _ => Self::images("docker-image", root),
        };
        vec![
            images,
            Self::config_map_volume(root),
            Self::secret_volume(root),
            Self::config_map_env(root),
            Self::secret_env(root),
        ]
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn artifact_type(&self) -> &'static str {
        self.artifact_type
    }

    fn applies_to(&self, manifest: &Manifest) -> bool {
        match &self.guard {
            Some(guard) => manifest.pointer(guard.pointer).and_then(Value::as_str) == Some(guard.expected),
            None => true,
        }
    }

    /// Artifacts currently referenced by this replacer's fields
    pub fn find(&self, manifest: &Manifest) -> Vec<Artifact> {
        if !self.applies_to(manifest) {
            return Vec::new();
        }

        self.paths
            .iter()
            .flat_map(|path| path.values(manifest.as_map()))
            .filter_map(Value::as_str)
            .filter(|value| !value.is_empty())
            .map(|value| self.detected(value, manifest.namespace()))
            .collect()
    }

    fn detected(&self, value: &str, namespace: Option<&str>) -> Artifact {
        match self.matching {
            Matching::Image => {
                let image = ImageReference::parse(value);
                let mut artifact = Artifact::new(self.artifact_type, image.name.clone())
                    .with_reference(value);
                artifact.version = image.version().map(String::from);
                artifact
            }
            Matching::ObjectName => {
                let mut artifact =
                    Artifact::new(self.artifact_type, value).with_reference(value);
                artifact.location = namespace.map(String::from);
                artifact
            }
        }
    }

    /// Rewrite matching fields, returning the artifacts that were bound
    ///
    /// Candidates are tried in order; the first match wins and each field is
    /// rewritten at most once.
    pub fn replace(
        &self,
        mode: BindingMode,
        manifest: &mut Manifest,
        candidates: &[Artifact],
        namespace: Option<&str>,
        account: &str,
    ) -> BTreeSet<Artifact> {
        let mut bound = BTreeSet::new();
        if !self.applies_to(manifest) {
            return bound;
        }

        let candidates: Vec<&Artifact> = candidates
            .iter()
            .filter(|a| a.artifact_type == self.artifact_type)
            .collect();
        if candidates.is_empty() {
            return bound;
        }

        for path in &self.paths {
            path.visit_mut(manifest.as_map_mut(), &mut |field| {
                let Some(current) = field.as_str() else {
                    return;
                };
                let Some(artifact) = candidates
                    .iter()
                    .find(|a| self.matches(mode, current, a, namespace, account))
                else {
                    return;
                };

                let replacement = artifact.resolved_reference();
                tracing::debug!(
                    replacer = self.name,
                    path = path.as_str(),
                    from = current,
                    to = replacement.as_str(),
                    "binding artifact"
                );
                *field = Value::String(replacement);
                bound.insert((*artifact).clone());
            });
        }

        bound
    }

    fn matches(
        &self,
        mode: BindingMode,
        current: &str,
        artifact: &Artifact,
        namespace: Option<&str>,
        account: &str,
    ) -> bool {
        match self.matching {
            Matching::Image => match mode {
                BindingMode::MatchNameOnly => ImageReference::parse(current).name == artifact.name,
                BindingMode::MatchNameAndTag => {
                    ImageReference::parse(current).name == artifact.name
                        && artifact.image_version().is_some()
                }
                BindingMode::MatchExact => current == artifact.resolved_reference(),
            },
            Matching::ObjectName => {
                let in_namespace = match (artifact.location.as_deref(), namespace) {
                    (Some(location), Some(namespace)) => location == namespace,
                    (Some(_), None) => false,
                    (None, _) => true,
                };
                let in_account = artifact.account.as_deref().is_none_or(|a| a == account);
                current == artifact.name && in_namespace && in_account
            }
        }
    }
}

fn env_paths(root: &str, from_ref: &str, key_ref: &str) -> Vec<String> {
    ["containers", "initContainers"]
        .into_iter()
        .flat_map(|c| {
            [
                format!("{root}.{c}[*].envFrom[*].{from_ref}.name"),
                format!("{root}.{c}[*].env[*].valueFrom.{key_ref}.name"),
            ]
        })
        .collect()
}

/// Roots used by handlers when composing their replacer lists
pub(crate) mod roots {
    pub const POD_TEMPLATE: &str = super::POD_TEMPLATE;
    pub const POD: &str = super::POD;
    pub const CRON_JOB_TEMPLATE: &str = super::CRON_JOB_TEMPLATE;
}
