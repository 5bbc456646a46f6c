//! HorizontalPodAutoscaler handler

use kindling_core::{DeployPriority, ResourceKind, SpinnakerKind};

use super::{KindHandler, Profile};
use crate::artifact::{ArtifactReplacer, Replacer};
use crate::relationships::{RelationshipMap, ResourcesByKind, SnapshotIndex};

/// Deploys after its scale target and binds that target's versioned name
pub struct HorizontalPodAutoscalerHandler {
    profile: Profile,
    replacer: ArtifactReplacer,
}

impl HorizontalPodAutoscalerHandler {
    pub fn new() -> Self {
        Self {
            profile: Profile::new(
                ResourceKind::HORIZONTAL_POD_AUTOSCALER,
                DeployPriority::WorkloadAttachmentPriority,
                SpinnakerKind::Workloads,
            ),
            replacer: ArtifactReplacer::new(vec![
                Replacer::hpa_deployment(),
                Replacer::hpa_replica_set(),
            ]),
        }
    }
}

impl Default for HorizontalPodAutoscalerHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl KindHandler for HorizontalPodAutoscalerHandler {
    fn kind(&self) -> ResourceKind {
        self.profile.kind.clone()
    }

    fn deploy_priority(&self) -> DeployPriority {
        self.profile.priority
    }

    fn spinnaker_kind(&self) -> SpinnakerKind {
        self.profile.spinnaker_kind
    }

    fn artifact_replacer(&self) -> &ArtifactReplacer {
        &self.replacer
    }

    fn add_relationships(&self, resources: &ResourcesByKind, relationships: &mut RelationshipMap) {
        let Some(autoscalers) = resources.get(&self.profile.kind) else {
            return;
        };
        let index = SnapshotIndex::new(resources);

        for hpa in autoscalers {
            let target = hpa.pointer("/spec/scaleTargetRef").and_then(|target| {
                let kind = target.get("kind")?.as_str()?;
                let name = target.get("name")?.as_str()?;
                let api_version = target.get("apiVersion").and_then(|v| v.as_str());
                Some((ResourceKind::from_parts(kind, api_version), name))
            });
            if let Some((kind, name)) = target
                && let Some(found) = index.find(kind, hpa.namespace(), name)
            {
                relationships.add(hpa.reference(), found);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::BindingMode;
    use crate::relationships::group_by_kind;
    use kindling_core::artifact::types;
    use kindling_core::{Artifact, Manifest, ManifestRef};

    fn hpa(kind: &str) -> Manifest {
        Manifest::from_yaml(&format!(
            r#"
apiVersion: autoscaling/v2
kind: HorizontalPodAutoscaler
metadata:
  name: web
  namespace: prod
spec:
  scaleTargetRef:
    apiVersion: apps/v1
    kind: {kind}
    name: web
  minReplicas: 1
  maxReplicas: 5
"#
        ))
        .unwrap()
    }

    fn target_name(manifest: &Manifest) -> Option<&str> {
        manifest
            .pointer("/spec/scaleTargetRef/name")
            .and_then(|v| v.as_str())
    }

    #[test]
    fn test_binds_versioned_replica_set() {
        let handler = HorizontalPodAutoscalerHandler::new();
        let result = handler.replace_artifacts(
            BindingMode::MatchNameAndTag,
            hpa("ReplicaSet"),
            &[Artifact::new(types::REPLICA_SET, "web")
                .with_version("v003")
                .with_location("prod")],
            Some("prod"),
            "acct",
        );
        assert_eq!(target_name(&result.manifest), Some("web-v003"));
        assert_eq!(result.bound_artifacts.len(), 1);
    }

    #[test]
    fn test_kind_guard() {
        let handler = HorizontalPodAutoscalerHandler::new();
        let result = handler.replace_artifacts(
            BindingMode::MatchNameAndTag,
            hpa("Deployment"),
            &[Artifact::new(types::REPLICA_SET, "web").with_version("v003")],
            Some("prod"),
            "acct",
        );
        assert_eq!(target_name(&result.manifest), Some("web"));
        assert!(result.bound_artifacts.is_empty());
    }

    #[test]
    fn test_links_to_scale_target() {
        let deployment = Manifest::from_yaml(
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n  namespace: prod\n",
        )
        .unwrap();
        let snapshot = group_by_kind([hpa("Deployment"), deployment]);

        let mut relationships = RelationshipMap::new();
        HorizontalPodAutoscalerHandler::new().add_relationships(&snapshot, &mut relationships);

        let from = ManifestRef::new(ResourceKind::HORIZONTAL_POD_AUTOSCALER, Some("prod"), "web");
        assert_eq!(
            relationships.get(&from),
            &[ManifestRef::new(ResourceKind::DEPLOYMENT, Some("prod"), "web")]
        );
    }

    #[test]
    fn test_attaches_after_workloads() {
        let handler = HorizontalPodAutoscalerHandler::new();
        assert!(
            handler.deploy_priority().weight()
                > DeployPriority::WorkloadControllerPriority.weight()
        );
    }
}
