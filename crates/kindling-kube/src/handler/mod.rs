//! Per-kind policy handlers
//!
//! Every supported kind has exactly one [`KindHandler`] answering the same
//! questions: where it deploys in the ordering, which fields carry artifacts,
//! how it relates to other manifests, what it hides from the cache and how its
//! listings sort. Most of the trait has defaults; a handler overrides only what
//! differs for its kind.

mod autoscaler;
mod basic;
mod data;
mod service;
mod workload;

use std::collections::BTreeSet;
use std::time::Duration;

use kindling_core::{Artifact, DeployPriority, Manifest, ResourceKind, SpinnakerKind};
use serde_json::{Map, Value};

use crate::artifact::{ArtifactReplacer, BindingMode, ReplaceResult};
use crate::caching::CachingAgent;
use crate::config::AccountCredentials;
use crate::error::Result;
use crate::relationships::{RelationshipMap, ResourcesByKind};
use crate::search::{InfrastructureCacheKey, KeyEncoder};
use crate::sort::{self, Comparator, SortKey};
use crate::status::{Status, Warning};

pub use autoscaler::HorizontalPodAutoscalerHandler;
pub use basic::BasicHandler;
pub use data::{ConfigMapHandler, SecretHandler};
pub use service::ServiceHandler;
pub use workload::WorkloadHandler;

static NO_REPLACERS: ArtifactReplacer = ArtifactReplacer::empty();

/// Policy for one Kubernetes kind
pub trait KindHandler: Send + Sync {
    fn kind(&self) -> ResourceKind;

    fn deploy_priority(&self) -> DeployPriority;

    /// Whether deploys of this kind create a new versioned object each time
    fn versioned(&self) -> bool {
        false
    }

    fn spinnaker_kind(&self) -> SpinnakerKind;

    fn status(&self, _manifest: &Manifest) -> Status {
        Status::stable()
    }

    fn list_warnings(&self, _manifest: &Manifest) -> Vec<Warning> {
        Vec::new()
    }

    /// Top-level keys never written to the cache
    fn sensitive_keys(&self) -> &[&'static str] {
        &[]
    }

    fn artifact_replacer(&self) -> &ArtifactReplacer {
        &NO_REPLACERS
    }

    fn replace_artifacts(
        &self,
        mode: BindingMode,
        manifest: Manifest,
        artifacts: &[Artifact],
        namespace: Option<&str>,
        account: &str,
    ) -> ReplaceResult {
        self.artifact_replacer()
            .replace_all(mode, manifest, artifacts, namespace, account)
    }

    fn list_artifacts(&self, manifest: &Manifest) -> BTreeSet<Artifact> {
        self.artifact_replacer().find_all(manifest)
    }

    fn remove_sensitive_keys(&self, manifest: &mut Manifest) {
        for key in self.sensitive_keys() {
            manifest.remove(key);
        }
    }

    /// Link manifests of this kind in the snapshot to what they depend on
    fn add_relationships(&self, _resources: &ResourcesByKind, _relationships: &mut RelationshipMap) {}

    fn age_comparator(&self) -> Comparator {
        sort::by_age()
    }

    fn size_comparator(&self) -> Comparator {
        sort::by_replicas()
    }

    fn comparator_for(&self, sort: SortKey) -> Comparator {
        match sort {
            SortKey::Age => self.age_comparator(),
            SortKey::Size => self.size_comparator(),
        }
    }

    fn build_caching_agent(
        &self,
        credentials: &AccountCredentials,
        index: usize,
        count: usize,
        poll_interval: Duration,
    ) -> Result<CachingAgent> {
        CachingAgent::new(
            credentials.clone(),
            vec![self.kind()],
            index,
            count,
            poll_interval,
        )
    }

    fn hydrate_search_result(
        &self,
        key: &InfrastructureCacheKey,
        encoder: &dyn KeyEncoder,
    ) -> Result<Map<String, Value>> {
        crate::search::hydrate_search_result(key, encoder)
    }
}

/// Identity shared by every handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Profile {
    pub(crate) kind: ResourceKind,
    pub(crate) priority: DeployPriority,
    pub(crate) spinnaker_kind: SpinnakerKind,
    pub(crate) versioned: bool,
}

impl Profile {
    pub(crate) fn new(kind: ResourceKind, priority: DeployPriority, spinnaker_kind: SpinnakerKind) -> Self {
        Self {
            kind,
            priority,
            spinnaker_kind,
            versioned: false,
        }
    }

    pub(crate) fn versioned(mut self) -> Self {
        self.versioned = true;
        self
    }
}

/// One handler per built-in kind
pub fn builtin_handlers() -> Vec<Box<dyn KindHandler>> {
    let mut handlers: Vec<Box<dyn KindHandler>> = vec![
        Box::new(ConfigMapHandler::new()),
        Box::new(SecretHandler::new()),
        Box::new(ServiceHandler::new()),
        Box::new(HorizontalPodAutoscalerHandler::new()),
    ];
    handlers.extend(
        WorkloadHandler::all()
            .into_iter()
            .map(|h| Box::new(h) as Box<dyn KindHandler>),
    );
    handlers.extend(
        BasicHandler::builtin()
            .into_iter()
            .map(|h| Box::new(h) as Box<dyn KindHandler>),
    );
    handlers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    struct Bare;

    impl KindHandler for Bare {
        fn kind(&self) -> ResourceKind {
            ResourceKind::custom("Widget", "example.com")
        }

        fn deploy_priority(&self) -> DeployPriority {
            DeployPriority::LowestPriority
        }

        fn spinnaker_kind(&self) -> SpinnakerKind {
            SpinnakerKind::Unclassified
        }
    }

    fn widget() -> Manifest {
        Manifest::from_yaml(
            "apiVersion: example.com/v1\nkind: Widget\nmetadata:\n  name: w\ndata:\n  a: b\n",
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_are_no_ops() {
        let mut manifest = widget();
        let before = manifest.clone();

        Bare.remove_sensitive_keys(&mut manifest);
        assert_eq!(manifest, before);
        assert!(Bare.list_artifacts(&manifest).is_empty());
        assert!(Bare.list_warnings(&manifest).is_empty());
        assert!(Bare.status(&manifest).is_stable());
        assert!(!Bare.versioned());

        let result = Bare.replace_artifacts(
            BindingMode::MatchNameOnly,
            manifest.clone(),
            &[Artifact::image("w").with_version("v2")],
            None,
            "acct",
        );
        assert_eq!(result.manifest, before);
        assert!(result.bound_artifacts.is_empty());

        let mut relationships = RelationshipMap::new();
        Bare.add_relationships(&ResourcesByKind::new(), &mut relationships);
        assert!(relationships.is_empty());
    }

    #[test]
    fn test_default_caching_agent_covers_own_kind() {
        let credentials = AccountCredentials::new("prod", ["default"]);
        let agent = Bare
            .build_caching_agent(&credentials, 1, 3, Duration::from_secs(5))
            .unwrap();
        assert_eq!(agent.kinds(), &[Bare.kind()]);
        assert_eq!(agent.id(), "prod/KubernetesCachingAgent[2/3]");
        assert!(Bare.build_caching_agent(&credentials, 3, 3, Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_builtin_handlers_are_unique_and_complete() {
        let kinds: BTreeSet<ResourceKind> = builtin_handlers().iter().map(|h| h.kind()).collect();
        assert_eq!(kinds.len(), builtin_handlers().len());
        for kind in ResourceKind::BUILTIN {
            assert!(kinds.contains(kind), "no handler for {kind}");
        }
    }
}
