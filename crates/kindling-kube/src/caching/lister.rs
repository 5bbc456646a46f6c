//! Sources of live manifests for caching agents

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use kindling_core::{Manifest, ResourceKind};
use kube::{
    Client,
    api::{Api, DynamicObject, ListParams},
    discovery::{ApiCapabilities, ApiResource, Discovery, Scope},
};
use serde_json::Value;

use crate::error::{KubeError, Result};

/// Lists the manifests of one kind
#[async_trait]
pub trait ResourceLister: Send + Sync {
    /// Manifests of `kind` in `namespace`, or cluster-wide when `None`
    async fn list(&self, kind: &ResourceKind, namespace: Option<&str>) -> Result<Vec<Manifest>>;
}

/// Lists manifests from a live cluster through API discovery
pub struct KubeResourceLister {
    client: Client,
    discovery: Discovery,
}

impl KubeResourceLister {
    pub async fn new(client: Client) -> Result<Self> {
        let discovery = Discovery::new(client.clone())
            .run()
            .await
            .map_err(KubeError::Api)?;
        Ok(Self { client, discovery })
    }

    fn resolve(&self, kind: &ResourceKind) -> Option<(ApiResource, ApiCapabilities)> {
        self.discovery
            .groups()
            .filter(|group| kind.group().is_none_or(|g| g == group.name()))
            .flat_map(|group| group.recommended_resources())
            .find(|(resource, _)| resource.kind == kind.name())
    }
}

#[async_trait]
impl ResourceLister for KubeResourceLister {
    async fn list(&self, kind: &ResourceKind, namespace: Option<&str>) -> Result<Vec<Manifest>> {
        let lister_error = |message: String| KubeError::Lister {
            kind: kind.clone(),
            namespace: namespace.unwrap_or("<cluster>").to_string(),
            message,
        };

        let (resource, capabilities) = self
            .resolve(kind)
            .ok_or_else(|| lister_error("kind not served by the cluster".to_string()))?;

        let api: Api<DynamicObject> = match (capabilities.scope, namespace) {
            (Scope::Namespaced, Some(ns)) => Api::namespaced_with(self.client.clone(), ns, &resource),
            _ => Api::all_with(self.client.clone(), &resource),
        };

        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| lister_error(e.to_string()))?;

        list.items
            .into_iter()
            .map(|obj| to_manifest(obj, &resource))
            .collect()
    }
}

/// List items come back without type meta; restore it from the resource
fn to_manifest(obj: DynamicObject, resource: &ApiResource) -> Result<Manifest> {
    let mut value = serde_json::to_value(obj)?;
    if let Value::Object(map) = &mut value {
        map.entry("apiVersion")
            .or_insert_with(|| Value::String(resource.api_version.clone()));
        map.entry("kind")
            .or_insert_with(|| Value::String(resource.kind.clone()));
    }
    Ok(Manifest::from_value(value)?)
}

type ListKey = (ResourceKind, Option<String>);

/// In-memory lister for testing
#[derive(Clone, Default)]
pub struct MockResourceLister {
    /// (kind, namespace) -> manifests
    store: Arc<RwLock<BTreeMap<ListKey, Vec<Manifest>>>>,
    /// Units whose listing fails
    failing: Arc<RwLock<BTreeSet<ListKey>>>,
    /// Every (kind, namespace) listed so far
    calls: Arc<RwLock<Vec<ListKey>>>,
}

impl MockResourceLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with manifests, keyed by their own kind and namespace
    pub fn with_manifests(manifests: impl IntoIterator<Item = Manifest>) -> Self {
        let lister = Self::new();
        {
            let mut store = lister.store.write().unwrap();
            for manifest in manifests {
                let key = Self::key(&manifest.kind(), manifest.namespace());
                store.entry(key).or_default().push(manifest);
            }
        }
        lister
    }

    /// Make listing `kind` in `namespace` fail
    pub fn fail_on(&self, kind: ResourceKind, namespace: Option<&str>) {
        let key = Self::key(&kind, namespace);
        self.failing.write().unwrap().insert(key);
    }

    /// Every listing performed, in call order
    pub fn calls(&self) -> Vec<(ResourceKind, Option<String>)> {
        self.calls.read().unwrap().clone()
    }

    fn key(kind: &ResourceKind, namespace: Option<&str>) -> ListKey {
        let namespace = if kind.is_cluster_scoped() {
            None
        } else {
            namespace.map(String::from)
        };
        (kind.clone(), namespace)
    }
}

#[async_trait]
impl ResourceLister for MockResourceLister {
    async fn list(&self, kind: &ResourceKind, namespace: Option<&str>) -> Result<Vec<Manifest>> {
        let key = Self::key(kind, namespace);
        self.calls.write().unwrap().push(key.clone());

        if self.failing.read().unwrap().contains(&key) {
            return Err(KubeError::Lister {
                kind: kind.clone(),
                namespace: namespace.unwrap_or("<cluster>").to_string(),
                message: "injected failure".to_string(),
            });
        }

        let store = self.store.read().unwrap();
        Ok(store.get(&key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(kind: &str, namespace: Option<&str>, name: &str) -> Manifest {
        let mut value = json!({"apiVersion": "v1", "kind": kind, "metadata": {"name": name}});
        if let Some(ns) = namespace {
            value["metadata"]["namespace"] = json!(ns);
        }
        Manifest::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_mock_lists_by_kind_and_namespace() {
        let lister = MockResourceLister::with_manifests([
            manifest("ConfigMap", Some("a"), "one"),
            manifest("ConfigMap", Some("b"), "two"),
            manifest("Namespace", None, "a"),
        ]);

        let in_a = lister.list(&ResourceKind::CONFIG_MAP, Some("a")).await.unwrap();
        assert_eq!(in_a.len(), 1);
        assert_eq!(in_a[0].name(), "one");

        // namespace is ignored for cluster-scoped kinds
        let namespaces = lister.list(&ResourceKind::NAMESPACE, Some("a")).await.unwrap();
        assert_eq!(namespaces.len(), 1);

        assert!(lister.list(&ResourceKind::SECRET, Some("a")).await.unwrap().is_empty());
        assert_eq!(lister.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let lister = MockResourceLister::new();
        lister.fail_on(ResourceKind::SECRET, Some("a"));
        let err = lister.list(&ResourceKind::SECRET, Some("a")).await.unwrap_err();
        assert!(matches!(err, KubeError::Lister { .. }));
        assert!(lister.list(&ResourceKind::SECRET, Some("b")).await.is_ok());
    }

    #[test]
    fn test_to_manifest_restores_type_meta() {
        let resource = ApiResource {
            group: "apps".to_string(),
            version: "v1".to_string(),
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            plural: "deployments".to_string(),
        };
        let mut obj = DynamicObject::new("web", &resource).within("prod");
        obj.types = None;
        obj.data = json!({"spec": {"replicas": 2}});

        let manifest = to_manifest(obj, &resource).unwrap();
        assert_eq!(manifest.kind(), ResourceKind::DEPLOYMENT);
        assert_eq!(manifest.api_version(), Some("apps/v1"));
        assert_eq!(manifest.namespace(), Some("prod"));
        assert_eq!(manifest.replicas(), Some(2));
    }
}
