//! Relationship graph construction
//!
//! Handlers link manifests in a snapshot to the other manifests they depend
//! on or are owned by. Edges only ever point at manifests present in the
//! snapshot, and lists keep insertion order so the same snapshot always
//! yields the same graph.

use std::collections::{BTreeMap, BTreeSet};

use kindling_core::{Manifest, ManifestRef, ResourceKind};
use serde_json::Value;

/// Snapshot of manifests grouped by kind
pub type ResourcesByKind = BTreeMap<ResourceKind, Vec<Manifest>>;

/// Group manifests by kind, preserving their order within a kind
pub fn group_by_kind(manifests: impl IntoIterator<Item = Manifest>) -> ResourcesByKind {
    let mut grouped = ResourcesByKind::new();
    for manifest in manifests {
        grouped.entry(manifest.kind()).or_default().push(manifest);
    }
    grouped
}

/// Manifest -> related manifests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipMap {
    edges: BTreeMap<ManifestRef, Vec<ManifestRef>>,
}

impl RelationshipMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `from -> to`, ignoring self-edges and duplicates
    pub fn add(&mut self, from: ManifestRef, to: ManifestRef) {
        if from == to {
            return;
        }
        let targets = self.edges.entry(from).or_default();
        if !targets.contains(&to) {
            targets.push(to);
        }
    }

    pub fn get(&self, from: &ManifestRef) -> &[ManifestRef] {
        self.edges.get(from).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of manifests with at least one relationship
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Merge another map's edges, keeping this map's order first
    pub fn extend(&mut self, other: RelationshipMap) {
        for (from, targets) in other.edges {
            for to in targets {
                self.add(from.clone(), to);
            }
        }
    }
}

/// Index of the references present in a snapshot
pub(crate) struct SnapshotIndex {
    present: BTreeSet<ManifestRef>,
}

impl SnapshotIndex {
    pub(crate) fn new(resources: &ResourcesByKind) -> Self {
        Self {
            present: resources
                .values()
                .flatten()
                .map(Manifest::reference)
                .collect(),
        }
    }

    /// The reference if such a manifest is in the snapshot
    pub(crate) fn find(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<ManifestRef> {
        let candidate = ManifestRef::new(kind, namespace, name);
        self.present.contains(&candidate).then_some(candidate)
    }
}

/// Whether every selector pair is present in `labels`
///
/// An empty selector selects nothing.
pub fn selector_matches(
    selector: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
) -> bool {
    !selector.is_empty() && selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}

/// Labels carried by the pods a manifest produces
pub fn pod_labels(manifest: &Manifest) -> BTreeMap<String, String> {
    if manifest.kind() == ResourceKind::POD {
        return manifest.labels();
    }
    manifest
        .pointer("/spec/template/metadata/labels")
        .and_then(Value::as_object)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Names of objects a pod spec refers to
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PodSpecReferences {
    pub config_maps: BTreeSet<String>,
    pub secrets: BTreeSet<String>,
    pub service_account: Option<String>,
}

/// Collect config maps, secrets and the service account a pod spec uses
pub fn pod_spec_references(pod_spec: &Value) -> PodSpecReferences {
    let mut refs = PodSpecReferences::default();

    let str_at = |value: &Value, pointer: &str| -> Option<String> {
        value.pointer(pointer).and_then(Value::as_str).map(String::from)
    };

    for volume in array(pod_spec, "volumes") {
        refs.config_maps.extend(str_at(volume, "/configMap/name"));
        refs.secrets.extend(str_at(volume, "/secret/secretName"));
        for source in array(volume.get("projected").unwrap_or(&Value::Null), "sources") {
            refs.config_maps.extend(str_at(source, "/configMap/name"));
            refs.secrets.extend(str_at(source, "/secret/name"));
        }
    }

    for key in ["containers", "initContainers"] {
        for container in array(pod_spec, key) {
            for env_from in array(container, "envFrom") {
                refs.config_maps.extend(str_at(env_from, "/configMapRef/name"));
                refs.secrets.extend(str_at(env_from, "/secretRef/name"));
            }
            for env in array(container, "env") {
                refs.config_maps.extend(str_at(env, "/valueFrom/configMapKeyRef/name"));
                refs.secrets.extend(str_at(env, "/valueFrom/secretKeyRef/name"));
            }
        }
    }

    for pull_secret in array(pod_spec, "imagePullSecrets") {
        refs.secrets.extend(str_at(pull_secret, "/name"));
    }

    refs.service_account = str_at(pod_spec, "/serviceAccountName")
        .or_else(|| str_at(pod_spec, "/serviceAccount"));
    refs
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_selector_matching() {
        let pod = labels(&[("app", "web"), ("tier", "frontend")]);
        assert!(selector_matches(&labels(&[("app", "web")]), &pod));
        assert!(!selector_matches(&labels(&[("app", "api")]), &pod));
        assert!(!selector_matches(&labels(&[]), &pod));
    }

    #[test]
    fn test_relationship_map_dedupes() {
        let a = ManifestRef::new(ResourceKind::SERVICE, Some("ns"), "a");
        let b = ManifestRef::new(ResourceKind::DEPLOYMENT, Some("ns"), "b");
        let mut map = RelationshipMap::new();
        map.add(a.clone(), b.clone());
        map.add(a.clone(), b.clone());
        map.add(a.clone(), a.clone());
        assert_eq!(map.get(&a), &[b.clone()]);
        assert_eq!(map.edge_count(), 1);
        assert!(map.get(&b).is_empty());
    }

    #[test]
    fn test_pod_spec_references() {
        let spec = json!({
            "serviceAccountName": "runner",
            "imagePullSecrets": [{"name": "registry"}],
            "volumes": [
                {"name": "a", "configMap": {"name": "cm-volume"}},
                {"name": "b", "secret": {"secretName": "secret-volume"}},
                {"name": "c", "projected": {"sources": [
                    {"configMap": {"name": "cm-projected"}},
                    {"secret": {"name": "secret-projected"}}
                ]}}
            ],
            "containers": [{
                "name": "app",
                "envFrom": [{"configMapRef": {"name": "cm-env"}}],
                "env": [{"name": "X", "valueFrom": {"secretKeyRef": {"name": "secret-env", "key": "x"}}}]
            }]
        });

        let refs = pod_spec_references(&spec);
        assert_eq!(
            refs.config_maps.into_iter().collect::<Vec<_>>(),
            vec!["cm-env", "cm-projected", "cm-volume"]
        );
        assert_eq!(
            refs.secrets.into_iter().collect::<Vec<_>>(),
            vec!["registry", "secret-env", "secret-projected", "secret-volume"]
        );
        assert_eq!(refs.service_account.as_deref(), Some("runner"));
    }

    #[test]
    fn test_snapshot_index_only_finds_present() {
        let cm = Manifest::from_value(json!({
            "kind": "ConfigMap", "metadata": {"name": "cfg", "namespace": "prod"}
        }))
        .unwrap();
        let index = SnapshotIndex::new(&group_by_kind([cm]));
        assert!(index.find(ResourceKind::CONFIG_MAP, Some("prod"), "cfg").is_some());
        assert!(index.find(ResourceKind::CONFIG_MAP, Some("dev"), "cfg").is_none());
        assert!(index.find(ResourceKind::SECRET, Some("prod"), "cfg").is_none());
    }
}
