//! ConfigMap and Secret handlers

use kindling_core::{DeployPriority, Manifest, ResourceKind, SpinnakerKind};
use serde_json::Value;

use super::{KindHandler, Profile};
use crate::sort::{self, Comparator};

/// Number of entries across the given data maps
fn entry_count(manifest: &Manifest, keys: &[&str]) -> usize {
    keys.iter()
        .filter_map(|key| manifest.get(key).and_then(Value::as_object))
        .map(|map| map.len())
        .sum()
}

fn config_map_entries(manifest: &Manifest) -> usize {
    entry_count(manifest, &["data", "binaryData"])
}

fn secret_entries(manifest: &Manifest) -> usize {
    entry_count(manifest, &["data", "stringData"])
}

fn mountable(kind: ResourceKind) -> Profile {
    Profile::new(kind, DeployPriority::MountableDataPriority, SpinnakerKind::Configs).versioned()
}

pub struct ConfigMapHandler {
    profile: Profile,
}

impl ConfigMapHandler {
    pub fn new() -> Self {
        Self {
            profile: mountable(ResourceKind::CONFIG_MAP),
        }
    }
}

impl Default for ConfigMapHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl KindHandler for ConfigMapHandler {
    fn kind(&self) -> ResourceKind {
        self.profile.kind.clone()
    }

    fn deploy_priority(&self) -> DeployPriority {
        self.profile.priority
    }

    fn versioned(&self) -> bool {
        self.profile.versioned
    }

    fn spinnaker_kind(&self) -> SpinnakerKind {
        self.profile.spinnaker_kind
    }

    fn size_comparator(&self) -> Comparator {
        sort::by_metric(config_map_entries)
    }
}

/// Secret values never leave the cluster through the cache
pub struct SecretHandler {
    profile: Profile,
}

impl SecretHandler {
    const SENSITIVE_KEYS: &'static [&'static str] = &["data", "stringData"];

    pub fn new() -> Self {
        Self {
            profile: mountable(ResourceKind::SECRET),
        }
    }
}

impl Default for SecretHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl KindHandler for SecretHandler {
    fn kind(&self) -> ResourceKind {
        self.profile.kind.clone()
    }

    fn deploy_priority(&self) -> DeployPriority {
        self.profile.priority
    }

    fn versioned(&self) -> bool {
        self.profile.versioned
    }

    fn spinnaker_kind(&self) -> SpinnakerKind {
        self.profile.spinnaker_kind
    }

    fn sensitive_keys(&self) -> &[&'static str] {
        Self::SENSITIVE_KEYS
    }

    fn size_comparator(&self) -> Comparator {
        sort::by_metric(secret_entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::SortKey;

    fn secret(data: &str) -> Manifest {
        Manifest::from_yaml(&format!(
            "apiVersion: v1\nkind: Secret\nmetadata:\n  name: s\n  labels:\n    app: x\n{data}"
        ))
        .unwrap()
    }

    #[test]
    fn test_secret_data_is_stripped() {
        let mut manifest = secret("type: Opaque\ndata:\n  token: c2VjcmV0\nstringData:\n  plain: text\n");
        SecretHandler::new().remove_sensitive_keys(&mut manifest);

        assert!(manifest.get("data").is_none());
        assert!(manifest.get("stringData").is_none());
        assert_eq!(manifest.get("type").and_then(Value::as_str), Some("Opaque"));
        assert_eq!(manifest.labels().get("app").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_stripping_without_data_is_a_no_op() {
        let mut manifest = secret("type: Opaque\n");
        let before = manifest.clone();
        SecretHandler::new().remove_sensitive_keys(&mut manifest);
        assert_eq!(manifest, before);
    }

    #[test]
    fn test_config_map_keeps_data() {
        let mut manifest = Manifest::from_yaml(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: c\ndata:\n  a: b\n",
        )
        .unwrap();
        let before = manifest.clone();
        ConfigMapHandler::new().remove_sensitive_keys(&mut manifest);
        assert_eq!(manifest, before);
    }

    #[test]
    fn test_size_counts_entries() {
        let small = secret("data:\n  a: YQ==\n");
        let large = secret("data:\n  a: YQ==\nstringData:\n  b: b\n  c: c\n");
        let mut items = vec![large.clone(), small.clone()];
        items.sort_by(SecretHandler::new().comparator_for(SortKey::Size));
        assert_eq!(items, vec![small, large]);
    }

    #[test]
    fn test_profiles() {
        for handler in [
            Box::new(ConfigMapHandler::new()) as Box<dyn KindHandler>,
            Box::new(SecretHandler::new()),
        ] {
            assert!(handler.versioned());
            assert_eq!(handler.deploy_priority(), DeployPriority::MountableDataPriority);
            assert_eq!(handler.spinnaker_kind(), SpinnakerKind::Configs);
        }
    }
}
