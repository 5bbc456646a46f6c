//! Infrastructure cache keys and search result hydration

use std::fmt;
use std::str::FromStr;

use kindling_core::{Manifest, ResourceKind, full_resource_name};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{KubeError, Result};

const PROVIDER: &str = "kubernetes.v2";
const GROUP: &str = "infrastructure";

/// Key of one cached manifest
///
/// Renders as `kubernetes.v2:infrastructure:<kind>:<account>:<namespace>:<name>`.
/// Cluster-scoped objects use an empty namespace segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureCacheKey {
    pub kubernetes_kind: ResourceKind,
    pub account: String,
    pub namespace: String,
    pub name: String,
}

impl InfrastructureCacheKey {
    pub fn new(
        kind: ResourceKind,
        account: impl Into<String>,
        namespace: Option<&str>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kubernetes_kind: kind,
            account: account.into(),
            namespace: namespace.unwrap_or_default().to_string(),
            name: name.into(),
        }
    }

    /// Key of a manifest cached for `account`
    pub fn for_manifest(account: &str, manifest: &Manifest) -> Self {
        Self::new(
            manifest.kind(),
            account,
            manifest.namespace(),
            manifest.name(),
        )
    }
}

impl fmt::Display for InfrastructureCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PROVIDER}:{GROUP}:{}:{}:{}:{}",
            self.kubernetes_kind, self.account, self.namespace, self.name
        )
    }
}

impl FromStr for InfrastructureCacheKey {
    type Err = KubeError;

    fn from_str(key: &str) -> Result<Self> {
        let invalid = |reason: &str| KubeError::InvalidCacheKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = key.split(':').collect();
        let [provider, group, kind, account, namespace, name] = parts.as_slice() else {
            return Err(invalid("expected 6 ':'-separated segments"));
        };
        if *provider != PROVIDER {
            return Err(invalid("unknown provider"));
        }
        if *group != GROUP {
            return Err(invalid("not an infrastructure key"));
        }
        if name.is_empty() {
            return Err(invalid("empty name"));
        }

        let kind = kind
            .parse::<ResourceKind>()
            .map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            kubernetes_kind: kind,
            account: account.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}

/// Turns a cache key into its raw search-result fields
pub trait KeyEncoder: Send + Sync {
    fn encode(&self, key: &InfrastructureCacheKey) -> Result<Map<String, Value>>;
}

/// Encodes a key through its serde representation
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonKeyEncoder;

impl KeyEncoder for JsonKeyEncoder {
    fn encode(&self, key: &InfrastructureCacheKey) -> Result<Map<String, Value>> {
        match serde_json::to_value(key)? {
            Value::Object(map) => Ok(map),
            other => Err(KubeError::Serialization(format!(
                "cache key encoded to {other}, expected an object"
            ))),
        }
    }
}

/// Raw key fields plus `region` (the namespace) and the composite `name`
///
/// The key's bare object name moves to `resourceName`.
pub fn hydrate_search_result(
    key: &InfrastructureCacheKey,
    encoder: &dyn KeyEncoder,
) -> Result<Map<String, Value>> {
    let mut result = encoder.encode(key)?;
    if let Some(raw) = result.remove("name") {
        result.insert("resourceName".to_string(), raw);
    }
    result.insert("region".to_string(), Value::String(key.namespace.clone()));
    result.insert(
        "name".to_string(),
        Value::String(full_resource_name(&key.kubernetes_kind, &key.name)),
    );
    Ok(result)
}
