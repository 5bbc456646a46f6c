//! Manifests: one Kubernetes object as a mutable JSON tree

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::kind::ResourceKind;

/// A single cluster object
///
/// The top level is always a JSON object carrying a string `kind`. Handlers
/// borrow manifests mutably for the duration of a call and never keep them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Manifest {
    data: Map<String, Value>,
}

impl Manifest {
    /// Build a manifest from a JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(data) = value else {
            return Err(CoreError::InvalidManifest {
                message: "manifest must be a mapping".to_string(),
            });
        };

        match data.get("kind") {
            Some(Value::String(kind)) if !kind.is_empty() => Ok(Self { data }),
            _ => Err(CoreError::InvalidManifest {
                message: "manifest is missing a 'kind'".to_string(),
            }),
        }
    }

    /// Parse a single YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a multi-document YAML stream, skipping empty documents
    pub fn from_yaml_documents(yaml: &str) -> Result<Vec<Self>> {
        let mut manifests = Vec::new();
        for document in serde_yaml::Deserializer::from_str(yaml) {
            let value = Value::deserialize(document)?;
            if value.is_null() {
                continue;
            }
            manifests.push(Self::from_value(value)?);
        }
        Ok(manifests)
    }

    /// Parse a JSON document
    /// Resolved resource kind
    pub fn kind(&self) -> ResourceKind {
        let raw = self.data.get("kind").and_then(Value::as_str).unwrap_or_default();
        ResourceKind::from_parts(raw, self.api_version())
    }

    pub fn api_version(&self) -> Option<&str> {
        self.data.get("apiVersion").and_then(Value::as_str)
    }

    fn metadata(&self) -> Option<&Map<String, Value>> {
        self.data.get("metadata").and_then(Value::as_object)
    }

    /// `metadata.name`, empty when unset
    pub fn name(&self) -> &str {
        self.metadata()
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// `metadata.namespace`, `None` for cluster-scoped objects
    pub fn namespace(&self) -> Option<&str> {
        self.metadata()
            .and_then(|m| m.get("namespace"))
            .and_then(Value::as_str)
            .filter(|ns| !ns.is_empty())
    }

    pub fn set_namespace(&mut self, namespace: &str) {
        let metadata = self
            .data
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(metadata) = metadata {
            metadata.insert("namespace".to_string(), Value::String(namespace.to_string()));
        }
    }

    /// `metadata.creationTimestamp`, if present and valid RFC 3339
    pub fn creation_timestamp(&self) -> Option<DateTime<Utc>> {
        self.metadata()
            .and_then(|m| m.get("creationTimestamp"))
            .and_then(Value::as_str)
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// `spec.replicas`
    pub fn replicas(&self) -> Option<i64> {
        self.pointer("/spec/replicas").and_then(Value::as_i64)
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        string_map(self.metadata().and_then(|m| m.get("labels")))
    }

    /// `metadata.ownerReferences`, skipping malformed entries
    pub fn owner_references(&self) -> Vec<OwnerReference> {
        self.metadata()
            .and_then(|m| m.get("ownerReferences"))
            .and_then(Value::as_array)
            .map(|refs| {
                refs.iter()
                    .filter_map(|r| serde_json::from_value(r.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Human-readable `kind name`
    pub fn full_resource_name(&self) -> String {
        full_resource_name(&self.kind(), self.name())
    }

    /// Identity of this manifest within a snapshot
    pub fn reference(&self) -> ManifestRef {
        ManifestRef {
            kind: self.kind(),
            namespace: self.namespace().map(String::from),
            name: self.name().to_string(),
        }
    }

    /// Top-level field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Remove a top-level field
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Look up a value by JSON pointer (`/spec/template/spec`)
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        let rest = pointer.strip_prefix('/')?;
        let (head, tail) = match rest.split_once('/') {
            Some((head, tail)) => (head, Some(tail)),
            None => (rest, None),
        };
        let value = self.data.get(&unescape(head))?;
        match tail {
            Some(tail) => value.pointer(&format!("/{tail}")),
            None => Some(value),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.data
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }
}

impl TryFrom<Value> for Manifest {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl From<Manifest> for Value {
    fn from(manifest: Manifest) -> Self {
        manifest.into_value()
    }
}

/// `kind name`, the display form used by search and caching
pub fn full_resource_name(kind: &ResourceKind, name: &str) -> String {
    format!("{} {}", kind, name)
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Entry of `metadata.ownerReferences`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: Option<String>,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub controller: Option<bool>,
}

impl OwnerReference {
    pub fn resource_kind(&self) -> ResourceKind {
        ResourceKind::from_parts(&self.kind, self.api_version.as_deref())
    }
}

/// Identity of a manifest inside a snapshot: kind, namespace and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManifestRef {
    pub kind: ResourceKind,
    pub namespace: Option<String>,
    pub name: String,
}

impl ManifestRef {
    pub fn new(kind: ResourceKind, namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.map(String::from),
            name: name.into(),
        }
    }
}

impl fmt::Display for ManifestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.kind, ns, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}
