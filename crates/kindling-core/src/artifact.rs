//! Artifacts: references to deployable units that can be bound into manifests

use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known artifact types
pub mod types {
    pub const DOCKER_IMAGE: &str = "docker/image";
    pub const CONFIG_MAP: &str = "kubernetes/configMap";
    pub const SECRET: &str = "kubernetes/secret";
    pub const DEPLOYMENT: &str = "kubernetes/deployment";
    pub const REPLICA_SET: &str = "kubernetes/replicaSet";

    /// Whether the type names a Kubernetes object rather than an image
    pub fn is_kubernetes(artifact_type: &str) -> bool {
        artifact_type.starts_with("kubernetes/")
    }
}

/// Reference to a deployable unit
///
/// Field order matters: artifacts sort by type, then name, then the rest,
/// which keeps bound-artifact sets stable for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub name: String,
    /// Fully resolved reference; derived from name and version when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Tag or digest for images, version suffix for Kubernetes objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Namespace the artifact lives in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl Artifact {
    pub fn new(artifact_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            artifact_type: artifact_type.into(),
            name: name.into(),
            reference: None,
            version: None,
            location: None,
            account: None,
        }
    }

    /// Container image artifact
    pub fn image(name: impl Into<String>) -> Self {
        Self::new(types::DOCKER_IMAGE, name)
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn is_image(&self) -> bool {
        self.artifact_type == types::DOCKER_IMAGE
    }

    /// Tag or digest the artifact pins, from `version` or the explicit reference
    pub fn image_version(&self) -> Option<String> {
        if let Some(version) = self.version.as_deref().filter(|v| !v.is_empty()) {
            return Some(version.to_string());
        }
        let reference = ImageReference::parse(self.reference.as_deref()?);
        reference.digest.or(reference.tag)
    }

    /// The value a bound field is rewritten to
    pub fn resolved_reference(&self) -> String {
        if let Some(reference) = self.reference.as_deref().filter(|r| !r.is_empty()) {
            return reference.to_string();
        }

        match self.version.as_deref().filter(|v| !v.is_empty()) {
            Some(version) if self.is_image() && is_digest(version) => {
                format!("{}@{}", self.name, version)
            }
            Some(version) if self.is_image() => format!("{}:{}", self.name, version),
            Some(version) if types::is_kubernetes(&self.artifact_type) => {
                format!("{}-{}", self.name, version)
            }
            _ => self.name.clone(),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.artifact_type, self.resolved_reference())
    }
}

fn is_digest(version: &str) -> bool {
    version.contains(':') && version.starts_with("sha")
}

/// A container image reference split into name, tag and digest
///
/// The name keeps its registry and repository path; a `:` only starts a tag
/// when it appears after the last `/`, so `registry:5000/app` has no tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub name: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageReference {
    pub fn parse(image: &str) -> Self {
        let (rest, digest) = match image.split_once('@') {
            Some((rest, digest)) => (rest, Some(digest.to_string())),
            None => (image, None),
        };

        let last_slash = rest.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (name, tag) = match rest[last_slash..].rfind(':') {
            Some(colon) => {
                let colon = last_slash + colon;
                (&rest[..colon], Some(rest[colon + 1..].to_string()))
            }
            None => (rest, None),
        };

        Self {
            name: name.to_string(),
            tag: tag.filter(|t| !t.is_empty()),
            digest: digest.filter(|d| !d.is_empty()),
        }
    }

    /// Tag or digest, whichever pins the image
    pub fn version(&self) -> Option<&str> {
        self.digest.as_deref().or(self.tag.as_deref())
    }
}
