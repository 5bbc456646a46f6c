//! Account configuration
//!
//! One YAML document per account:
//!
//! ```yaml
//! name: prod
//! namespaces: [default, payments]
//! omitNamespaces: [kube-system]
//! customKinds:
//!   - kind: Certificate.cert-manager.io
//!     deployPriority: lowest_priority
//! artifactBinding: match-name-and-tag
//! caching:
//!   agentCount: 4
//!   pollInterval: 30s
//! ```

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use kindling_core::{DeployPriority, ResourceKind};
use serde::{Deserialize, Serialize};

use crate::artifact::BindingMode;
use crate::error::{KubeError, Result};

/// Configuration for one Kubernetes account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountConfig {
    /// Unique account name
    pub name: String,

    /// Namespaces to cache; `default` when empty
    #[serde(default)]
    pub namespaces: Vec<String>,

    /// Namespaces never cached, even when listed
    #[serde(default)]
    pub omit_namespaces: Vec<String>,

    /// Kinds to cache; every registered kind when empty
    #[serde(default)]
    pub kinds: Vec<ResourceKind>,

    /// Custom resource kinds to register handlers for
    #[serde(default)]
    pub custom_kinds: Vec<CustomKindConfig>,

    /// How image artifacts bind into manifests
    #[serde(default)]
    pub artifact_binding: BindingMode,

    /// Caching agent settings
    #[serde(default)]
    pub caching: CachingConfig,
}

/// Handler settings for a custom resource kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomKindConfig {
    pub kind: ResourceKind,

    #[serde(default = "default_custom_priority", with = "priority_name")]
    pub deploy_priority: DeployPriority,

    #[serde(default)]
    pub versioned: bool,
}

fn default_custom_priority() -> DeployPriority {
    DeployPriority::LowestPriority
}

/// Caching agent settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachingConfig {
    /// Number of sharded agents per account
    #[serde(default = "default_agent_count")]
    pub agent_count: usize,

    /// Interval between polls of one agent
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

fn default_agent_count() -> usize {
    1
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(30)
}

impl Default for CachingConfig {
    fn default() -> Self {
        Self {
            agent_count: default_agent_count(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl AccountConfig {
    /// Minimal configuration for an account
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespaces: Vec::new(),
            omit_namespaces: Vec::new(),
            kinds: Vec::new(),
            custom_kinds: Vec::new(),
            artifact_binding: BindingMode::default(),
            caching: CachingConfig::default(),
        }
    }

    /// Load and validate configuration from a YAML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(KubeError::InvalidConfig("account name must not be empty".to_string()));
        }
        if self.caching.agent_count == 0 {
            return Err(KubeError::InvalidConfig(format!(
                "account '{}': caching.agentCount must be at least 1",
                self.name
            )));
        }
        if self.caching.poll_interval.is_zero() {
            return Err(KubeError::InvalidConfig(format!(
                "account '{}': caching.pollInterval must be positive",
                self.name
            )));
        }

        let mut seen = BTreeSet::new();
        if let Some(duplicate) = self.namespaces.iter().find(|ns| !seen.insert(ns.as_str())) {
            return Err(KubeError::InvalidConfig(format!(
                "account '{}': namespace '{}' listed twice",
                self.name, duplicate
            )));
        }

        let mut seen = BTreeSet::new();
        if let Some(duplicate) = self.custom_kinds.iter().find(|c| !seen.insert(&c.kind)) {
            return Err(KubeError::InvalidConfig(format!(
                "account '{}': custom kind '{}' declared twice",
                self.name, duplicate.kind
            )));
        }
        Ok(())
    }

    /// Credentials value handed to caching agents
    pub fn credentials(&self) -> AccountCredentials {
        let omitted: BTreeSet<&str> = self.omit_namespaces.iter().map(String::as_str).collect();
        let namespaces = if self.namespaces.is_empty() {
            vec!["default".to_string()]
        } else {
            self.namespaces.clone()
        };

        AccountCredentials {
            name: self.name.clone(),
            namespaces: namespaces
                .into_iter()
                .filter(|ns| !omitted.contains(ns.as_str()))
                .collect(),
            kinds: self.kinds.clone(),
        }
    }
}

/// What a caching agent needs to know about its account
///
/// Identity only; authentication lives with the cluster client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCredentials {
    pub name: String,
    /// Namespaces in scope, in configured order
    pub namespaces: Vec<String>,
    /// Kinds in scope; empty means all registered kinds
    pub kinds: Vec<ResourceKind>,
}

impl AccountCredentials {
    pub fn new(name: impl Into<String>, namespaces: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            namespaces: namespaces.into_iter().map(Into::into).collect(),
            kinds: Vec::new(),
        }
    }
}

/// Serialize a priority by its case-insensitive name
mod priority_name {
    use kindling_core::DeployPriority;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(priority: &DeployPriority, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(priority.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DeployPriority, D::Error> {
        let name = String::deserialize(d)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"
name: prod
namespaces: [default, payments, kube-system]
omitNamespaces: [kube-system]
kinds: [deployment, Service]
customKinds:
  - kind: Certificate.cert-manager.io
    deployPriority: network_resource_priority
  - kind: Widget.example.com
artifactBinding: match-name-only
caching:
  agentCount: 4
  pollInterval: 45s
"#;

    #[test]
    fn test_parse_full() {
        let config = AccountConfig::from_yaml(FULL).unwrap();
        assert_eq!(config.name, "prod");
        assert_eq!(config.artifact_binding, BindingMode::MatchNameOnly);
        assert_eq!(config.caching.agent_count, 4);
        assert_eq!(config.caching.poll_interval, Duration::from_secs(45));
        assert_eq!(config.kinds, vec![ResourceKind::DEPLOYMENT, ResourceKind::SERVICE]);
        assert_eq!(
            config.custom_kinds[0].deploy_priority,
            DeployPriority::NetworkResourcePriority
        );
        assert_eq!(config.custom_kinds[1].deploy_priority, DeployPriority::LowestPriority);
    }

    #[test]
    fn test_defaults() {
        let config = AccountConfig::from_yaml("name: dev\n").unwrap();
        assert_eq!(config.artifact_binding, BindingMode::MatchNameAndTag);
        assert_eq!(config.caching, CachingConfig::default());
        assert_eq!(config.credentials().namespaces, vec!["default"]);
    }

    #[test]
    fn test_credentials_drop_omitted_namespaces() {
        let credentials = AccountConfig::from_yaml(FULL).unwrap().credentials();
        assert_eq!(credentials.namespaces, vec!["default", "payments"]);
        assert_eq!(credentials.name, "prod");
    }

    #[test]
    fn test_unknown_priority_is_rejected() {
        let yaml = "name: x\ncustomKinds:\n  - kind: A.b.c\n    deployPriority: first\n";
        let err = AccountConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("No such priority 'first'"));
    }

    #[test]
    fn test_unknown_binding_is_rejected() {
        assert!(AccountConfig::from_yaml("name: x\nartifactBinding: fuzzy\n").is_err());
    }

    #[test]
    fn test_validation() {
        let zero_agents = "name: x\ncaching:\n  agentCount: 0\n";
        assert!(matches!(
            AccountConfig::from_yaml(zero_agents),
            Err(KubeError::InvalidConfig(_))
        ));

        let duplicate = "name: x\nnamespaces: [a, a]\n";
        assert!(matches!(
            AccountConfig::from_yaml(duplicate),
            Err(KubeError::InvalidConfig(msg)) if msg.contains("listed twice")
        ));

        assert!(AccountConfig::from_yaml("name: \"\"\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        let config = AccountConfig::load_from(file.path()).unwrap();
        assert_eq!(config.name, "prod");

        let missing = AccountConfig::load_from(Path::new("/definitely/not/here.yaml"));
        assert!(matches!(missing, Err(KubeError::Io(_))));
    }
}
