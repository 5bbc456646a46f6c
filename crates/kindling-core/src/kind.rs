//! Resource kind identifiers and their coarse Spinnaker categories

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Identifier for a Kubernetes resource type
///
/// Built-in kinds carry no API group and print as their bare name
/// (`Deployment`). Custom kinds keep their group and print as
/// `Name.group` (`Certificate.cert-manager.io`). Parsing is
/// case-insensitive for built-in kinds and always yields canonical casing,
/// so `kind.to_string().parse()` returns the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKind {
    name: Cow<'static, str>,
    group: Option<Cow<'static, str>>,
}

macro_rules! builtin_kinds {
    ($($konst:ident => $name:literal),* $(,)?) => {
        impl ResourceKind {
            $(pub const $konst: ResourceKind = ResourceKind::builtin($name);)*

            /// Every kind with a built-in handler
            pub const BUILTIN: &'static [ResourceKind] = &[$(ResourceKind::$konst),*];
        }
    };
}

builtin_kinds! {
    API_SERVICE => "APIService",
    CLUSTER_ROLE => "ClusterRole",
    CLUSTER_ROLE_BINDING => "ClusterRoleBinding",
    CONFIG_MAP => "ConfigMap",
    CRON_JOB => "CronJob",
    CUSTOM_RESOURCE_DEFINITION => "CustomResourceDefinition",
    DAEMON_SET => "DaemonSet",
    DEPLOYMENT => "Deployment",
    HORIZONTAL_POD_AUTOSCALER => "HorizontalPodAutoscaler",
    INGRESS => "Ingress",
    JOB => "Job",
    LIMIT_RANGE => "LimitRange",
    MUTATING_WEBHOOK_CONFIGURATION => "MutatingWebhookConfiguration",
    NAMESPACE => "Namespace",
    NETWORK_POLICY => "NetworkPolicy",
    PERSISTENT_VOLUME => "PersistentVolume",
    PERSISTENT_VOLUME_CLAIM => "PersistentVolumeClaim",
    POD => "Pod",
    POD_DISRUPTION_BUDGET => "PodDisruptionBudget",
    REPLICA_SET => "ReplicaSet",
    RESOURCE_QUOTA => "ResourceQuota",
    ROLE => "Role",
    ROLE_BINDING => "RoleBinding",
    SECRET => "Secret",
    SERVICE => "Service",
    SERVICE_ACCOUNT => "ServiceAccount",
    STATEFUL_SET => "StatefulSet",
    STORAGE_CLASS => "StorageClass",
    VALIDATING_WEBHOOK_CONFIGURATION => "ValidatingWebhookConfiguration",
}

impl ResourceKind {
    /// API groups serving the built-in kinds besides the core group
    pub const BUILTIN_GROUPS: &'static [&'static str] = &[
        "admissionregistration.k8s.io",
        "apiextensions.k8s.io",
        "apiregistration.k8s.io",
        "apps",
        "autoscaling",
        "batch",
        "extensions",
        "networking.k8s.io",
        "policy",
        "rbac.authorization.k8s.io",
        "storage.k8s.io",
    ];

    const fn builtin(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            group: None,
        }
    }

    /// Create a custom kind with an explicit API group
    pub fn custom(name: impl Into<String>, group: impl Into<String>) -> Self {
        let group = group.into();
        Self {
            name: Cow::Owned(name.into()),
            group: (!group.is_empty()).then_some(Cow::Owned(group)),
        }
    }

    /// Resolve a kind from a manifest's `kind` and `apiVersion` fields
    ///
    /// A built-in name only resolves to the built-in kind when the group is
    /// core or one of [`Self::BUILTIN_GROUPS`]. Anything else keeps the group
    /// taken from `apiVersion` (`cert-manager.io/v1` -> `cert-manager.io`).
    pub fn from_parts(kind: &str, api_version: Option<&str>) -> Self {
        let group = api_version
            .and_then(|v| v.rsplit_once('/'))
            .map(|(g, _)| g)
            .filter(|g| !g.is_empty());

        match group {
            Some(group) if !Self::BUILTIN_GROUPS.contains(&group) => Self::custom(kind, group),
            _ => Self::lookup_builtin(kind).cloned().unwrap_or_else(|| match group {
                Some(group) => Self::custom(kind, group),
                None => Self {
                    name: Cow::Owned(kind.to_string()),
                    group: None,
                },
            }),
        }
    }

    /// Kind name without the group
    pub fn name(&self) -> &str {
        &self.name
    }

    /// API group for custom kinds
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Whether this is one of the built-in kinds
    pub fn is_builtin(&self) -> bool {
        self.group.is_none() && Self::lookup_builtin(&self.name).is_some()
    }

    /// Whether instances of this kind live outside any namespace
    pub fn is_cluster_scoped(&self) -> bool {
        matches!(
            self.name.as_ref(),
            "APIService"
                | "ClusterRole"
                | "ClusterRoleBinding"
                | "CustomResourceDefinition"
                | "MutatingWebhookConfiguration"
                | "Namespace"
                | "PersistentVolume"
                | "StorageClass"
                | "ValidatingWebhookConfiguration"
        ) && self.group.is_none()
    }

    fn lookup_builtin(name: &str) -> Option<&'static ResourceKind> {
        Self::BUILTIN
            .iter()
            .find(|k| k.name.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}.{}", self.name, group),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CoreError::InvalidKind {
                value: s.to_string(),
                message: "kind must not be empty".to_string(),
            });
        }

        match s.split_once('.') {
            None => Ok(Self::lookup_builtin(s)
                .cloned()
                .unwrap_or_else(|| Self {
                    name: Cow::Owned(s.to_string()),
                    group: None,
                })),
            Some((name, group)) if !name.is_empty() && !group.is_empty() => {
                Ok(Self::custom(name, group))
            }
            Some(_) => Err(CoreError::InvalidKind {
                value: s.to_string(),
                message: "expected 'Kind' or 'Kind.group'".to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ResourceKind {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.to_string()
    }
}

/// Coarse category a resource kind belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum SpinnakerKind {
    Workloads,
    Configs,
    Network,
    ServiceAccounts,
    Namespaces,
    Storage,
    Rbac,
    Unclassified,
}

impl fmt::Display for SpinnakerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Workloads => "WORKLOADS",
            Self::Configs => "CONFIGS",
            Self::Network => "NETWORK",
            Self::ServiceAccounts => "SERVICE_ACCOUNTS",
            Self::Namespaces => "NAMESPACES",
            Self::Storage => "STORAGE",
            Self::Rbac => "RBAC",
            Self::Unclassified => "UNCLASSIFIED",
        };
        write!(f, "{}", s)
    }
}
