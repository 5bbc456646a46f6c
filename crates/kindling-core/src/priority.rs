//! Deploy priorities
//!
//! Lower weight deploys first. Several priorities intentionally share a
//! weight; ordering between them is left to a stable sort over the input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Named deploy priority of a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeployPriority {
    NamespacePriority,
    RolePriority,
    RoleBindingPriority,
    ResourceDefinitionPriority,
    AdmissionPriority,
    StorageClassPriority,
    ServiceAccountPriority,
    MountableDataBackingResourcePriority,
    MountableDataPriority,
    NetworkResourcePriority,
    ApiServicePriority,
    PdbPriority,
    WorkloadModifierPriority,
    /// Same weight as [`DeployPriority::WorkloadControllerPriority`]: a bare
    /// workload and a controller need no ordering between them.
    WorkloadPriority,
    WorkloadControllerPriority,
    WorkloadAttachmentPriority,
    LowestPriority,
}

impl DeployPriority {
    /// All priorities, in declaration order
    pub const ALL: [DeployPriority; 17] = [
        Self::NamespacePriority,
        Self::RolePriority,
        Self::RoleBindingPriority,
        Self::ResourceDefinitionPriority,
        Self::AdmissionPriority,
        Self::StorageClassPriority,
        Self::ServiceAccountPriority,
        Self::MountableDataBackingResourcePriority,
        Self::MountableDataPriority,
        Self::NetworkResourcePriority,
        Self::ApiServicePriority,
        Self::PdbPriority,
        Self::WorkloadModifierPriority,
        Self::WorkloadPriority,
        Self::WorkloadControllerPriority,
        Self::WorkloadAttachmentPriority,
        Self::LowestPriority,
    ];

    /// Ordering weight
    pub const fn weight(self) -> u32 {
        match self {
            Self::NamespacePriority => 0,
            Self::RolePriority => 20,
            Self::RoleBindingPriority | Self::ResourceDefinitionPriority => 30,
            Self::AdmissionPriority
            | Self::StorageClassPriority
            | Self::ServiceAccountPriority
            | Self::MountableDataBackingResourcePriority => 40,
            Self::MountableDataPriority => 50,
            Self::NetworkResourcePriority => 70,
            Self::ApiServicePriority => 80,
            Self::PdbPriority | Self::WorkloadModifierPriority => 90,
            Self::WorkloadPriority | Self::WorkloadControllerPriority => 100,
            Self::WorkloadAttachmentPriority => 110,
            Self::LowestPriority => 1000,
        }
    }

    /// Canonical name, as accepted by [`FromStr`]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NamespacePriority => "NAMESPACE_PRIORITY",
            Self::RolePriority => "ROLE_PRIORITY",
            Self::RoleBindingPriority => "ROLE_BINDING_PRIORITY",
            Self::ResourceDefinitionPriority => "RESOURCE_DEFINITION_PRIORITY",
            Self::AdmissionPriority => "ADMISSION_PRIORITY",
            Self::StorageClassPriority => "STORAGE_CLASS_PRIORITY",
            Self::ServiceAccountPriority => "SERVICE_ACCOUNT_PRIORITY",
            Self::MountableDataBackingResourcePriority => {
                "MOUNTABLE_DATA_BACKING_RESOURCE_PRIORITY"
            }
            Self::MountableDataPriority => "MOUNTABLE_DATA_PRIORITY",
            Self::NetworkResourcePriority => "NETWORK_RESOURCE_PRIORITY",
            Self::ApiServicePriority => "API_SERVICE_PRIORITY",
            Self::PdbPriority => "PDB_PRIORITY",
            Self::WorkloadModifierPriority => "WORKLOAD_MODIFIER_PRIORITY",
            Self::WorkloadPriority => "WORKLOAD_PRIORITY",
            Self::WorkloadControllerPriority => "WORKLOAD_CONTROLLER_PRIORITY",
            Self::WorkloadAttachmentPriority => "WORKLOAD_ATTACHMENT_PRIORITY",
            Self::LowestPriority => "LOWEST_PRIORITY",
        }
    }
}

impl fmt::Display for DeployPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeployPriority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::PriorityNotFound {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!(
            "workload_attachment_priority".parse::<DeployPriority>().unwrap(),
            DeployPriority::WorkloadAttachmentPriority
        );
        assert_eq!(
            "Namespace_Priority".parse::<DeployPriority>().unwrap(),
            DeployPriority::NamespacePriority
        );
    }

    #[test]
    fn test_from_str_unknown() {
        let err = "BOGUS_PRIORITY".parse::<DeployPriority>().unwrap_err();
        assert!(matches!(err, CoreError::PriorityNotFound { ref name } if name == "BOGUS_PRIORITY"));
        assert_eq!(err.to_string(), "No such priority 'BOGUS_PRIORITY'");
    }

    #[test]
    fn test_names_round_trip() {
        for priority in DeployPriority::ALL {
            assert_eq!(priority.to_string().parse::<DeployPriority>().unwrap(), priority);
        }
    }

    #[test]
    fn test_workload_tie_is_intentional() {
        assert_eq!(
            DeployPriority::WorkloadPriority.weight(),
            DeployPriority::WorkloadControllerPriority.weight()
        );
        assert!(
            DeployPriority::WorkloadAttachmentPriority.weight()
                > DeployPriority::WorkloadControllerPriority.weight()
        );
    }

    #[test]
    fn test_dependencies_before_workloads() {
        let workload = DeployPriority::WorkloadControllerPriority.weight();
        for dependency in [
            DeployPriority::NamespacePriority,
            DeployPriority::RolePriority,
            DeployPriority::RoleBindingPriority,
            DeployPriority::ResourceDefinitionPriority,
            DeployPriority::ServiceAccountPriority,
            DeployPriority::MountableDataPriority,
        ] {
            assert!(dependency.weight() < workload, "{dependency} should precede workloads");
        }
    }

    #[test]
    fn test_serde_uses_names() {
        let json = serde_json::to_string(&DeployPriority::PdbPriority).unwrap();
        assert_eq!(json, "\"PDB_PRIORITY\"");
    }
}
