//! Handlers that differ only in identity and status evaluation

use kindling_core::{DeployPriority, Manifest, ResourceKind, SpinnakerKind};

use super::{KindHandler, Profile};
use crate::status::{self, Status};

/// Data-driven handler for kinds without artifacts or relationships
#[derive(Clone)]
pub struct BasicHandler {
    profile: Profile,
    status: fn(&Manifest) -> Status,
}

impl BasicHandler {
    pub fn new(kind: ResourceKind, priority: DeployPriority, spinnaker_kind: SpinnakerKind) -> Self {
        Self {
            profile: Profile::new(kind, priority, spinnaker_kind),
            status: |_| Status::stable(),
        }
    }

    /// Handler for a custom resource kind
    pub fn custom(kind: ResourceKind, priority: DeployPriority, versioned: bool) -> Self {
        let mut handler = Self::new(kind, priority, SpinnakerKind::Unclassified);
        handler.profile.versioned = versioned;
        handler
    }

    pub fn with_status(mut self, status: fn(&Manifest) -> Status) -> Self {
        self.status = status;
        self
    }

    /// Every built-in kind handled by a `BasicHandler`
    pub fn builtin() -> Vec<Self> {
        use DeployPriority as P;
        use ResourceKind as K;
        use SpinnakerKind as S;

        vec![
            Self::new(K::NAMESPACE, P::NamespacePriority, S::Namespaces),
            Self::new(K::CUSTOM_RESOURCE_DEFINITION, P::ResourceDefinitionPriority, S::Unclassified),
            Self::new(K::STORAGE_CLASS, P::StorageClassPriority, S::Storage),
            Self::new(K::MUTATING_WEBHOOK_CONFIGURATION, P::AdmissionPriority, S::Unclassified),
            Self::new(K::VALIDATING_WEBHOOK_CONFIGURATION, P::AdmissionPriority, S::Unclassified),
            Self::new(K::LIMIT_RANGE, P::AdmissionPriority, S::Unclassified),
            Self::new(K::RESOURCE_QUOTA, P::AdmissionPriority, S::Unclassified),
            Self::new(K::SERVICE_ACCOUNT, P::ServiceAccountPriority, S::ServiceAccounts),
            Self::new(K::ROLE, P::RolePriority, S::Rbac),
            Self::new(K::CLUSTER_ROLE, P::RolePriority, S::Rbac),
            Self::new(K::ROLE_BINDING, P::RoleBindingPriority, S::Rbac),
            Self::new(K::CLUSTER_ROLE_BINDING, P::RoleBindingPriority, S::Rbac),
            Self::new(K::PERSISTENT_VOLUME, P::MountableDataBackingResourcePriority, S::Storage),
            Self::new(K::PERSISTENT_VOLUME_CLAIM, P::MountableDataPriority, S::Storage)
                .with_status(status::persistent_volume_claim),
            Self::new(K::INGRESS, P::NetworkResourcePriority, S::Network),
            Self::new(K::NETWORK_POLICY, P::NetworkResourcePriority, S::Network),
            Self::new(K::API_SERVICE, P::ApiServicePriority, S::Unclassified),
            Self::new(K::POD_DISRUPTION_BUDGET, P::PdbPriority, S::Unclassified),
        ]
    }
}

impl KindHandler for BasicHandler {
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

    fn status(&self, manifest: &Manifest) -> Status {
        (self.status)(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Health;

    #[test]
    fn test_custom_handler() {
        let kind = ResourceKind::custom("Certificate", "cert-manager.io");
        let handler = BasicHandler::custom(kind.clone(), DeployPriority::NetworkResourcePriority, true);
        assert_eq!(handler.kind(), kind);
        assert_eq!(handler.deploy_priority().weight(), 70);
        assert!(handler.versioned());
        assert_eq!(handler.spinnaker_kind(), SpinnakerKind::Unclassified);
    }

    #[test]
    fn test_pvc_status() {
        let pvc = BasicHandler::builtin()
            .into_iter()
            .find(|h| h.kind() == ResourceKind::PERSISTENT_VOLUME_CLAIM)
            .unwrap();
        let pending = Manifest::from_yaml(
            "apiVersion: v1\nkind: PersistentVolumeClaim\nmetadata:\n  name: d\nstatus:\n  phase: Pending\n",
        )
        .unwrap();
        assert_eq!(pvc.status(&pending).health, Health::Unstable);
    }

    #[test]
    fn test_rbac_ordering() {
        let handlers = BasicHandler::builtin();
        let weight = |kind: ResourceKind| {
            handlers
                .iter()
                .find(|h| h.kind() == kind)
                .map(|h| h.deploy_priority().weight())
                .unwrap()
        };
        assert!(weight(ResourceKind::NAMESPACE) < weight(ResourceKind::CUSTOM_RESOURCE_DEFINITION));
        assert!(weight(ResourceKind::ROLE) < weight(ResourceKind::ROLE_BINDING));
        assert!(weight(ResourceKind::ROLE_BINDING) < weight(ResourceKind::INGRESS));
    }
}
