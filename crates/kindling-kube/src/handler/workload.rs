//! Pod-producing kinds

use kindling_core::{DeployPriority, Manifest, ResourceKind, SpinnakerKind};

use super::{KindHandler, Profile};
use crate::artifact::{ArtifactReplacer, Replacer, roots};
use crate::relationships::{RelationshipMap, ResourcesByKind, SnapshotIndex, pod_spec_references};
use crate::status::{self, Status, Warning};

const TEMPLATE_POD_SPEC: &str = "/spec/template/spec";
const CRON_JOB_POD_SPEC: &str = "/spec/jobTemplate/spec/template/spec";
const POD_SPEC: &str = "/spec";

/// Handler for workloads and workload controllers
///
/// Binds images and config references in the pod spec, reports health from
/// the controller status and links each workload to the config maps, secrets
/// and service account it mounts as well as to its owners.
pub struct WorkloadHandler {
    profile: Profile,
    replacer: ArtifactReplacer,
    pod_spec: &'static str,
    status: fn(&Manifest) -> Status,
}

impl WorkloadHandler {
    fn new(
        profile: Profile,
        root: &str,
        pod_spec: &'static str,
        status: fn(&Manifest) -> Status,
    ) -> Self {
        Self {
            profile,
            replacer: ArtifactReplacer::new(Replacer::pod_spec_set(root)),
            pod_spec,
            status,
        }
    }

    fn controller(kind: ResourceKind, status: fn(&Manifest) -> Status) -> Self {
        Self::new(
            Profile::new(kind, DeployPriority::WorkloadControllerPriority, SpinnakerKind::Workloads),
            roots::POD_TEMPLATE,
            TEMPLATE_POD_SPEC,
            status,
        )
    }

    pub fn deployment() -> Self {
        Self::controller(ResourceKind::DEPLOYMENT, status::deployment)
    }

    pub fn replica_set() -> Self {
        let mut handler = Self::controller(ResourceKind::REPLICA_SET, status::replica_set);
        handler.profile = handler.profile.versioned();
        handler
    }

    pub fn stateful_set() -> Self {
        Self::controller(ResourceKind::STATEFUL_SET, status::stateful_set)
    }

    pub fn daemon_set() -> Self {
        Self::controller(ResourceKind::DAEMON_SET, status::daemon_set)
    }

    pub fn job() -> Self {
        Self::controller(ResourceKind::JOB, status::job)
    }

    pub fn cron_job() -> Self {
        Self::new(
            Profile::new(
                ResourceKind::CRON_JOB,
                DeployPriority::WorkloadControllerPriority,
                SpinnakerKind::Workloads,
            ),
            roots::CRON_JOB_TEMPLATE,
            CRON_JOB_POD_SPEC,
            |_| Status::stable(),
        )
    }

    pub fn pod() -> Self {
        Self::new(
            Profile::new(ResourceKind::POD, DeployPriority::WorkloadPriority, SpinnakerKind::Workloads)
                .versioned(),
            roots::POD,
            POD_SPEC,
            status::pod,
        )
    }

    pub fn all() -> Vec<Self> {
        vec![
            Self::deployment(),
            Self::replica_set(),
            Self::stateful_set(),
            Self::daemon_set(),
            Self::job(),
            Self::cron_job(),
            Self::pod(),
        ]
    }
}

impl KindHandler for WorkloadHandler {
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

    fn list_warnings(&self, manifest: &Manifest) -> Vec<Warning> {
        let mut warnings = status::mutable_image_warnings(manifest, self.pod_spec);
        if self.profile.kind == ResourceKind::POD {
            warnings.extend(status::restart_warnings(manifest));
        }
        warnings
    }

    fn artifact_replacer(&self) -> &ArtifactReplacer {
        &self.replacer
    }

    fn add_relationships(&self, resources: &ResourcesByKind, relationships: &mut RelationshipMap) {
        let Some(workloads) = resources.get(&self.profile.kind) else {
            return;
        };
        let index = SnapshotIndex::new(resources);

        for workload in workloads {
            let from = workload.reference();
            let namespace = workload.namespace();

            if let Some(spec) = workload.pointer(self.pod_spec) {
                let refs = pod_spec_references(spec);
                let targets = refs
                    .config_maps
                    .iter()
                    .filter_map(|name| index.find(ResourceKind::CONFIG_MAP, namespace, name))
                    .chain(
                        refs.secrets
                            .iter()
                            .filter_map(|name| index.find(ResourceKind::SECRET, namespace, name)),
                    )
                    .chain(refs.service_account.as_deref().and_then(|name| {
                        index.find(ResourceKind::SERVICE_ACCOUNT, namespace, name)
                    }));
                for target in targets {
                    relationships.add(from.clone(), target);
                }
            }

            for owner in workload.owner_references() {
                if let Some(target) = index.find(owner.resource_kind(), namespace, &owner.name) {
                    relationships.add(from.clone(), target);
                }
            }
        }
    }
}
