//! Service handler

use std::collections::BTreeMap;

use kindling_core::{DeployPriority, Manifest, ResourceKind, SpinnakerKind};
use serde_json::Value;

use super::{KindHandler, Profile};
use crate::relationships::{RelationshipMap, ResourcesByKind, pod_labels, selector_matches};
use crate::sort::{self, Comparator};
use crate::status::{self, Status};

/// Kinds whose pods a service can select
const SELECTABLE: [ResourceKind; 6] = [
    ResourceKind::DEPLOYMENT,
    ResourceKind::REPLICA_SET,
    ResourceKind::STATEFUL_SET,
    ResourceKind::DAEMON_SET,
    ResourceKind::JOB,
    ResourceKind::POD,
];

pub struct ServiceHandler {
    profile: Profile,
}

impl ServiceHandler {
    pub fn new() -> Self {
        Self {
            profile: Profile::new(
                ResourceKind::SERVICE,
                DeployPriority::NetworkResourcePriority,
                SpinnakerKind::Network,
            ),
        }
    }
}

impl Default for ServiceHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn selector(service: &Manifest) -> BTreeMap<String, String> {
    service
        .pointer("/spec/selector")
        .and_then(Value::as_object)
        .map(|selector| {
            selector
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

impl KindHandler for ServiceHandler {
    fn kind(&self) -> ResourceKind {
        self.profile.kind.clone()
    }

    fn deploy_priority(&self) -> DeployPriority {
        self.profile.priority
    }

    fn spinnaker_kind(&self) -> SpinnakerKind {
        self.profile.spinnaker_kind
    }

    fn status(&self, manifest: &Manifest) -> Status {
        status::service(manifest)
    }

    fn size_comparator(&self) -> Comparator {
        sort::unordered()
    }

    /// Link each service to the workloads in its namespace whose pod labels
    /// satisfy its selector
    fn add_relationships(&self, resources: &ResourcesByKind, relationships: &mut RelationshipMap) {
        let Some(services) = resources.get(&ResourceKind::SERVICE) else {
            return;
        };

        for service in services {
            let selector = selector(service);
            if selector.is_empty() {
                continue;
            }
            let from = service.reference();

            for kind in &SELECTABLE {
                let Some(workloads) = resources.get(kind) else {
                    continue;
                };
                workloads
                    .iter()
                    .filter(|w| w.namespace() == service.namespace())
                    .filter(|w| selector_matches(&selector, &pod_labels(w)))
                    .for_each(|w| relationships.add(from.clone(), w.reference()));
            }
        }
    }
}
