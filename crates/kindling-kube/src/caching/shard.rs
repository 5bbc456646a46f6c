//! Deterministic assignment of work units to caching agents
//!
//! A work unit is one kind in one namespace (or a cluster-scoped kind). Every
//! unit belongs to exactly one of an account's agents. Namespaced units hash
//! on their namespace, so all kinds of a namespace share an agent and
//! relationships inside a namespace are never split across shards.

use std::fmt;

use kindling_core::ResourceKind;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::AccountCredentials;
use crate::error::{KubeError, Result};

/// One kind in one namespace
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WorkUnit {
    pub kind: ResourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl WorkUnit {
    pub fn new(kind: ResourceKind, namespace: Option<&str>) -> Self {
        let namespace = if kind.is_cluster_scoped() {
            None
        } else {
            namespace.map(String::from)
        };
        Self { kind, namespace }
    }

    fn shard_key(&self, account: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{account}/namespace/{namespace}"),
            None => format!("{account}/kind/{}", self.kind),
        }
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{} in {}", self.kind, namespace),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Reject shard coordinates outside `[0, count)`
pub fn check_shard(index: usize, count: usize) -> Result<()> {
    if count == 0 || index >= count {
        return Err(KubeError::InvalidShard { index, count });
    }
    Ok(())
}

/// Shard owning `unit` among `count` agents
pub fn shard_of(account: &str, unit: &WorkUnit, count: usize) -> usize {
    if count <= 1 {
        return 0;
    }
    let digest = Sha256::digest(unit.shard_key(account).as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) % count as u64) as usize
}

/// Every work unit of an account
///
/// Cluster-scoped kinds appear once; namespaced kinds once per namespace.
pub fn work_units(credentials: &AccountCredentials, kinds: &[ResourceKind]) -> Vec<WorkUnit> {
    let mut units = Vec::new();
    for kind in kinds {
        if kind.is_cluster_scoped() {
            units.push(WorkUnit::new(kind.clone(), None));
        } else {
            units.extend(
                credentials
                    .namespaces
                    .iter()
                    .map(|ns| WorkUnit::new(kind.clone(), Some(ns))),
            );
        }
    }
    units.sort();
    units.dedup();
    units
}

/// Work units of an account split across its agents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardPlan {
    pub account: String,
    pub agent_count: usize,
    pub shards: Vec<Vec<WorkUnit>>,
}

impl ShardPlan {
    pub fn for_account(
        credentials: &AccountCredentials,
        kinds: &[ResourceKind],
        agent_count: usize,
    ) -> Result<Self> {
        check_shard(0, agent_count)?;

        let mut shards = vec![Vec::new(); agent_count];
        for unit in work_units(credentials, kinds) {
            shards[shard_of(&credentials.name, &unit, agent_count)].push(unit);
        }

        Ok(Self {
            account: credentials.name.clone(),
            agent_count,
            shards,
        })
    }

    pub fn units(&self, index: usize) -> &[WorkUnit] {
        self.shards.get(index).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn total_units(&self) -> usize {
        self.shards.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn credentials(namespaces: &[&str]) -> AccountCredentials {
        AccountCredentials::new("prod", namespaces.iter().copied())
    }

    fn kinds() -> Vec<ResourceKind> {
        vec![
            ResourceKind::NAMESPACE,
            ResourceKind::DEPLOYMENT,
            ResourceKind::CONFIG_MAP,
            ResourceKind::SERVICE,
            ResourceKind::CLUSTER_ROLE,
        ]
    }

    #[test]
    fn test_invalid_shards() {
        assert!(check_shard(0, 1).is_ok());
        assert!(matches!(
            check_shard(3, 3),
            Err(KubeError::InvalidShard { index: 3, count: 3 })
        ));
        assert!(check_shard(0, 0).is_err());
        assert!(ShardPlan::for_account(&credentials(&["a"]), &kinds(), 0).is_err());
    }

    #[test]
    fn test_single_agent_owns_everything() {
        let plan = ShardPlan::for_account(&credentials(&["a", "b"]), &kinds(), 1).unwrap();
        assert_eq!(plan.shards.len(), 1);
        // 2 cluster-scoped kinds + 3 namespaced kinds in 2 namespaces
        assert_eq!(plan.total_units(), 8);
    }

    #[test]
    fn test_namespace_stays_together() {
        let plan =
            ShardPlan::for_account(&credentials(&["a", "b", "c", "d", "e"]), &kinds(), 3).unwrap();
        for namespace in ["a", "b", "c", "d", "e"] {
            let owners: BTreeSet<usize> = plan
                .shards
                .iter()
                .enumerate()
                .filter(|(_, units)| {
                    units
                        .iter()
                        .any(|u| u.namespace.as_deref() == Some(namespace))
                })
                .map(|(index, _)| index)
                .collect();
            assert_eq!(owners.len(), 1, "namespace {namespace} split across {owners:?}");
        }
    }

    #[test]
    fn test_cluster_scoped_unit_drops_namespace() {
        let unit = WorkUnit::new(ResourceKind::NAMESPACE, Some("ignored"));
        assert_eq!(unit.namespace, None);
        assert_eq!(unit.to_string(), "Namespace");
    }

    #[test]
    fn test_plan_units_are_sorted() {
        let plan = ShardPlan::for_account(
            &credentials(&["default"]),
            &[ResourceKind::NAMESPACE, ResourceKind::DEPLOYMENT],
            1,
        )
        .unwrap();
        let rendered: Vec<String> = plan.units(0).iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["Deployment in default", "Namespace"]);
        assert!(plan.units(1).is_empty());
    }

    proptest! {
        #[test]
        fn shards_partition_units(
            namespaces in proptest::collection::btree_set("[a-z]{1,8}", 1..12),
            count in 1usize..8,
        ) {
            let namespaces: Vec<&str> = namespaces.iter().map(String::as_str).collect();
            let credentials = credentials(&namespaces);
            let plan = ShardPlan::for_account(&credentials, &kinds(), count).unwrap();

            let all = work_units(&credentials, &kinds());
            let mut seen: Vec<WorkUnit> = plan.shards.iter().flatten().cloned().collect();
            seen.sort();
            prop_assert_eq!(seen, all);
        }

        #[test]
        fn shard_assignment_is_stable(namespace in "[a-z]{1,12}", count in 1usize..16) {
            let unit = WorkUnit::new(ResourceKind::DEPLOYMENT, Some(&namespace));
            let first = shard_of("prod", &unit, count);
            prop_assert!(first < count);
            prop_assert_eq!(first, shard_of("prod", &unit, count));
        }
    }
}
