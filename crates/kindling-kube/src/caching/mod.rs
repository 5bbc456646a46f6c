//! Sharded caching agents
//!
//! An account's (kind, namespace) work units are split across `agent_count`
//! agents. Each agent polls the units it owns on its own interval, strips
//! sensitive keys, builds relationships for its slice and hands the batch to a
//! [`CacheSink`]. Failures stay inside the loop that hit them.

mod lister;
mod shard;
mod sink;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use kindling_core::{Manifest, ResourceKind};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{MissedTickBehavior, interval};

use crate::config::AccountCredentials;
use crate::error::{KubeError, Result};
use crate::registry::HandlerRegistry;
use crate::relationships::{RelationshipMap, ResourcesByKind, group_by_kind};
use crate::search::InfrastructureCacheKey;

pub use lister::{KubeResourceLister, MockResourceLister, ResourceLister};
pub use shard::{ShardPlan, WorkUnit, check_shard, shard_of, work_units};
pub use sink::{CacheSink, MemoryCacheSink};

const AGENT_TYPE: &str = "KubernetesCachingAgent";

/// Result of one poll of one agent
#[derive(Debug, Clone, PartialEq)]
pub struct CacheData {
    pub agent_id: String,
    pub account: String,
    pub resources: ResourcesByKind,
    pub relationships: RelationshipMap,
}

impl CacheData {
    pub fn resource_count(&self) -> usize {
        self.resources.values().map(Vec::len).sum()
    }

    /// Cache keys of every manifest in the batch
    pub fn keys(&self) -> Vec<InfrastructureCacheKey> {
        self.resources
            .values()
            .flatten()
            .map(|m| InfrastructureCacheKey::for_manifest(&self.account, m))
            .collect()
    }
}

/// One shard of an account's polling work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachingAgent {
    credentials: AccountCredentials,
    kinds: Vec<ResourceKind>,
    index: usize,
    count: usize,
    poll_interval: Duration,
}

impl CachingAgent {
    /// Validate shard coordinates; performs no I/O
    pub fn new(
        credentials: AccountCredentials,
        kinds: Vec<ResourceKind>,
        index: usize,
        count: usize,
        poll_interval: Duration,
    ) -> Result<Self> {
        check_shard(index, count)?;
        if poll_interval.is_zero() {
            return Err(KubeError::InvalidConfig(format!(
                "account '{}': poll interval must be positive",
                credentials.name
            )));
        }
        Ok(Self {
            credentials,
            kinds,
            index,
            count,
            poll_interval,
        })
    }

    /// Stable identifier, e.g. `prod/KubernetesCachingAgent[1/4]`
    pub fn id(&self) -> String {
        format!(
            "{}/{AGENT_TYPE}[{}/{}]",
            self.credentials.name,
            self.index + 1,
            self.count
        )
    }

    pub fn kinds(&self) -> &[ResourceKind] {
        &self.kinds
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Whether this agent is responsible for `kind` in `namespace`
    pub fn owns(&self, kind: &ResourceKind, namespace: Option<&str>) -> bool {
        let unit = WorkUnit::new(kind.clone(), namespace);
        shard_of(&self.credentials.name, &unit, self.count) == self.index
    }

    /// Work units this agent polls
    pub fn units(&self) -> Vec<WorkUnit> {
        work_units(&self.credentials, &self.kinds)
            .into_iter()
            .filter(|unit| shard_of(&self.credentials.name, unit, self.count) == self.index)
            .collect()
    }

    /// List every owned unit once and assemble the batch
    ///
    /// Any failed listing fails the whole poll so a partial snapshot is never
    /// stored.
    pub async fn poll(
        &self,
        registry: &HandlerRegistry,
        lister: &dyn ResourceLister,
    ) -> Result<CacheData> {
        let units = self.units();
        let listings = join_all(
            units
                .iter()
                .map(|unit| lister.list(&unit.kind, unit.namespace.as_deref())),
        )
        .await;

        let mut manifests: Vec<Manifest> = Vec::new();
        for (unit, listing) in units.iter().zip(listings) {
            let mut listed = listing?;
            tracing::debug!(agent = %self.id(), unit = %unit, count = listed.len(), "listed");
            if let Some(handler) = registry.handler(&unit.kind) {
                listed.iter_mut().for_each(|m| handler.remove_sensitive_keys(m));
            }
            manifests.extend(listed);
        }

        let resources = group_by_kind(manifests);
        let relationships = registry.build_relationships(&resources);

        Ok(CacheData {
            agent_id: self.id(),
            account: self.credentials.name.clone(),
            resources,
            relationships,
        })
    }

    /// Poll and store on every tick until `shutdown` flips to `true`
    pub async fn run(
        self,
        registry: Arc<HandlerRegistry>,
        lister: Arc<dyn ResourceLister>,
        sink: Arc<dyn CacheSink>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let id = self.id();
        tracing::info!(agent = %id, units = self.units().len(), interval = ?self.poll_interval, "caching agent started");

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    match self.poll(&registry, lister.as_ref()).await {
                        Ok(data) => {
                            let resources = data.resource_count();
                            let edges = data.relationships.edge_count();
                            match sink.store(data).await {
                                Ok(()) => tracing::info!(agent = %id, resources, edges, "poll complete"),
                                Err(e) => tracing::warn!(agent = %id, error = %e, "failed to store cache batch"),
                            }
                        }
                        Err(e) => tracing::warn!(agent = %id, error = %e, "poll failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!(agent = %id, "caching agent stopped");
    }
}

/// One agent per shard of an account
///
/// With no kinds configured, every kind the registry knows is cached.
pub fn build_account_agents(
    registry: &HandlerRegistry,
    credentials: &AccountCredentials,
    agent_count: usize,
    poll_interval: Duration,
) -> Result<Vec<CachingAgent>> {
    check_shard(0, agent_count)?;
    let kinds: Vec<ResourceKind> = if credentials.kinds.is_empty() {
        registry.kinds().cloned().collect()
    } else {
        credentials.kinds.clone()
    };

    (0..agent_count)
        .map(|index| {
            CachingAgent::new(
                credentials.clone(),
                kinds.clone(),
                index,
                agent_count,
                poll_interval,
            )
        })
        .collect()
}

/// Run each agent on its own task
pub fn spawn_agents(
    agents: Vec<CachingAgent>,
    registry: Arc<HandlerRegistry>,
    lister: Arc<dyn ResourceLister>,
    sink: Arc<dyn CacheSink>,
    shutdown: watch::Receiver<bool>,
) -> JoinSet<()> {
    let mut set = JoinSet::new();
    for agent in agents {
        set.spawn(agent.run(
            Arc::clone(&registry),
            Arc::clone(&lister),
            Arc::clone(&sink),
            shutdown.clone(),
        ));
    }
    set
}
