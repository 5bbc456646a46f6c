//! Destinations for cache results

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::CacheData;
use crate::error::Result;
use crate::relationships::RelationshipMap;

/// Receives the result of each successful poll
#[async_trait]
pub trait CacheSink: Send + Sync {
    async fn store(&self, data: CacheData) -> Result<()>;
}

/// Keeps every stored result in memory
#[derive(Clone, Default)]
pub struct MemoryCacheSink {
    batches: Arc<RwLock<Vec<CacheData>>>,
}

impl MemoryCacheSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relationships across the account, from each agent's latest batch
    pub fn relationships(&self) -> RelationshipMap {
        let batches = self.batches.read().unwrap();
        let mut seen = BTreeSet::new();
        let mut merged = RelationshipMap::new();
        for batch in batches.iter().rev() {
            if seen.insert(batch.agent_id.as_str()) {
                merged.extend(batch.relationships.clone());
            }
        }
        merged
    }

    /// Most recent batch stored by `agent_id`
    pub fn latest(&self, agent_id: &str) -> Option<CacheData> {
        self.batches
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|batch| batch.agent_id == agent_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.batches.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheSink for MemoryCacheSink {
    async fn store(&self, data: CacheData) -> Result<()> {
        tracing::debug!(agent = %data.agent_id, resources = data.resource_count(), "storing cache batch");
        self.batches.write().unwrap().push(data);
        Ok(())
    }
}
