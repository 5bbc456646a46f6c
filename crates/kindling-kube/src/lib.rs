//! Kindling Kube - Per-kind Kubernetes policies
//!
//! This crate provides:
//! - **Handlers**: one policy object per kind (deploy priority, status, warnings)
//! - **Artifact Binding**: rewrite image and config references under a binding mode
//! - **Relationships**: link manifests in a snapshot to what they mount, select or scale
//! - **Sensitive Keys**: strip secret payloads before anything is cached
//! - **Caching Agents**: deterministic sharding of (kind, namespace) polling work
//! - **Search**: infrastructure cache keys and search result hydration

pub mod artifact;
pub mod caching;
pub mod config;
pub mod error;
pub mod handler;
pub mod registry;
pub mod relationships;
pub mod search;
pub mod sort;
pub mod status;

pub use artifact::{ArtifactReplacer, BindingMode, FieldPath, ReplaceResult, Replacer};
pub use caching::{
    CacheData, CacheSink, CachingAgent, KubeResourceLister, MemoryCacheSink, MockResourceLister,
    ResourceLister, ShardPlan, WorkUnit, build_account_agents, shard_of, spawn_agents,
};
pub use config::{AccountConfig, AccountCredentials, CachingConfig, CustomKindConfig};
pub use error::{KindError, KubeError, Result};
pub use handler::{
    BasicHandler, ConfigMapHandler, HorizontalPodAutoscalerHandler, KindHandler, SecretHandler,
    ServiceHandler, WorkloadHandler, builtin_handlers,
};
pub use registry::{HandlerRegistry, RegistryBuilder};
pub use relationships::{RelationshipMap, ResourcesByKind, group_by_kind};
pub use search::{InfrastructureCacheKey, JsonKeyEncoder, KeyEncoder, hydrate_search_result};
pub use sort::{Comparator, SortKey};
pub use status::{Health, Status, Warning};
