//! Kind -> handler lookup and the operations built on it

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use kindling_core::{Artifact, DeployPriority, Manifest, ResourceKind};

use crate::artifact::{BindingMode, ReplaceResult};
use crate::config::AccountConfig;
use crate::error::{KindError, Result};
use crate::handler::{BasicHandler, KindHandler, builtin_handlers};
use crate::relationships::{RelationshipMap, ResourcesByKind};
use crate::sort::SortKey;

/// Collects handlers before the registry is frozen
#[derive(Default)]
pub struct RegistryBuilder {
    handlers: Vec<Arc<dyn KindHandler>>,
    binding_mode: BindingMode,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one handler per built-in kind
    pub fn with_builtin_handlers(mut self) -> Self {
        self.handlers
            .extend(builtin_handlers().into_iter().map(Arc::from));
        self
    }

    pub fn register(mut self, handler: impl KindHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Register a data-only handler for a custom kind
    pub fn with_custom_kind(
        self,
        kind: ResourceKind,
        priority: DeployPriority,
        versioned: bool,
    ) -> Self {
        self.register(BasicHandler::custom(kind, priority, versioned))
    }

    pub fn binding_mode(mut self, mode: BindingMode) -> Self {
        self.binding_mode = mode;
        self
    }

    /// Freeze the registry; two handlers for one kind is an error
    pub fn build(self) -> std::result::Result<HandlerRegistry, KindError> {
        let mut handlers = BTreeMap::new();
        for handler in self.handlers {
            let kind = handler.kind();
            if handlers.insert(kind.clone(), handler).is_some() {
                return Err(KindError::DuplicateHandler(kind));
            }
        }
        Ok(HandlerRegistry {
            handlers,
            binding_mode: self.binding_mode,
        })
    }

    /// Freeze the registry, also requiring a handler for each of `kinds`
    pub fn build_requiring(
        self,
        kinds: &[ResourceKind],
    ) -> std::result::Result<HandlerRegistry, KindError> {
        let registry = self.build()?;
        let missing: Vec<ResourceKind> = kinds
            .iter()
            .filter(|kind| !registry.handlers.contains_key(*kind))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(KindError::MissingHandlers(missing));
        }
        Ok(registry)
    }
}

/// Exactly one handler per kind
pub struct HandlerRegistry {
    handlers: BTreeMap<ResourceKind, Arc<dyn KindHandler>>,
    binding_mode: BindingMode,
}

impl HandlerRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Built-in handlers with the default binding mode
    pub fn standard() -> Self {
        let handlers = builtin_handlers()
            .into_iter()
            .map(|handler| (handler.kind(), Arc::from(handler)))
            .collect();
        Self {
            handlers,
            binding_mode: BindingMode::default(),
        }
    }

    /// Built-in handlers plus the account's custom kinds and binding mode
    pub fn for_account(config: &AccountConfig) -> Result<Self> {
        let builder = config.custom_kinds.iter().fold(
            Self::builder()
                .with_builtin_handlers()
                .binding_mode(config.artifact_binding),
            |builder, custom| {
                builder.with_custom_kind(custom.kind.clone(), custom.deploy_priority, custom.versioned)
            },
        );
        Ok(builder.build_requiring(&config.kinds)?)
    }

    pub fn binding_mode(&self) -> BindingMode {
        self.binding_mode
    }

    pub fn kinds(&self) -> impl Iterator<Item = &ResourceKind> {
        self.handlers.keys()
    }

    pub fn handler(&self, kind: &ResourceKind) -> Option<&dyn KindHandler> {
        self.handlers.get(kind).map(|handler| handler.as_ref())
    }

    pub fn try_handler(&self, kind: &ResourceKind) -> std::result::Result<&dyn KindHandler, KindError> {
        self.handler(kind)
            .ok_or_else(|| KindError::Unregistered(kind.clone()))
    }

    /// Deploy priority of a registered kind
    ///
    /// # Panics
    ///
    /// When no handler is registered for `kind`. Callers check manifests with
    /// [`HandlerRegistry::try_handler`] before ordering them.
    pub fn priority_of(&self, kind: &ResourceKind) -> DeployPriority {
        match self.handler(kind) {
            Some(handler) => handler.deploy_priority(),
            None => panic!("no handler registered for kind '{kind}'"),
        }
    }

    /// Stable sort into deploy order
    ///
    /// Every kind is checked before anything moves, so an unregistered kind
    /// leaves the slice as it was.
    pub fn sort_for_deploy(&self, manifests: &mut [Manifest]) -> std::result::Result<(), KindError> {
        for manifest in manifests.iter() {
            self.try_handler(&manifest.kind())?;
        }
        manifests.sort_by_cached_key(|m| self.priority_of(&m.kind()).weight());
        Ok(())
    }

    /// Bind artifacts using the manifest's own namespace
    pub fn replace_artifacts(
        &self,
        manifest: Manifest,
        artifacts: &[Artifact],
        account: &str,
    ) -> std::result::Result<ReplaceResult, KindError> {
        let namespace = manifest.namespace().map(String::from);
        self.replace_artifacts_in(manifest, artifacts, namespace.as_deref(), account)
    }

    /// Bind artifacts as if the manifest were deployed to `namespace`
    pub fn replace_artifacts_in(
        &self,
        manifest: Manifest,
        artifacts: &[Artifact],
        namespace: Option<&str>,
        account: &str,
    ) -> std::result::Result<ReplaceResult, KindError> {
        let handler = self.try_handler(&manifest.kind())?;
        Ok(handler.replace_artifacts(self.binding_mode, manifest, artifacts, namespace, account))
    }

    pub fn list_artifacts(&self, manifest: &Manifest) -> std::result::Result<BTreeSet<Artifact>, KindError> {
        Ok(self.try_handler(&manifest.kind())?.list_artifacts(manifest))
    }

    pub fn remove_sensitive_keys(&self, manifest: &mut Manifest) -> std::result::Result<(), KindError> {
        self.try_handler(&manifest.kind())?
            .remove_sensitive_keys(manifest);
        Ok(())
    }

    /// Run every registered handler over the snapshot, in kind order
    pub fn build_relationships(&self, resources: &ResourcesByKind) -> RelationshipMap {
        let mut relationships = RelationshipMap::new();
        for handler in self.handlers.values() {
            handler.add_relationships(resources, &mut relationships);
        }
        relationships
    }

    /// Sort a listing of `kind` by a named sort key (`age` or `size`)
    pub fn sort_by(&self, kind: &ResourceKind, sort: &str, manifests: &mut [Manifest]) -> Result<()> {
        let key: SortKey = sort.parse()?;
        let comparator = self.try_handler(kind)?.comparator_for(key);
        manifests.sort_by(|a, b| comparator(a, b));
        Ok(())
    }
}
