//! Shared helpers for CLI commands

use std::path::{Path, PathBuf};

use kindling_core::{Artifact, ImageReference, Manifest};
use kindling_kube::{AccountConfig, BindingMode, HandlerRegistry};

use crate::error::{CliError, Result};

/// Every manifest in `paths`, in file then document order
pub fn load_manifests(paths: &[PathBuf]) -> Result<Vec<Manifest>> {
    let mut manifests = Vec::new();
    for path in paths {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::Io {
            message: format!("{}: {}", path.display(), e),
        })?;
        let documents = Manifest::from_yaml_documents(&content)
            .map_err(|e| CliError::input(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), count = documents.len(), "loaded manifests");
        manifests.extend(documents);
    }
    Ok(manifests)
}

/// Built-in registry, extended by an account file when one is given
pub fn registry(config: Option<&Path>, mode: Option<BindingMode>) -> Result<HandlerRegistry> {
    let Some(path) = config else {
        return Ok(HandlerRegistry::builder()
            .with_builtin_handlers()
            .binding_mode(mode.unwrap_or_default())
            .build()?);
    };

    let mut config = AccountConfig::load_from(path)?;
    if let Some(mode) = mode {
        config.artifact_binding = mode;
    }
    Ok(HandlerRegistry::for_account(&config)?)
}

/// Parse `[type=]name[:tag|@digest]`, defaulting to a docker image
///
/// Kubernetes object artifacts use `:` for their version suffix
/// (`kubernetes/configMap=settings:v002`).
pub fn parse_artifact(spec: &str, namespace: Option<&str>) -> Result<Artifact> {
    let (artifact_type, reference) = match spec.split_once('=') {
        Some((t, r)) => (t.trim(), r.trim()),
        None => (kindling_core::artifact::types::DOCKER_IMAGE, spec.trim()),
    };
    if reference.is_empty() {
        return Err(CliError::input_with_help(
            format!("artifact '{spec}' has no reference"),
            "Use [type=]name[:tag], e.g. docker/image=gcr.io/app:v2",
        ));
    }

    if artifact_type == kindling_core::artifact::types::DOCKER_IMAGE {
        let image = ImageReference::parse(reference);
        let mut artifact = Artifact::image(image.name.clone());
        if let Some(version) = image.version() {
            artifact = artifact.with_version(version).with_reference(reference);
        }
        return Ok(artifact);
    }

    let (name, version) = match reference.rsplit_once(':') {
        Some((name, version)) => (name, Some(version)),
        None => (reference, None),
    };
    let mut artifact = Artifact::new(artifact_type, name);
    if let Some(version) = version {
        artifact = artifact.with_version(version);
    }
    if let Some(namespace) = namespace {
        artifact = artifact.with_location(namespace);
    }
    Ok(artifact)
}
