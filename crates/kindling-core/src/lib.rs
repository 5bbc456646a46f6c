//! Kindling Core - Core types for the kind-handler policy layer
//!
//! This crate provides the value types shared by every handler:
//! - `ResourceKind` / `SpinnakerKind`: what a manifest is and how it is grouped
//! - `Manifest`: one cluster object as a mutable JSON tree
//! - `Artifact`: a deployable reference that can be bound into a manifest
//! - `DeployPriority`: the ordering weight a kind deploys with

pub mod artifact;
pub mod error;
pub mod kind;
pub mod manifest;
pub mod priority;

pub use artifact::{Artifact, ImageReference};
pub use error::{CoreError, Result};
pub use kind::{ResourceKind, SpinnakerKind};
pub use manifest::{Manifest, ManifestRef, OwnerReference, full_resource_name};
pub use priority::DeployPriority;
