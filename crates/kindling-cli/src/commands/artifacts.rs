//! Artifacts command - list artifacts referenced by manifests

use std::path::{Path, PathBuf};

use console::style;
use kindling_core::Artifact;
use serde::Serialize;

use crate::display::artifact_line;
use crate::error::Result;
use crate::util::{load_manifests, registry};

#[derive(Serialize)]
struct ManifestArtifacts {
    manifest: String,
    artifacts: Vec<Artifact>,
}

pub fn run(files: &[PathBuf], config: Option<&Path>, json: bool) -> Result<()> {
    let registry = registry(config, None)?;
    let manifests = load_manifests(files)?;

    let mut report = Vec::with_capacity(manifests.len());
    for manifest in &manifests {
        report.push(ManifestArtifacts {
            manifest: manifest.full_resource_name(),
            artifacts: registry.list_artifacts(manifest)?.into_iter().collect(),
        });
    }

    if json {
        let out = serde_json::to_string_pretty(&report)?;
        println!("{out}");
        return Ok(());
    }

    for entry in report.iter().filter(|e| !e.artifacts.is_empty()) {
        println!("{} {}", style("→").blue(), style(&entry.manifest).bold());
        for artifact in &entry.artifacts {
            println!("    {}", artifact_line(artifact));
        }
    }
    let total: usize = report.iter().map(|e| e.artifacts.len()).sum();
    println!(
        "{} {} artifact(s) in {} manifest(s)",
        style("✓").green(),
        total,
        report.len()
    );
    Ok(())
}
