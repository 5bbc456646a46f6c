//! Status command - health and warnings per manifest

use std::path::{Path, PathBuf};

use console::style;
use kindling_kube::{Status, Warning};
use serde::Serialize;

use crate::display::health_label;
use crate::error::{CliError, Result};
use crate::util::{load_manifests, registry};

#[derive(Serialize)]
struct ManifestStatus {
    manifest: String,
    status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<Warning>,
}

pub fn run(files: &[PathBuf], config: Option<&Path>, json: bool, check: bool) -> Result<()> {
    let registry = registry(config, None)?;
    let manifests = load_manifests(files)?;

    let mut report = Vec::with_capacity(manifests.len());
    for manifest in &manifests {
        let handler = registry.try_handler(&manifest.kind())?;
        report.push(ManifestStatus {
            manifest: manifest.full_resource_name(),
            status: handler.status(manifest),
            warnings: handler.list_warnings(manifest),
        });
    }

    if json {
        let out = serde_json::to_string_pretty(&report)?;
        println!("{out}");
    } else {
        for entry in &report {
            let message = entry
                .status
                .message
                .as_deref()
                .map(|m| format!(" - {m}"))
                .unwrap_or_default();
            println!("{:<48} {}{}", entry.manifest, health_label(&entry.status), message);
            for warning in &entry.warnings {
                println!(
                    "    {} {}: {}",
                    style("⚠").yellow(),
                    warning.kind,
                    warning.message
                );
            }
        }
    }

    let unhealthy = report.iter().filter(|e| !e.status.is_stable()).count();
    if check && unhealthy > 0 {
        return Err(CliError::Unhealthy {
            unhealthy,
            total: report.len(),
        });
    }
    Ok(())
}
