//! Order command - print manifests in deploy order

use std::path::{Path, PathBuf};

use console::style;
use kindling_core::DeployPriority;
use serde::Serialize;

use crate::display::priority_label;
use crate::error::Result;
use crate::util::{load_manifests, registry};

#[derive(Serialize)]
struct OrderedManifest {
    kind: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    priority: DeployPriority,
    weight: u32,
}

pub fn run(files: &[PathBuf], config: Option<&Path>, json: bool) -> Result<()> {
    let registry = registry(config, None)?;
    let mut manifests = load_manifests(files)?;
    registry.sort_for_deploy(&mut manifests)?;

    let ordered: Vec<OrderedManifest> = manifests
        .iter()
        .map(|m| {
            let priority = registry.priority_of(&m.kind());
            OrderedManifest {
                kind: m.kind().to_string(),
                name: m.name().to_string(),
                namespace: m.namespace().map(String::from),
                priority,
                weight: priority.weight(),
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&ordered)?);
        return Ok(());
    }

    println!(
        "{} Deploy order for {} manifest(s)",
        style("→").blue(),
        ordered.len()
    );
    for (position, item) in ordered.iter().enumerate() {
        let target = match &item.namespace {
            Some(ns) => format!("{} {}/{}", item.kind, ns, item.name),
            None => format!("{} {}", item.kind, item.name),
        };
        println!(
            "  {:>3}. {:>4} {} {}",
            position + 1,
            item.weight,
            priority_label(item.priority),
            target
        );
    }
    Ok(())
}
