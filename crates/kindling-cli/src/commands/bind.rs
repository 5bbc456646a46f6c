//! Bind command - rewrite manifests with resolved artifacts

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use console::style;
use kindling_core::Artifact;
use kindling_kube::BindingMode;

use crate::display::artifact_line;
use crate::error::Result;
use crate::util::{load_manifests, parse_artifact, registry};

pub struct BindOptions<'a> {
    pub artifacts: &'a [String],
    pub mode: Option<BindingMode>,
    pub namespace: Option<&'a str>,
    pub account: &'a str,
    pub config: Option<&'a Path>,
}

pub fn run(files: &[PathBuf], options: BindOptions<'_>) -> Result<()> {
    let registry = registry(options.config, options.mode)?;
    let artifacts = options
        .artifacts
        .iter()
        .map(|spec| parse_artifact(spec, options.namespace))
        .collect::<Result<Vec<Artifact>>>()?;

    let mut bound = BTreeSet::new();
    let mut documents = Vec::new();
    for manifest in load_manifests(files)? {
        let result = match options.namespace {
            Some(namespace) => {
                registry.replace_artifacts_in(manifest, &artifacts, Some(namespace), options.account)?
            }
            None => registry.replace_artifacts(manifest, &artifacts, options.account)?,
        };
        bound.extend(result.bound_artifacts);
        documents.push(serde_yaml::to_string(&result.manifest)?);
    }

    println!("{}", documents.join("---\n").trim_end());

    eprintln!(
        "{} Bound {} of {} artifact(s) with {}",
        style("✓").green(),
        bound.len(),
        artifacts.len(),
        registry.binding_mode()
    );
    for artifact in &bound {
        eprintln!("    {}", artifact_line(artifact));
    }
    Ok(())
}
