//! Display formatting for CLI output

use console::style;
use kindling_core::{Artifact, DeployPriority};
use kindling_kube::{Health, Status};

/// Priority name padded for column output, colored by weight band
pub fn priority_label(priority: DeployPriority) -> String {
    let label = format!("{:<42}", priority.as_str());
    match priority.weight() {
        0..=30 => style(label).cyan().to_string(),
        31..=90 => style(label).blue().to_string(),
        91..=110 => style(label).green().to_string(),
        _ => style(label).dim().to_string(),
    }
}

pub fn health_label(status: &Status) -> String {
    match status.health {
        Health::Stable if status.paused => style("paused").yellow().to_string(),
        Health::Stable => style("stable").green().to_string(),
        Health::Unstable => style("unstable").yellow().to_string(),
        Health::Failed => style("failed").red().bold().to_string(),
    }
}

/// `type  name  reference` with the namespace when the artifact has one
pub fn artifact_line(artifact: &Artifact) -> String {
    let mut line = format!(
        "{:<22} {:<32} {}",
        artifact.artifact_type,
        artifact.name,
        artifact.resolved_reference()
    );
    if let Some(location) = &artifact.location {
        line.push_str(&format!(" {}", style(format!("({location})")).dim()));
    }
    line
}
