//! Shards command - show how an account's caching work is split

use std::path::Path;

use console::style;
use kindling_kube::{AccountConfig, CachingAgent, HandlerRegistry, ShardPlan, build_account_agents};
use serde::Serialize;

use crate::error::Result;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AgentReport {
    id: String,
    units: Vec<String>,
}

pub fn run(config: &Path, agents: Option<usize>, json: bool) -> Result<()> {
    let config = AccountConfig::load_from(config)?;
    let registry = HandlerRegistry::for_account(&config)?;
    let agent_count = agents.unwrap_or(config.caching.agent_count);
    let credentials = config.credentials();
    let agents = build_account_agents(
        &registry,
        &credentials,
        agent_count,
        config.caching.poll_interval,
    )?;
    let kinds = agents.first().map(CachingAgent::kinds).unwrap_or_default();
    let plan = ShardPlan::for_account(&credentials, kinds, agent_count)?;

    let report: Vec<AgentReport> = agents
        .iter()
        .map(|agent| AgentReport {
            id: agent.id(),
            units: plan.units(agent.index()).iter().map(ToString::to_string).collect(),
        })
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&report)?;
        println!("{out}");
        return Ok(());
    }

    let interval = agents
        .first()
        .map(|agent| format!("{:?}", agent.poll_interval()))
        .unwrap_or_default();
    println!(
        "{} Account {} split across {} agent(s), polling every {}",
        style("→").blue(),
        style(&config.name).bold(),
        report.len(),
        interval
    );
    println!("  {} unit(s) in total", plan.total_units());
    for agent in &report {
        println!("  {} ({} unit(s))", style(&agent.id).cyan(), agent.units.len());
        for unit in &agent.units {
            println!("    - {unit}");
        }
    }
    Ok(())
}
