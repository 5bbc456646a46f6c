//! Kindling CLI - Inspect Kubernetes manifests through per-kind policies

use clap::{Parser, Subcommand};
use kindling_kube::BindingMode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;
mod util;

use error::Result;

#[derive(Parser)]
#[command(name = "kindling")]
#[command(author = "Kindling Contributors")]
#[command(version)]
#[command(about = "Deploy ordering, artifact binding and caching plans for Kubernetes manifests", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print manifests in the order they deploy
    Order {
        /// Manifest files (multi-document YAML)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Account file declaring custom kinds
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List artifacts referenced by manifests
    Artifacts {
        /// Manifest files (multi-document YAML)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Account file declaring custom kinds
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Bind artifacts into manifests and print the result
    Bind {
        /// Manifest files (multi-document YAML)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Artifact to bind: [type=]name[:tag], repeatable
        #[arg(short, long = "artifact", required = true)]
        artifacts: Vec<String>,

        /// Binding mode (match-name-only, match-name-and-tag, match-exact)
        #[arg(short, long)]
        mode: Option<BindingMode>,

        /// Namespace the manifests are deployed to
        #[arg(short, long)]
        namespace: Option<String>,

        /// Account the manifests are deployed with
        #[arg(long, default_value = "default")]
        account: String,

        /// Account file declaring custom kinds and the binding mode
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show health and warnings for manifests with status
    Status {
        /// Manifest files (multi-document YAML)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Account file declaring custom kinds
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Exit with an error when any manifest is not stable
        #[arg(long)]
        check: bool,
    },

    /// Show how an account's caching work is split across agents
    Shards {
        /// Account file
        #[arg(short, long)]
        config: PathBuf,

        /// Override the configured agent count
        #[arg(long)]
        agents: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Order {
            files,
            config,
            json,
        } => commands::order::run(&files, config.as_deref(), json),

        Commands::Artifacts {
            files,
            config,
            json,
        } => commands::artifacts::run(&files, config.as_deref(), json),

        Commands::Bind {
            files,
            artifacts,
            mode,
            namespace,
            account,
            config,
        } => commands::bind::run(
            &files,
            commands::bind::BindOptions {
                artifacts: &artifacts,
                mode,
                namespace: namespace.as_deref(),
                account: &account,
                config: config.as_deref(),
            },
        ),

        Commands::Status {
            files,
            config,
            json,
            check,
        } => commands::status::run(&files, config.as_deref(), json, check),

        Commands::Shards {
            config,
            agents,
            json,
        } => commands::shards::run(&config, agents, json),
    }
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
