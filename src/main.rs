//! prp-reconcile CLI
//!
//! Thin wrapper over the library: reconcile recorded test runs against a PRP
//! and print merged flow plans.

use anyhow::Context;
use clap::{Parser, Subcommand};
use prp_reconcile::prp::types::{ExecutedApiTest, ExecutedFlow, Step};
use prp_reconcile::{ApiLookupStrategy, EngineConfig, RequirementStore, Session};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "prp-reconcile")]
#[command(about = "Reconcile executed UI flows and API tests against a PRP")]
#[command(version)]
struct Cli {
    /// Engine config file (YAML or JSON)
    #[arg(short, long, global = true, env = "PRP_RECONCILE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute coverage of recorded runs and export prp-compliance.json
    Coverage {
        /// PRP document
        #[arg(long)]
        prp: Option<PathBuf>,

        /// JSON file with recorded `flows` and `apiTests`
        #[arg(long)]
        executed: PathBuf,

        /// Output directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Project identifier for the report
        #[arg(long)]
        project: Option<String>,

        /// API lookup strategy: exact or containment
        #[arg(long)]
        strategy: Option<ApiLookupStrategy>,
    },

    /// Print the resolved steps for a flow
    Plan {
        /// PRP document
        #[arg(long)]
        prp: Option<PathBuf>,

        /// Flow name or scenario id
        #[arg(long)]
        flow: String,

        /// JSON file with caller steps to merge onto the scenario
        #[arg(long)]
        steps: Option<PathBuf>,
    },
}

/// Recorded runs as written by the execution collaborators
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ExecutedRecords {
    #[serde(default)]
    flows: Vec<ExecutedFlow>,
    #[serde(default)]
    api_tests: Vec<ExecutedApiTest>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Coverage {
            prp,
            executed,
            out,
            project,
            strategy,
        } => {
            if let Some(prp) = prp {
                config.prp_path = prp;
            }
            if let Some(out) = out {
                config.output_dir = out;
            }
            if let Some(project) = project {
                config.project_name = project;
            }
            if let Some(strategy) = strategy {
                config.api_lookup = strategy;
            }
            coverage(config, &executed).await
        }
        Commands::Plan { prp, flow, steps } => {
            if let Some(prp) = prp {
                config.prp_path = prp;
            }
            plan(config, &flow, steps.as_deref()).await
        }
    }
}

async fn coverage(config: EngineConfig, executed: &Path) -> anyhow::Result<()> {
    let records: ExecutedRecords = read_json(executed)?;
    let session = Session::start(config).await?;

    for flow in records.flows {
        session.record_flow(flow);
    }
    for test in records.api_tests {
        session.record_api_test(test);
    }

    let report = session.validate();
    let stories = session.story_coverage();
    let summary = session.finish().await?;

    info!(
        "Scenarios/APIs {}% ({} of {}), stories {}%, overall {}%",
        report.coverage,
        report.covered.len(),
        report.total,
        stories.coverage,
        summary.prp_compliance.overall_coverage
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn plan(config: EngineConfig, flow: &str, steps: Option<&Path>) -> anyhow::Result<()> {
    let caller_steps: Option<Vec<Step>> = steps.map(read_json::<Vec<Step>>).transpose()?;
    let store = RequirementStore::load(&config.prp_path)
        .await?
        .with_strategy(config.api_lookup);
    let session = Session::with_store(config, store);

    let plan = session.plan_flow(flow, caller_steps);
    plan.step_kinds()?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
