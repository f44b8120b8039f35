//! Portfolio triage command-line driver.
//!
//! A thin presentation layer over `triage-core`: it loads the static
//! catalog, selects a customer, runs the two ranking stages, forwards
//! the operator's approve/reject decisions, and prints whatever the
//! engine produces. All sequencing and state rules live in the core.
//!
//! ## Commands
//!
//! - `customers`: list the customers in the catalog
//! - `run`: run the full workflow for one customer

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

use triage_core::{
    init_tracing, Catalog, CompanyId, CustomerId, ReviewStatus, StageOutcome, TriageConfig,
    TriageEngine, WorkflowPhase,
};

#[derive(Parser)]
#[command(name = "triage")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Portfolio triage: rank, review, report", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Path to the catalog JSON file
    #[arg(long, global = true, default_value = "data/portfolio.json")]
    catalog: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the customers in the catalog
    Customers,

    /// Run the full triage workflow for one customer
    Run {
        /// Customer id to triage
        #[arg(short, long)]
        customer: CustomerId,

        /// Company ids to approve during review
        #[arg(long, value_delimiter = ',')]
        approve: Vec<CompanyId>,

        /// Company ids to reject during review
        #[arg(long, value_delimiter = ',')]
        reject: Vec<CompanyId>,

        /// Skip the simulated stage latencies
        #[arg(long)]
        fast: bool,

        /// Print the finalized report as JSON instead of a table
        #[arg(long)]
        json_report: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    let catalog = Catalog::load(&cli.catalog)
        .with_context(|| format!("failed to load catalog from {}", cli.catalog.display()))?;

    match cli.command {
        Commands::Customers => {
            for customer in catalog.customers() {
                println!("{:>4}  {} ({})", customer.id, customer.name, customer.kind);
            }
            Ok(())
        }
        Commands::Run {
            customer,
            approve,
            reject,
            fast,
            json_report,
        } => {
            let config = if fast {
                TriageConfig::zero_latency()
            } else {
                TriageConfig::default()
            };
            run_workflow(catalog, config, customer, &approve, &reject, json_report).await
        }
    }
}

async fn run_workflow(
    catalog: Catalog,
    config: TriageConfig,
    customer: CustomerId,
    approve: &[CompanyId],
    reject: &[CompanyId],
    json_report: bool,
) -> Result<()> {
    let engine = TriageEngine::new(catalog, config);

    let companies = engine.select_customer(customer).await?;
    println!("Catalog: {} companies", companies.len());

    run_stage(engine.run_broad_rank().await?, "Broad rank")?;
    let survivors = run_stage(engine.run_tailored_rank().await?, "Tailored rank")?;

    for company in &survivors {
        println!(
            "  {:>4}  {}  confidence {}  tailored {}",
            company.id,
            company.name,
            company.confidence,
            company.confidence_b.unwrap_or(company.confidence),
        );
    }

    for &id in approve {
        engine.approve(id).await?;
    }
    for &id in reject {
        engine.reject(id).await?;
    }

    if engine.phase().await != WorkflowPhase::Finalized {
        println!("\nReview incomplete; no report produced.");
        for (id, entry) in engine.review_statuses().await? {
            let status = match entry.status {
                ReviewStatus::Pending => "pending",
                ReviewStatus::Approved => "approved",
                ReviewStatus::Rejected => "rejected",
            };
            println!("  {id:>4}  {status}");
        }
        return Ok(());
    }

    let report = engine.report().await?;
    if json_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\nFinal report ({}):", report.summary.status);
    for entry in &report.entries {
        println!(
            "  #{:<2} {}  compatibility {}  (confidence {} / tailored {} / shareholders {})",
            entry.rank,
            entry.name,
            entry.compatibility,
            entry.confidence,
            entry.confidence_b,
            entry.shareholder,
        );
    }
    println!(
        "  average {}  max {}  entries {}",
        report.summary.average_compatibility,
        report.summary.max_compatibility,
        report.summary.entry_count,
    );
    Ok(())
}

fn run_stage(outcome: StageOutcome, label: &str) -> Result<Vec<triage_core::Company>> {
    match outcome {
        StageOutcome::Ranked { working_set } => {
            println!("{label}: kept {}", working_set.len());
            Ok(working_set)
        }
        StageOutcome::AlreadyRanked { working_set } => Ok(working_set),
        StageOutcome::Superseded => bail!("{label} was superseded by a customer switch"),
    }
}
