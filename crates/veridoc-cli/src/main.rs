//! Veridoc CLI - bulk credential verification against institution portals
//!
//! Usage:
//!   veridoc run --input items.json --out results/     Verify a batch
//!   veridoc check-routing --input items.json          Dry-run the dispatcher

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use veridoc_core::{SummaryRow, VeridocConfig, WorkItem};

#[derive(Parser)]
#[command(name = "veridoc")]
#[command(author, version, about = "Bulk credential verification against institution portals")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a batch of items and write evidence + results
    Run {
        /// JSON file with the work items
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for evidence images and results.json
        #[arg(short, long)]
        out: PathBuf,

        /// Configuration file
        #[arg(short, long, default_value = "veridoc.toml")]
        config: PathBuf,

        /// Operator label attached to the batch summary
        #[arg(long, default_value = "cli")]
        user_label: String,
    },

    /// Report which adapter each item would hit, without a browser
    CheckRouting {
        /// JSON file with the work items
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Run {
            input,
            out,
            config,
            user_label,
        } => run_batch(&input, &out, &config, &user_label).await,
        Commands::CheckRouting { input } => check_routing(&input),
    }
}

async fn run_batch(input: &Path, out: &Path, config_path: &Path, user_label: &str) -> Result<()> {
    let items = load_items(input)?;
    let config = if config_path.exists() {
        VeridocConfig::load(config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?
    } else {
        info!("No config at {}, using defaults", config_path.display());
        VeridocConfig::default()
    };

    let report = veridoc_batch::verify_batch(items, &config, user_label)
        .await
        .context("Batch verification failed")?;

    fs::create_dir_all(out)
        .with_context(|| format!("Failed to create {}", out.display()))?;

    // Evidence images land at their archive-relative paths
    let mut evidence_count = 0usize;
    for item in &report.items {
        if let (Some(path), Some(image)) = (&item.evidence_path, &item.evidence_image) {
            let target = out.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, image)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            evidence_count += 1;
        }
    }

    let rows: Vec<SummaryRow> = report.items.iter().map(WorkItem::summary_row).collect();
    let results_path = out.join("results.json");
    fs::write(&results_path, serde_json::to_string_pretty(&rows)?)?;

    let summary = &report.summary;
    println!("Batch {}", summary.batch_id);
    println!("  items:    {}", summary.item_count);
    println!("  evidence: {evidence_count}");
    println!(
        "  status:   {}",
        if summary.had_errors { "had errors" } else { "success" }
    );
    for (institution, count) in &summary.per_institution {
        println!("  {institution}: {count}");
    }
    println!("Results written to {}", results_path.display());

    Ok(())
}

fn check_routing(input: &Path) -> Result<()> {
    let items = load_items(input)?;

    for item in &items {
        match veridoc_portals::resolve(item) {
            Ok(kind) => println!(
                "{}\t{}\t-> {:?}",
                item.name,
                item.institution.trim(),
                kind
            ),
            Err(e) => println!("{}\t{}\t!! {}", item.name, item.institution.trim(), e),
        }
    }

    Ok(())
}

fn load_items(input: &Path) -> Result<Vec<WorkItem>> {
    let contents = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let items: Vec<WorkItem> =
        serde_json::from_str(&contents).context("Input must be a JSON array of work items")?;
    info!("Loaded {} items from {}", items.len(), input.display());
    Ok(items)
}
