//! tonnage: Kubernetes cluster capacity inventory
//!
//! Lists the nodes of a cluster, sums the CPU and memory requests and limits
//! of the running pods on each, and prints them against node allocatable.

mod config;
mod output;
mod progress;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use output::{print_warning, LogFormatArg, OutputFormat};
use progress::BarProgress;
use std::path::PathBuf;
use std::sync::Arc;
use tonnage_lib::observability::{init_logging, init_logging_with_writer};
use tonnage_lib::{DetailLevel, Inventory, InventoryLogger, InventoryOptions, KubeSource};
use tracing::debug;

const UNITS_HELP: &str = "Units: table CPU columns are millicores (1000m = 1 core). \
Table memory columns are mebibytes (MiB, 2^20 bytes), rounded up. \
JSON reports millicores and bytes.";

/// Kubernetes cluster capacity inventory
#[derive(Parser)]
#[command(name = "tonnage")]
#[command(author, version, about = "Kubernetes cluster capacity inventory", long_about = None)]
#[command(after_help = UNITS_HELP)]
pub struct Cli {
    /// Path to a kubeconfig file (defaults to $KUBECONFIG, then ~/.kube/config)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Name of the kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Label selector for nodes to include
    #[arg(long, short = 'N')]
    pub node_selector: Option<String>,

    /// Label selector for pods to include
    #[arg(long, short = 'P')]
    pub pod_selector: Option<String>,

    /// Include per-pod resource data in the output
    #[arg(long, short = 'p', conflicts_with = "summary")]
    pub include_pods: bool,

    /// Show only the cumulative cluster summary
    #[arg(long, short = 's')]
    pub summary: bool,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Output format
    #[arg(long, short = 'f', value_enum)]
    pub format: Option<OutputFormat>,

    /// Log line format
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormatArg,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let bars = (!cli.no_progress).then(|| Arc::new(BarProgress::new()));
    match &bars {
        Some(bars) => {
            let writer = bars.log_writer();
            init_logging_with_writer(cli.debug, cli.log_format.into(), move || writer.clone());
        }
        None => init_logging(cli.debug, cli.log_format.into()),
    }

    let detail = DetailLevel::from_flags(cli.summary, cli.include_pods)?;
    let config = config::Config::load()?;

    let context = cli.context.or(config.context);
    let format = cli.format.or(config.format).unwrap_or_default();

    let mut options = InventoryOptions::new().detail(detail);
    if let Some(selector) = cli.node_selector.or(config.node_selector) {
        options = options.node_selector(selector);
    }
    if let Some(selector) = cli.pod_selector.or(config.pod_selector) {
        options = options.pod_selector(selector);
    }

    debug!(
        ?detail,
        ?format,
        context = context.as_deref().unwrap_or("current"),
        node_selector = options.node_selector.as_deref().unwrap_or(""),
        pod_selector = options.pod_selector.as_deref().unwrap_or(""),
        "Resolved options"
    );

    let source = KubeSource::connect(cli.kubeconfig.as_deref(), context.as_deref())
        .await
        .context("Error creating kube client")?;
    let logger = InventoryLogger::new(context.as_deref().unwrap_or("current"));
    logger.log_connected(source.server_version().await.as_deref());

    let mut inventory = Inventory::new(Arc::new(source), options).with_logger(logger);
    if let Some(bars) = &bars {
        inventory = inventory.with_progress(bars.clone());
    }

    let result = inventory.collect().await;
    if let Some(bars) = &bars {
        bars.finish(result.is_ok());
    }
    let aggregate = result.context("Error building cluster inventory")?;

    if aggregate.is_empty() {
        print_warning("No nodes matched the node selector");
    }
    println!("{}", report::render(&aggregate, detail, format)?);

    Ok(())
}
