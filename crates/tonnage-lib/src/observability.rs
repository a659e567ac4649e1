//! Logging setup and structured inventory events
//!
//! Logs go to stderr so stdout only carries the report.

use tracing::{debug, info, warn};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new("info,tonnage=debug,tonnage_lib=debug")
    } else {
        EnvFilter::new("info")
    }
}

/// Install the global tracing subscriber writing to stderr. `RUST_LOG` overrides `debug`.
pub fn init_logging(debug: bool, format: LogFormat) {
    init_logging_with_writer(debug, format, std::io::stderr);
}

/// Like [`init_logging`], with log lines going to `writer`
pub fn init_logging_with_writer<W>(debug: bool, format: LogFormat, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(debug));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer))
            .init(),
        LogFormat::Text => registry.with(fmt::layer().with_writer(writer)).init(),
    }
}

/// Structured logger for inventory lifecycle events
#[derive(Debug, Clone)]
pub struct InventoryLogger {
    context: String,
}

impl InventoryLogger {
    /// `context` names the cluster context the run targets
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }

    /// Log the API session, with the server version when it could be fetched
    pub fn log_connected(&self, server_version: Option<&str>) {
        match server_version {
            Some(version) => info!(
                event = "connected",
                context = %self.context,
                server = %version,
                "Connected to Kubernetes API"
            ),
            None => warn!(
                event = "connected",
                context = %self.context,
                server = "unknown",
                "Connected to Kubernetes API - unable to determine version"
            ),
        }
    }

    pub fn log_nodes_found(
        &self,
        count: usize,
        node_selector: Option<&str>,
        pod_selector: Option<&str>,
    ) {
        info!(
            event = "nodes_found",
            context = %self.context,
            nodes = count,
            node_selector = node_selector.unwrap_or(""),
            pod_selector = pod_selector.unwrap_or(""),
            "Found nodes"
        );
    }

    pub fn log_pod_skipped(&self, node: &str, pod: &str, phase: &str) {
        debug!(
            event = "pod_skipped",
            node = %node,
            pod = %pod,
            phase = %phase,
            "Skipping pod that is not running"
        );
    }

    pub fn log_node_processed(&self, node: &str, pods: u64, containers: u64) {
        debug!(
            event = "node_processed",
            node = %node,
            pods = pods,
            containers = containers,
            "Node processed"
        );
    }

    pub fn log_inventory_complete(&self, nodes: u64, pods: u64, containers: u64, elapsed_ms: u128) {
        info!(
            event = "inventory_complete",
            context = %self.context,
            nodes = nodes,
            pods = pods,
            containers = containers,
            elapsed_ms = elapsed_ms as u64,
            "Inventory complete"
        );
    }
}

impl Default for InventoryLogger {
    fn default() -> Self {
        Self::new("default")
    }
}
