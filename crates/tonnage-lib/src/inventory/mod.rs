//! Cluster inventory: node listing, per-node workers and the cluster roll-up
//!
//! [`Inventory::collect`] lists the nodes, spawns one worker per node and
//! returns the finished [`ClusterAggregate`]. Any query failure fails the
//! whole run.

mod coordinator;
mod processor;


pub use coordinator::Coordinator;
pub use processor::{fold_node, NodeProcessor};

use crate::error::Result;
use crate::models::{ClusterAggregate, DetailLevel};
use crate::observability::InventoryLogger;
use crate::progress::{NoProgress, ProgressObserver};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use std::sync::Arc;
use std::time::Instant;

/// Directory service the inventory reads nodes and pods from
#[async_trait]
pub trait ClusterSource: Send + Sync {
    /// List nodes, optionally filtered by a label selector
    async fn list_nodes(&self, label_selector: Option<&str>) -> Result<Vec<Node>>;

    /// List pods scheduled on `node_name`, optionally filtered by a label selector
    async fn list_pods(&self, node_name: &str, label_selector: Option<&str>) -> Result<Vec<Pod>>;
}

/// What to inventory and how much detail to keep
#[derive(Debug, Clone, Default)]
pub struct InventoryOptions {
    /// Label selector applied to nodes
    pub node_selector: Option<String>,
    /// Label selector applied to pods
    pub pod_selector: Option<String>,
    /// Detail retained in the finished aggregate
    pub detail: DetailLevel,
}

impl InventoryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the node label selector. Blank selectors match everything.
    pub fn node_selector(mut self, selector: impl Into<String>) -> Self {
        self.node_selector = non_blank(selector.into());
        self
    }

    /// Set the pod label selector. Blank selectors match everything.
    pub fn pod_selector(mut self, selector: impl Into<String>) -> Self {
        self.pod_selector = non_blank(selector.into());
        self
    }

    pub fn detail(mut self, detail: DetailLevel) -> Self {
        self.detail = detail;
        self
    }
}

fn non_blank(selector: String) -> Option<String> {
    let trimmed = selector.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// One inventory run against a [`ClusterSource`]
pub struct Inventory {
    source: Arc<dyn ClusterSource>,
    options: InventoryOptions,
    progress: Arc<dyn ProgressObserver>,
    logger: InventoryLogger,
}

impl Inventory {
    pub fn new(source: Arc<dyn ClusterSource>, options: InventoryOptions) -> Self {
        Self {
            source,
            options,
            progress: Arc::new(NoProgress),
            logger: InventoryLogger::default(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_logger(mut self, logger: InventoryLogger) -> Self {
        self.logger = logger;
        self
    }

    /// List the nodes, process them concurrently and return the cluster totals
    pub async fn collect(&self) -> Result<ClusterAggregate> {
        let start = Instant::now();
        let node_selector = self.options.node_selector.as_deref();

        let nodes = self.source.list_nodes(node_selector).await?;
        self.logger.log_nodes_found(
            nodes.len(),
            node_selector,
            self.options.pod_selector.as_deref(),
        );
        self.progress.nodes_discovered(nodes.len());

        let coordinator = Coordinator::new(
            self.source.clone(),
            self.options.clone(),
            self.progress.clone(),
            self.logger.clone(),
        );
        let aggregate = coordinator.run(nodes).await?;

        self.logger.log_inventory_complete(
            aggregate.node_count,
            aggregate.pod_count,
            aggregate.container_count,
            start.elapsed().as_millis(),
        );
        Ok(aggregate)
    }
}
