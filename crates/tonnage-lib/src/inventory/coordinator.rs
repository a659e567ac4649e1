//! Fan-out over nodes
//!
//! One task per node on the runtime's worker pool. The first failure aborts
//! the remaining tasks and is returned; partial totals are discarded.

use super::{ClusterSource, InventoryOptions, NodeProcessor};
use crate::aggregate::SharedAggregate;
use crate::error::{InventoryError, Result};
use crate::models::ClusterAggregate;
use crate::observability::InventoryLogger;
use crate::progress::ProgressObserver;
use k8s_openapi::api::core::v1::Node;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Launches a [`NodeProcessor`] per node and waits for all of them
pub struct Coordinator {
    source: Arc<dyn ClusterSource>,
    options: InventoryOptions,
    progress: Arc<dyn ProgressObserver>,
    logger: InventoryLogger,
}

impl Coordinator {
    pub fn new(
        source: Arc<dyn ClusterSource>,
        options: InventoryOptions,
        progress: Arc<dyn ProgressObserver>,
        logger: InventoryLogger,
    ) -> Self {
        Self {
            source,
            options,
            progress,
            logger,
        }
    }

    pub async fn run(&self, nodes: Vec<Node>) -> Result<ClusterAggregate> {
        if nodes.is_empty() {
            return Ok(ClusterAggregate::new());
        }

        let aggregate = SharedAggregate::new();
        let mut workers = JoinSet::new();

        for node in nodes {
            let processor = NodeProcessor::new(
                self.source.clone(),
                self.options.pod_selector.clone(),
                self.options.detail,
                aggregate.clone(),
                self.progress.clone(),
                self.logger.clone(),
            );
            workers.spawn(processor.process(node));
        }
        debug!(workers = workers.len(), "Spawned node workers");

        while let Some(joined) = workers.join_next().await {
            let failure = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) => InventoryError::Worker(e),
            };
            error!(error = %failure, remaining = workers.len(), "Node worker failed, aborting inventory");
            workers.shutdown().await;
            return Err(failure);
        }

        Ok(aggregate.take().await)
    }
}
