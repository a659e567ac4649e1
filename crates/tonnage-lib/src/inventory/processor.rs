//! Per-node worker
//!
//! Lists the pods on one node, folds the running ones into a [`NodeRecord`]
//! and merges it into the shared aggregate exactly once.

use super::ClusterSource;
use crate::aggregate::SharedAggregate;
use crate::error::Result;
use crate::models::{is_running, pod_phase, DetailLevel, NodeRecord, PodRecord};
use crate::observability::InventoryLogger;
use crate::progress::ProgressObserver;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::ResourceExt;
use std::sync::Arc;

/// Worker owning everything needed to inventory one node
pub struct NodeProcessor {
    source: Arc<dyn ClusterSource>,
    pod_selector: Option<String>,
    detail: DetailLevel,
    aggregate: SharedAggregate,
    progress: Arc<dyn ProgressObserver>,
    logger: InventoryLogger,
}

impl NodeProcessor {
    pub fn new(
        source: Arc<dyn ClusterSource>,
        pod_selector: Option<String>,
        detail: DetailLevel,
        aggregate: SharedAggregate,
        progress: Arc<dyn ProgressObserver>,
        logger: InventoryLogger,
    ) -> Self {
        Self {
            source,
            pod_selector,
            detail,
            aggregate,
            progress,
            logger,
        }
    }

    /// Inventory `node` and merge the result
    pub async fn process(self, node: Node) -> Result<()> {
        let name = node.name_any();
        let pods = self
            .source
            .list_pods(&name, self.pod_selector.as_deref())
            .await?;
        self.progress.node_started(&name, pods.len());

        let mut record = fold_node(&node, &pods, |pod| {
            if !is_running(pod) {
                self.logger
                    .log_pod_skipped(&name, &pod.name_any(), pod_phase(pod));
            }
            self.progress.pod_processed(&name);
        })?;
        record.retain_detail(self.detail);

        self.logger
            .log_node_processed(&name, record.pod_count, record.container_count);
        self.aggregate.merge(record).await;
        self.progress.node_finished(&name);
        Ok(())
    }
}

/// Build a node's record from its pods, skipping pods that are not running.
/// `on_pod` is called once per pod, folded or skipped.
pub fn fold_node(node: &Node, pods: &[Pod], mut on_pod: impl FnMut(&Pod)) -> Result<NodeRecord> {
    let mut record = NodeRecord::from_node(node)?;
    for pod in pods {
        if is_running(pod) {
            record.add(PodRecord::from_pod(pod)?);
        }
        on_pod(pod);
    }
    Ok(record)
}
