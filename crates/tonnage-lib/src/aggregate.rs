//! Cluster aggregate shared between node workers
//!
//! A single mutex is held across the whole merge (append, counters, totals),
//! so concurrent merges never interleave.

use crate::models::{ClusterAggregate, NodeRecord};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Handle to a [`ClusterAggregate`] written by many workers.
/// Clones share the same underlying aggregate.
#[derive(Debug, Clone, Default)]
pub struct SharedAggregate {
    inner: Arc<Mutex<ClusterAggregate>>,
}

impl SharedAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a finished node. Ownership of the record moves into the aggregate.
    pub async fn merge(&self, node: NodeRecord) {
        let mut aggregate = self.inner.lock().await;
        debug!(
            node = %node.name,
            pods = node.pod_count,
            merged = aggregate.node_count,
            "Merging node into cluster aggregate"
        );
        aggregate.merge(node);
    }

    /// Move the aggregate out, leaving an empty one behind
    pub async fn take(&self) -> ClusterAggregate {
        std::mem::take(&mut *self.inner.lock().await)
    }
}
