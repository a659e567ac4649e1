//! Progress notifications from an inventory run
//!
//! Rendering is left to the caller; every hook defaults to a no-op.

/// Receives progress events from node workers. Called concurrently.
pub trait ProgressObserver: Send + Sync {
    /// The node list is known
    fn nodes_discovered(&self, _count: usize) {}

    /// A worker listed the pods on its node
    fn node_started(&self, _node: &str, _pods: usize) {}

    /// One pod on `node` was folded or skipped
    fn pod_processed(&self, _node: &str) {}

    /// A node was merged into the cluster aggregate
    fn node_finished(&self, _node: &str) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}
