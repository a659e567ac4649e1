//! Error taxonomy for an inventory run
//!
//! Every variant is fatal: a run either produces a complete aggregate or
//! fails with one of these.

use crate::quantity::ParseQuantityError;

/// Boxed source error from an external collaborator (kube client, config loader)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the library
pub type Result<T, E = InventoryError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// Could not establish a session with the cluster API
    #[error("failed to connect to the Kubernetes API: {context}")]
    Connection {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Listing nodes failed
    #[error("failed to list nodes")]
    NodeQuery {
        #[source]
        source: BoxError,
    },

    /// Listing the pods scheduled on one node failed
    #[error("failed to list pods on node {node}")]
    PodQuery {
        node: String,
        #[source]
        source: BoxError,
    },

    /// Mutually exclusive options were combined
    #[error("invalid usage: {0}")]
    Usage(String),

    /// A resource quantity reported by the API could not be parsed
    #[error("invalid {resource} quantity on {object}")]
    InvalidQuantity {
        resource: &'static str,
        object: String,
        #[source]
        source: ParseQuantityError,
    },

    /// A node worker panicked or was cancelled
    #[error("node worker did not complete")]
    Worker(#[from] tokio::task::JoinError),
}

impl InventoryError {
    pub fn connection(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Connection {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn node_query(source: impl Into<BoxError>) -> Self {
        Self::NodeQuery {
            source: source.into(),
        }
    }

    pub fn pod_query(node: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::PodQuery {
            node: node.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_query_names_node() {
        let err = InventoryError::pod_query("worker-1", "connection refused");
        assert_eq!(err.to_string(), "failed to list pods on node worker-1");

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "connection refused");
    }

    #[test]
    fn test_usage_message() {
        let err = InventoryError::Usage("both flags".into());
        assert_eq!(err.to_string(), "invalid usage: both flags");
        assert!(std::error::Error::source(&err).is_none());
    }
}
