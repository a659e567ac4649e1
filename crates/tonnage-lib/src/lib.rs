//! Kubernetes capacity inventory
//!
//! This crate provides the core functionality for:
//! - Exact CPU/memory quantities and resource pairs
//! - Container, pod, node and cluster resource records
//! - Concurrent per-node collection rolled up into cluster totals
//! - Kubernetes API access and structured logging

pub mod aggregate;
pub mod error;
pub mod inventory;
pub mod kube_source;
pub mod models;
pub mod observability;
pub mod progress;
pub mod quantity;

pub use aggregate::SharedAggregate;
pub use error::{InventoryError, Result};
pub use inventory::{ClusterSource, Inventory, InventoryOptions};
pub use kube_source::KubeSource;
pub use models::*;
pub use observability::{InventoryLogger, LogFormat};
pub use progress::{NoProgress, ProgressObserver};
pub use quantity::{Cpu, CpuQuantity, Memory, MemoryQuantity, Quantity};
