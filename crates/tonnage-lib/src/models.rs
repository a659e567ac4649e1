//! Resource records at container, pod, node and cluster granularity
//!
//! Records are built bottom-up: containers fold into a pod, pods fold into a
//! node, and finished nodes merge into the cluster aggregate.

use crate::error::{InventoryError, Result};
use crate::quantity::{CpuQuantity, MemoryQuantity, ParseQuantityError, Quantity, Unit};
use k8s_openapi::api::core::v1::{Container, Node, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity as K8sQuantity;
use kube::ResourceExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Pod phase whose pods count towards the inventory
pub const RUNNING_PHASE: &str = "Running";

/// CPU and memory for one measurement dimension (allocatable, requests or limits)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourcePair {
    pub cpu: CpuQuantity,
    pub memory: MemoryQuantity,
}

impl ResourcePair {
    pub const fn new(cpu: CpuQuantity, memory: MemoryQuantity) -> Self {
        Self { cpu, memory }
    }

    pub const fn zero() -> Self {
        Self::new(Quantity::zero(), Quantity::zero())
    }

    /// Read `cpu` and `memory` from a Kubernetes resource map.
    /// Missing maps and missing keys are zero.
    pub fn from_resource_map(
        map: Option<&BTreeMap<String, K8sQuantity>>,
        object: &str,
    ) -> Result<Self> {
        Ok(Self {
            cpu: read_quantity(map, object)?,
            memory: read_quantity(map, object)?,
        })
    }
}

fn read_quantity<U: Unit>(
    map: Option<&BTreeMap<String, K8sQuantity>>,
    object: &str,
) -> Result<Quantity<U>> {
    let Some(raw) = map.and_then(|m| m.get(U::RESOURCE)) else {
        return Ok(Quantity::zero());
    };
    Quantity::from_k8s(raw).map_err(|source: ParseQuantityError| InventoryError::InvalidQuantity {
        resource: U::RESOURCE,
        object: object.to_string(),
        source,
    })
}

impl Add for ResourcePair {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.cpu + rhs.cpu, self.memory + rhs.memory)
    }
}

impl AddAssign for ResourcePair {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for ResourcePair {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

/// Requests and limits declared by one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerRecord {
    pub name: String,
    pub requests: ResourcePair,
    pub limits: ResourcePair,
}

impl ContainerRecord {
    pub fn new(name: impl Into<String>, requests: ResourcePair, limits: ResourcePair) -> Self {
        Self {
            name: name.into(),
            requests,
            limits,
        }
    }

    pub fn from_requirements(
        name: impl Into<String>,
        requests: Option<&BTreeMap<String, K8sQuantity>>,
        limits: Option<&BTreeMap<String, K8sQuantity>>,
    ) -> Result<Self> {
        let name = name.into();
        Ok(Self {
            requests: ResourcePair::from_resource_map(requests, &name)?,
            limits: ResourcePair::from_resource_map(limits, &name)?,
            name,
        })
    }

    pub fn from_container(container: &Container) -> Result<Self> {
        let resources = container.resources.as_ref();
        Self::from_requirements(
            container.name.clone(),
            resources.and_then(|r| r.requests.as_ref()),
            resources.and_then(|r| r.limits.as_ref()),
        )
    }
}

/// Sum of a pod's containers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PodRecord {
    pub name: String,
    pub namespace: String,
    pub requests: ResourcePair,
    pub limits: ResourcePair,
    pub container_count: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<ContainerRecord>,
}

impl PodRecord {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Fold one container into the pod
    pub fn add(&mut self, container: ContainerRecord) {
        self.requests += container.requests;
        self.limits += container.limits;
        self.container_count += 1;
        self.containers.push(container);
    }

    pub fn fold(
        name: impl Into<String>,
        namespace: impl Into<String>,
        containers: impl IntoIterator<Item = ContainerRecord>,
    ) -> Self {
        let mut pod = Self::new(name, namespace);
        for container in containers {
            pod.add(container);
        }
        pod
    }

    /// Combine two partial folds of the same pod
    pub fn merge(&mut self, other: PodRecord) {
        self.requests += other.requests;
        self.limits += other.limits;
        self.container_count += other.container_count;
        self.containers.extend(other.containers);
    }

    /// Build from a pod object, regardless of its phase
    pub fn from_pod(pod: &Pod) -> Result<Self> {
        let containers = pod
            .spec
            .as_ref()
            .map(|spec| spec.containers.as_slice())
            .unwrap_or_default()
            .iter()
            .map(ContainerRecord::from_container)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::fold(
            pod.name_any(),
            pod.namespace().unwrap_or_default(),
            containers,
        ))
    }
}

/// Phase reported in `status.phase`, or "Unknown"
pub fn pod_phase(pod: &Pod) -> &str {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("Unknown")
}

pub fn is_running(pod: &Pod) -> bool {
    pod_phase(pod) == RUNNING_PHASE
}

/// How much of the record tree a report needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Cluster totals only
    Summary,
    /// Totals plus one row per node
    #[default]
    Nodes,
    /// Totals, nodes and the pods on each node
    Pods,
}

impl DetailLevel {
    /// Resolve the `summary` / `include pods` switches, which are mutually exclusive
    pub fn from_flags(summary_only: bool, include_pods: bool) -> Result<Self> {
        match (summary_only, include_pods) {
            (true, true) => Err(InventoryError::Usage(
                "summary-only and per-pod detail are mutually exclusive, choose only one".into(),
            )),
            (true, false) => Ok(Self::Summary),
            (false, true) => Ok(Self::Pods),
            (false, false) => Ok(Self::Nodes),
        }
    }

    pub fn includes_nodes(&self) -> bool {
        !matches!(self, Self::Summary)
    }

    pub fn includes_pods(&self) -> bool {
        matches!(self, Self::Pods)
    }
}

/// Allocatable capacity of a node plus the sum of its running pods
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeRecord {
    pub name: String,
    pub allocatable: ResourcePair,
    pub requests: ResourcePair,
    pub limits: ResourcePair,
    pub pod_count: u64,
    pub container_count: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pods: Vec<PodRecord>,
}

impl NodeRecord {
    pub fn new(name: impl Into<String>, allocatable: ResourcePair) -> Self {
        Self {
            name: name.into(),
            allocatable,
            ..Default::default()
        }
    }

    /// Empty record carrying the node's name and `status.allocatable`
    pub fn from_node(node: &Node) -> Result<Self> {
        let name = node.name_any();
        let allocatable = ResourcePair::from_resource_map(
            node.status.as_ref().and_then(|s| s.allocatable.as_ref()),
            &name,
        )?;
        Ok(Self::new(name, allocatable))
    }

    /// Fold one running pod into the node
    pub fn add(&mut self, pod: PodRecord) {
        self.requests += pod.requests;
        self.limits += pod.limits;
        self.pod_count += 1;
        self.container_count += pod.container_count;
        self.pods.push(pod);
    }

    /// Fold pods that have already been filtered to the running phase
    pub fn fold(
        name: impl Into<String>,
        allocatable: ResourcePair,
        pods: impl IntoIterator<Item = PodRecord>,
    ) -> Self {
        let mut node = Self::new(name, allocatable);
        for pod in pods {
            node.add(pod);
        }
        node
    }

    /// Drop detail the report will not show. Counts and totals are kept.
    pub fn retain_detail(&mut self, detail: DetailLevel) {
        if detail.includes_pods() {
            return;
        }
        self.pods = Vec::new();
    }
}

/// Cluster-wide totals and the nodes that produced them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterAggregate {
    pub allocatable: ResourcePair,
    pub requests: ResourcePair,
    pub limits: ResourcePair,
    pub node_count: u64,
    pub pod_count: u64,
    pub container_count: u64,
    pub nodes: Vec<NodeRecord>,
}

impl ClusterAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one finished node. Callers sharing an aggregate must serialize merges.
    pub fn merge(&mut self, node: NodeRecord) {
        self.node_count += 1;
        self.pod_count += node.pod_count;
        self.container_count += node.container_count;
        self.allocatable += node.allocatable;
        self.requests += node.requests;
        self.limits += node.limits;
        self.nodes.push(node);
    }

    /// Nodes in merge order are nondeterministic; reports use this instead
    pub fn sorted_nodes(&self) -> Vec<&NodeRecord> {
        let mut nodes: Vec<&NodeRecord> = self.nodes.iter().collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes
    }

    pub fn is_empty(&self) -> bool {
        self.node_count == 0
    }
}
