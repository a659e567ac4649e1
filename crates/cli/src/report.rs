//! Cluster report rendering

use crate::output::{format_count, OutputFormat};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use tonnage_lib::{ClusterAggregate, DetailLevel, NodeRecord, PodRecord, ResourcePair};

const TOTAL_LABEL: &str = "Cluster Total";

/// Numeric columns shared by every row
#[derive(Tabled)]
struct Figures {
    #[tabled(rename = "Allocatable CPU (m)")]
    allocatable_cpu: String,
    #[tabled(rename = "Allocatable Memory (Mi)")]
    allocatable_memory: String,
    #[tabled(rename = "Requested CPU (m)")]
    requested_cpu: String,
    #[tabled(rename = "Requested Memory (Mi)")]
    requested_memory: String,
    #[tabled(rename = "Limits CPU (m)")]
    limits_cpu: String,
    #[tabled(rename = "Limits Memory (Mi)")]
    limits_memory: String,
    #[tabled(rename = "# Pods")]
    pods: String,
    #[tabled(rename = "# Containers")]
    containers: String,
}

impl Figures {
    fn new(
        allocatable: Option<&ResourcePair>,
        requests: &ResourcePair,
        limits: &ResourcePair,
        pods: Option<u64>,
        containers: u64,
    ) -> Self {
        Self {
            allocatable_cpu: allocatable.map(cpu).unwrap_or_default(),
            allocatable_memory: allocatable.map(memory).unwrap_or_default(),
            requested_cpu: cpu(requests),
            requested_memory: memory(requests),
            limits_cpu: cpu(limits),
            limits_memory: memory(limits),
            pods: pods.map(count).unwrap_or_default(),
            containers: count(containers),
        }
    }

    fn node(node: &NodeRecord) -> Self {
        Self::new(
            Some(&node.allocatable),
            &node.requests,
            &node.limits,
            Some(node.pod_count),
            node.container_count,
        )
    }

    fn pod(pod: &PodRecord) -> Self {
        Self::new(None, &pod.requests, &pod.limits, None, pod.container_count)
    }

    fn cluster(aggregate: &ClusterAggregate) -> Self {
        Self::new(
            Some(&aggregate.allocatable),
            &aggregate.requests,
            &aggregate.limits,
            Some(aggregate.pod_count),
            aggregate.container_count,
        )
    }
}

fn cpu(pair: &ResourcePair) -> String {
    format_count(pair.cpu.millicores())
}

fn memory(pair: &ResourcePair) -> String {
    format_count(pair.memory.mebibytes())
}

fn count(value: u64) -> String {
    format_count(i64::try_from(value).unwrap_or(i64::MAX))
}

/// Row for the node table
#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(inline)]
    figures: Figures,
}

/// Row for the node + pod table
#[derive(Tabled)]
struct PodRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Pod")]
    pod: String,
    #[tabled(inline)]
    figures: Figures,
}

/// JSON document printed by `--format json`
#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    detail: DetailLevel,
    units: Units,
    node_count: u64,
    pod_count: u64,
    container_count: u64,
    allocatable: &'a ResourcePair,
    requests: &'a ResourcePair,
    limits: &'a ResourcePair,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    nodes: Vec<&'a NodeRecord>,
}

/// Units of the figures in a [`JsonReport`]
#[derive(Serialize)]
struct Units {
    cpu: &'static str,
    memory: &'static str,
}

const JSON_UNITS: Units = Units {
    cpu: "millicores",
    memory: "bytes",
};

/// Render the finished aggregate at the requested detail
pub fn render(
    aggregate: &ClusterAggregate,
    detail: DetailLevel,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(aggregate, detail, Utc::now()),
        OutputFormat::Table => Ok(render_table(aggregate, detail)),
    }
}

fn render_json(
    aggregate: &ClusterAggregate,
    detail: DetailLevel,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    let nodes = if detail.includes_nodes() {
        aggregate.sorted_nodes()
    } else {
        Vec::new()
    };

    let report = JsonReport {
        generated_at,
        detail,
        units: JSON_UNITS,
        node_count: aggregate.node_count,
        pod_count: aggregate.pod_count,
        container_count: aggregate.container_count,
        allocatable: &aggregate.allocatable,
        requests: &aggregate.requests,
        limits: &aggregate.limits,
        nodes,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn render_table(aggregate: &ClusterAggregate, detail: DetailLevel) -> String {
    let nodes = if detail.includes_nodes() {
        aggregate.sorted_nodes()
    } else {
        Vec::new()
    };

    let mut table = if detail.includes_pods() {
        let mut rows = Vec::new();
        for node in nodes {
            rows.push(PodRow {
                node: node.name.clone(),
                pod: String::new(),
                figures: Figures::node(node),
            });

            let mut pods: Vec<&PodRecord> = node.pods.iter().collect();
            pods.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
            rows.extend(pods.into_iter().map(|pod| PodRow {
                node: node.name.clone(),
                pod: format!("{}/{}", pod.namespace, pod.name),
                figures: Figures::pod(pod),
            }));
        }
        rows.push(PodRow {
            node: TOTAL_LABEL.to_string(),
            pod: String::new(),
            figures: Figures::cluster(aggregate),
        });
        Table::new(rows)
    } else {
        let mut rows: Vec<NodeRow> = nodes
            .into_iter()
            .map(|node| NodeRow {
                node: node.name.clone(),
                figures: Figures::node(node),
            })
            .collect();
        rows.push(NodeRow {
            node: TOTAL_LABEL.to_string(),
            figures: Figures::cluster(aggregate),
        });
        Table::new(rows)
    };

    table.with(Style::rounded()).to_string()
}
