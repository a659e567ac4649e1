//! [`ClusterSource`] backed by the Kubernetes API

use crate::error::{InventoryError, Result};
use crate::inventory::ClusterSource;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::Path;
use tracing::debug;

/// Lists nodes and pods through a kube-rs client
#[derive(Clone)]
pub struct KubeSource {
    client: Client,
}

impl KubeSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from kubeconfig.
    ///
    /// An explicit `kubeconfig` path is read as-is. Otherwise the default
    /// loading rules apply (`KUBECONFIG`, `~/.kube/config`), falling back to the
    /// in-cluster service account when no context was requested.
    pub async fn connect(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Self> {
        let options = KubeConfigOptions {
            context: context.map(String::from),
            ..Default::default()
        };

        let config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    InventoryError::connection(
                        format!("failed to read kubeconfig {}", path.display()),
                        e,
                    )
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| InventoryError::connection("failed to load kubeconfig", e))?
            }
            None if context.is_some() => Config::from_kubeconfig(&options)
                .await
                .map_err(|e| InventoryError::connection("failed to load kubeconfig", e))?,
            None => Config::infer()
                .await
                .map_err(|e| InventoryError::connection("failed to infer cluster config", e))?,
        };

        debug!(cluster_url = %config.cluster_url, "Loaded cluster configuration");

        let client = Client::try_from(config)
            .map_err(|e| InventoryError::connection("failed to create client", e))?;
        Ok(Self::new(client))
    }

    /// API server git version, if the discovery endpoint answers
    pub async fn server_version(&self) -> Option<String> {
        match self.client.apiserver_version().await {
            Ok(info) => Some(info.git_version),
            Err(e) => {
                debug!(error = %e, "Failed to fetch API server version");
                None
            }
        }
    }
}

/// `spec.nodeName` field selector restricting pods to one node
pub fn node_field_selector(node_name: &str) -> String {
    format!("spec.nodeName={node_name}")
}

#[async_trait]
impl ClusterSource for KubeSource {
    async fn list_nodes(&self, label_selector: Option<&str>) -> Result<Vec<Node>> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }

        let list = nodes.list(&params).await.map_err(InventoryError::node_query)?;
        Ok(list.items)
    }

    async fn list_pods(&self, node_name: &str, label_selector: Option<&str>) -> Result<Vec<Pod>> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let mut params = ListParams::default().fields(&node_field_selector(node_name));
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }

        let list = pods
            .list(&params)
            .await
            .map_err(|e| InventoryError::pod_query(node_name, e))?;
        debug!(node = %node_name, pods = list.items.len(), "Listed pods");
        Ok(list.items)
    }
}
