//! kube-mcp kubehub: API client construction and typed listings.

#![forbid(unsafe_code)]

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use k8s_openapi::api::{
    apps::v1::{Deployment, StatefulSet},
    core::v1::{Pod, Service},
};
use kube::{
    api::{Api, ListParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use tracing::info;

pub mod summary;

pub use summary::{
    render_age, DeploymentSummary, PodSummary, ServiceSummary, StatefulSetSummary, Summarize,
};

/// Build a client from an explicit kubeconfig, else the default inference
/// chain (KUBECONFIG, ~/.kube/config, in-cluster).
pub async fn get_kube_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let t0 = Instant::now();
    let client = match kubeconfig {
        Some(path) => {
            let kc = Kubeconfig::read_from(path).with_context(|| format!("reading kubeconfig {}", path.display()))?;
            let cfg = Config::from_custom_kubeconfig(kc, &KubeConfigOptions::default())
                .await
                .context("building client config from kubeconfig")?;
            Client::try_from(cfg).context("constructing kube client")?
        }
        None => Client::try_default().await.context("inferring kube client config")?,
    };
    info!(kubeconfig = ?kubeconfig, took_ms = %t0.elapsed().as_millis(), "kube client ready");
    Ok(client)
}

/// Read-side cluster operations used by count/list endpoints.
///
/// `None` lists across all namespaces.
#[async_trait::async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<Pod>>;
    async fn list_deployments(&self, namespace: Option<&str>) -> Result<Vec<Deployment>>;
    async fn list_services(&self, namespace: Option<&str>) -> Result<Vec<Service>>;
    async fn list_statefulsets(&self, namespace: Option<&str>) -> Result<Vec<StatefulSet>>;
}

/// `ClusterApi` over a shared kube client.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self { Self { client } }

    fn api<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        match namespace {
            Some(ns) if !ns.is_empty() => Api::namespaced(self.client.clone(), ns),
            _ => Api::all(self.client.clone()),
        }
    }

    async fn list<K>(&self, kind: &'static str, namespace: Option<&str>) -> Result<Vec<K>>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + std::fmt::Debug
            + serde::de::DeserializeOwned,
        <K as kube::Resource>::DynamicType: Default,
    {
        let t0 = Instant::now();
        let api: Api<K> = self.api(namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .with_context(|| format!("failed to list {} in {}", kind, scope_label(namespace)))?;
        info!(kind, ns = %namespace.unwrap_or("(all)"), count = list.items.len(), took_ms = %t0.elapsed().as_millis(), "list ok");
        Ok(list.items)
    }
}

fn scope_label(namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("namespace '{}'", ns),
        _ => "all namespaces".to_string(),
    }
}

#[async_trait::async_trait]
impl ClusterApi for KubeCluster {
    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<Pod>> {
        self.list("pods", namespace).await
    }

    async fn list_deployments(&self, namespace: Option<&str>) -> Result<Vec<Deployment>> {
        self.list("deployments", namespace).await
    }

    async fn list_services(&self, namespace: Option<&str>) -> Result<Vec<Service>> {
        self.list("services", namespace).await
    }

    async fn list_statefulsets(&self, namespace: Option<&str>) -> Result<Vec<StatefulSet>> {
        self.list("statefulsets", namespace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_labels() {
        assert_eq!(scope_label(None), "all namespaces");
        assert_eq!(scope_label(Some("")), "all namespaces");
        assert_eq!(scope_label(Some("prod")), "namespace 'prod'");
    }

    #[tokio::test]
    async fn missing_kubeconfig_file_is_error() {
        let Err(err) = get_kube_client(Some(Path::new("/nonexistent/kubeconfig"))).await else {
            panic!("expected a missing kubeconfig to fail");
        };
        assert!(err.to_string().contains("reading kubeconfig"));
    }
}
