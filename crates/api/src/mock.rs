//! In-memory collaborators for tests.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use k8s_openapi::api::{
    apps::v1::{Deployment, StatefulSet},
    core::v1::{Pod, Service},
};
use kmcp_kubehub::ClusterApi;
use kmcp_ops::{CommandVector, ExecOutput, ProcessExecutor};
use tokio_util::sync::CancellationToken;

/// Fixed object lists, filtered by `metadata.namespace` on namespaced calls.
#[derive(Default)]
pub struct MockCluster {
    pub pods: Vec<Pod>,
    pub deployments: Vec<Deployment>,
    pub services: Vec<Service>,
    pub statefulsets: Vec<StatefulSet>,
    /// Every list call fails with this message when set.
    pub fail: Option<String>,
    /// List calls never complete.
    pub hang: bool,
    /// Namespace argument of each call, in order.
    pub calls: Mutex<Vec<Option<String>>>,
}

impl MockCluster {
    pub fn new() -> Self { Self::default() }

    pub fn calls(&self) -> Vec<Option<String>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    async fn list<K>(&self, items: &[K], meta_ns: impl Fn(&K) -> Option<&str>, namespace: Option<&str>) -> Result<Vec<K>>
    where
        K: Clone + Send + Sync,
    {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(namespace.map(|s| s.to_string()));
        }
        if self.hang {
            futures::future::pending::<()>().await;
        }
        if let Some(msg) = &self.fail {
            return Err(anyhow!(msg.clone()));
        }
        Ok(match namespace {
            Some(ns) if !ns.is_empty() => items.iter().filter(|i| meta_ns(i) == Some(ns)).cloned().collect(),
            _ => items.to_vec(),
        })
    }
}

#[async_trait::async_trait]
impl ClusterApi for MockCluster {
    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<Pod>> {
        self.list(&self.pods, |p| p.metadata.namespace.as_deref(), namespace).await
    }

    async fn list_deployments(&self, namespace: Option<&str>) -> Result<Vec<Deployment>> {
        self.list(&self.deployments, |d| d.metadata.namespace.as_deref(), namespace).await
    }

    async fn list_services(&self, namespace: Option<&str>) -> Result<Vec<Service>> {
        self.list(&self.services, |s| s.metadata.namespace.as_deref(), namespace).await
    }

    async fn list_statefulsets(&self, namespace: Option<&str>) -> Result<Vec<StatefulSet>> {
        self.list(&self.statefulsets, |s| s.metadata.namespace.as_deref(), namespace).await
    }
}

/// Returns a canned reply and records every vector it is handed.
#[derive(Default)]
pub struct RecordingExecutor {
    pub reply: ExecOutput,
    seen: Mutex<Vec<Vec<String>>>,
}

impl RecordingExecutor {
    pub fn new(reply: ExecOutput) -> Self { Self { reply, seen: Mutex::new(Vec::new()) } }

    pub fn seen(&self) -> Vec<Vec<String>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ProcessExecutor for RecordingExecutor {
    async fn execute(&self, command: &CommandVector, _cancel: &CancellationToken) -> ExecOutput {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(command.tokens().to_vec());
        }
        self.reply.clone()
    }
}
