//! Fixed-shape summary records for the built-in read collections.
//!
//! Each record is projected from the typed `k8s-openapi` object with an
//! explicit `now`, so identical inputs always project to identical records.

use chrono::{DateTime, Utc};
use k8s_openapi::{
    api::{
        apps::v1::{Deployment, StatefulSet},
        core::v1::{Pod, Service},
    },
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use serde::Serialize;

/// Projection of one native object into its summary record.
pub trait Summarize {
    type Summary: Serialize;
    fn summarize(&self, now: DateTime<Utc>) -> Self::Summary;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodSummary {
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub ready: String,
    pub node: String,
    pub age: String,
    pub containers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentSummary {
    pub name: String,
    pub namespace: String,
    pub replicas: i32,
    pub available: i32,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSummary {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(rename = "clusterIP")]
    pub cluster_ip: String,
    pub ports: Vec<String>,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatefulSetSummary {
    pub name: String,
    pub namespace: String,
    pub replicas: i32,
    pub ready: i32,
    pub age: String,
}

/// Go-style duration string for a whole number of seconds: `0s`, `45s`,
/// `3m7s`, `26h0m5s`.
pub fn render_age(secs: i64) -> String {
    if secs == 0 {
        return "0s".to_string();
    }
    let sign = if secs < 0 { "-" } else { "" };
    let s = secs.unsigned_abs();
    let (h, m, s) = (s / 3600, (s % 3600) / 60, s % 60);
    if h > 0 {
        format!("{}{}h{}m{}s", sign, h, m, s)
    } else if m > 0 {
        format!("{}{}m{}s", sign, m, s)
    } else {
        format!("{}{}s", sign, s)
    }
}

/// `now - creationTimestamp`, rounded half away from zero to whole seconds.
fn age_of(meta: &ObjectMeta, now: DateTime<Utc>) -> String {
    let Some(created) = meta.creation_timestamp.as_ref() else { return render_age(0) };
    let ms = (now - created.0).num_milliseconds();
    let secs = if ms >= 0 { (ms + 500) / 1000 } else { (ms - 500) / 1000 };
    render_age(secs)
}

fn name_ns(meta: &ObjectMeta) -> (String, String) {
    (meta.name.clone().unwrap_or_default(), meta.namespace.clone().unwrap_or_default())
}

/// `(ready, total)` over the pod's container statuses.
pub fn pod_ready_containers(pod: &Pod) -> (usize, usize) {
    let statuses = pod.status.as_ref().and_then(|s| s.container_statuses.as_deref()).unwrap_or_default();
    (statuses.iter().filter(|c| c.ready).count(), statuses.len())
}

impl Summarize for Pod {
    type Summary = PodSummary;

    fn summarize(&self, now: DateTime<Utc>) -> PodSummary {
        let (name, namespace) = name_ns(&self.metadata);
        let (ready, total) = pod_ready_containers(self);
        let spec = self.spec.as_ref();
        PodSummary {
            name,
            namespace,
            status: self.status.as_ref().and_then(|s| s.phase.clone()).unwrap_or_default(),
            ready: format!("{}/{}", ready, total),
            node: spec.and_then(|s| s.node_name.clone()).unwrap_or_default(),
            age: age_of(&self.metadata, now),
            containers: spec.map(|s| s.containers.iter().map(|c| c.name.clone()).collect()).unwrap_or_default(),
        }
    }
}

impl Summarize for Deployment {
    type Summary = DeploymentSummary;

    fn summarize(&self, now: DateTime<Utc>) -> DeploymentSummary {
        let (name, namespace) = name_ns(&self.metadata);
        let status = self.status.as_ref();
        DeploymentSummary {
            name,
            namespace,
            replicas: status.and_then(|s| s.replicas).unwrap_or(0),
            available: status.and_then(|s| s.available_replicas).unwrap_or(0),
            age: age_of(&self.metadata, now),
        }
    }
}

impl Summarize for Service {
    type Summary = ServiceSummary;

    fn summarize(&self, now: DateTime<Utc>) -> ServiceSummary {
        let (name, namespace) = name_ns(&self.metadata);
        let spec = self.spec.as_ref();
        let ports = spec
            .and_then(|s| s.ports.as_ref())
            .map(|ports| {
                ports
                    .iter()
                    .map(|p| format!("{}/{}", p.port, p.protocol.as_deref().unwrap_or("TCP")))
                    .collect()
            })
            .unwrap_or_default();
        ServiceSummary {
            name,
            namespace,
            service_type: spec.and_then(|s| s.type_.clone()).unwrap_or_default(),
            cluster_ip: spec.and_then(|s| s.cluster_ip.clone()).unwrap_or_default(),
            ports,
            age: age_of(&self.metadata, now),
        }
    }
}

impl Summarize for StatefulSet {
    type Summary = StatefulSetSummary;

    fn summarize(&self, now: DateTime<Utc>) -> StatefulSetSummary {
        let (name, namespace) = name_ns(&self.metadata);
        let status = self.status.as_ref();
        StatefulSetSummary {
            name,
            namespace,
            replicas: status.map(|s| s.replicas).unwrap_or(0),
            ready: status.and_then(|s| s.ready_replicas).unwrap_or(0),
            age: age_of(&self.metadata, now),
        }
    }
}

/// Project a whole listing against a single `now`.
pub fn summarize_all<K: Summarize>(items: &[K], now: DateTime<Utc>) -> Vec<K::Summary> {
    items.iter().map(|i| i.summarize(now)).collect()
}
