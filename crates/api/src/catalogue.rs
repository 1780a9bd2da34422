//! Built-in operations and resources.

use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use kmcp_core::{ArgumentSet, Config, KmcpError, KmcpResult, ParamSpec, ResourceTemplate, ResponseEnvelope, Scope};
use kmcp_kubehub::{summary::summarize_all, ClusterApi};
use kmcp_ops::{CommandOp, ProcessExecutor};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::registry::{OperationHandler, OperationSpec, Registry, ResourceHandler, ResourceSpec};

/// The summarized read collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Pods,
    Deployments,
    Services,
    StatefulSets,
}

impl Collection {
    pub const ALL: [Collection; 4] = [Collection::Pods, Collection::Deployments, Collection::Services, Collection::StatefulSets];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Pods => "pods",
            Collection::Deployments => "deployments",
            Collection::Services => "services",
            Collection::StatefulSets => "statefulsets",
        }
    }

    pub fn total_key(self) -> &'static str {
        match self {
            Collection::Pods => "total_pods",
            _ => "total_items",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Collection::Pods => "Pods",
            Collection::Deployments => "Deployments",
            Collection::Services => "Services",
            Collection::StatefulSets => "StatefulSets",
        }
    }

    /// List, project and wrap one collection for `scope`.
    pub async fn render(self, cluster: &dyn ClusterApi, scope: &Scope) -> KmcpResult<String> {
        let ns = scope.namespace();
        let failed = |e: anyhow::Error| KmcpError::External(format!("{:#}", e));
        let now = Utc::now();
        match self {
            Collection::Pods => self.wrap(scope, summarize_all(&cluster.list_pods(ns).await.map_err(failed)?, now)),
            Collection::Deployments => self.wrap(scope, summarize_all(&cluster.list_deployments(ns).await.map_err(failed)?, now)),
            Collection::Services => self.wrap(scope, summarize_all(&cluster.list_services(ns).await.map_err(failed)?, now)),
            Collection::StatefulSets => {
                self.wrap(scope, summarize_all(&cluster.list_statefulsets(ns).await.map_err(failed)?, now))
            }
        }
    }

    fn wrap<T: Serialize>(self, scope: &Scope, items: Vec<T>) -> KmcpResult<String> {
        ResponseEnvelope::new(self.name(), self.total_key(), scope, items).to_json_pretty()
    }
}

/// Race `fut` against caller cancellation.
async fn cancellable<T>(cancel: &CancellationToken, fut: impl std::future::Future<Output = KmcpResult<T>>) -> KmcpResult<T> {
    tokio::select! {
        res = fut => res,
        _ = cancel.cancelled() => Err(KmcpError::Cancelled),
    }
}

fn count_pods(cluster: Arc<dyn ClusterApi>) -> OperationSpec {
    let params = vec![ParamSpec::string("namespace", "Namespace to count (empty for all)").with_default("default")];
    let handler: OperationHandler = Arc::new(move |args: ArgumentSet, cancel: CancellationToken| {
        let cluster = cluster.clone();
        async move {
            let ns = args.str("namespace").map(|s| s.to_string());
            let pods = cancellable(&cancel, async {
                cluster
                    .list_pods(ns.as_deref())
                    .await
                    .map_err(|e| KmcpError::External(format!("count pods failed: {:#}", e)))
            })
            .await?;
            Ok(format!("Found {} pods", pods.len()))
        }
        .boxed()
    });
    OperationSpec::new("count_pods", "Count Pods in a Kubernetes namespace", params, handler)
}

fn kubectl_operation(op: CommandOp, executor: Arc<dyn ProcessExecutor>) -> OperationSpec {
    let handler: OperationHandler = Arc::new(move |args: ArgumentSet, cancel: CancellationToken| {
        let executor = executor.clone();
        async move { kmcp_ops::run(op, &args, executor.as_ref(), &cancel).await }.boxed()
    });
    OperationSpec::new(op.tool_name(), op.description(), op.params(), handler)
}

fn collection_resource(collection: Collection, cluster: Arc<dyn ClusterApi>) -> ResourceSpec {
    let handler: ResourceHandler = Arc::new(move |scope: Scope, cancel: CancellationToken| {
        let cluster = cluster.clone();
        async move { cancellable(&cancel, collection.render(cluster.as_ref(), &scope)).await }.boxed()
    });
    ResourceSpec::new(
        ResourceTemplate::new(collection.name()),
        collection.title(),
        format!("List and view {} across all namespaces or within one namespace", collection.name()),
        handler,
    )
}

/// Registry with every built-in entry the configuration enables.
///
/// kubectl-backed operations need an executor; without one they are skipped.
pub fn build_registry(
    cfg: &Config,
    cluster: Arc<dyn ClusterApi>,
    executor: Option<Arc<dyn ProcessExecutor>>,
) -> KmcpResult<Registry> {
    let mut registry = Registry::new();
    if cfg.tools_enabled() {
        registry.register_operation(count_pods(cluster.clone()))?;
        if let Some(exec) = executor.filter(|_| cfg.kubectl_enabled()) {
            for op in CommandOp::ALL {
                registry.register_operation(kubectl_operation(op, exec.clone()))?;
            }
        }
    }
    if cfg.resources_enabled() {
        for collection in Collection::ALL {
            registry.register_resource(collection_resource(collection, cluster.clone()))?;
        }
    }
    info!(operations = registry.operations().len(), resources = registry.resources().len(), "registry ready");
    Ok(registry)
}
