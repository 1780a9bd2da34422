//! Name and URI keyed dispatch table.
//!
//! Entries are registered once at startup and read concurrently afterwards;
//! the registry is shared behind an `Arc` and never mutated after that.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use kmcp_core::{params::input_schema, ArgumentSet, KmcpError, KmcpResult, ParamSpec, ResourceTemplate, Scope};
use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const JSON_MIME: &str = "application/json";

/// Operation handler: validated arguments in, response text out.
pub type OperationHandler = Arc<dyn Fn(ArgumentSet, CancellationToken) -> BoxFuture<'static, KmcpResult<String>> + Send + Sync>;

/// Resource handler: resolved scope in, document text out.
pub type ResourceHandler = Arc<dyn Fn(Scope, CancellationToken) -> BoxFuture<'static, KmcpResult<String>> + Send + Sync>;

/// Result of one operation call. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallOutcome {
    pub text: String,
    pub is_error: bool,
}

impl CallOutcome {
    pub fn text(text: impl Into<String>) -> Self { Self { text: text.into(), is_error: false } }
    pub fn error(text: impl Into<String>) -> Self { Self { text: text.into(), is_error: true } }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceContents {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub text: String,
}

pub struct OperationSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    handler: OperationHandler,
}

impl OperationSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, params: Vec<ParamSpec>, handler: OperationHandler) -> Self {
        Self { name: name.into(), description: description.into(), params, handler }
    }

    /// JSON Schema object for the declared parameters.
    pub fn input_schema(&self) -> Value { input_schema(&self.params) }
}

impl fmt::Debug for OperationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationSpec")
            .field("name", &self.name)
            .field("params", &self.params.iter().map(|p| p.key.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

pub struct ResourceSpec {
    pub template: ResourceTemplate,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    handler: ResourceHandler,
}

impl ResourceSpec {
    pub fn new(template: ResourceTemplate, name: impl Into<String>, description: impl Into<String>, handler: ResourceHandler) -> Self {
        Self { template, name: name.into(), description: description.into(), mime_type: JSON_MIME.to_string(), handler }
    }
}

impl fmt::Debug for ResourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSpec").field("uri", &self.template.literal_uri()).field("name", &self.name).finish()
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    operations: Vec<OperationSpec>,
    by_name: HashMap<String, usize>,
    resources: Vec<ResourceSpec>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn register_operation(&mut self, spec: OperationSpec) -> KmcpResult<()> {
        if self.by_name.contains_key(&spec.name) {
            return Err(KmcpError::Registration(format!("operation '{}' already registered", spec.name)));
        }
        self.by_name.insert(spec.name.clone(), self.operations.len());
        self.operations.push(spec);
        Ok(())
    }

    pub fn register_resource(&mut self, spec: ResourceSpec) -> KmcpResult<()> {
        let uri = spec.template.literal_uri();
        if self.resources.iter().any(|r| r.template.literal_uri() == uri) {
            return Err(KmcpError::Registration(format!("resource '{}' already registered", uri)));
        }
        self.resources.push(spec);
        Ok(())
    }

    pub fn operations(&self) -> &[OperationSpec] { &self.operations }

    pub fn resources(&self) -> &[ResourceSpec] { &self.resources }

    pub fn operation(&self, name: &str) -> Option<&OperationSpec> {
        self.by_name.get(name).map(|&i| &self.operations[i])
    }

    /// Validate `raw` against the named operation and run its handler.
    ///
    /// Unknown names and caller cancellation are errors; everything else,
    /// including invalid arguments, comes back as a `CallOutcome`.
    pub async fn dispatch(&self, name: &str, raw: &Value, cancel: &CancellationToken) -> KmcpResult<CallOutcome> {
        let t0 = Instant::now();
        let spec = self.operation(name).ok_or_else(|| KmcpError::NotFound(format!("unknown operation '{}'", name)))?;
        counter!("dispatch_calls", 1u64, "op" => spec.name.clone());
        let outcome = match ArgumentSet::validate(&spec.params, raw) {
            Err(e) => {
                warn!(op = %name, error = %e, "arguments rejected");
                CallOutcome::error(e.detail())
            }
            Ok(args) => match (spec.handler)(args, cancel.clone()).await {
                Ok(text) => CallOutcome::text(text),
                Err(KmcpError::Cancelled) => {
                    counter!("dispatch_errors", 1u64, "op" => spec.name.clone());
                    info!(op = %name, took_ms = %t0.elapsed().as_millis(), "dispatch cancelled");
                    return Err(KmcpError::Cancelled);
                }
                Err(e) => CallOutcome::error(e.detail()),
            },
        };
        if outcome.is_error {
            counter!("dispatch_errors", 1u64, "op" => spec.name.clone());
        }
        let took = t0.elapsed();
        histogram!("dispatch_latency_ms", took.as_secs_f64() * 1000.0, "op" => spec.name.clone());
        info!(op = %name, is_error = outcome.is_error, took_ms = %took.as_millis(), "dispatch done");
        Ok(outcome)
    }

    /// Route `uri` to a resource: the literal form first, then the
    /// `{namespace}` template.
    pub async fn read(&self, uri: &str, cancel: &CancellationToken) -> KmcpResult<ResourceContents> {
        let t0 = Instant::now();
        let (spec, scope) = self
            .resources
            .iter()
            .find_map(|r| r.template.match_uri(uri).map(|s| (r, s)))
            .ok_or_else(|| KmcpError::NotFound(format!("no resource matches '{}'", uri)))?;
        counter!("resource_reads", 1u64, "collection" => spec.template.collection().to_string());
        let ns = scope.namespace().unwrap_or("(all)").to_string();
        let text = (spec.handler)(scope, cancel.clone()).await?;
        info!(uri = %uri, ns = %ns, bytes = text.len(), took_ms = %t0.elapsed().as_millis(), "resource read");
        Ok(ResourceContents { uri: uri.to_string(), mime_type: spec.mime_type.clone(), text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    fn echo_op(name: &str) -> OperationSpec {
        let handler: OperationHandler = Arc::new(|args: ArgumentSet, _cancel: CancellationToken| {
            async move { Ok(format!("hello {}", args.str("who").unwrap_or("nobody"))) }.boxed()
        });
        OperationSpec::new(name, "echo", vec![ParamSpec::string("who", "target").required()], handler)
    }

    fn scope_resource(collection: &str) -> ResourceSpec {
        let handler: ResourceHandler = Arc::new(|scope: Scope, _cancel: CancellationToken| async move { Ok(scope.describe()) }.boxed());
        ResourceSpec::new(ResourceTemplate::new(collection), collection, "scope echo", handler)
    }

    #[test]
    fn duplicate_names_and_uris_are_rejected() {
        let mut r = Registry::new();
        r.register_operation(echo_op("a")).expect("first");
        assert!(matches!(r.register_operation(echo_op("a")), Err(KmcpError::Registration(_))));
        r.register_resource(scope_resource("pods")).expect("first");
        assert!(matches!(r.register_resource(scope_resource("pods")), Err(KmcpError::Registration(_))));
        assert_eq!(r.operations().len(), 1);
        assert_eq!(r.resources().len(), 1);
    }

    #[test]
    fn enumeration_keeps_registration_order() {
        let mut r = Registry::new();
        for n in ["b", "a", "c"] {
            r.register_operation(echo_op(n)).expect("register");
        }
        let names: Vec<_> = r.operations().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn schema_lists_required_keys() {
        let s = echo_op("a").input_schema();
        assert_eq!(s["type"], "object");
        assert_eq!(s["required"], json!(["who"]));
        assert_eq!(s["properties"]["who"]["type"], "string");
    }

    #[tokio::test]
    async fn dispatch_routes_validates_and_misses() {
        let mut r = Registry::new();
        r.register_operation(echo_op("greet")).expect("register");
        let cancel = CancellationToken::new();
        let ok = r.dispatch("greet", &json!({"who": "world"}), &cancel).await.expect("dispatch");
        assert_eq!(ok, CallOutcome::text("hello world"));
        let bad = r.dispatch("greet", &json!({}), &cancel).await.expect("dispatch");
        assert_eq!(bad, CallOutcome::error("missing required argument 'who'"));
        let miss = r.dispatch("Greet", &json!({}), &cancel).await.unwrap_err();
        assert!(matches!(miss, KmcpError::NotFound(_)));
    }

    #[tokio::test]
    async fn read_prefers_literal_then_template() {
        let mut r = Registry::new();
        r.register_resource(scope_resource("pods")).expect("register");
        let cancel = CancellationToken::new();
        let all = r.read("k8s://pods", &cancel).await.expect("read");
        assert_eq!(all.text, "All namespaces");
        assert_eq!(all.mime_type, JSON_MIME);
        let ns = r.read("k8s://prod/pods", &cancel).await.expect("read");
        assert_eq!(ns.text, "Namespace: prod");
        assert_eq!(ns.uri, "k8s://prod/pods");
        assert!(matches!(r.read("k8s://prod/nodes", &cancel).await, Err(KmcpError::NotFound(_))));
        assert!(matches!(r.read("pods", &cancel).await, Err(KmcpError::NotFound(_))));
    }
}
