//! `k8s://` resource URIs.
//!
//! Two shapes are routed: `k8s://<collection>` (all namespaces) and
//! `k8s://<namespace>/<collection>`. The first path segment after the prefix
//! is the namespace; an empty first segment never means "all namespaces".

use crate::{envelope::scope_description, KmcpError, KmcpResult};

pub const URI_PREFIX: &str = "k8s://";
pub const NAMESPACE_PLACEHOLDER: &str = "{namespace}";

/// Extract the namespace segment from a `k8s://<namespace>[/...]` URI.
pub fn parse_namespace(uri: &str) -> KmcpResult<String> {
    let rest = uri
        .strip_prefix(URI_PREFIX)
        .ok_or_else(|| KmcpError::Validation(format!("invalid URI format: {}", uri)))?;
    match rest.split('/').next() {
        Some(ns) if !ns.is_empty() => Ok(ns.to_string()),
        _ => Err(KmcpError::Validation(format!("namespace not found in URI: {}", uri))),
    }
}

/// Namespace scope of a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Namespace(String),
}

impl Scope {
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Scope::All => None,
            Scope::Namespace(ns) => Some(ns),
        }
    }

    pub fn describe(&self) -> String {
        scope_description(self.namespace())
    }
}

/// Literal and `{namespace}`-templated URI pair for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTemplate {
    collection: String,
}

impl ResourceTemplate {
    pub fn new(collection: &str) -> Self {
        Self { collection: collection.to_string() }
    }

    pub fn collection(&self) -> &str { &self.collection }

    pub fn literal_uri(&self) -> String {
        format!("{}{}", URI_PREFIX, self.collection)
    }

    pub fn template_uri(&self) -> String {
        format!("{}{}/{}", URI_PREFIX, NAMESPACE_PLACEHOLDER, self.collection)
    }

    /// Literal form first, then the templated form.
    pub fn match_uri(&self, uri: &str) -> Option<Scope> {
        if uri == self.literal_uri() {
            return Some(Scope::All);
        }
        let rest = uri.strip_prefix(URI_PREFIX)?;
        let (_, tail) = rest.split_once('/')?;
        if tail != self.collection {
            return None;
        }
        parse_namespace(uri).ok().map(Scope::Namespace)
    }
}
