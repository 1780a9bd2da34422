//! kube-mcp core types.
//!
//! Shared by the kube integration, the command layer and the dispatch registry:
//! the error taxonomy, operation parameter schemas, the `k8s://` URI router,
//! the response envelope for read endpoints and the process configuration.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub mod config;
pub mod envelope;
pub mod params;
pub mod uri;

pub use config::Config;
pub use envelope::{scope_description, ResponseEnvelope};
pub use params::{ArgumentSet, ParamKind, ParamSpec};
pub use uri::{parse_namespace, ResourceTemplate, Scope, URI_PREFIX};

/// Per-request errors. None of these are fatal to the serving process.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum KmcpError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("external: {0}")]
    External(String),
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("registration: {0}")]
    Registration(String),
    #[error("cancelled")]
    Cancelled,
}

impl KmcpError {
    /// Message without the category prefix, for text shown to callers.
    pub fn detail(&self) -> &str {
        match self {
            KmcpError::Validation(m)
            | KmcpError::NotFound(m)
            | KmcpError::External(m)
            | KmcpError::Serialization(m)
            | KmcpError::Registration(m) => m,
            KmcpError::Cancelled => "operation cancelled",
        }
    }
}

impl From<serde_json::Error> for KmcpError {
    fn from(e: serde_json::Error) -> Self {
        KmcpError::Serialization(e.to_string())
    }
}

pub type KmcpResult<T> = Result<T, KmcpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_strips_category() {
        let e = KmcpError::Validation("resource must be specified".into());
        assert_eq!(e.to_string(), "validation: resource must be specified");
        assert_eq!(e.detail(), "resource must be specified");
        assert_eq!(KmcpError::Cancelled.detail(), "operation cancelled");
    }

    #[test]
    fn json_errors_map_to_serialization() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(KmcpError::from(err), KmcpError::Serialization(_)));
    }
}
