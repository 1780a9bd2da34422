//! kube-mcp dispatch surface (in-process).
//!
//! Frontends build a [`Registry`] once with [`build_registry`] and then call
//! [`Registry::dispatch`] and [`Registry::read`] per request.

#![forbid(unsafe_code)]

pub mod catalogue;
pub mod mock;
pub mod registry;

pub use catalogue::{build_registry, Collection};
pub use kmcp_core::{KmcpError, KmcpResult};
pub use registry::{CallOutcome, OperationSpec, Registry, ResourceContents, ResourceSpec, JSON_MIME};
