//! Process configuration: optional YAML file, then `KMCP_*` environment
//! overrides. CLI flags are layered on top by the binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_FILE_NAME: &str = ".kube-mcp-server.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub log_level: String,
    /// JSON log lines instead of the human formatter.
    pub structured_logging: bool,
    /// Passed to kubectl as `--kubeconfig` and used to build the API client.
    pub kubeconfig_path: Option<PathBuf>,
    pub disable_kubectl: bool,
    /// Explicit kubectl binary; looked up on `PATH` when unset.
    pub kubectl_path: Option<PathBuf>,
    pub disable_tools: bool,
    pub disable_resources: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            structured_logging: false,
            kubeconfig_path: None,
            disable_kubectl: false,
            kubectl_path: None,
            disable_tools: false,
            disable_resources: false,
        }
    }
}

impl Config {
    /// Load from `path` (must exist) or from `$HOME/.kube-mcp-server.yaml`
    /// (skipped when absent), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_path() {
                Some(p) if p.is_file() => Self::from_file(&p)?,
                _ => {
                    debug!("no config file; using defaults");
                    Self::default()
                }
            },
        };
        cfg.apply_overrides(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply `KMCP_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("KMCP_LOG_LEVEL").filter(|s| !s.is_empty()) {
            self.log_level = v;
        }
        if let Some(v) = lookup("KMCP_KUBECONFIG").filter(|s| !s.is_empty()) {
            self.kubeconfig_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("KMCP_KUBECTL_PATH").filter(|s| !s.is_empty()) {
            self.kubectl_path = Some(PathBuf::from(v));
        }
        let flags: [(&str, &mut bool); 4] = [
            ("KMCP_STRUCTURED_LOGGING", &mut self.structured_logging),
            ("KMCP_DISABLE_KUBECTL", &mut self.disable_kubectl),
            ("KMCP_DISABLE_TOOLS", &mut self.disable_tools),
            ("KMCP_DISABLE_RESOURCES", &mut self.disable_resources),
        ];
        for (key, slot) in flags {
            if let Some(raw) = lookup(key) {
                match parse_bool(&raw) {
                    Some(b) => *slot = b,
                    None => warn!(key, value = %raw, "ignoring non-boolean override"),
                }
            }
        }
    }

    pub fn tools_enabled(&self) -> bool { !self.disable_tools }
    pub fn resources_enabled(&self) -> bool { !self.disable_resources }
    pub fn kubectl_enabled(&self) -> bool { !self.disable_kubectl }
}

pub fn default_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(DEFAULT_FILE_NAME))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn yaml_uses_camel_case_keys_and_defaults() {
        let cfg = Config::from_yaml_str("logLevel: debug\nkubeconfigPath: /tmp/kc\ndisableKubectl: true\n").expect("parse");
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.kubeconfig_path.as_deref(), Some(Path::new("/tmp/kc")));
        assert!(!cfg.kubectl_enabled());
        assert!(cfg.tools_enabled());
        assert!(!cfg.structured_logging);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(Config::from_yaml_str("  \n").expect("parse"), Config::default());
    }

    #[test]
    fn malformed_yaml_is_error() {
        assert!(Config::from_yaml_str("logLevel: [unclosed").is_err());
    }

    #[test]
    fn env_overrides_win_and_bad_bools_are_ignored() {
        let env: HashMap<&str, &str> = [
            ("KMCP_LOG_LEVEL", "trace"),
            ("KMCP_KUBECONFIG", "/etc/kube/config"),
            ("KMCP_STRUCTURED_LOGGING", "yes"),
            ("KMCP_DISABLE_RESOURCES", "maybe"),
        ]
        .into_iter()
        .collect();
        let mut cfg = Config::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.log_level, "trace");
        assert_eq!(cfg.kubeconfig_path, Some(PathBuf::from("/etc/kube/config")));
        assert!(cfg.structured_logging);
        assert!(cfg.resources_enabled());
    }

    #[test]
    fn missing_explicit_file_is_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/kmcp.yaml"))).is_err());
    }
}
