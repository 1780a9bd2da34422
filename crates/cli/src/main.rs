use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use kmcp_api::{build_registry, CallOutcome, KmcpError, Registry};
use kmcp_core::Config;
use kmcp_kubehub::{get_kube_client, ClusterApi, KubeCluster};
use kmcp_ops::{KubectlExecutor, ProcessExecutor};
use serde_json::{json, Value};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "kube-mcp", version, about = "Kubernetes operations and resources for agents")]
struct Cli {
    /// Config file (default: ~/.kube-mcp-server.yaml when present)
    #[arg(long = "config", global = true, env = "KMCP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level, overrides the config file
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,

    /// Kubeconfig for kubectl and the API client
    #[arg(long = "kubeconfig", global = true)]
    kubeconfig: Option<PathBuf>,

    /// Do not register kubectl-backed operations
    #[arg(long = "disable-kubectl", global = true, action = ArgAction::SetTrue)]
    disable_kubectl: bool,

    /// kubectl binary (default: looked up on PATH)
    #[arg(long = "kubectl", global = true)]
    kubectl: Option<PathBuf>,

    /// Cancel the request after this many seconds
    #[arg(long = "timeout", global = true)]
    timeout: Option<u64>,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered operations
    Tools,
    /// Invoke an operation with JSON arguments
    Call {
        /// Operation name, e.g. "kubectl_get" or "count_pods"
        name: String,
        /// Arguments as a JSON object
        #[arg(long = "args", default_value = "{}")]
        args: String,
    },
    /// List registered resources
    Resources,
    /// Read a resource URI, e.g. "k8s://pods" or "k8s://prod/services"
    Read { uri: String },
}

fn init_tracing(cfg: &Config) {
    let env = std::env::var("KMCP_LOG").unwrap_or_else(|_| cfg.log_level.clone());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if cfg.structured_logging {
        fmt.json().with_target(true).init();
    } else {
        fmt.with_target(true).init();
    }
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("KMCP_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid KMCP_METRICS_ADDR; expected host:port");
        }
    }
}

/// Config file and environment first, then command-line flags.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut cfg = Config::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        cfg.log_level = level.clone();
    }
    if let Some(kc) = &cli.kubeconfig {
        cfg.kubeconfig_path = Some(kc.clone());
    }
    if let Some(bin) = &cli.kubectl {
        cfg.kubectl_path = Some(bin.clone());
    }
    if cli.disable_kubectl {
        cfg.disable_kubectl = true;
    }
    Ok(cfg)
}

async fn startup(cfg: &Config) -> Result<Registry> {
    let t0 = Instant::now();
    let client = get_kube_client(cfg.kubeconfig_path.as_deref()).await?;
    let cluster: Arc<dyn ClusterApi> = Arc::new(KubeCluster::new(client));
    let executor: Option<Arc<dyn ProcessExecutor>> = if cfg.tools_enabled() && cfg.kubectl_enabled() {
        let exec = KubectlExecutor::new(cfg.kubectl_path.as_deref(), cfg.kubeconfig_path.clone())?;
        Some(Arc::new(exec) as Arc<dyn ProcessExecutor>)
    } else {
        None
    };
    let registry = build_registry(cfg, cluster, executor).context("building registry")?;
    info!(took_ms = %t0.elapsed().as_millis(), "startup complete");
    Ok(registry)
}

/// Token cancelled by ctrl-c or, when set, after `timeout`.
fn cancel_token(timeout: Option<u64>) -> CancellationToken {
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received; cancelling");
                cancel.cancel();
            }
        }
    });
    if let Some(secs) = timeout {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!(secs, "timeout reached; cancelling");
            cancel.cancel();
        });
    }
    cancel
}

fn print_outcome(outcome: &CallOutcome, output: Output) -> Result<()> {
    match output {
        Output::Human => {
            if outcome.is_error {
                eprintln!("{}", outcome.text);
            } else {
                println!("{}", outcome.text);
            }
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    init_tracing(&cfg);
    init_metrics();
    let registry = startup(&cfg).await?;

    match cli.command {
        Commands::Tools => match cli.output {
            Output::Human => {
                for op in registry.operations() {
                    println!("{:<18} {}", op.name, op.description);
                }
            }
            Output::Json => {
                let tools: Vec<Value> = registry
                    .operations()
                    .iter()
                    .map(|op| json!({"name": op.name, "description": op.description, "inputSchema": op.input_schema()}))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&tools)?);
            }
        },
        Commands::Resources => match cli.output {
            Output::Human => {
                for r in registry.resources() {
                    println!("{:<20} {:<32} {}", r.template.literal_uri(), r.template.template_uri(), r.name);
                }
            }
            Output::Json => {
                let resources: Vec<Value> = registry
                    .resources()
                    .iter()
                    .map(|r| {
                        json!({
                            "uri": r.template.literal_uri(),
                            "uriTemplate": r.template.template_uri(),
                            "name": r.name,
                            "description": r.description,
                            "mimeType": r.mime_type,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&resources)?);
            }
        },
        Commands::Call { name, args } => {
            let raw: Value = serde_json::from_str(&args).context("--args must be valid JSON")?;
            let cancel = cancel_token(cli.timeout);
            info!(op = %name, "call invoked");
            match registry.dispatch(&name, &raw, &cancel).await {
                Ok(outcome) => {
                    print_outcome(&outcome, cli.output)?;
                    if outcome.is_error {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    error!(op = %name, error = %e, "call failed");
                    eprintln!("call error: {}", e);
                    std::process::exit(exit_code(&e));
                }
            }
        }
        Commands::Read { uri } => {
            let cancel = cancel_token(cli.timeout);
            info!(uri = %uri, "read invoked");
            match registry.read(&uri, &cancel).await {
                Ok(contents) => match cli.output {
                    Output::Human => println!("{}", contents.text),
                    Output::Json => println!("{}", serde_json::to_string_pretty(&contents)?),
                },
                Err(e) => {
                    error!(uri = %uri, error = %e, "read failed");
                    eprintln!("read error: {}", e);
                    std::process::exit(exit_code(&e));
                }
            }
        }
    }
    Ok(())
}

fn exit_code(e: &KmcpError) -> i32 {
    match e {
        KmcpError::NotFound(_) => 2,
        KmcpError::Cancelled => 130,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["kube-mcp", "call", "kubectl_get", "--args", r#"{"resource":"pods"}"#, "-o", "json", "--timeout", "5"])
            .expect("parse");
        assert_eq!(cli.output, Output::Json);
        assert_eq!(cli.timeout, Some(5));
        match cli.command {
            Commands::Call { name, args } => {
                assert_eq!(name, "kubectl_get");
                assert_eq!(args, r#"{"resource":"pods"}"#);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn flags_override_config_file() {
        let path = std::env::temp_dir().join(format!("kmcp-cli-test-{}.yaml", std::process::id()));
        std::fs::write(&path, "logLevel: warn\nkubeconfigPath: /from/file\n").expect("write config");
        let cli = Cli::try_parse_from([
            "kube-mcp",
            "--config",
            path.to_str().expect("utf8 path"),
            "--kubeconfig",
            "/from/flag",
            "--disable-kubectl",
            "tools",
        ])
        .expect("parse");
        let cfg = load_config(&cli).expect("load");
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.kubeconfig_path, Some(PathBuf::from("/from/flag")));
        assert!(!cfg.kubectl_enabled());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code(&KmcpError::NotFound("x".into())), 2);
        assert_eq!(exit_code(&KmcpError::Cancelled), 130);
        assert_eq!(exit_code(&KmcpError::External("x".into())), 1);
    }
}
