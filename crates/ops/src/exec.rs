//! Process boundary: run one argument vector against the kubectl binary.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::builder::CommandVector;

/// Combined process output (stdout followed by stderr) and the failure, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub output: Vec<u8>,
    pub error: Option<String>,
}

impl ExecOutput {
    pub fn ok(output: impl Into<Vec<u8>>) -> Self { Self { output: output.into(), error: None } }

    pub fn failed(output: impl Into<Vec<u8>>, error: impl Into<String>) -> Self {
        Self { output: output.into(), error: Some(error.into()) }
    }

    pub fn is_success(&self) -> bool { self.error.is_none() }
}

/// Bytes read from one pipe so far.
type Captured = Arc<Mutex<Vec<u8>>>;

#[async_trait::async_trait]
pub trait ProcessExecutor: Send + Sync {
    async fn execute(&self, command: &CommandVector, cancel: &CancellationToken) -> ExecOutput;
}

/// Runs `kubectl` directly by argv. No shell is involved.
#[derive(Debug, Clone)]
pub struct KubectlExecutor {
    program: PathBuf,
    kubeconfig: Option<PathBuf>,
}

impl KubectlExecutor {
    /// Resolve the binary: the explicit path if given, else `kubectl` on `PATH`.
    pub fn new(explicit: Option<&Path>, kubeconfig: Option<PathBuf>) -> Result<Self> {
        let program = match explicit {
            Some(p) => which::which(p).with_context(|| format!("kubectl binary not found at {}", p.display()))?,
            None => which::which("kubectl").context("kubectl not found on PATH")?,
        };
        info!(program = %program.display(), "kubectl resolved");
        Ok(Self { program, kubeconfig })
    }

    /// Use `program` as is, without a lookup.
    pub fn with_program(program: impl Into<PathBuf>, kubeconfig: Option<PathBuf>) -> Self {
        Self { program: program.into(), kubeconfig }
    }

    /// Full argument list: `--kubeconfig <path>` first when configured.
    /// The path is passed through unmodified.
    pub fn argv(&self, command: &CommandVector) -> Vec<OsString> {
        let mut argv = Vec::with_capacity(command.tokens().len() + 2);
        if let Some(kc) = &self.kubeconfig {
            argv.push(OsString::from("--kubeconfig"));
            argv.push(kc.clone().into_os_string());
        }
        argv.extend(command.tokens().iter().map(OsString::from));
        argv
    }
}

#[async_trait::async_trait]
impl ProcessExecutor for KubectlExecutor {
    async fn execute(&self, command: &CommandVector, cancel: &CancellationToken) -> ExecOutput {
        let t0 = Instant::now();
        let argv = self.argv(command);
        debug!(program = %self.program.display(), argv = ?argv, "spawning");
        let mut child = match Command::new(&self.program)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "spawn failed");
                return ExecOutput::failed(Vec::new(), format!("failed to start {}: {}", self.program.display(), e));
            }
        };
        let (out_buf, err_buf) = (Captured::default(), Captured::default());
        let stdout = tokio::spawn(drain(child.stdout.take(), out_buf.clone()));
        let stderr = tokio::spawn(drain(child.stderr.take(), err_buf.clone()));

        let (error, cancelled) = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => (exit_error(status), false),
                Err(e) => (Some(format!("waiting for process: {}", e)), false),
            },
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "kill after cancel failed");
                }
                (Some("cancelled".to_string()), true)
            }
        };

        // Descendants of a killed child can hold the pipes open; keep what was read.
        if cancelled {
            stdout.abort();
            stderr.abort();
        }
        let _ = stdout.await;
        let _ = stderr.await;
        let mut output = take(&out_buf);
        output.extend(take(&err_buf));
        let out = ExecOutput { output, error };
        info!(sub = %command.subcommand(), ok = out.is_success(), bytes = out.output.len(), took_ms = %t0.elapsed().as_millis(), "kubectl finished");
        out
    }
}

async fn drain<R: AsyncRead + Unpin>(reader: Option<R>, sink: Captured) {
    let Some(mut r) = reader else { return };
    let mut chunk = [0u8; 8192];
    loop {
        match r.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                lock(&sink).extend_from_slice(&chunk[..n]);
            }
            Err(e) => {
                debug!(error = %e, "pipe read ended early");
                break;
            }
        }
    }
}

fn lock(sink: &Captured) -> MutexGuard<'_, Vec<u8>> { sink.lock().unwrap_or_else(PoisonError::into_inner) }

fn take(sink: &Captured) -> Vec<u8> { std::mem::take(&mut *lock(sink)) }

fn exit_error(status: ExitStatus) -> Option<String> {
    if status.success() {
        return None;
    }
    Some(match status.code() {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(tokens: &[&str]) -> CommandVector {
        let mut v = CommandVector::new(tokens[0]);
        for t in &tokens[1..] {
            v.push(*t);
        }
        v
    }

    #[test]
    fn kubeconfig_is_prepended() {
        let exec = KubectlExecutor::with_program("kubectl", Some(PathBuf::from("/tmp/kc")));
        assert_eq!(exec.argv(&cmd(&["get", "pods"])), os(&["--kubeconfig", "/tmp/kc", "get", "pods"]));
        let bare = KubectlExecutor::with_program("kubectl", None);
        assert_eq!(bare.argv(&cmd(&["get", "pods"])), os(&["get", "pods"]));
    }

    fn os(tokens: &[&str]) -> Vec<OsString> { tokens.iter().map(OsString::from).collect() }

    #[cfg(unix)]
    #[test]
    fn non_utf8_kubeconfig_path_is_passed_unchanged() {
        use std::os::unix::ffi::OsStrExt;
        let raw = std::ffi::OsStr::from_bytes(b"/tmp/kc-\xff");
        let exec = KubectlExecutor::with_program("kubectl", Some(PathBuf::from(raw)));
        let argv = exec.argv(&cmd(&["get"]));
        assert_eq!(argv[1].as_bytes(), b"/tmp/kc-\xff");
    }

    #[test]
    fn missing_explicit_binary_is_startup_error() {
        assert!(KubectlExecutor::new(Some(Path::new("/nonexistent/kubectl")), None).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn echo_receives_argv_in_order() {
        let exec = KubectlExecutor::with_program("echo", Some(PathBuf::from("/tmp/kc")));
        let out = exec.execute(&cmd(&["get", "pods", "-n", "prod"]), &CancellationToken::new()).await;
        assert!(out.is_success());
        assert_eq!(String::from_utf8_lossy(&out.output), "--kubeconfig /tmp/kc get pods -n prod\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_reports_status() {
        let exec = KubectlExecutor::with_program("false", None);
        let out = exec.execute(&cmd(&["get"]), &CancellationToken::new()).await;
        assert_eq!(out.error.as_deref(), Some("exit status 1"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancel_kills_child() {
        let exec = KubectlExecutor::with_program("sleep", None);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let t0 = Instant::now();
        let out = tokio::time::timeout(std::time::Duration::from_secs(5), exec.execute(&cmd(&["30"]), &cancel))
            .await
            .expect("execute returned after cancel");
        assert_eq!(out.error.as_deref(), Some("cancelled"));
        assert!(t0.elapsed() < std::time::Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancel_returns_while_grandchild_holds_pipes() {
        let exec = KubectlExecutor::with_program("sh", None);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            trigger.cancel();
        });
        let t0 = Instant::now();
        let out = exec.execute(&cmd(&["-c", "echo started; sleep 4 & wait"]), &cancel).await;
        let took = t0.elapsed();
        assert_eq!(out.error.as_deref(), Some("cancelled"));
        assert!(took < std::time::Duration::from_secs(2), "execute took {:?} after cancel", took);
        assert_eq!(String::from_utf8_lossy(&out.output), "started\n");
    }

    #[tokio::test]
    async fn spawn_failure_is_reported_not_raised() {
        let exec = KubectlExecutor::with_program("/nonexistent/kubectl", None);
        let out = exec.execute(&cmd(&["get"]), &CancellationToken::new()).await;
        assert!(out.error.as_deref().is_some_and(|e| e.starts_with("failed to start")));
        assert!(out.output.is_empty());
    }
}
