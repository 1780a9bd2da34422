//! kube-mcp ops: the kubectl command surface.
//!
//! `builder` turns validated arguments into an argument vector, `exec` runs it,
//! `normalize` shapes the text handed back to the caller. [`run`] strings the
//! three together for one request.

#![forbid(unsafe_code)]

use std::time::Instant;

use kmcp_core::{ArgumentSet, KmcpError, KmcpResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod builder;
pub mod exec;
pub mod normalize;

pub use builder::{build, CommandOp, CommandVector};
pub use exec::{ExecOutput, KubectlExecutor, ProcessExecutor};
pub use normalize::{normalize, render_executed, render_failure};

/// Build, execute and render one kubectl operation.
///
/// `Ok` carries the success text. Invalid argument combinations are
/// `Validation` and never reach the executor; process failures are
/// `External` carrying the rendered failure text, or `Cancelled` once the
/// token has fired.
pub async fn run(
    op: CommandOp,
    args: &ArgumentSet,
    executor: &dyn ProcessExecutor,
    cancel: &CancellationToken,
) -> KmcpResult<String> {
    let t0 = Instant::now();
    let command = build(op, args)?;
    debug!(op = %op, command = %command, "built");
    let out = executor.execute(&command, cancel).await;
    match out.error {
        None => {
            let format = if op.reindents_json() { args.str("output") } else { None };
            let body = normalize(&out.output, format);
            info!(op = %op, took_ms = %t0.elapsed().as_millis(), "kubectl ok");
            Ok(render_executed(&command, &body))
        }
        Some(err) if cancel.is_cancelled() => {
            warn!(op = %op, error = %err, took_ms = %t0.elapsed().as_millis(), "kubectl cancelled");
            Err(KmcpError::Cancelled)
        }
        Some(err) => {
            warn!(op = %op, error = %err, took_ms = %t0.elapsed().as_millis(), "kubectl failed");
            Err(KmcpError::External(render_failure(&command, &err, &out.output)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct Canned {
        reply: ExecOutput,
        seen: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl ProcessExecutor for Canned {
        async fn execute(&self, command: &CommandVector, _cancel: &CancellationToken) -> ExecOutput {
            self.seen.lock().expect("lock").push(command.tokens().to_vec());
            self.reply.clone()
        }
    }

    fn canned(reply: ExecOutput) -> Canned { Canned { reply, seen: Mutex::new(Vec::new()) } }

    fn args(op: CommandOp, raw: serde_json::Value) -> ArgumentSet {
        ArgumentSet::validate(&op.params(), &raw).expect("valid")
    }

    #[tokio::test]
    async fn get_json_is_reindented_and_echoed() {
        let exec = canned(ExecOutput::ok(br#"{"items":[]}"#.to_vec()));
        let a = args(CommandOp::Get, json!({"resource": "pods"}));
        let text = run(CommandOp::Get, &a, &exec, &CancellationToken::new()).await.expect("ok");
        assert_eq!(text, "Command executed: kubectl get pods -o json\n\n{\n  \"items\": []\n}");
    }

    #[tokio::test]
    async fn create_json_is_not_reindented() {
        let exec = canned(ExecOutput::ok(br#"{"kind":"Namespace"}"#.to_vec()));
        let a = args(CommandOp::Create, json!({"resource": "namespace", "name": "a", "output": "json"}));
        let text = run(CommandOp::Create, &a, &exec, &CancellationToken::new()).await.expect("ok");
        assert!(text.ends_with("\n\n{\"kind\":\"Namespace\"}"));
    }

    #[tokio::test]
    async fn failure_is_external_with_rendered_text() {
        let exec = canned(ExecOutput::failed(b"Error from server (NotFound)".to_vec(), "exit status 1"));
        let a = args(CommandOp::Describe, json!({"resource": "pod", "name": "x"}));
        let err = run(CommandOp::Describe, &a, &exec, &CancellationToken::new()).await.unwrap_err();
        assert_eq!(
            err,
            KmcpError::External(
                "kubectl describe failed: exit status 1\nCommand: kubectl describe pod x\nOutput: Error from server (NotFound)".into()
            )
        );
    }

    #[tokio::test]
    async fn invalid_combination_never_executes() {
        let exec = canned(ExecOutput::ok(Vec::new()));
        let a = args(CommandOp::Get, json!({"resource": "pods", "output": "jsonpath"}));
        let err = run(CommandOp::Get, &a, &exec, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, KmcpError::Validation(_)));
        assert!(exec.seen.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn killed_process_after_cancel_is_cancelled() {
        let exec = canned(ExecOutput::failed(b"partial".to_vec(), "cancelled"));
        let a = args(CommandOp::Logs, json!({"pod_name": "web"}));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run(CommandOp::Logs, &a, &exec, &cancel).await.unwrap_err();
        assert_eq!(err, KmcpError::Cancelled);
    }
}
