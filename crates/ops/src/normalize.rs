//! Response text for kubectl-backed operations.

use crate::builder::CommandVector;

/// Re-indent JSON output with two spaces when `json` was requested and the
/// bytes parse; anything else passes through as lossy UTF-8.
pub fn normalize(raw: &[u8], requested_format: Option<&str>) -> String {
    if requested_format == Some("json") && !raw.is_empty() {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(raw) {
            if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                return pretty;
            }
        }
    }
    String::from_utf8_lossy(raw).into_owned()
}

pub fn render_executed(command: &CommandVector, body: &str) -> String {
    format!("Command executed: kubectl {}\n\n{}", command.joined(), body)
}

pub fn render_failure(command: &CommandVector, error: &str, raw: &[u8]) -> String {
    format!(
        "kubectl {} failed: {}\nCommand: kubectl {}\nOutput: {}",
        command.subcommand(),
        error,
        command.joined(),
        String::from_utf8_lossy(raw)
    )
}
