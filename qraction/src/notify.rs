//! Desktop notifications via `osascript`.
//!
//! Best-effort: a missing or failing osascript logs a warning and never
//! fails the caller. The install itself is already done by the time the
//! confirmation fires.

use std::process::Command;

/// Send one desktop notification with the given title and message.
pub fn send(title: &str, message: &str) {
    let script = format!(
        r#"display notification "{}" with title "{}""#,
        escape(message),
        escape(title)
    );
    match Command::new("osascript").args(["-e", &script]).output() {
        Ok(output) if output.status.success() => {}
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(stderr = %stderr.trim(), "osascript notification failed");
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not run osascript");
        }
    }
}

/// Escape a string for embedding inside an AppleScript double-quoted literal.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
