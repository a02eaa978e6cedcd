//! Command text rendered into the installed action.
//!
//! The generated script is what Automator executes when the user invokes
//! the Quick Action: it activates the project virtual environment, runs
//! the decoder over the selected files, and reports the outcome as a
//! desktop notification keyed off the decoder's exit status.

use std::path::Path;

/// Exit status the decoder reserves for "valid run, no QR code detected".
/// Part of the decoder contract; the generated dispatch depends on it.
pub const NO_CODE_EXIT_STATUS: i32 = 4;

/// Shell the patched action is forced to execute with.
pub const ACTION_SHELL: &str = "/bin/zsh";

pub const NOTIFY_TITLE: &str = "QR Decoder";
pub const NOTIFY_DECODED: &str = "QR code decoded, copied to clipboard";
pub const NOTIFY_NO_CODE: &str = "No QR code found";

/// Render the shell command embedded into the action bundle.
///
/// Deterministic: the same inputs render the same bytes. Both paths are
/// embedded absolute, so the installed action works regardless of the
/// caller's working directory; re-running the installer after moving the
/// project re-embeds the new location.
pub fn render(project_root: &Path, decoder: &Path) -> String {
    format!(
        r#"#!/bin/zsh
set -euo pipefail

# ── config ──────────────────────────────────────────────
PROJECT_ROOT="{root}"
DECODER="{decoder}"

# ── logic ───────────────────────────────────────────────
source "$PROJECT_ROOT/.venv/bin/activate"

status=0
python3 "$DECODER" "$@" --copy || status=$?

case "$status" in
  0)
    osascript -e 'display notification "{decoded}" with title "{title}"'
    ;;
  {no_code})
    osascript -e 'display notification "{no_code_msg}" with title "{title}"'
    ;;
  *)
    osascript -e "display notification \"Decode failed (exit $status)\" with title \"{title}\""
    ;;
esac

# Let the notification render before Automator tears the process down.
sleep 1
"#,
        root = project_root.display(),
        decoder = decoder.display(),
        decoded = NOTIFY_DECODED,
        title = NOTIFY_TITLE,
        no_code = NO_CODE_EXIT_STATUS,
        no_code_msg = NOTIFY_NO_CODE,
    )
}
