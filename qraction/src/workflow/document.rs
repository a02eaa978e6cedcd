//! Patching of the `document.wflow` property list inside a staged bundle.
//!
//! The document holds an ordered `actions` array. The Run Shell Script
//! action is located by its bundle identifier, never by position: a
//! template that grows a preceding action must not get the wrong entry
//! patched. Zero or multiple qualifying actions is a hard error.

use plist::{Dictionary, Value};
use std::path::Path;
use thiserror::Error;

/// Bundle identifier of Automator's Run Shell Script action.
const RUN_SHELL_SCRIPT_ID: &str = "com.apple.Automator.RunShellScript";

const KEY_ACTIONS: &str = "actions";
const KEY_ACTION: &str = "action";
const KEY_BUNDLE_ID: &str = "BundleIdentifier";
const KEY_PARAMETERS: &str = "ActionParameters";
const KEY_COMMAND: &str = "COMMAND_STRING";
const KEY_SHELL: &str = "shell";
const KEY_INPUT_METHOD: &str = "inputMethod";

/// Automator's integer encoding for how input reaches the command:
/// 1 = as CLI arguments, 0 = via stdin. Written as a plist integer;
/// the host OS rejects any other encoding.
pub const INPUT_METHOD_ARGUMENTS: i64 = 1;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read or write workflow document: {0}")]
    Plist(#[from] plist::Error),
    #[error("workflow document has no `actions` array")]
    MissingActions,
    #[error("no Run Shell Script action in workflow document")]
    NoShellScriptAction,
    #[error("expected exactly one Run Shell Script action, found {0}")]
    AmbiguousActions(usize),
    #[error("Run Shell Script action has no ActionParameters dictionary")]
    MissingParameters,
}

/// Patch the Run Shell Script action inside `document_path` in place:
/// command text, shell, and input-passing mode. The document is written
/// back as XML.
pub fn patch_document(
    document_path: &Path,
    command: &str,
    shell: &str,
) -> Result<(), DocumentError> {
    let mut doc = Value::from_file(document_path)?;
    patch_value(&mut doc, command, shell)?;
    doc.to_file_xml(document_path)?;
    Ok(())
}

/// Patch an in-memory document. Split from the file I/O for testability.
pub(crate) fn patch_value(
    doc: &mut Value,
    command: &str,
    shell: &str,
) -> Result<(), DocumentError> {
    let actions = doc
        .as_dictionary_mut()
        .and_then(|d| d.get_mut(KEY_ACTIONS))
        .and_then(|v| v.as_array_mut())
        .ok_or(DocumentError::MissingActions)?;

    let qualifying: Vec<usize> = actions
        .iter()
        .enumerate()
        .filter(|(_, entry)| is_run_shell_script(entry))
        .map(|(i, _)| i)
        .collect();
    let index = match qualifying.as_slice() {
        [] => return Err(DocumentError::NoShellScriptAction),
        [i] => *i,
        _ => return Err(DocumentError::AmbiguousActions(qualifying.len())),
    };

    let params = action_parameters_mut(&mut actions[index])
        .ok_or(DocumentError::MissingParameters)?;

    params.insert(KEY_COMMAND.to_string(), Value::String(command.to_string()));
    params.insert(KEY_SHELL.to_string(), Value::String(shell.to_string()));
    params.insert(
        KEY_INPUT_METHOD.to_string(),
        Value::Integer(INPUT_METHOD_ARGUMENTS.into()),
    );
    Ok(())
}

fn is_run_shell_script(entry: &Value) -> bool {
    entry
        .as_dictionary()
        .and_then(|d| d.get(KEY_ACTION))
        .and_then(|v| v.as_dictionary())
        .and_then(|d| d.get(KEY_BUNDLE_ID))
        .and_then(|v| v.as_string())
        == Some(RUN_SHELL_SCRIPT_ID)
}

fn action_parameters_mut(entry: &mut Value) -> Option<&mut Dictionary> {
    entry
        .as_dictionary_mut()?
        .get_mut(KEY_ACTION)?
        .as_dictionary_mut()?
        .get_mut(KEY_PARAMETERS)?
        .as_dictionary_mut()
}
