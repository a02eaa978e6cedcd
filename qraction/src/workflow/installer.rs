//! Staged build and installation of the action bundle.
//!
//! Pipeline: validate -> stage -> template -> patch -> install -> notify.
//! Every step is a hard stop on failure; there is no rollback. A staged
//! bundle that fails to patch is left under `build/` for inspection.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::{ProjectLayout, BUNDLE_NAME};
use crate::notify;
use crate::workflow::{command, document};

/// Files excluded when copying the template bundle.
const COPY_EXCLUDE_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Build the action bundle from the template and install it into
/// `services_dir`, replacing any prior installation.
///
/// Safe to re-run: the command text is regenerated from the current
/// project location and both the staging leftover and the installed
/// bundle are fully replaced.
pub fn install(layout: &ProjectLayout, services_dir: &Path) -> Result<()> {
    // ── Validate ──
    let template = layout.template_bundle();
    if !template.is_dir() {
        anyhow::bail!("Template bundle not found: {}", template.display());
    }
    let decoder = layout.decoder_script();
    if !decoder.is_file() {
        anyhow::bail!("Decoder entry point not found: {}", decoder.display());
    }

    // ── Stage ──
    let staged = layout.staged_bundle();
    if staged.exists() {
        fs::remove_dir_all(&staged)
            .with_context(|| format!("Failed to remove stale staging: {}", staged.display()))?;
    }
    copy_dir_filtered(&template, &staged)?;
    eprintln!("✓ Staged {}", staged.display());

    // ── Template + Patch ──
    let command_text = command::render(&layout.root, &decoder);
    let doc_path = staged.join("Contents").join("document.wflow");
    document::patch_document(&doc_path, &command_text, command::ACTION_SHELL)
        .with_context(|| format!("Failed to patch {}", doc_path.display()))?;
    eprintln!("✓ Patched {}", doc_path.display());

    // ── Install ──
    fs::create_dir_all(services_dir)
        .with_context(|| format!("Failed to create {}", services_dir.display()))?;
    let dest = services_dir.join(BUNDLE_NAME);
    if dest.exists() {
        fs::remove_dir_all(&dest)
            .with_context(|| format!("Failed to remove previous install: {}", dest.display()))?;
    }
    move_bundle(&staged, &dest)?;
    eprintln!("✓ Installed {}", dest.display());

    // ── Notify ──
    let action_name = BUNDLE_NAME.trim_end_matches(".workflow");
    notify::send(command::NOTIFY_TITLE, "Quick Action installed");
    println!(
        "🎉 Done. Right-click an image in Finder → Quick Actions → {}",
        action_name
    );

    Ok(())
}

/// Move the staged bundle into place. `rename` when staging and the
/// services directory share a volume; copy + remove otherwise.
fn move_bundle(staged: &Path, dest: &Path) -> Result<()> {
    match fs::rename(staged, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            copy_dir_filtered(staged, dest)?;
            fs::remove_dir_all(staged)
                .with_context(|| format!("Failed to remove staging: {}", staged.display()))?;
            Ok(())
        }
    }
}

fn copy_dir_filtered(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create directory: {}", dest.display()))?;
    for entry in fs::read_dir(src)
        .with_context(|| format!("Failed to read directory: {}", src.display()))?
        .flatten()
    {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if COPY_EXCLUDE_FILES.contains(&name_str.as_ref()) {
            continue;
        }

        let src_path = entry.path();
        let dest_path = dest.join(&name);
        if src_path.is_dir() {
            copy_dir_filtered(&src_path, &dest_path)?;
        } else {
            fs::copy(&src_path, &dest_path)
                .with_context(|| format!("Failed to copy: {}", src_path.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plist::{Dictionary, Value};
    use std::path::PathBuf;

    const RUN_SHELL_SCRIPT_ID: &str = "com.apple.Automator.RunShellScript";

    fn template_document() -> Value {
        let mut params = Dictionary::new();
        params.insert("COMMAND_STRING".to_string(), Value::String(String::new()));
        params.insert("shell".to_string(), Value::String("/bin/bash".to_string()));
        params.insert("inputMethod".to_string(), Value::Integer(0.into()));

        let mut action = Dictionary::new();
        action.insert(
            "BundleIdentifier".to_string(),
            Value::String(RUN_SHELL_SCRIPT_ID.to_string()),
        );
        action.insert("ActionParameters".to_string(), Value::Dictionary(params));

        let mut entry = Dictionary::new();
        entry.insert("action".to_string(), Value::Dictionary(action));

        let mut doc = Dictionary::new();
        doc.insert("actions".to_string(), Value::Array(vec![Value::Dictionary(entry)]));
        Value::Dictionary(doc)
    }

    /// Lay out a minimal project checkout: template bundle plus decoder.
    fn write_project(root: &Path) -> ProjectLayout {
        let layout = ProjectLayout::resolve(Some(root.to_str().unwrap())).unwrap();
        let contents = layout.template_bundle().join("Contents");
        fs::create_dir_all(&contents).unwrap();
        template_document()
            .to_file_xml(contents.join("document.wflow"))
            .unwrap();
        fs::write(contents.join("Info.plist"), "<plist/>").unwrap();
        fs::create_dir_all(layout.decoder_script().parent().unwrap()).unwrap();
        fs::write(layout.decoder_script(), "#!/usr/bin/env python3\n").unwrap();
        layout
    }

    fn installed_params(doc_path: &Path) -> Dictionary {
        let doc = Value::from_file(doc_path).unwrap();
        doc.as_dictionary()
            .unwrap()
            .get("actions")
            .unwrap()
            .as_array()
            .unwrap()[0]
            .as_dictionary()
            .unwrap()
            .get("action")
            .unwrap()
            .as_dictionary()
            .unwrap()
            .get("ActionParameters")
            .unwrap()
            .as_dictionary()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_install_builds_patches_and_moves_bundle() {
        let project = tempfile::tempdir().unwrap();
        let services = tempfile::tempdir().unwrap();
        let services_dir = services.path().join("Services");
        let layout = write_project(project.path());

        install(&layout, &services_dir).unwrap();

        let doc_path = services_dir
            .join(BUNDLE_NAME)
            .join("Contents")
            .join("document.wflow");
        let params = installed_params(&doc_path);

        let cmd = params.get("COMMAND_STRING").unwrap().as_string().unwrap();
        assert!(cmd.contains(layout.root.to_str().unwrap()));
        assert!(cmd.contains("--copy"));
        assert_eq!(params.get("shell").unwrap().as_string(), Some("/bin/zsh"));
        assert_eq!(
            params.get("inputMethod").unwrap().as_signed_integer(),
            Some(1)
        );
        // The staged copy was moved, not duplicated.
        assert!(!layout.staged_bundle().exists());
        // Template junk is not carried into the install.
        assert!(doc_path.parent().unwrap().join("Info.plist").exists());
    }

    #[test]
    fn test_missing_template_fails_before_any_install_write() {
        let project = tempfile::tempdir().unwrap();
        let services = tempfile::tempdir().unwrap();
        let services_dir = services.path().join("Services");
        let layout = ProjectLayout::resolve(Some(project.path().to_str().unwrap())).unwrap();

        let err = install(&layout, &services_dir).unwrap_err();
        assert!(err.to_string().contains("Template bundle not found"));
        assert!(!services_dir.exists());
    }

    #[test]
    fn test_missing_decoder_fails() {
        let project = tempfile::tempdir().unwrap();
        let services = tempfile::tempdir().unwrap();
        let layout = write_project(project.path());
        fs::remove_file(layout.decoder_script()).unwrap();

        let err = install(&layout, &services.path().join("Services")).unwrap_err();
        assert!(err.to_string().contains("Decoder entry point not found"));
    }

    #[test]
    fn test_rerun_replaces_previous_install_and_stale_staging() {
        let project = tempfile::tempdir().unwrap();
        let services = tempfile::tempdir().unwrap();
        let services_dir = services.path().join("Services");
        let layout = write_project(project.path());

        install(&layout, &services_dir).unwrap();

        // Simulate leftovers: a sentinel in the installed bundle and a
        // stale staging directory from an interrupted run.
        let installed = services_dir.join(BUNDLE_NAME);
        fs::write(installed.join("stale-sentinel"), "old").unwrap();
        fs::create_dir_all(layout.staged_bundle()).unwrap();
        fs::write(layout.staged_bundle().join("stale"), "old").unwrap();

        install(&layout, &services_dir).unwrap();

        assert!(!installed.join("stale-sentinel").exists());
        assert!(!layout.staged_bundle().exists());
    }

    #[test]
    fn test_patch_failure_leaves_staged_bundle_for_inspection() {
        let project = tempfile::tempdir().unwrap();
        let services = tempfile::tempdir().unwrap();
        let services_dir = services.path().join("Services");
        let layout = write_project(project.path());

        // Break the template: no actions array at all.
        Value::Dictionary(Dictionary::new())
            .to_file_xml(
                layout
                    .template_bundle()
                    .join("Contents")
                    .join("document.wflow"),
            )
            .unwrap();

        let err = install(&layout, &services_dir).unwrap_err();
        assert!(err.to_string().contains("Failed to patch"));
        assert!(layout.staged_bundle().is_dir());
        assert!(!services_dir.exists());
    }

    #[test]
    fn test_ds_store_is_not_copied() {
        let project = tempfile::tempdir().unwrap();
        let services = tempfile::tempdir().unwrap();
        let services_dir = services.path().join("Services");
        let layout = write_project(project.path());
        fs::write(
            layout.template_bundle().join("Contents").join(".DS_Store"),
            "junk",
        )
        .unwrap();

        install(&layout, &services_dir).unwrap();

        let contents = services_dir.join(BUNDLE_NAME).join("Contents");
        assert!(!contents.join(".DS_Store").exists());
    }

    #[test]
    fn test_command_text_tracks_project_moves() {
        // Install from location A, then from location B: the second
        // install must embed only B.
        let services = tempfile::tempdir().unwrap();
        let services_dir = services.path().join("Services");

        let a = tempfile::tempdir().unwrap();
        let layout_a = write_project(a.path());
        install(&layout_a, &services_dir).unwrap();

        let b = tempfile::tempdir().unwrap();
        let layout_b = write_project(b.path());
        install(&layout_b, &services_dir).unwrap();

        let doc_path = services_dir
            .join(BUNDLE_NAME)
            .join("Contents")
            .join("document.wflow");
        let cmd = installed_params(&doc_path)
            .get("COMMAND_STRING")
            .unwrap()
            .as_string()
            .unwrap()
            .to_string();
        assert!(cmd.contains(layout_b.root.to_str().unwrap()));
        assert!(!cmd.contains(layout_a.root.to_str().unwrap()));
    }

    #[test]
    fn test_move_bundle_renames_within_volume() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src.workflow");
        let dest: PathBuf = tmp.path().join("dest.workflow");
        fs::create_dir_all(src.join("Contents")).unwrap();
        fs::write(src.join("Contents").join("f"), "x").unwrap();

        move_bundle(&src, &dest).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(dest.join("Contents").join("f")).unwrap(), "x");
    }
}
