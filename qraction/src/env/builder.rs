//! Virtual environment provisioning for the decoder runtime.
//!
//! The environment lives at `<project>/.venv` and is created once. An
//! existing environment is never deleted or recreated by this tooling; a
//! corrupted one must be removed manually before re-running.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::ProjectLayout;

/// Marker file recording the SHA-256 of the requirements manifest the
/// environment was last synced against.
const SYNC_MARKER_FILE: &str = ".qraction_synced";

/// Locate a usable Python interpreter on PATH.
///
/// Probes `python3` first, then `python`, accepting the first one that
/// answers `--version`.
pub fn find_python() -> Result<PathBuf> {
    for candidate in ["python3", "python"] {
        let ok = Command::new(candidate)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if ok {
            return Ok(PathBuf::from(candidate));
        }
    }
    anyhow::bail!("No Python interpreter found on PATH. Install python3 and re-run.")
}

/// Ensure the project virtual environment exists and has the declared
/// dependencies installed.
///
/// The manifest (`requirements.txt`) is optional: when absent, dependency
/// installation is skipped with a warning, not a failure. When present and
/// unchanged since the last sync, the pip subprocess is skipped entirely.
pub fn ensure_environment(layout: &ProjectLayout, skip_deps: bool) -> Result<()> {
    let venv = layout.venv();
    if venv.is_dir() {
        tracing::debug!(path = %venv.display(), "virtual environment already present");
    } else {
        let python = find_python()?;
        create_venv(&python, &venv)?;
        eprintln!("✓ Created virtual environment at {}", venv.display());
    }

    if skip_deps {
        eprintln!("⏭ Skipping dependency installation (--skip-deps)");
        return Ok(());
    }

    let manifest = layout.requirements();
    if !manifest.is_file() {
        eprintln!(
            "⚠ No requirements.txt at {}; skipping dependency installation",
            manifest.display()
        );
        return Ok(());
    }

    let manifest_hash = hash_file(&manifest)?;
    let marker = venv.join(SYNC_MARKER_FILE);
    if marker_matches(&marker, &manifest_hash) {
        tracing::debug!("requirements unchanged, skipping pip install");
        return Ok(());
    }

    install_requirements(&venv, &manifest)?;
    fs::write(&marker, &manifest_hash)
        .with_context(|| format!("Failed to write sync marker: {}", marker.display()))?;
    eprintln!("✓ Dependencies installed from {}", manifest.display());
    Ok(())
}

/// Create a Python virtual environment at `venv`.
fn create_venv(python: &Path, venv: &Path) -> Result<()> {
    let output = Command::new(python)
        .arg("-m")
        .arg("venv")
        .arg(venv)
        .output()
        .with_context(|| format!("Failed to execute {} -m venv", python.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Failed to create virtual environment: {}", stderr.trim());
    }

    Ok(())
}

/// Install the manifest into the environment via its own pip.
fn install_requirements(venv: &Path, manifest: &Path) -> Result<()> {
    let pip = pip_path(venv);
    let output = Command::new(&pip)
        .args(["install", "--quiet", "--disable-pip-version-check", "-r"])
        .arg(manifest)
        .output()
        .with_context(|| format!("Failed to execute {}", pip.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "Failed to install dependencies from {}: {}",
            manifest.display(),
            stderr.trim()
        );
    }

    Ok(())
}

/// pip inside the virtual environment. This tool targets macOS, so only
/// the Unix layout is handled.
fn pip_path(venv: &Path) -> PathBuf {
    venv.join("bin").join("pip")
}

fn hash_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

fn marker_matches(marker: &Path, expected_hash: &str) -> bool {
    fs::read_to_string(marker)
        .map(|s| s.trim() == expected_hash)
        .unwrap_or(false)
}
