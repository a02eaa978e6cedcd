//! Configuration for qraction.
//!
//! All configuration is read from environment variables or CLI arguments.
//! No configuration file is used. Environment variable keys are centralized
//! here for consistency. CLI flags take precedence over environment values.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable key constants.
/// Use these when reading env vars to avoid typos and enable refactoring.
pub mod env_keys {
    pub const QRACTION_SERVICES_DIR: &str = "QRACTION_SERVICES_DIR";
    pub const QRACTION_QUIET: &str = "QRACTION_QUIET";
    pub const QRACTION_LOG_LEVEL: &str = "QRACTION_LOG_LEVEL";
    pub const QRACTION_LOG_JSON: &str = "QRACTION_LOG_JSON";
}

/// Name of the action bundle, both in `templates/` and once installed.
/// Also the menu label shown under Finder's Quick Actions.
pub const BUNDLE_NAME: &str = "Decode QR Code.workflow";

/// Fixed relative layout of a qraction project checkout.
///
/// The installer expects `templates/`, `scripts/` and `requirements.txt`
/// under the project root, and produces `.venv/` and `build/` there.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
}

impl ProjectLayout {
    /// Resolve the project root from the CLI override or the current
    /// directory. The root must exist; the pipeline validates the
    /// individual entries it needs.
    pub fn resolve(project_dir: Option<&str>) -> Result<Self> {
        let root = match project_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        if !root.is_dir() {
            anyhow::bail!("Project directory does not exist: {}", root.display());
        }
        // Canonicalize so the paths embedded into the command text stay
        // valid regardless of how the root was spelled on the command line.
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve project directory: {}", root.display()))?;
        Ok(Self { root })
    }

    /// Pristine template bundle shipped with the repository.
    pub fn template_bundle(&self) -> PathBuf {
        self.root.join("templates").join(BUNDLE_NAME)
    }

    /// Staging location for the patched bundle before installation.
    pub fn staged_bundle(&self) -> PathBuf {
        self.root.join("build").join(BUNDLE_NAME)
    }

    /// Decoder CLI the installed action invokes.
    pub fn decoder_script(&self) -> PathBuf {
        self.root.join("scripts").join("qr_decode.py")
    }

    /// Optional dependency manifest for the decoder runtime.
    pub fn requirements(&self) -> PathBuf {
        self.root.join("requirements.txt")
    }

    /// Virtual environment holding the decoder's interpreter and packages.
    pub fn venv(&self) -> PathBuf {
        self.root.join(".venv")
    }
}

/// Resolve the install destination.
/// - CLI override (full path)
/// - `QRACTION_SERVICES_DIR` env override (full path)
/// - Default: `~/Library/Services`
pub fn resolve_services_dir(custom_services_dir: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = custom_services_dir {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(dir) = std::env::var(env_keys::QRACTION_SERVICES_DIR) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = dirs::home_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine home directory. Please set {} to the install destination.",
            env_keys::QRACTION_SERVICES_DIR
        )
    })?;
    Ok(home.join("Library").join("Services"))
}

/// Observability configuration: quiet, log_level, log_json.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            let quiet = env_bool(env_keys::QRACTION_QUIET);
            let log_level = std::env::var(env_keys::QRACTION_LOG_LEVEL)
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "qraction=info".to_string());
            let log_json = env_bool(env_keys::QRACTION_LOG_JSON);
            Self {
                quiet,
                log_level,
                log_json,
            }
        })
    }
}

fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
