use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{DEFAULT_ITERATIONS, MIN_ITERATIONS};
use crate::errors::{Result, VaultFillError};
use crate::sync::DEFAULT_CAPACITY;

/// Project-level configuration, loaded from `.vaultfill.toml`.
///
/// Every field has a sensible default so VaultFill works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to the working directory) holding the blobs.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// PBKDF2 iterations for newly registered accounts and password changes.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// How many snapshots a listening context may fall behind by.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_data_dir() -> String {
    ".vaultfill".to_string()
}

fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_broadcast_capacity() -> usize {
    DEFAULT_CAPACITY
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            kdf_iterations: default_kdf_iterations(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the working directory.
    const FILE_NAME: &'static str = ".vaultfill.toml";

    /// Load settings from `<project_dir>/.vaultfill.toml`.
    ///
    /// If the file does not exist, defaults are returned. If it exists
    /// but cannot be parsed, or asks for a KDF cost below the floor, an
    /// error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultFillError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.kdf_iterations < MIN_ITERATIONS {
            return Err(VaultFillError::ConfigError(format!(
                "kdf_iterations must be at least {MIN_ITERATIONS} (got {})",
                settings.kdf_iterations
            )));
        }

        Ok(settings)
    }

    /// Resolve the data directory against the working directory.
    ///
    /// An explicit `--data-dir` overrides the configured one.
    pub fn data_path(&self, project_dir: &Path, override_dir: Option<&str>) -> PathBuf {
        project_dir.join(override_dir.unwrap_or(&self.data_dir))
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.data_dir, ".vaultfill");
        assert_eq!(s.kdf_iterations, 100_000);
        assert_eq!(s.broadcast_capacity, 64);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.kdf_iterations, 100_000);
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
data_dir = "secrets"
kdf_iterations = 250000
broadcast_capacity = 8
"#;
        fs::write(tmp.path().join(".vaultfill.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.data_dir, "secrets");
        assert_eq!(settings.kdf_iterations, 250_000);
        assert_eq!(settings.broadcast_capacity, 8);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".vaultfill.toml"), "kdf_iterations = 5000\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.kdf_iterations, 5_000);
        assert_eq!(settings.data_dir, ".vaultfill");
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".vaultfill.toml"), "not valid {{toml").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn load_rejects_weak_kdf_cost() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".vaultfill.toml"), "kdf_iterations = 10\n").unwrap();
        let err = Settings::load(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("kdf_iterations"));
    }

    #[test]
    fn data_path_respects_override() {
        let s = Settings::default();
        let project = Path::new("/home/user");
        assert_eq!(
            s.data_path(project, None),
            PathBuf::from("/home/user/.vaultfill")
        );
        assert_eq!(
            s.data_path(project, Some("elsewhere")),
            PathBuf::from("/home/user/elsewhere")
        );
    }
}
