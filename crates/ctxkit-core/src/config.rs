use crate::bundle::StatusPolicy;
use crate::error::Result;
use crate::paths;
use crate::threshold::Thresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// BundleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Bundle directory, relative to the project root unless absolute.
    #[serde(default = "default_bundle_dir")]
    pub dir: String,
    #[serde(default = "default_active_hours")]
    pub active_hours: u32,
    #[serde(default = "default_archive_days")]
    pub archive_days: u32,
}

fn default_bundle_dir() -> String {
    paths::BUNDLES_DIR.to_string()
}

fn default_active_hours() -> u32 {
    StatusPolicy::default().active_hours
}

fn default_archive_days() -> u32 {
    StatusPolicy::default().archive_days
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            dir: default_bundle_dir(),
            active_hours: default_active_hours(),
            archive_days: default_archive_days(),
        }
    }
}

impl BundleConfig {
    pub fn resolve_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.dir)
    }

    pub fn status_policy(&self) -> StatusPolicy {
        StatusPolicy {
            active_hours: self.active_hours,
            archive_days: self.archive_days,
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub bundles: BundleConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            thresholds: Thresholds::default(),
            bundles: BundleConfig::default(),
        }
    }
}

impl Config {
    /// Load `.claude/ctxkit.yaml`, falling back to defaults when the file is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Write the config only when no file exists yet. Returns true if written.
    pub fn save_if_missing(&self, root: &Path) -> Result<bool> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::write_if_missing(&path, data.as_bytes())
    }

    pub fn bundle_dir(&self, root: &Path) -> PathBuf {
        self.bundles.resolve_dir(root)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if let Err(e) = self.thresholds.validate() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: e.to_string(),
            });
        }

        if self.bundles.dir.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "bundles.dir is empty".to_string(),
            });
        } else if Path::new(&self.bundles.dir).is_absolute() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "bundles.dir '{}' is absolute; bundles will not travel with the project",
                    self.bundles.dir
                ),
            });
        }

        let active = u64::from(self.bundles.active_hours);
        let archive = u64::from(self.bundles.archive_days) * 24;
        if active >= archive {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "bundles.active_hours ({}) reaches past bundles.archive_days ({}); \
                     no bundle will ever be listed as completed",
                    self.bundles.active_hours, self.bundles.archive_days
                ),
            });
        }

        if self.version != 1 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("unknown config version {}", self.version),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.thresholds.overload, 150_000);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".claude")).unwrap();
        std::fs::write(
            dir.path().join(".claude/ctxkit.yaml"),
            "thresholds:\n  overload: 180000\nbundles:\n  archive_days: 7\n",
        )
        .unwrap();

        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.thresholds.overload, 180_000);
        assert_eq!(cfg.thresholds.growing, 60_000);
        assert_eq!(cfg.bundles.archive_days, 7);
        assert_eq!(cfg.bundles.active_hours, 24);
        assert_eq!(cfg.bundle_dir(dir.path()), dir.path().join(".claude/bundles"));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.bundles.dir = "handoff".to_string();
        cfg.save(dir.path()).unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), cfg);
    }

    #[test]
    fn save_if_missing_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        assert!(Config::default().save_if_missing(dir.path()).unwrap());

        let mut other = Config::default();
        other.bundles.archive_days = 3;
        assert!(!other.save_if_missing(dir.path()).unwrap());
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".claude")).unwrap();
        std::fs::write(dir.path().join(".claude/ctxkit.yaml"), "thresholds: [1, 2").unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(crate::CtxError::Yaml(_))
        ));
    }

    #[test]
    fn default_config_has_no_warnings() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_flags_unordered_thresholds() {
        let mut cfg = Config::default();
        cfg.thresholds.large = 50_000;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Error);
    }

    #[test]
    fn validate_flags_overlapping_status_windows() {
        let mut cfg = Config::default();
        cfg.bundles.active_hours = 48;
        cfg.bundles.archive_days = 1;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Warning && w.message.contains("active_hours")));
    }
}
