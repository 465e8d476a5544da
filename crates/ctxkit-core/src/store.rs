//! File-backed bundle store.
//!
//! Layout:
//!   <dir>/<name>.json   — one bundle per file
//!
//! Saving an existing name replaces the document (last write wins). Writes go
//! through a tempfile + rename, so readers never observe a partial bundle.

use crate::bundle::{Bundle, BundleSummary, StatusPolicy};
use crate::config::Config;
use crate::error::{CtxError, Result};
use crate::io;
use crate::paths;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct BundleStore {
    dir: PathBuf,
    policy: StatusPolicy,
}

impl BundleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            policy: StatusPolicy::default(),
        }
    }

    /// Store at the configured bundle directory under `root`.
    pub fn open(root: &Path, config: &Config) -> Self {
        Self::new(config.bundle_dir(root)).with_policy(config.bundles.status_policy())
    }

    pub fn with_policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        paths::validate_bundle_name(name)?;
        Ok(paths::bundle_path(&self.dir, name).is_file())
    }

    pub fn save(&self, bundle: &Bundle) -> Result<()> {
        paths::validate_bundle_name(&bundle.name)?;
        bundle.check_extras()?;
        let path = paths::bundle_path(&self.dir, &bundle.name);
        let mut data = serde_json::to_string_pretty(bundle)?;
        data.push('\n');
        io::atomic_write(&path, data.as_bytes())?;
        tracing::debug!(name = %bundle.name, tokens = bundle.tokens, "bundle saved");
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<Bundle> {
        paths::validate_bundle_name(name)?;
        let path = paths::bundle_path(&self.dir, name);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CtxError::BundleNotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let bundle: Bundle = serde_json::from_str(&data)?;
        check_name(&bundle, name)?;
        tracing::debug!(name, "bundle loaded");
        Ok(bundle)
    }

    pub fn list(&self) -> Result<Vec<BundleSummary>> {
        self.list_at(Utc::now())
    }

    /// Summaries of every stored bundle, newest first, with status computed
    /// relative to `now`. Unparseable files, and files whose `name` differs
    /// from the file stem, are skipped.
    pub fn list_at(&self, now: DateTime<Utc>) -> Result<Vec<BundleSummary>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut summaries = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(paths::BUNDLE_EXT)
            {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            match read_bundle(&path).and_then(|b| check_name(&b, stem).map(|()| b)) {
                Ok(bundle) => summaries.push(bundle.summary(now, &self.policy)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping bundle file");
                }
            }
        }

        summaries.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.name.cmp(&b.name)));
        Ok(summaries)
    }
}

fn read_bundle(path: &Path) -> Result<Bundle> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// The file stem is the key; a document carrying another name is not that bundle.
fn check_name(bundle: &Bundle, file_stem: &str) -> Result<()> {
    if bundle.name != file_stem {
        return Err(CtxError::NameMismatch {
            file: file_stem.to_string(),
            name: bundle.name.clone(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleStatus;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> BundleStore {
        BundleStore::new(dir.path().join(".claude/bundles"))
    }

    #[test]
    fn save_then_load_roundtrips_all_fields() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let b = Bundle::new("oauth-impl", "Implement OAuth2", 125_000)
            .with_files_modified(["src/auth/oauth.py"])
            .with_decisions(["PKCE for public clients", "refresh tokens in db"])
            .with_progress("authorize endpoint done")
            .with_next_agent("test-writer")
            .with_next_task("cover token refresh");

        s.save(&b).unwrap();
        let loaded = s.load("oauth-impl").unwrap();

        assert_eq!(loaded, b);
        assert_eq!(loaded.tokens, 125_000);
        assert_eq!(loaded.files_modified(), ["src/auth/oauth.py"]);
    }

    #[test]
    fn save_same_name_overwrites() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.save(&Bundle::new("work", "t", 10).with_progress("first")).unwrap();
        s.save(&Bundle::new("work", "t", 20).with_progress("second")).unwrap();

        let loaded = s.load("work").unwrap();
        assert_eq!(loaded.progress(), "second");
        assert_eq!(loaded.tokens, 20);
        assert_eq!(s.list().unwrap().len(), 1);
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = store(&dir).load("never-saved").unwrap_err();
        assert!(matches!(err, CtxError::BundleNotFound(ref n) if n == "never-saved"));
    }

    #[test]
    fn empty_or_unsafe_names_rejected() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        assert!(matches!(s.load(""), Err(CtxError::InvalidInput(_))));
        assert!(matches!(
            s.save(&Bundle::new("../escape", "t", 1)),
            Err(CtxError::InvalidInput(_))
        ));
        assert!(!dir.path().join(".claude/escape.json").exists());
    }

    #[test]
    fn list_returns_one_summary_per_bundle() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        for name in ["a", "b", "c"] {
            s.save(&Bundle::new(name, "task", 1_000)).unwrap();
        }
        let mut names: Vec<String> = s.list().unwrap().into_iter().map(|b| b.name).collect();
        names.sort();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).list().unwrap().is_empty());
    }

    #[test]
    fn list_sorted_newest_first_with_status() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        s.save(&Bundle::new("old", "t", 1).with_created(now - Duration::days(45)))
            .unwrap();
        s.save(&Bundle::new("recent", "t", 2).with_created(now - Duration::hours(2)))
            .unwrap();
        s.save(&Bundle::new("week", "t", 3).with_created(now - Duration::days(7)))
            .unwrap();

        let list = s.list_at(now).unwrap();
        let got: Vec<(&str, BundleStatus)> =
            list.iter().map(|b| (b.name.as_str(), b.status)).collect();
        assert_eq!(
            got,
            vec![
                ("recent", BundleStatus::Active),
                ("week", BundleStatus::Completed),
                ("old", BundleStatus::Archived),
            ]
        );
    }

    #[test]
    fn list_skips_foreign_and_corrupt_files() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.save(&Bundle::new("good", "t", 1)).unwrap();
        std::fs::write(s.dir().join("notes.md"), "# not a bundle").unwrap();
        std::fs::write(s.dir().join("broken.json"), "{ nope").unwrap();

        let list = s.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "good");
        assert!(matches!(s.load("broken"), Err(CtxError::Json(_))));
    }

    #[test]
    fn copied_file_under_other_name_is_not_that_bundle() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.save(&Bundle::new("alpha", "t", 1)).unwrap();
        std::fs::copy(s.dir().join("alpha.json"), s.dir().join("beta.json")).unwrap();

        let err = s.load("beta").unwrap_err();
        assert!(matches!(
            err,
            CtxError::NameMismatch { ref file, ref name } if file == "beta" && name == "alpha"
        ));
        assert_eq!(s.load("alpha").unwrap().name, "alpha");

        let names: Vec<String> = s.list().unwrap().into_iter().map(|b| b.name).collect();
        assert_eq!(names, ["alpha"]);
    }

    #[test]
    fn save_rejects_extras_shadowing_builtin_fields() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let mut b = Bundle::new("shadowed", "t", 1);
        b.context
            .extra
            .insert("progress".to_string(), serde_json::Value::from("shadow"));

        assert!(matches!(s.save(&b), Err(CtxError::InvalidInput(_))));
        assert!(!s.exists("shadowed").unwrap());

        b.context.extra.clear();
        b.context
            .extra
            .insert("blockers".to_string(), serde_json::json!(["ci"]));
        s.save(&b).unwrap();
        assert_eq!(s.load("shadowed").unwrap(), b);
    }

    #[test]
    fn exists_tracks_saves() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        assert!(!s.exists("x").unwrap());
        s.save(&Bundle::new("x", "t", 1)).unwrap();
        assert!(s.exists("x").unwrap());
    }

    #[test]
    fn open_uses_configured_dir_and_policy() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.bundles.dir = "handoffs".to_string();
        cfg.bundles.active_hours = 1;
        let s = BundleStore::open(dir.path(), &cfg);
        assert_eq!(s.dir(), dir.path().join("handoffs"));

        let now = Utc::now();
        s.save(&Bundle::new("n", "t", 1).with_created(now - Duration::hours(3)))
            .unwrap();
        assert_eq!(s.list_at(now).unwrap()[0].status, BundleStatus::Completed);
    }

    #[test]
    fn storage_failure_surfaces_as_storage_error() {
        let dir = TempDir::new().unwrap();
        // A regular file where the bundle directory should be.
        let blocker = dir.path().join("bundles");
        std::fs::write(&blocker, "").unwrap();
        let s = BundleStore::new(&blocker);
        let err = s.save(&Bundle::new("x", "t", 1)).unwrap_err();
        assert!(matches!(err, CtxError::Storage(_)));
    }
}
