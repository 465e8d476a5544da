use crate::error::{CtxError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CLAUDE_DIR: &str = ".claude";
pub const BUNDLES_DIR: &str = ".claude/bundles";
pub const CONFIG_FILE: &str = ".claude/ctxkit.yaml";

pub const BUNDLE_EXT: &str = "json";

const MAX_NAME_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn claude_dir(root: &Path) -> PathBuf {
    root.join(CLAUDE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn default_bundles_dir(root: &Path) -> PathBuf {
    root.join(BUNDLES_DIR)
}

pub fn bundle_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{BUNDLE_EXT}"))
}

// ---------------------------------------------------------------------------
// Bundle name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[a-z0-9_\-][a-z0-9._\-]*$").unwrap())
}

/// Bundle names double as file stems: they must not escape the bundle dir, and
/// they are lowercase so two names never share a file on case-insensitive filesystems.
pub fn validate_bundle_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CtxError::InvalidInput(
            "bundle name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN || !name_re().is_match(name) {
        return Err(CtxError::InvalidInput(format!(
            "invalid bundle name '{name}': use lowercase letters, digits, '.', '_' or '-', not starting with '.'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
