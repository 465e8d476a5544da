use anyhow::Context;
use ctxkit_core::{config::Config, io, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing ctxkit in: {}", root.display());

    // 1. .claude/
    let claude = paths::claude_dir(root);
    io::ensure_dir(&claude).with_context(|| format!("failed to create {}", claude.display()))?;

    // 2. ctxkit.yaml, only if missing; an existing file decides the bundle dir
    let written = Config::default()
        .save_if_missing(root)
        .with_context(|| format!("failed to write {}", paths::CONFIG_FILE))?;
    let label = if written { "created:" } else { "exists: " };
    println!("  {label} {}", paths::CONFIG_FILE);
    let config = Config::load(root).context("failed to load config")?;

    // 3. bundle directory
    let bundles = config.bundle_dir(root);
    let created = io::ensure_dir(&bundles)
        .with_context(|| format!("failed to create {}", bundles.display()))?;
    let label = if created { "created:" } else { "exists: " };
    println!("  {label} {}", config.bundles.dir);

    Ok(())
}
