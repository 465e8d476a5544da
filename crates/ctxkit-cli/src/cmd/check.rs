use crate::output::print_json;
use anyhow::Context;
use ctxkit_core::config::Config;
use ctxkit_core::threshold::ThresholdMonitor;
use std::path::Path;

/// Classify `tokens` and print the one-line report (or the full classification as JSON).
pub fn run(root: &Path, tokens: i64, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let monitor = ThresholdMonitor::new(config.thresholds)
        .context("config has invalid thresholds; run 'ctxkit config validate'")?;

    let classification = monitor.classify(tokens)?;
    tracing::debug!(
        tokens = classification.tokens,
        stage = %classification.stage,
        "classified token count"
    );

    if json {
        print_json(&classification)?;
    } else {
        println!("{}", classification.message);
    }
    Ok(())
}
