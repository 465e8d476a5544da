use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use ctxkit_core::config::Config;
use ctxkit_core::{Bundle, BundleStore};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand tree
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum BundleSubcommand {
    /// Save a context bundle (replaces any bundle with the same name)
    Save {
        /// Bundle name, used as the file name
        name: String,

        /// What the session was working on
        #[arg(long)]
        task: String,

        /// Token count at save time
        #[arg(long)]
        tokens: u64,

        /// File touched during the session (repeatable)
        #[arg(long = "file", value_name = "PATH")]
        files: Vec<String>,

        /// Decision taken during the session (repeatable)
        #[arg(long = "decision", value_name = "TEXT")]
        decisions: Vec<String>,

        /// Progress summary
        #[arg(long, default_value = "")]
        progress: String,

        /// Agent expected to pick this bundle up
        #[arg(long)]
        next_agent: Option<String>,

        /// Task for the next session
        #[arg(long)]
        next_task: Option<String>,
    },

    /// Show a saved bundle
    Load {
        /// Bundle name
        name: String,
    },

    /// List saved bundles, newest first
    List,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcommand: BundleSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let store = BundleStore::open(root, &config);

    match subcommand {
        BundleSubcommand::Save {
            name,
            task,
            tokens,
            files,
            decisions,
            progress,
            next_agent,
            next_task,
        } => {
            let mut bundle = Bundle::new(name, task, tokens)
                .with_files_modified(files)
                .with_decisions(decisions)
                .with_progress(progress);
            bundle.next_agent = next_agent;
            bundle.next_task = next_task;

            let replaced = store.exists(&bundle.name)?;
            store.save(&bundle)?;

            if json {
                print_json(&bundle)?;
            } else {
                let verb = if replaced { "replaced" } else { "saved" };
                println!("{verb} bundle '{}' ({} tokens)", bundle.name, bundle.tokens);
                println!("  resume with: ctxkit bundle load {}", bundle.name);
            }
            Ok(())
        }

        BundleSubcommand::Load { name } => {
            let bundle = store.load(&name)?;
            if json {
                print_json(&bundle)?;
            } else {
                print_bundle(&bundle);
            }
            Ok(())
        }

        BundleSubcommand::List => {
            let summaries = store.list()?;
            if json {
                print_json(&summaries)?;
                return Ok(());
            }
            if summaries.is_empty() {
                println!("no bundles in {}", store.dir().display());
                return Ok(());
            }
            print_table(
                &["NAME", "CREATED", "TOKENS", "STATUS"],
                summaries
                    .iter()
                    .map(|b| {
                        vec![
                            b.name.clone(),
                            b.created.format("%Y-%m-%d %H:%M UTC").to_string(),
                            b.tokens.to_string(),
                            b.status.to_string(),
                        ]
                    })
                    .collect(),
            );
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_bundle(bundle: &Bundle) {
    println!("Bundle:   {}", bundle.name);
    println!("Created:  {}", bundle.created.format("%Y-%m-%d %H:%M UTC"));
    println!("Tokens:   {}", bundle.tokens);
    println!("Task:     {}", bundle.task());
    if !bundle.progress().is_empty() {
        println!("Progress: {}", bundle.progress());
    }
    print_list("Files modified", bundle.files_modified());
    print_list("Decisions", bundle.decisions());
    if let Some(agent) = &bundle.next_agent {
        println!("Next agent: {agent}");
    }
    if let Some(task) = &bundle.next_task {
        println!("Next task:  {task}");
    }
}

fn print_list(heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{heading}:");
    for item in items {
        println!("  - {item}");
    }
}
