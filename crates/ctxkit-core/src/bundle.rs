//! Context bundles — named snapshots of task state handed from one agent
//! session to the next.
//!
//! On disk each bundle is one JSON document:
//!
//! ```json
//! {
//!   "name": "oauth-impl",
//!   "created": "2025-01-15T14:30:00Z",
//!   "context": {
//!     "task": "Implement OAuth2",
//!     "files_modified": ["src/auth/oauth.py"],
//!     "decisions": ["use PKCE"],
//!     "progress": "token exchange done"
//!   },
//!   "tokens": 125000,
//!   "next_agent": "test-writer",
//!   "next_task": "cover refresh flow"
//! }
//! ```
//!
//! Keys this crate does not know about are kept in `extra` maps and written
//! back untouched.

use crate::error::{CtxError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Top-level keys owned by `Bundle`; `extra` must not reuse them.
const BUNDLE_KEYS: &[&str] = &[
    "name",
    "created",
    "context",
    "tokens",
    "next_agent",
    "next_task",
];

/// Keys owned by `BundleContext`; `context.extra` must not reuse them.
const CONTEXT_KEYS: &[&str] = &["task", "files_modified", "decisions", "progress"];

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleContext {
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub files_modified: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub progress: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub name: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub context: BundleContext,
    pub tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_task: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Bundle {
    pub fn new(name: impl Into<String>, task: impl Into<String>, tokens: u64) -> Self {
        Self {
            name: name.into(),
            created: Utc::now(),
            context: BundleContext {
                task: task.into(),
                ..BundleContext::default()
            },
            tokens,
            next_agent: None,
            next_task: None,
            extra: Map::new(),
        }
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    pub fn with_files_modified<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context.files_modified = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_decisions<I, S>(mut self, decisions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context.decisions = decisions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_progress(mut self, progress: impl Into<String>) -> Self {
        self.context.progress = progress.into();
        self
    }

    pub fn with_next_agent(mut self, agent: impl Into<String>) -> Self {
        self.next_agent = Some(agent.into());
        self
    }

    pub fn with_next_task(mut self, task: impl Into<String>) -> Self {
        self.next_task = Some(task.into());
        self
    }

    pub fn task(&self) -> &str {
        &self.context.task
    }

    pub fn files_modified(&self) -> &[String] {
        &self.context.files_modified
    }

    pub fn decisions(&self) -> &[String] {
        &self.context.decisions
    }

    pub fn progress(&self) -> &str {
        &self.context.progress
    }

    /// Extra keys that shadow a typed field would be written twice and make
    /// the document unreadable.
    pub fn check_extras(&self) -> Result<()> {
        let shadowed = |extra: &Map<String, Value>, reserved: &[&str], prefix: &str| {
            extra
                .keys()
                .find(|k| reserved.contains(&k.as_str()))
                .map(|k| format!("{prefix}{k}"))
        };
        let clash = shadowed(&self.extra, BUNDLE_KEYS, "")
            .or_else(|| shadowed(&self.context.extra, CONTEXT_KEYS, "context."));
        match clash {
            Some(key) => Err(CtxError::InvalidInput(format!(
                "extra field '{key}' of bundle '{}' collides with a built-in field",
                self.name
            ))),
            None => Ok(()),
        }
    }

    pub fn summary(&self, now: DateTime<Utc>, policy: &StatusPolicy) -> BundleSummary {
        BundleSummary {
            name: self.name.clone(),
            created: self.created,
            tokens: self.tokens,
            status: policy.status_for(self.created, now),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleStatus {
    Active,
    Completed,
    Archived,
}

impl fmt::Display for BundleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleStatus::Active => f.write_str("active"),
            BundleStatus::Completed => f.write_str("completed"),
            BundleStatus::Archived => f.write_str("archived"),
        }
    }
}

/// Age cut-offs for the status label shown by `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    pub active_hours: u32,
    pub archive_days: u32,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            active_hours: 24,
            archive_days: 30,
        }
    }
}

impl StatusPolicy {
    /// Younger than `active_hours` is active (including clock skew into the
    /// future); older than `archive_days` is archived; anything between is completed.
    pub fn status_for(&self, created: DateTime<Utc>, now: DateTime<Utc>) -> BundleStatus {
        let age = now.signed_duration_since(created);
        if age < Duration::hours(i64::from(self.active_hours)) {
            BundleStatus::Active
        } else if age > Duration::days(i64::from(self.archive_days)) {
            BundleStatus::Archived
        } else {
            BundleStatus::Completed
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSummary {
    pub name: String,
    pub created: DateTime<Utc>,
    pub tokens: u64,
    pub status: BundleStatus,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
