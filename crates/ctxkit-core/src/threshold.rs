//! Token-budget threshold monitor.
//!
//! Classifies the current context-window token count into one of five
//! ordered stages and pairs it with a severity label and a recommended
//! action. The caller owns the running count and passes it in on every
//! call; nothing here stores state.

use crate::error::{CtxError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fresh,
    Growing,
    Large,
    Critical,
    Overload,
}

impl Stage {
    pub fn all() -> &'static [Stage] {
        &[
            Stage::Fresh,
            Stage::Growing,
            Stage::Large,
            Stage::Critical,
            Stage::Overload,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Fresh => "fresh",
            Stage::Growing => "growing",
            Stage::Large => "large",
            Stage::Critical => "critical",
            Stage::Overload => "overload",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Stage::Fresh => Severity::Ok,
            Stage::Growing => Severity::Notice,
            Stage::Large => Severity::Alert,
            Stage::Critical => Severity::Warning,
            Stage::Overload => Severity::Critical,
        }
    }

    pub fn recommendation(self) -> Recommendation {
        match self {
            Stage::Fresh => Recommendation::Continue,
            Stage::Growing => Recommendation::Delegate,
            Stage::Large => Recommendation::DelegateNow,
            Stage::Critical => Recommendation::SaveBundle,
            Stage::Overload => Recommendation::SaveAndRestart,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Ok,
    Notice,
    Alert,
    Warning,
    Critical,
}

impl Severity {
    pub fn icon(self) -> &'static str {
        match self {
            Severity::Ok => "🟢",
            Severity::Notice => "🟡",
            Severity::Alert => "🟠",
            Severity::Warning | Severity::Critical => "🔴",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Notice => "NOTICE",
            Severity::Alert => "ALERT",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.icon(), self.label())
    }
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Continue,
    Delegate,
    DelegateNow,
    SaveBundle,
    SaveAndRestart,
}

impl Recommendation {
    /// Suffix appended to the one-line report. `None` when no action is needed.
    pub fn advice(self) -> Option<&'static str> {
        match self {
            Recommendation::Continue => None,
            Recommendation::Delegate => Some("consider delegating exploration to subagents"),
            Recommendation::DelegateNow => Some("delegate remaining work to subagents now"),
            Recommendation::SaveBundle => Some("save a context bundle before continuing"),
            Recommendation::SaveAndRestart => {
                Some("save a context bundle and start a fresh session")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Inclusive lower bounds of every stage above `Fresh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_growing")]
    pub growing: u64,
    #[serde(default = "default_large")]
    pub large: u64,
    #[serde(default = "default_critical")]
    pub critical: u64,
    #[serde(default = "default_overload")]
    pub overload: u64,
}

fn default_growing() -> u64 {
    60_000
}

fn default_large() -> u64 {
    100_000
}

fn default_critical() -> u64 {
    120_000
}

fn default_overload() -> u64 {
    150_000
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            growing: default_growing(),
            large: default_large(),
            critical: default_critical(),
            overload: default_overload(),
        }
    }
}

impl Thresholds {
    /// Breakpoints must be strictly ascending so every stage is non-empty.
    pub fn validate(&self) -> Result<()> {
        let ordered = 0 < self.growing
            && self.growing < self.large
            && self.large < self.critical
            && self.critical < self.overload;
        if !ordered {
            return Err(CtxError::InvalidInput(format!(
                "thresholds must be strictly ascending and above zero \
                 (growing={}, large={}, critical={}, overload={})",
                self.growing, self.large, self.critical, self.overload
            )));
        }
        Ok(())
    }

    /// Lower bound of `stage`; `Fresh` starts at zero.
    pub fn lower_bound(&self, stage: Stage) -> u64 {
        match stage {
            Stage::Fresh => 0,
            Stage::Growing => self.growing,
            Stage::Large => self.large,
            Stage::Critical => self.critical,
            Stage::Overload => self.overload,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification (output)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub tokens: u64,
    pub stage: Stage,
    pub severity: Severity,
    pub recommendation: Recommendation,
    /// Tokens left before the next breakpoint; absent once overloaded.
    pub headroom: Option<u64>,
    pub message: String,
}

fn format_message(tokens: u64, severity: Severity, recommendation: Recommendation) -> String {
    match recommendation.advice() {
        Some(advice) => format!("{severity}: {tokens} tokens, {advice}"),
        None => format!("{severity}: {tokens} tokens"),
    }
}

// ---------------------------------------------------------------------------
// ThresholdMonitor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThresholdMonitor {
    thresholds: Thresholds,
}

impl ThresholdMonitor {
    pub fn new(thresholds: Thresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    /// Stage for a count already known to be non-negative.
    /// Checked highest first, so a count equal to a breakpoint lands in the higher stage.
    pub fn stage_for(&self, tokens: u64) -> Stage {
        let t = &self.thresholds;
        if tokens >= t.overload {
            Stage::Overload
        } else if tokens >= t.critical {
            Stage::Critical
        } else if tokens >= t.large {
            Stage::Large
        } else if tokens >= t.growing {
            Stage::Growing
        } else {
            Stage::Fresh
        }
    }

    pub fn classify(&self, token_count: i64) -> Result<Classification> {
        let tokens = u64::try_from(token_count).map_err(|_| {
            CtxError::InvalidInput(format!(
                "token count must be non-negative, got {token_count}"
            ))
        })?;
        let stage = self.stage_for(tokens);
        let severity = stage.severity();
        let recommendation = stage.recommendation();
        Ok(Classification {
            tokens,
            stage,
            severity,
            recommendation,
            headroom: self.headroom(tokens),
            message: format_message(tokens, severity, recommendation),
        })
    }

    /// Tokens left before the next breakpoint, or `None` once overloaded.
    pub fn headroom(&self, tokens: u64) -> Option<u64> {
        Stage::all()
            .iter()
            .map(|&stage| self.thresholds.lower_bound(stage))
            .find(|&bound| bound > tokens)
            .map(|bound| bound - tokens)
    }
}

/// Classify against the default breakpoints.
pub fn classify(token_count: i64) -> Result<Classification> {
    ThresholdMonitor::default().classify(token_count)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
