//! Checkpoint and run tracking types.
//!
//! Shared by the engine and the checkpoint store backends so neither has to
//! depend on the other.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque pipeline identifier. Also the key a watermark is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineId(String);

impl PipelineId {
    /// Create a new pipeline identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Into<String>> From<S> for PipelineId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

/// Last successfully loaded `id_venda`.
///
/// [`Watermark::UNSET`] (`0`) is the value before the first successful load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(i64);

impl Watermark {
    /// Sentinel for "nothing loaded yet".
    pub const UNSET: Self = Self(0);

    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_unset(self) -> bool {
        self.0 == Self::UNSET.0
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Watermark {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for Watermark {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

// ---------------------------------------------------------------------------
// Run tracking
// ---------------------------------------------------------------------------

/// Terminal status of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    /// The source had nothing past the watermark.
    NoNewData,
    Failed,
}

impl RunStatus {
    /// Wire-format string for storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::NoNewData => "no_new_data",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate statistics recorded when a run finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub rows_extracted: u64,
    pub facts_loaded: u64,
    pub join_misses: u64,
    pub watermark_before: Watermark,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark_after: Option<Watermark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_id_display_and_as_str() {
        let pid = PipelineId::new("vendas_dw");
        assert_eq!(pid.as_str(), "vendas_dw");
        assert_eq!(pid.to_string(), "vendas_dw");
    }

    #[test]
    fn watermark_unset_is_zero() {
        assert_eq!(Watermark::UNSET.value(), 0);
        assert!(Watermark::default().is_unset());
        assert!(!Watermark::new(100).is_unset());
    }

    #[test]
    fn watermark_parses_trimmed_text() {
        assert_eq!("103\n".parse::<Watermark>().unwrap(), Watermark::new(103));
        assert_eq!("  0 ".parse::<Watermark>().unwrap(), Watermark::UNSET);
        assert!("abc".parse::<Watermark>().is_err());
        assert!("".parse::<Watermark>().is_err());
    }

    #[test]
    fn watermark_orders_numerically() {
        assert!(Watermark::new(87) < Watermark::new(100));
        assert_eq!(Watermark::new(5).max(Watermark::new(3)), Watermark::new(5));
    }

    #[test]
    fn run_status_as_str() {
        assert_eq!(RunStatus::Running.as_str(), "running");
        assert_eq!(RunStatus::Completed.as_str(), "completed");
        assert_eq!(RunStatus::NoNewData.as_str(), "no_new_data");
        assert_eq!(RunStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn run_stats_serde_skips_empty_optionals() {
        let stats = RunStats {
            rows_extracted: 3,
            facts_loaded: 3,
            ..RunStats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("error_message").is_none());
        assert!(json.get("watermark_after").is_none());
        assert_eq!(json["watermark_before"], 0);
    }
}
