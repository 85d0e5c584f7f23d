// ─────────────────────────────────────────────────────────────────────
// Flutter Shutter Search — Score Types
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::code::Code;

/// Which way an objective improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    /// Strict improvement test. Equal scores never improve, and a
    /// non-finite candidate never beats anything.
    #[inline]
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        if candidate.is_nan() {
            log::warn!("is_better: NaN score ignored");
            return false;
        }
        match self {
            Direction::Maximize => candidate > incumbent,
            Direction::Minimize => candidate < incumbent,
        }
    }

    /// Score every candidate improves on.
    pub fn worst(self) -> f64 {
        match self {
            Direction::Maximize => f64::NEG_INFINITY,
            Direction::Minimize => f64::INFINITY,
        }
    }
}

/// Search path taken by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Exhaustive,
    Delegated,
}

/// One improvement observed during an exhaustive scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub n: usize,
    pub k: usize,
    pub score: f64,
    /// Digit rendering of the improving code.
    pub code: String,
}

/// Result of a completed search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub code: Code,
    pub score: f64,
    pub strategy: StrategyKind,
    /// Candidates scored in process (0 on the delegated path).
    pub candidates_evaluated: u64,
    /// Strict improvements seen while scanning.
    pub improvements: u64,
}
