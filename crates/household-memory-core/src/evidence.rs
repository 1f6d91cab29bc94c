//! Evidence sufficiency and confidence labeling.
//!
//! Evidence is sufficient when the top hit alone is strong
//! (`rank ≥ high_threshold`), or when at least three hits together are
//! (`sum(top-3 ranks) ≥ multi_threshold`). Sufficient evidence is labeled
//! `high` when the top rank reaches `second_threshold`, `medium` otherwise.
//! Insufficient evidence is always `low`.

use serde::{Deserialize, Serialize};

use crate::error::{RecallError, RecallResult};
use crate::models::{Confidence, Hit};

/// Default top-rank threshold for sufficiency.
pub const DEFAULT_HIGH_THRESHOLD: f64 = 0.35;
/// Default threshold for the summed top-3 ranks.
pub const DEFAULT_MULTI_THRESHOLD: f64 = 0.75;
/// Default top-rank threshold separating `medium` from `high`.
pub const DEFAULT_SECOND_THRESHOLD: f64 = 0.55;

/// Number of hits summed by the multi-hit rule.
const MULTI_HIT_COUNT: usize = 3;

/// The three tunable thresholds of the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvidenceThresholds {
    pub high: f64,
    pub multi: f64,
    pub second: f64,
}

impl Default for EvidenceThresholds {
    fn default() -> Self {
        Self {
            high: DEFAULT_HIGH_THRESHOLD,
            multi: DEFAULT_MULTI_THRESHOLD,
            second: DEFAULT_SECOND_THRESHOLD,
        }
    }
}

impl EvidenceThresholds {
    pub fn validate(&self) -> RecallResult<()> {
        if !(0.0..=1.0).contains(&self.high) {
            return Err(RecallError::Config(
                "evidence.high_threshold must be in [0.0, 1.0]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.second) {
            return Err(RecallError::Config(
                "evidence.second_threshold must be in [0.0, 1.0]".into(),
            ));
        }
        if !(0.0..=MULTI_HIT_COUNT as f64).contains(&self.multi) {
            return Err(RecallError::Config(
                "evidence.multi_threshold must be in [0.0, 3.0]".into(),
            ));
        }
        Ok(())
    }

    /// Whether the ranked hits are strong enough to answer from.
    ///
    /// `hits` must already be sorted by rank, descending.
    pub fn is_sufficient(&self, hits: &[Hit]) -> bool {
        let top = match hits.first() {
            Some(hit) => hit.rank,
            None => return false,
        };
        if top >= self.high {
            return true;
        }
        if hits.len() >= MULTI_HIT_COUNT {
            let sum: f64 = hits.iter().take(MULTI_HIT_COUNT).map(|h| h.rank).sum();
            return sum >= self.multi;
        }
        false
    }

    /// Confidence label for the ranked hits.
    pub fn confidence(&self, hits: &[Hit]) -> Confidence {
        if !self.is_sufficient(hits) {
            return Confidence::Low;
        }
        match hits.first() {
            Some(top) if top.rank >= self.second => Confidence::High,
            _ => Confidence::Medium,
        }
    }
}
