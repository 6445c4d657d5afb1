//! Accuracy metrics over reviewed decisions.
//!
//! Pure computations over already-fetched rows; the ledger supplies the
//! window.

use serde::{Deserialize, Serialize};

use crate::config::LifecycleThresholds;
use crate::decision::{Decision, DecisionStatus};

/// One confidence-calibration bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBucket {
    /// Reviewed decisions in this bucket.
    pub count: u32,
    /// How many the user approved.
    pub approved: u32,
    /// Approval rate within the bucket (0 when empty).
    pub rate: f64,
}

impl CalibrationBucket {
    fn from_decisions<'a>(decisions: impl Iterator<Item = &'a Decision>) -> Self {
        let mut count = 0u32;
        let mut approved = 0u32;
        for decision in decisions {
            count += 1;
            if decision.status == DecisionStatus::UserApproved {
                approved += 1;
            }
        }
        let rate = if count == 0 {
            0.0
        } else {
            f64::from(approved) / f64::from(count)
        };
        Self {
            count,
            approved,
            rate,
        }
    }
}

/// Calibration buckets keyed by the lifecycle confidence gates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Decisions at or above the autonomous gate.
    pub high: CalibrationBucket,
    /// Decisions between the suggest and autonomous gates.
    pub medium: CalibrationBucket,
    /// Decisions below the suggest gate.
    pub low: CalibrationBucket,
}

/// Accuracy statistics over reviewed decisions in a window.
///
/// `total == 0` is the "no reviewed decisions yet" sentinel, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    /// Reviewed decisions in the window.
    pub total: u32,
    /// Approved by the user.
    pub approved: u32,
    /// Corrected by the user.
    pub corrected: u32,
    /// `approved / total` (0 when empty).
    pub approval_rate: f64,
    /// Mean confidence across reviewed decisions (0 when empty).
    pub avg_confidence: f64,
    /// Per-confidence-bucket approval rates.
    pub calibration: Calibration,
}

impl AccuracyMetrics {
    /// Whether the window held no reviewed decisions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Compute metrics from reviewed decisions.
///
/// The calibration buckets reuse the lifecycle gates, so bucket membership
/// always matches the status a confidence value would have produced.
#[must_use]
pub fn compute(reviewed: &[Decision], gates: &LifecycleThresholds) -> AccuracyMetrics {
    if reviewed.is_empty() {
        return AccuracyMetrics::default();
    }

    #[allow(clippy::cast_possible_truncation)]
    let total = reviewed.len() as u32;
    let approved = reviewed
        .iter()
        .filter(|d| d.status == DecisionStatus::UserApproved)
        .count();
    let corrected = reviewed
        .iter()
        .filter(|d| d.status == DecisionStatus::UserCorrected)
        .count();
    let confidence_sum: f64 = reviewed.iter().map(|d| d.confidence).sum();

    let calibration = Calibration {
        high: CalibrationBucket::from_decisions(
            reviewed.iter().filter(|d| d.confidence >= gates.autonomous),
        ),
        medium: CalibrationBucket::from_decisions(
            reviewed
                .iter()
                .filter(|d| d.confidence >= gates.suggest && d.confidence < gates.autonomous),
        ),
        low: CalibrationBucket::from_decisions(
            reviewed.iter().filter(|d| d.confidence < gates.suggest),
        ),
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    AccuracyMetrics {
        total,
        approved: approved as u32,
        corrected: corrected as u32,
        approval_rate: approved as f64 / f64::from(total),
        avg_confidence: confidence_sum / f64::from(total),
        calibration,
    }
}

/// A decision list grouped by review state, for dashboards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewQueue {
    /// Suggested and your-call decisions awaiting the user.
    pub needs_review: Vec<Decision>,
    /// Autonomously handled decisions.
    pub recently_handled: Vec<Decision>,
    /// Decisions the user approved.
    pub approved: Vec<Decision>,
    /// Decisions the user corrected.
    pub corrected: Vec<Decision>,
}

/// Aggregate counts over a [`ReviewQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueueSummary {
    /// All decisions in the queue.
    pub total: u32,
    /// Decisions needing user attention.
    pub needs_attention: u32,
    /// Decisions the engine handled on its own.
    pub handled_automatically: u32,
    /// Approval rate among reviewed decisions; `None` before any review.
    pub approval_rate: Option<f64>,
}

impl ReviewQueue {
    /// Group a decision list by review state.
    #[must_use]
    pub fn from_decisions(decisions: Vec<Decision>) -> Self {
        let mut queue = Self::default();
        for decision in decisions {
            match decision.status {
                DecisionStatus::Suggested | DecisionStatus::YourCall => {
                    queue.needs_review.push(decision);
                }
                DecisionStatus::Handled => queue.recently_handled.push(decision),
                DecisionStatus::UserApproved => queue.approved.push(decision),
                DecisionStatus::UserCorrected => queue.corrected.push(decision),
            }
        }
        queue
    }

    /// Aggregate counts for this queue.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn summary(&self) -> QueueSummary {
        let reviewed = self.approved.len() + self.corrected.len();
        QueueSummary {
            total: (self.needs_review.len()
                + self.recently_handled.len()
                + reviewed) as u32,
            needs_attention: self.needs_review.len() as u32,
            handled_automatically: self.recently_handled.len() as u32,
            approval_rate: if reviewed == 0 {
                None
            } else {
                Some(self.approved.len() as f64 / reviewed as f64)
            },
        }
    }
}
