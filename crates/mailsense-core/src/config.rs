//! Named engine configuration.
//!
//! Every threshold the engine compares against lives here, so the same
//! constant is never duplicated across the classifier, scorer, lifecycle,
//! metrics, and escalation components.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decision::DecisionStatus;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Composite scorer weights and thresholds.
    pub scoring: ScoringConfig,
    /// Confidence gates for the decision lifecycle.
    pub lifecycle: LifecycleThresholds,
    /// Deep-escalation batch limits.
    pub escalation: EscalationConfig,
    /// Memory/learning parameters.
    pub memory: MemoryConfig,
}

/// Weights and thresholds for the composite scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Neutral starting score before any signal is applied.
    pub base_score: f64,
    /// Per-relationship score adjustments.
    pub relationship: RelationshipWeights,
    /// Multiplier applied to the deviation of the learned sender weight
    /// from neutral (`(h - 0.5) * history_weight`).
    pub history_weight: f64,
    /// Bonus for explicitly trusted senders.
    pub trusted_bonus: f64,
    /// Penalty for explicitly blocked senders.
    pub blocked_penalty: f64,
    /// Hard ceiling on the final score of a blocked sender.
    pub blocked_cap: u8,
    /// Bonus when the platform reports the message starred.
    pub starred_bonus: f64,
    /// Bonus when the platform flags the message important.
    pub flagged_bonus: f64,
    /// Penalty for the promotional platform category.
    pub promotional_penalty: f64,
    /// Bonus for the primary platform category.
    pub primary_bonus: f64,
    /// Bonus when the subject contains an urgency keyword.
    pub urgency_bonus: f64,
    /// Penalty when the message carries an unsubscribe link.
    pub unsubscribe_penalty: f64,
    /// Case-insensitive urgency keywords matched against the subject.
    pub urgency_keywords: Vec<String>,
    /// Relationship classifier thresholds.
    pub classifier: ClassifierThresholds,
    /// Confidence step function over message volume.
    pub confidence: ConfidenceSteps,
    /// Score thresholds for the suggested-action mapping.
    pub actions: ActionThresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_score: 50.0,
            relationship: RelationshipWeights::default(),
            history_weight: 30.0,
            trusted_bonus: 15.0,
            blocked_penalty: 50.0,
            blocked_cap: 25,
            starred_bonus: 20.0,
            flagged_bonus: 15.0,
            promotional_penalty: 25.0,
            primary_bonus: 10.0,
            urgency_bonus: 15.0,
            unsubscribe_penalty: 20.0,
            urgency_keywords: [
                "urgent",
                "asap",
                "deadline",
                "today",
                "approval needed",
                "review needed",
            ]
            .map(String::from)
            .to_vec(),
            classifier: ClassifierThresholds::default(),
            confidence: ConfidenceSteps::default(),
            actions: ActionThresholds::default(),
        }
    }
}

/// Score adjustments per sender relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipWeights {
    /// Adjustment for vip senders.
    pub vip: f64,
    /// Adjustment for important senders.
    pub important: f64,
    /// Adjustment for occasional senders.
    pub occasional: f64,
    /// Adjustment for informational senders.
    pub informational: f64,
    /// Adjustment for noise senders (negative).
    pub noise: f64,
}

impl Default for RelationshipWeights {
    fn default() -> Self {
        Self {
            vip: 40.0,
            important: 30.0,
            occasional: 10.0,
            informational: 5.0,
            noise: -35.0,
        }
    }
}

/// Thresholds for the deterministic relationship classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierThresholds {
    /// Response rate above which an established sender is vip.
    pub vip_response_rate: f64,
    /// Importance rate above which an established sender is important.
    pub important_rate: f64,
    /// Archive rate above which a well-known sender is noise.
    pub noise_archive_rate: f64,
    /// Messages required before a sender counts as established.
    pub min_messages: u32,
    /// Messages required before the noise rule may fire.
    pub noise_min_messages: u32,
    /// Response rate above which a sender is occasional rather than
    /// informational.
    pub occasional_response_rate: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            vip_response_rate: 0.5,
            important_rate: 0.6,
            noise_archive_rate: 0.7,
            min_messages: 3,
            noise_min_messages: 5,
            occasional_response_rate: 0.2,
        }
    }
}

/// Step function mapping message volume to scoring confidence.
///
/// Deliberately a step function; it is never smoothed or interpolated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceSteps {
    /// Confidence with no history at all.
    pub no_history: f64,
    /// Confidence below `sparse_below` messages.
    pub sparse: f64,
    /// Confidence below `developing_below` messages.
    pub developing: f64,
    /// Confidence at or above `developing_below` messages.
    pub established: f64,
    /// First message count that leaves the sparse band.
    pub sparse_below: u32,
    /// First message count that leaves the developing band.
    pub developing_below: u32,
}

impl Default for ConfidenceSteps {
    fn default() -> Self {
        Self {
            no_history: 0.3,
            sparse: 0.5,
            developing: 0.7,
            established: 0.9,
            sparse_below: 3,
            developing_below: 10,
        }
    }
}

impl ConfidenceSteps {
    /// Returns the confidence for a sender with `total_messages` of history.
    #[must_use]
    pub const fn for_messages(&self, total_messages: u32) -> f64 {
        if total_messages == 0 {
            self.no_history
        } else if total_messages < self.sparse_below {
            self.sparse
        } else if total_messages < self.developing_below {
            self.developing
        } else {
            self.established
        }
    }
}

/// Score thresholds for the suggested-action mapping, evaluated in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionThresholds {
    /// Score at or above which the action is `reply_now`.
    pub reply_now: f64,
    /// Score at or above which the action is `review_today`.
    pub review_today: f64,
    /// Score at or above which the action is `read_later`.
    pub read_later: f64,
    /// Score at or above which the action is `archive_if_not_urgent`.
    pub archive_if_not_urgent: f64,
    /// Archive rate above which a noise sender is auto-archived.
    pub auto_archive_rate: f64,
}

impl Default for ActionThresholds {
    fn default() -> Self {
        Self {
            reply_now: 75.0,
            review_today: 60.0,
            read_later: 40.0,
            archive_if_not_urgent: 25.0,
            auto_archive_rate: 0.8,
        }
    }
}

/// Confidence gates deciding the initial lifecycle status of a decision.
///
/// The same two gates define the calibration buckets in accuracy metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleThresholds {
    /// Confidence at or above which the engine acts autonomously.
    pub autonomous: f64,
    /// Confidence at or above which the engine suggests; below this it
    /// defers to the user.
    pub suggest: f64,
}

impl Default for LifecycleThresholds {
    fn default() -> Self {
        Self {
            autonomous: 0.9,
            suggest: 0.6,
        }
    }
}

impl LifecycleThresholds {
    /// Maps a confidence value to the initial decision status.
    #[must_use]
    pub fn status_for(&self, confidence: f64) -> DecisionStatus {
        if confidence >= self.autonomous {
            DecisionStatus::Handled
        } else if confidence >= self.suggest {
            DecisionStatus::Suggested
        } else {
            DecisionStatus::YourCall
        }
    }
}

/// Limits for the deep-escalation path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Messages scored below this confidence qualify for escalation.
    pub confidence_cutoff: f64,
    /// Maximum messages per escalation batch.
    pub max_batch: usize,
    /// Timeout for one completion call.
    pub timeout: Duration,
    /// Snippet truncation length in the escalation prompt.
    pub snippet_limit: usize,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            // Escalation targets exactly the decisions the lifecycle would
            // hand back to the user.
            confidence_cutoff: LifecycleThresholds::default().suggest,
            max_batch: 20,
            timeout: Duration::from_secs(30),
            snippet_limit: 150,
        }
    }
}

/// Parameters for correction mining and memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Corrections required before a pattern becomes a visible memory.
    pub min_pattern_corrections: usize,
    /// How many recent corrections the miner scans.
    pub correction_scan_limit: u32,
    /// Maximum sender memories returned by a catalog query.
    pub sender_memory_limit: u32,
    /// Interaction count at which a sender memory reaches full confidence.
    pub full_confidence_interactions: u32,
    /// Absolute score delta for a correction to appear on the timeline.
    pub significant_delta: f64,
    /// Absolute score delta at which a timeline event is high impact.
    pub high_impact_delta: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            min_pattern_corrections: 2,
            correction_scan_limit: 50,
            sender_memory_limit: 50,
            full_confidence_interactions: 20,
            significant_delta: 30.0,
            high_impact_delta: 50.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_steps_match_volume_bands() {
        let steps = ConfidenceSteps::default();

        assert!((steps.for_messages(0) - 0.3).abs() < f64::EPSILON);
        assert!((steps.for_messages(1) - 0.5).abs() < f64::EPSILON);
        assert!((steps.for_messages(2) - 0.5).abs() < f64::EPSILON);
        assert!((steps.for_messages(3) - 0.7).abs() < f64::EPSILON);
        assert!((steps.for_messages(9) - 0.7).abs() < f64::EPSILON);
        assert!((steps.for_messages(10) - 0.9).abs() < f64::EPSILON);
        assert!((steps.for_messages(500) - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_confidence_monotone_in_volume() {
        let steps = ConfidenceSteps::default();
        let mut last = 0.0;
        for total in 0..20 {
            let c = steps.for_messages(total);
            assert!(c >= last, "confidence dipped at {total} messages");
            last = c;
        }
    }

    #[test]
    fn test_status_gates() {
        let gates = LifecycleThresholds::default();

        assert_eq!(gates.status_for(0.9), DecisionStatus::Handled);
        assert_eq!(gates.status_for(0.899_999), DecisionStatus::Suggested);
        assert_eq!(gates.status_for(0.6), DecisionStatus::Suggested);
        assert_eq!(gates.status_for(0.599_999), DecisionStatus::YourCall);
        assert_eq!(gates.status_for(0.0), DecisionStatus::YourCall);
    }

    #[test]
    fn test_escalation_cutoff_tracks_lifecycle_gate() {
        let escalation = EscalationConfig::default();
        let lifecycle = LifecycleThresholds::default();
        assert!((escalation.confidence_cutoff - lifecycle.suggest).abs() < f64::EPSILON);
    }
}
