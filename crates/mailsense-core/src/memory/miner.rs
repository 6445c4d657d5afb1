//! Correction-pattern mining.
//!
//! Pure functions over corrected decisions; the service supplies the rows
//! and the user's pattern overrides.

use std::collections::HashMap;

use super::model::{CorrectionMemory, CorrectionPattern, Impact, TimelineEvent};
use super::repository::PatternOverride;
use crate::config::MemoryConfig;
use crate::decision::Decision;

/// Score assumed when a correction payload carries no importance score.
const NEUTRAL_SCORE: f64 = 50.0;

/// Group corrected decisions by the pattern in their reasoning.
#[must_use]
pub fn group_by_pattern(corrections: &[Decision]) -> HashMap<CorrectionPattern, Vec<&Decision>> {
    let mut groups: HashMap<CorrectionPattern, Vec<&Decision>> = HashMap::new();
    for decision in corrections {
        let pattern = CorrectionPattern::from_reasoning(
            decision.correction_reasoning.as_deref().unwrap_or_default(),
        );
        groups.entry(pattern).or_default().push(decision);
    }
    groups
}

/// Build the visible correction memories.
///
/// A muted pattern only counts corrections reviewed after its watermark,
/// so deletion resets influence and only fresh corrections re-learn it.
/// Patterns below the correction minimum stay invisible.
#[must_use]
pub fn build_memories(
    corrections: &[Decision],
    overrides: &HashMap<CorrectionPattern, PatternOverride>,
    config: &MemoryConfig,
) -> Vec<CorrectionMemory> {
    let mut memories: Vec<CorrectionMemory> = group_by_pattern(corrections)
        .into_iter()
        .filter_map(|(pattern, group)| {
            let state = overrides.get(&pattern).copied().unwrap_or_default();
            let live: Vec<&&Decision> = group
                .iter()
                .filter(|d| match state.muted_at {
                    Some(watermark) => d.reviewed_at.is_some_and(|at| at > watermark),
                    None => true,
                })
                .collect();

            if live.len() < config.min_pattern_corrections {
                return None;
            }

            #[allow(clippy::cast_precision_loss)]
            let count = live.len() as f64;
            let original_avg = live
                .iter()
                .map(|d| d.decision_data.importance_score().unwrap_or(NEUTRAL_SCORE))
                .sum::<f64>()
                / count;
            let corrected_avg = live
                .iter()
                .map(|d| {
                    d.correction
                        .as_ref()
                        .and_then(crate::decision::DecisionData::importance_score)
                        .unwrap_or(NEUTRAL_SCORE)
                })
                .sum::<f64>()
                / count;

            #[allow(clippy::cast_possible_truncation)]
            Some(CorrectionMemory {
                id: format!("correction_{}", pattern.as_str()),
                pattern,
                correction_count: live.len() as u32,
                average_adjustment: corrected_avg - original_avg,
                original_score_avg: original_avg,
                corrected_score_avg: corrected_avg,
                weight: state.weight,
                last_correction: live.iter().filter_map(|d| d.reviewed_at).max(),
                reasoning: format!("You've corrected similar emails {} times", live.len()),
            })
        })
        .collect();

    memories.sort_by(|a, b| b.correction_count.cmp(&a.correction_count));
    memories
}

/// Significant corrections, newest first.
#[must_use]
pub fn timeline(corrections: &[Decision], config: &MemoryConfig) -> Vec<TimelineEvent> {
    let mut events: Vec<TimelineEvent> = corrections
        .iter()
        .filter_map(|decision| {
            let reviewed_at = decision.reviewed_at?;
            let original = decision
                .decision_data
                .importance_score()
                .unwrap_or(NEUTRAL_SCORE);
            let corrected = decision
                .correction
                .as_ref()
                .and_then(crate::decision::DecisionData::importance_score)
                .unwrap_or(NEUTRAL_SCORE);
            let delta = (corrected - original).abs();

            if delta < config.significant_delta {
                return None;
            }

            Some(TimelineEvent {
                reviewed_at,
                original_score: original,
                corrected_score: corrected,
                reasoning: decision.correction_reasoning.clone(),
                impact: if delta >= config.high_impact_delta {
                    Impact::High
                } else {
                    Impact::Medium
                },
            })
        })
        .collect();

    events.sort_by(|a, b| b.reviewed_at.cmp(&a.reviewed_at));
    events
}
