//! Deterministic relationship classification.

use super::model::RelationshipType;
use crate::config::ClassifierThresholds;
use crate::signal::SenderHistory;

/// Classify a sender from behavioral history.
///
/// Pure threshold cascade; rules are evaluated in a fixed order and the
/// first match wins. Rates outside [0, 1] are clamped before comparison.
#[must_use]
pub fn classify_relationship(
    history: &SenderHistory,
    thresholds: &ClassifierThresholds,
) -> RelationshipType {
    let response_rate = history.response_rate.clamp(0.0, 1.0);
    let archive_rate = history.archive_rate.clamp(0.0, 1.0);
    let importance_rate = history.importance_rate.clamp(0.0, 1.0);
    let total = history.total_messages;

    if response_rate > thresholds.vip_response_rate && total >= thresholds.min_messages {
        RelationshipType::Vip
    } else if importance_rate > thresholds.important_rate && total >= thresholds.min_messages {
        RelationshipType::Important
    } else if archive_rate > thresholds.noise_archive_rate && total >= thresholds.noise_min_messages
    {
        RelationshipType::Noise
    } else if total < thresholds.min_messages {
        RelationshipType::Unknown
    } else if response_rate > thresholds.occasional_response_rate {
        RelationshipType::Occasional
    } else {
        RelationshipType::Informational
    }
}
