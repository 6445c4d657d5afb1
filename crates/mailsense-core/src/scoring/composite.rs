//! Composite importance scoring.

use super::classify::classify_relationship;
use super::model::{RelationshipType, ScoringResult, SuggestedAction};
use crate::config::ScoringConfig;
use crate::signal::{MailCategory, PlatformSignals, SenderHistory, TrustLevel, UserContext};

/// Combines relationship, learned history, trust, platform, and content
/// signals into a bounded importance score.
///
/// Stateless apart from configuration; safe to share across concurrent
/// scoring calls.
#[derive(Debug, Clone, Default)]
pub struct CompositeScorer {
    config: ScoringConfig,
}

impl CompositeScorer {
    /// Creates a scorer with the given configuration.
    #[must_use]
    pub const fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// The scorer's configuration.
    #[must_use]
    pub const fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one message.
    ///
    /// Deterministic for fixed inputs. Out-of-range rates and weights from
    /// providers are clamped here, never raised as errors. A blocked trust
    /// designation dominates every other signal: the final score is capped
    /// and the suggested action is forced to archive-or-stronger.
    ///
    /// User context and snippet are carried for the escalation path; the
    /// fast score does not read them.
    #[must_use]
    pub fn score(
        &self,
        history: &SenderHistory,
        _user_context: &UserContext,
        trust: TrustLevel,
        platform: &PlatformSignals,
        subject: &str,
        _snippet: &str,
    ) -> ScoringResult {
        let relationship = classify_relationship(history, &self.config.classifier);
        let archive_rate = history.archive_rate.clamp(0.0, 1.0);

        let mut score = self.config.base_score;

        let weights = &self.config.relationship;
        score += match relationship {
            RelationshipType::Vip => weights.vip,
            RelationshipType::Important => weights.important,
            RelationshipType::Occasional => weights.occasional,
            RelationshipType::Informational => weights.informational,
            RelationshipType::Noise => weights.noise,
            RelationshipType::Unknown => 0.0,
        };

        if let Some(weight) = history.importance_weight {
            score += (weight.clamp(0.0, 1.0) - 0.5) * self.config.history_weight;
        }

        match trust {
            TrustLevel::Trusted => score += self.config.trusted_bonus,
            TrustLevel::Blocked => score -= self.config.blocked_penalty,
            TrustLevel::Neutral => {}
        }

        if platform.is_starred {
            score += self.config.starred_bonus;
        }
        if platform.is_flagged_important {
            score += self.config.flagged_bonus;
        }
        match platform.category {
            MailCategory::Promotional => score -= self.config.promotional_penalty,
            MailCategory::Primary => score += self.config.primary_bonus,
            _ => {}
        }

        let subject_lower = subject.to_lowercase();
        if self
            .config
            .urgency_keywords
            .iter()
            .any(|keyword| subject_lower.contains(keyword.as_str()))
        {
            score += self.config.urgency_bonus;
        }
        if platform.has_unsubscribe_link {
            score -= self.config.unsubscribe_penalty;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mut importance_score = score.clamp(0.0, 100.0).round() as u8;

        if trust == TrustLevel::Blocked {
            importance_score = importance_score.min(self.config.blocked_cap);
        }

        let mut suggested_action =
            self.suggest_action(f64::from(importance_score), relationship, archive_rate);

        if trust == TrustLevel::Blocked {
            suggested_action = if relationship == RelationshipType::Noise
                && archive_rate > self.config.actions.auto_archive_rate
            {
                SuggestedAction::AutoArchive
            } else {
                SuggestedAction::ArchiveIfNotUrgent
            };
        }

        ScoringResult {
            importance_score,
            confidence: self.confidence(history.total_messages),
            relationship,
            reasoning: self.explain(relationship, trust, platform, archive_rate),
            suggested_action,
        }
    }

    /// Scoring confidence for a sender with this much history.
    ///
    /// A step function of message volume only.
    #[must_use]
    pub const fn confidence(&self, total_messages: u32) -> f64 {
        self.config.confidence.for_messages(total_messages)
    }

    fn suggest_action(
        &self,
        score: f64,
        relationship: RelationshipType,
        archive_rate: f64,
    ) -> SuggestedAction {
        let thresholds = &self.config.actions;

        if score >= thresholds.reply_now {
            SuggestedAction::ReplyNow
        } else if score >= thresholds.review_today {
            SuggestedAction::ReviewToday
        } else if score >= thresholds.read_later {
            SuggestedAction::ReadLater
        } else if score >= thresholds.archive_if_not_urgent {
            SuggestedAction::ArchiveIfNotUrgent
        } else if relationship == RelationshipType::Noise
            && archive_rate > thresholds.auto_archive_rate
        {
            SuggestedAction::AutoArchive
        } else {
            SuggestedAction::UserDecides
        }
    }

    fn explain(
        &self,
        relationship: RelationshipType,
        trust: TrustLevel,
        platform: &PlatformSignals,
        archive_rate: f64,
    ) -> String {
        let mut reasons: Vec<String> = Vec::new();

        match relationship {
            RelationshipType::Vip => {
                reasons.push("You frequently engage with this sender".to_string());
            }
            RelationshipType::Important => {
                reasons.push("You've marked this sender as important before".to_string());
            }
            RelationshipType::Noise => {
                #[allow(clippy::cast_possible_truncation)]
                let percent = (archive_rate * 100.0).round() as i64;
                reasons.push(format!(
                    "You archive {percent}% of emails from this sender"
                ));
            }
            RelationshipType::Unknown => {
                reasons.push("New sender - no history available".to_string());
            }
            RelationshipType::Occasional | RelationshipType::Informational => {}
        }

        match trust {
            TrustLevel::Trusted => reasons.push("Explicitly trusted contact".to_string()),
            TrustLevel::Blocked => reasons.push("Blocked sender".to_string()),
            TrustLevel::Neutral => {}
        }

        if platform.is_starred {
            reasons.push("Starred by your mail provider".to_string());
        }
        if platform.is_flagged_important {
            reasons.push("Flagged important by your mail provider".to_string());
        }
        if platform.category == MailCategory::Promotional {
            reasons.push("Promotional content".to_string());
        }

        if reasons.is_empty() {
            reasons.push("Standard email with no strong signals".to_string());
        }

        reasons.join(" \u{2022} ")
    }
}
