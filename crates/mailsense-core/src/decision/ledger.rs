//! Decision recording, lifecycle, and review handling.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use super::model::{Decision, DecisionData, DecisionStatus, DecisionType, NewDecision, ReviewOutcome};
use super::store::DecisionStore;
use crate::config::LifecycleThresholds;
use crate::metrics::{self, AccuracyMetrics};
use crate::signal::UserId;
use crate::{Error, Result};

/// How long handled decisions stay in the review queue for audit.
const HANDLED_REVIEW_WINDOW_HOURS: i64 = 24;

/// Records decisions and applies user reviews.
///
/// Creation and review are each one atomic store write; the review write is
/// conditional on the row still being non-terminal, so concurrent reviews
/// of the same decision have exactly one winner.
pub struct DecisionLedger<S> {
    store: Arc<S>,
    lifecycle: LifecycleThresholds,
}

impl<S: DecisionStore> DecisionLedger<S> {
    /// Creates a ledger over the given store.
    #[must_use]
    pub const fn new(store: Arc<S>, lifecycle: LifecycleThresholds) -> Self {
        Self { store, lifecycle }
    }

    /// The confidence gates this ledger applies.
    #[must_use]
    pub const fn lifecycle(&self) -> &LifecycleThresholds {
        &self.lifecycle
    }

    /// Record one decision and return its new id.
    ///
    /// The initial status is purely a function of confidence; out-of-range
    /// confidence is clamped. Never updates an existing row.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn record_decision(
        &self,
        user_id: UserId,
        decision_data: DecisionData,
        reasoning: impl Into<String>,
        confidence: f64,
        message_id: Option<String>,
    ) -> Result<i64> {
        let confidence = confidence.clamp(0.0, 1.0);
        let status = self.lifecycle.status_for(confidence);
        let kind = decision_data.kind();

        let decision = NewDecision {
            user_id,
            message_id,
            decision_data,
            reasoning: reasoning.into(),
            confidence,
            status,
            created_at: Utc::now(),
        };
        let id = self.store.insert(&decision).await?;

        info!(
            "Recorded {} decision {id} (confidence {confidence:.2}, status {})",
            kind.as_str(),
            status.as_str()
        );
        Ok(id)
    }

    /// Decisions awaiting the user's attention.
    ///
    /// Suggested and your-call decisions at any age, plus autonomously
    /// handled ones from the last 24 hours for audit. Newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn get_pending_reviews(&self, user_id: UserId, limit: u32) -> Result<Vec<Decision>> {
        let cutoff = Utc::now() - Duration::hours(HANDLED_REVIEW_WINDOW_HOURS);
        self.store.pending(user_id, cutoff, limit).await
    }

    /// Apply a user's review to a decision.
    ///
    /// Review is a one-time transition: approval sets `user_approved`,
    /// rejection requires a correction payload matching the decision kind
    /// and sets `user_corrected`. Returns the decision with its terminal
    /// fields set.
    ///
    /// # Errors
    ///
    /// - [`Error::DecisionNotFound`] if no decision with this id is owned
    ///   by `user_id` (existence is not leaked to other users)
    /// - [`Error::AlreadyReviewed`] if the decision is already terminal
    /// - [`Error::Validation`] if a correction accompanies an approval, is
    ///   missing from a rejection, or has the wrong payload kind
    /// - [`Error::Database`] if the store write fails
    pub async fn user_review_decision(
        &self,
        decision_id: i64,
        user_id: UserId,
        approved: bool,
        correction: Option<DecisionData>,
        correction_reasoning: Option<String>,
    ) -> Result<Decision> {
        let Some(decision) = self.store.fetch_owned(decision_id, user_id).await? else {
            return Err(Error::DecisionNotFound(decision_id));
        };
        if decision.status.is_terminal() {
            return Err(Error::AlreadyReviewed(decision_id));
        }

        let outcome = if approved {
            if correction.is_some() {
                return Err(Error::Validation(
                    "a correction cannot accompany an approval".to_string(),
                ));
            }
            ReviewOutcome {
                status: DecisionStatus::UserApproved,
                reviewed_at: Utc::now(),
                correction: None,
                correction_reasoning: None,
            }
        } else {
            let correction = correction.ok_or_else(|| {
                Error::Validation(
                    "a correction payload is required when rejecting a decision".to_string(),
                )
            })?;
            if correction.kind() != decision.decision_type {
                return Err(Error::Validation(format!(
                    "correction payload is {} but the decision is {}",
                    correction.kind().as_str(),
                    decision.decision_type.as_str()
                )));
            }
            ReviewOutcome {
                status: DecisionStatus::UserCorrected,
                reviewed_at: Utc::now(),
                correction: Some(correction),
                correction_reasoning,
            }
        };

        // The conditional write is the serialization point for racing
        // reviews; a lost race surfaces the same way as a late retry.
        if !self
            .store
            .complete_review(decision_id, user_id, &outcome)
            .await?
        {
            return Err(Error::AlreadyReviewed(decision_id));
        }

        info!(
            "User {} decision {decision_id}",
            if approved { "approved" } else { "corrected" }
        );

        Ok(Decision {
            status: outcome.status,
            reviewed_at: Some(outcome.reviewed_at),
            correction: outcome.correction,
            correction_reasoning: outcome.correction_reasoning,
            ..decision
        })
    }

    /// Decision history for audit, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn get_decision_history(
        &self,
        user_id: UserId,
        message_id: Option<&str>,
        decision_type: Option<DecisionType>,
        days: u32,
    ) -> Result<Vec<Decision>> {
        let since = Utc::now() - Duration::days(i64::from(days));
        self.store
            .history(user_id, message_id, decision_type, since)
            .await
    }

    /// Reviewed decisions inside the window.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn reviewed_decisions(
        &self,
        user_id: UserId,
        decision_type: Option<DecisionType>,
        days: u32,
    ) -> Result<Vec<Decision>> {
        let since = Utc::now() - Duration::days(i64::from(days));
        self.store.reviewed(user_id, decision_type, since).await
    }

    /// Approval-rate and calibration statistics over reviewed decisions.
    ///
    /// A window with no reviewed decisions yields the empty-metrics
    /// sentinel, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn get_accuracy_metrics(
        &self,
        user_id: UserId,
        decision_type: Option<DecisionType>,
        days: u32,
    ) -> Result<AccuracyMetrics> {
        let reviewed = self.reviewed_decisions(user_id, decision_type, days).await?;
        Ok(metrics::compute(&reviewed, &self.lifecycle))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::decision::SqliteDecisionStore;
    use crate::scoring::SuggestedAction;

    async fn ledger() -> DecisionLedger<SqliteDecisionStore> {
        let store = Arc::new(SqliteDecisionStore::in_memory().await.unwrap());
        DecisionLedger::new(store, LifecycleThresholds::default())
    }

    fn scoring_data(score: u8) -> DecisionData {
        DecisionData::ImportanceScoring {
            importance_score: score,
            sender_email: Some("boss@corp.com".to_string()),
            suggested_action: Some(SuggestedAction::ReviewToday),
        }
    }

    #[tokio::test]
    async fn test_status_follows_confidence_boundaries() {
        let ledger = ledger().await;
        let user = UserId::new(1);

        for (confidence, expected) in [
            (0.9, DecisionStatus::Handled),
            (0.899_999, DecisionStatus::Suggested),
            (0.6, DecisionStatus::Suggested),
            (0.599_999, DecisionStatus::YourCall),
        ] {
            let id = ledger
                .record_decision(user, scoring_data(70), "r", confidence, None)
                .await
                .unwrap();
            let rows = ledger.get_decision_history(user, None, None, 1).await.unwrap();
            let decision = rows.iter().find(|d| d.id == id).unwrap();
            assert_eq!(decision.status, expected, "confidence {confidence}");
        }
    }

    #[tokio::test]
    async fn test_confidence_clamped_on_record() {
        let ledger = ledger().await;
        let user = UserId::new(1);

        let id = ledger
            .record_decision(user, scoring_data(70), "r", 1.7, None)
            .await
            .unwrap();

        let rows = ledger.get_decision_history(user, None, None, 1).await.unwrap();
        let decision = rows.iter().find(|d| d.id == id).unwrap();
        assert!((decision.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(decision.status, DecisionStatus::Handled);
    }

    #[tokio::test]
    async fn test_record_then_history_roundtrip() {
        let ledger = ledger().await;
        let user = UserId::new(1);
        let data = scoring_data(82);

        ledger
            .record_decision(user, data.clone(), "vip sender", 0.7, Some("msg-42".to_string()))
            .await
            .unwrap();

        let rows = ledger
            .get_decision_history(user, Some("msg-42"), None, 30)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].decision_data, data);
        assert_eq!(rows[0].reasoning, "vip sender");
    }

    #[tokio::test]
    async fn test_approval_sets_terminal_state() {
        let ledger = ledger().await;
        let user = UserId::new(1);
        let id = ledger
            .record_decision(user, scoring_data(70), "r", 0.7, None)
            .await
            .unwrap();

        let decision = ledger
            .user_review_decision(id, user, true, None, None)
            .await
            .unwrap();

        assert_eq!(decision.status, DecisionStatus::UserApproved);
        assert!(decision.reviewed_at.is_some());
        assert!(decision.correction.is_none());
    }

    #[tokio::test]
    async fn test_approval_rejects_stray_correction() {
        let ledger = ledger().await;
        let user = UserId::new(1);
        let id = ledger
            .record_decision(user, scoring_data(70), "r", 0.7, None)
            .await
            .unwrap();

        let result = ledger
            .user_review_decision(id, user, true, Some(scoring_data(10)), None)
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_rejection_requires_correction() {
        let ledger = ledger().await;
        let user = UserId::new(1);
        let id = ledger
            .record_decision(user, scoring_data(70), "r", 0.7, None)
            .await
            .unwrap();

        let result = ledger.user_review_decision(id, user, false, None, None).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_rejection_requires_matching_payload_kind() {
        let ledger = ledger().await;
        let user = UserId::new(1);
        let id = ledger
            .record_decision(user, scoring_data(70), "r", 0.7, None)
            .await
            .unwrap();

        let result = ledger
            .user_review_decision(
                id,
                user,
                false,
                Some(DecisionData::AutoArchive { archive: false }),
                None,
            )
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_correction_stored_with_reasoning() {
        let ledger = ledger().await;
        let user = UserId::new(1);
        let id = ledger
            .record_decision(user, scoring_data(70), "r", 0.7, None)
            .await
            .unwrap();

        let decision = ledger
            .user_review_decision(
                id,
                user,
                false,
                Some(scoring_data(15)),
                Some("automated report, not important".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(decision.status, DecisionStatus::UserCorrected);
        assert_eq!(decision.correction, Some(scoring_data(15)));
        assert_eq!(
            decision.correction_reasoning.as_deref(),
            Some("automated report, not important")
        );
    }

    #[tokio::test]
    async fn test_second_review_fails() {
        let ledger = ledger().await;
        let user = UserId::new(1);
        let id = ledger
            .record_decision(user, scoring_data(70), "r", 0.7, None)
            .await
            .unwrap();

        ledger
            .user_review_decision(id, user, true, None, None)
            .await
            .unwrap();
        let result = ledger.user_review_decision(id, user, true, None, None).await;
        assert!(matches!(result, Err(Error::AlreadyReviewed(_))));
    }

    #[tokio::test]
    async fn test_concurrent_reviews_have_one_winner() {
        let ledger = ledger().await;
        let user = UserId::new(1);
        let id = ledger
            .record_decision(user, scoring_data(70), "r", 0.7, None)
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            ledger.user_review_decision(id, user, true, None, None),
            ledger.user_review_decision(
                id,
                user,
                false,
                Some(scoring_data(5)),
                Some("spam".to_string())
            ),
        );

        let outcomes = [a.is_ok(), b.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    }

    #[tokio::test]
    async fn test_review_not_found_for_other_users() {
        let ledger = ledger().await;
        let id = ledger
            .record_decision(UserId::new(1), scoring_data(70), "r", 0.7, None)
            .await
            .unwrap();

        let result = ledger
            .user_review_decision(id, UserId::new(2), true, None, None)
            .await;
        assert!(matches!(result, Err(Error::DecisionNotFound(_))));

        let result = ledger
            .user_review_decision(9999, UserId::new(2), true, None, None)
            .await;
        assert!(matches!(result, Err(Error::DecisionNotFound(_))));
    }

    #[tokio::test]
    async fn test_pending_reviews_exclude_terminal() {
        let ledger = ledger().await;
        let user = UserId::new(1);

        let reviewed_id = ledger
            .record_decision(user, scoring_data(70), "r", 0.7, None)
            .await
            .unwrap();
        ledger
            .record_decision(user, scoring_data(70), "r", 0.5, None)
            .await
            .unwrap();
        ledger
            .record_decision(user, scoring_data(70), "r", 0.95, None)
            .await
            .unwrap();
        ledger
            .user_review_decision(reviewed_id, user, true, None, None)
            .await
            .unwrap();

        let pending = ledger.get_pending_reviews(user, 10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|d| !d.status.is_terminal()));
    }
}
