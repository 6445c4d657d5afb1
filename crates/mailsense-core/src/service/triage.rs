//! Triage service - the engine's public operation surface.
//!
//! Wires the scorer, signal reads, the decision ledger, and the memory
//! service together, including the review-to-learning hook: a correction
//! landing through [`TriageService::user_review_decision`] feeds the
//! correction-pattern miner.

use std::sync::Arc;

use tracing::warn;

use mailsense_reason::Completer;

use crate::config::EngineConfig;
use crate::decision::{Decision, DecisionData, DecisionLedger, DecisionStatus, DecisionStore, DecisionType};
use crate::escalate::{Escalator, ScoredMessage};
use crate::memory::{MemoryCatalog, MemoryService, MemoryUpdate, PatternRepository, TimelineEvent};
use crate::metrics::{AccuracyMetrics, ReviewQueue};
use crate::scoring::{CompositeScorer, ScoringResult};
use crate::signal::{PlatformSignals, SenderHistory, SignalRepository, TrustLevel, UserContext, UserId};
use crate::Result;

/// The engine's exposed operations over one decision store.
pub struct TriageService<S> {
    scorer: CompositeScorer,
    signals: SignalRepository,
    ledger: DecisionLedger<S>,
    memory: MemoryService<S>,
}

impl<S: DecisionStore> TriageService<S> {
    /// Creates a service over the given store and signal repository.
    ///
    /// # Errors
    ///
    /// Returns an error if supporting schema creation fails.
    pub async fn new(store: S, signals: SignalRepository, config: EngineConfig) -> Result<Self> {
        let store = Arc::new(store);
        let patterns = PatternRepository::from_pool(signals.pool().clone()).await?;

        Ok(Self {
            scorer: CompositeScorer::new(config.scoring),
            ledger: DecisionLedger::new(Arc::clone(&store), config.lifecycle),
            memory: MemoryService::new(store, signals.clone(), patterns, config.memory),
            signals,
        })
    }

    /// The signal repository, for ingestion by collaborators.
    #[must_use]
    pub const fn signals(&self) -> &SignalRepository {
        &self.signals
    }

    /// The composite scorer.
    #[must_use]
    pub const fn scorer(&self) -> &CompositeScorer {
        &self.scorer
    }

    /// Score a message from already-fetched signals. Pure and synchronous.
    #[must_use]
    pub fn score(
        &self,
        history: &SenderHistory,
        user_context: &UserContext,
        trust: TrustLevel,
        platform: &PlatformSignals,
        subject: &str,
        snippet: &str,
    ) -> ScoringResult {
        self.scorer
            .score(history, user_context, trust, platform, subject, snippet)
    }

    /// Score a message, looking the sender's signals up first.
    ///
    /// Signal reads happen before scoring; no lock spans a lookup and a
    /// write, so a slow read only delays this one call.
    ///
    /// # Errors
    ///
    /// Returns an error if a signal lookup fails.
    pub async fn score_message(
        &self,
        user_id: UserId,
        sender_email: &str,
        subject: &str,
        snippet: &str,
        platform: &PlatformSignals,
    ) -> Result<ScoringResult> {
        let history = self.signals.sender_history(user_id, sender_email).await?;
        let trust = self.signals.trust(user_id, sender_email).await?;
        let user_context = self.signals.user_context(user_id).await?;

        Ok(self
            .scorer
            .score(&history, &user_context, trust, platform, subject, snippet))
    }

    /// Record one decision; see [`DecisionLedger::record_decision`].
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
        self.ledger
            .record_decision(user_id, decision_data, reasoning, confidence, message_id)
            .await
    }

    /// Decisions awaiting the user; see
    /// [`DecisionLedger::get_pending_reviews`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn get_pending_reviews(&self, user_id: UserId, limit: u32) -> Result<Vec<Decision>> {
        self.ledger.get_pending_reviews(user_id, limit).await
    }

    /// Apply a user's review, feeding corrections to the learning hook.
    ///
    /// A failure to register the correction pattern is logged but does not
    /// undo the already-persisted review.
    ///
    /// # Errors
    ///
    /// See [`DecisionLedger::user_review_decision`].
    pub async fn user_review_decision(
        &self,
        decision_id: i64,
        user_id: UserId,
        approved: bool,
        correction: Option<DecisionData>,
        correction_reasoning: Option<String>,
    ) -> Result<Decision> {
        let decision = self
            .ledger
            .user_review_decision(decision_id, user_id, approved, correction, correction_reasoning)
            .await?;

        if decision.status == DecisionStatus::UserCorrected
            && let Err(e) = self.memory.observe_correction(&decision).await
        {
            warn!("Failed to register correction pattern for decision {decision_id}: {e}");
        }

        Ok(decision)
    }

    /// Decision history for audit; see
    /// [`DecisionLedger::get_decision_history`].
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
        self.ledger
            .get_decision_history(user_id, message_id, decision_type, days)
            .await
    }

    /// Recent decisions grouped by review state, for dashboards.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn review_queue(&self, user_id: UserId, days: u32) -> Result<ReviewQueue> {
        let decisions = self
            .ledger
            .get_decision_history(user_id, None, None, days)
            .await?;
        Ok(ReviewQueue::from_decisions(decisions))
    }

    /// Accuracy statistics; see [`DecisionLedger::get_accuracy_metrics`].
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
        self.ledger
            .get_accuracy_metrics(user_id, decision_type, days)
            .await
    }

    /// Everything the engine has learned; see
    /// [`MemoryService::get_all_memories`].
    ///
    /// # Errors
    ///
    /// Returns an error if a store query fails.
    pub async fn get_all_memories(&self, user_id: UserId) -> Result<MemoryCatalog> {
        self.memory.get_all_memories(user_id).await
    }

    /// Edit a memory; see [`MemoryService::update_memory`].
    ///
    /// # Errors
    ///
    /// Returns an error if a store write fails.
    pub async fn update_memory(
        &self,
        user_id: UserId,
        memory_id: &str,
        updates: MemoryUpdate,
    ) -> Result<bool> {
        self.memory.update_memory(user_id, memory_id, updates).await
    }

    /// Delete a memory; see [`MemoryService::delete_memory`].
    ///
    /// # Errors
    ///
    /// Returns an error if a store write fails.
    pub async fn delete_memory(&self, user_id: UserId, memory_id: &str) -> Result<bool> {
        self.memory.delete_memory(user_id, memory_id).await
    }

    /// Timeline of significant corrections; see
    /// [`MemoryService::memory_timeline`].
    ///
    /// # Errors
    ///
    /// Returns an error if a store query fails.
    pub async fn memory_timeline(
        &self,
        user_id: UserId,
        days: u32,
    ) -> Result<Vec<TimelineEvent>> {
        self.memory.memory_timeline(user_id, days).await
    }

    /// Send a batch of uncertain scores through the deep-escalation path.
    ///
    /// # Errors
    ///
    /// Returns an error if the user-context lookup fails; escalation
    /// failures themselves fall back to the composite scores.
    pub async fn deep_rescore<C: Completer>(
        &self,
        escalator: &Escalator<C>,
        user_id: UserId,
        messages: Vec<ScoredMessage>,
    ) -> Result<Vec<ScoredMessage>> {
        let user_context = self.signals.user_context(user_id).await?;
        Ok(escalator.deep_rescore(&user_context, messages).await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::decision::SqliteDecisionStore;
    use crate::memory::CorrectionPattern;
    use crate::scoring::{RelationshipType, SuggestedAction};
    use crate::signal::{InteractionKind, MailCategory};

    async fn service() -> TriageService<SqliteDecisionStore> {
        let store = SqliteDecisionStore::in_memory().await.unwrap();
        let signals = SignalRepository::in_memory().await.unwrap();
        TriageService::new(store, signals, EngineConfig::default())
            .await
            .unwrap()
    }

    fn scoring_data(score: u8, sender: &str) -> DecisionData {
        DecisionData::ImportanceScoring {
            importance_score: score,
            sender_email: Some(sender.to_string()),
            suggested_action: None,
        }
    }

    #[tokio::test]
    async fn test_score_message_uses_stored_signals() {
        let service = service().await;
        let user = UserId::new(1);

        for _ in 0..10 {
            service
                .signals()
                .record_message(user, "boss@corp.com")
                .await
                .unwrap();
        }
        for _ in 0..6 {
            service
                .signals()
                .record_interaction(user, "boss@corp.com", InteractionKind::Responded)
                .await
                .unwrap();
        }
        for _ in 0..4 {
            service
                .signals()
                .record_interaction(user, "boss@corp.com", InteractionKind::Archived)
                .await
                .unwrap();
        }

        let platform = PlatformSignals {
            is_starred: true,
            is_flagged_important: true,
            category: MailCategory::Primary,
            has_unsubscribe_link: false,
        };
        let result = service
            .score_message(user, "boss@corp.com", "Quick question", "", &platform)
            .await
            .unwrap();

        assert_eq!(result.relationship, RelationshipType::Vip);
        assert!(result.importance_score >= 75);
        assert_eq!(result.suggested_action, SuggestedAction::ReplyNow);
    }

    #[tokio::test]
    async fn test_blocked_sender_dominates_through_the_service() {
        let service = service().await;
        let user = UserId::new(1);

        for _ in 0..10 {
            service
                .signals()
                .record_message(user, "pest@corp.com")
                .await
                .unwrap();
        }
        for _ in 0..6 {
            service
                .signals()
                .record_interaction(user, "pest@corp.com", InteractionKind::Responded)
                .await
                .unwrap();
        }
        service
            .signals()
            .set_trust(user, "pest@corp.com", TrustLevel::Blocked)
            .await
            .unwrap();

        let result = service
            .score_message(
                user,
                "pest@corp.com",
                "urgent!",
                "",
                &PlatformSignals::default(),
            )
            .await
            .unwrap();

        assert!(result.importance_score <= 25);
        assert_ne!(result.suggested_action, SuggestedAction::ReplyNow);
    }

    #[tokio::test]
    async fn test_correction_review_feeds_pattern_memories() {
        let service = service().await;
        let user = UserId::new(1);

        for n in 0..2 {
            let id = service
                .record_decision(
                    user,
                    scoring_data(70, "reports@corp.com"),
                    "scored by history",
                    0.7,
                    Some(format!("msg-{n}")),
                )
                .await
                .unwrap();
            service
                .user_review_decision(
                    id,
                    user,
                    false,
                    Some(scoring_data(20, "reports@corp.com")),
                    Some("automated report".to_string()),
                )
                .await
                .unwrap();
        }

        let catalog = service.get_all_memories(user).await.unwrap();
        assert_eq!(catalog.correction_memories.len(), 1);
        let memory = &catalog.correction_memories[0];
        assert_eq!(memory.pattern, CorrectionPattern::AutomatedReports);
        assert_eq!(memory.correction_count, 2);
        assert!((memory.average_adjustment - -50.0).abs() < 1e-9);

        // Deleting the memory resets its influence
        assert!(service.delete_memory(user, &memory.id).await.unwrap());
        let catalog = service.get_all_memories(user).await.unwrap();
        assert!(catalog.correction_memories.is_empty());
    }

    #[tokio::test]
    async fn test_accuracy_metrics_through_the_service() {
        let service = service().await;
        let user = UserId::new(1);

        for n in 0..4 {
            let id = service
                .record_decision(user, scoring_data(70, "a@b.com"), "r", 0.7, None)
                .await
                .unwrap();
            let approved = n < 3;
            let correction = if approved {
                None
            } else {
                Some(scoring_data(30, "a@b.com"))
            };
            service
                .user_review_decision(id, user, approved, correction, Some("spam".to_string()))
                .await
                .ok();
        }

        let metrics = service.get_accuracy_metrics(user, None, 30).await.unwrap();
        assert_eq!(metrics.total, 4);
        assert_eq!(metrics.approved, 3);
        assert_eq!(metrics.corrected, 1);
        assert!((metrics.approval_rate - 0.75).abs() < 1e-9);

        let empty = service
            .get_accuracy_metrics(UserId::new(99), None, 30)
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_review_queue_groups_recent_decisions() {
        let service = service().await;
        let user = UserId::new(1);

        service
            .record_decision(user, scoring_data(70, "a@b.com"), "r", 0.95, None)
            .await
            .unwrap();
        service
            .record_decision(user, scoring_data(70, "a@b.com"), "r", 0.7, None)
            .await
            .unwrap();
        service
            .record_decision(user, scoring_data(70, "a@b.com"), "r", 0.4, None)
            .await
            .unwrap();

        let queue = service.review_queue(user, 7).await.unwrap();
        let summary = queue.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.needs_attention, 2);
        assert_eq!(summary.handled_automatically, 1);
        assert_eq!(summary.approval_rate, None);
    }

    #[tokio::test]
    async fn test_users_cannot_see_each_others_decisions() {
        let service = service().await;

        let id = service
            .record_decision(UserId::new(1), scoring_data(70, "a@b.com"), "r", 0.7, None)
            .await
            .unwrap();

        let other_history = service
            .get_decision_history(UserId::new(2), None, None, 30)
            .await
            .unwrap();
        assert!(other_history.is_empty());

        let result = service
            .user_review_decision(id, UserId::new(2), true, None, None)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_approval_reviews_do_not_create_patterns() {
        let service = service().await;
        let user = UserId::new(1);

        let id = service
            .record_decision(user, scoring_data(70, "a@b.com"), "r", 0.7, None)
            .await
            .unwrap();
        service
            .user_review_decision(id, user, true, None, None)
            .await
            .unwrap();

        let catalog = service.get_all_memories(user).await.unwrap();
        assert!(catalog.is_empty());
    }
}
