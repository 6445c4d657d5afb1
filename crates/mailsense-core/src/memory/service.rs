//! Memory service - catalog, edits, deletion, and the learning hook.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};

use super::miner;
use super::model::{
    CorrectionPattern, MemoryCatalog, MemoryRef, MemoryUpdate, SenderMemory, TimelineEvent,
};
use super::repository::PatternRepository;
use crate::Result;
use crate::config::MemoryConfig;
use crate::decision::{Decision, DecisionStore};
use crate::signal::{SignalRepository, UserId};

/// Manages the engine's learned memories for inspection and control.
pub struct MemoryService<S> {
    store: Arc<S>,
    signals: SignalRepository,
    patterns: PatternRepository,
    config: MemoryConfig,
}

impl<S: DecisionStore> MemoryService<S> {
    /// Creates a memory service over the given stores.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        signals: SignalRepository,
        patterns: PatternRepository,
        config: MemoryConfig,
    ) -> Self {
        Self {
            store,
            signals,
            patterns,
            config,
        }
    }

    /// Everything the engine has learned for this user.
    ///
    /// # Errors
    ///
    /// Returns an error if a store query fails.
    pub async fn get_all_memories(&self, user_id: UserId) -> Result<MemoryCatalog> {
        let weighted = self
            .signals
            .weighted_senders(user_id, self.config.sender_memory_limit)
            .await?;

        let sender_memories = weighted
            .into_iter()
            .map(|sender| {
                let confidence = (f64::from(sender.interaction_count)
                    / f64::from(self.config.full_confidence_interactions))
                .min(1.0);
                let reasoning =
                    explain_sender_weight(sender.importance_weight, sender.interaction_count);
                SenderMemory {
                    id: format!("sender_{}", sender.id),
                    sender_email: sender.sender_email,
                    importance_weight: sender.importance_weight,
                    confidence,
                    interaction_count: sender.interaction_count,
                    last_interaction: sender.last_interaction,
                    reasoning,
                }
            })
            .collect();

        let corrections = self
            .store
            .corrected(user_id, self.config.correction_scan_limit)
            .await?;
        let overrides = self.patterns.overrides(user_id).await?;
        let correction_memories = miner::build_memories(&corrections, &overrides, &self.config);

        Ok(MemoryCatalog {
            sender_memories,
            correction_memories,
        })
    }

    /// Learning hook invoked after a correction lands.
    ///
    /// Registers the correction's pattern so it can surface as a memory.
    /// Feeding the adjustment back into stored sender weights is an
    /// explicit extension point; today the correction is recorded and
    /// logged, and the user reshapes weights through memory edits.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern write fails.
    pub async fn observe_correction(&self, decision: &Decision) -> Result<()> {
        let reasoning = decision.correction_reasoning.as_deref().unwrap_or_default();
        let pattern = CorrectionPattern::from_reasoning(reasoning);

        self.patterns.record(decision.user_id, pattern).await?;

        info!(
            "Learning from correction on decision {} (pattern {})",
            decision.id,
            pattern.as_str()
        );
        debug!(
            "Correction on {}: {:?} -> {:?}",
            decision.decision_type.as_str(),
            decision.decision_data,
            decision.correction
        );

        Ok(())
    }

    /// Apply a user's edit to a memory.
    ///
    /// Returns false when the memory does not exist or the update carries
    /// no applicable field.
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
        match MemoryRef::parse(memory_id) {
            Some(MemoryRef::Sender(stats_id)) => match updates.importance_weight {
                Some(weight) => {
                    let changed = self
                        .signals
                        .set_importance_weight(user_id, stats_id, weight)
                        .await?;
                    if changed {
                        info!("Updated sender memory {memory_id} to weight {weight:.2}");
                    }
                    Ok(changed)
                }
                None => Ok(false),
            },
            Some(MemoryRef::Correction(pattern)) => match updates.weight {
                Some(weight) => {
                    let changed = self.patterns.set_weight(user_id, pattern, weight).await?;
                    if changed {
                        info!("Updated correction memory {memory_id} to weight {weight:.2}");
                    }
                    Ok(changed)
                }
                None => Ok(false),
            },
            None => Ok(false),
        }
    }

    /// Delete a memory, resetting its influence to neutral.
    ///
    /// Sender memories lose their learned weight, so future scoring falls
    /// back to the plain relationship classification. Correction memories
    /// are muted: past corrections stop counting and only new ones can
    /// re-learn the pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if a store write fails.
    pub async fn delete_memory(&self, user_id: UserId, memory_id: &str) -> Result<bool> {
        let deleted = match MemoryRef::parse(memory_id) {
            Some(MemoryRef::Sender(stats_id)) => {
                self.signals
                    .clear_importance_weight(user_id, stats_id)
                    .await?
            }
            Some(MemoryRef::Correction(pattern)) => {
                self.patterns.mute(user_id, pattern).await?
            }
            None => false,
        };

        if deleted {
            info!("Deleted memory {memory_id}");
        }
        Ok(deleted)
    }

    /// Chronological timeline of significant corrections in the window.
    ///
    /// # Errors
    ///
    /// Returns an error if a store query fails.
    pub async fn memory_timeline(
        &self,
        user_id: UserId,
        days: u32,
    ) -> Result<Vec<TimelineEvent>> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let corrections = self
            .store
            .corrected(user_id, self.config.correction_scan_limit)
            .await?;
        let recent: Vec<Decision> = corrections
            .into_iter()
            .filter(|d| d.reviewed_at.is_some_and(|at| at >= cutoff))
            .collect();

        Ok(miner::timeline(&recent, &self.config))
    }
}

fn explain_sender_weight(weight: f64, count: u32) -> String {
    if weight >= 0.8 {
        format!(
            "You frequently interact with this sender ({count} times). Often open, reply, or star their emails."
        )
    } else if weight >= 0.5 {
        format!("Moderate interaction ({count} times). Mix of opened and archived emails.")
    } else if weight >= 0.2 {
        format!("Low interaction ({count} times). Usually archived without opening.")
    } else {
        format!("Very low interaction ({count} times). Consistently ignored or spam.")
    }
}
