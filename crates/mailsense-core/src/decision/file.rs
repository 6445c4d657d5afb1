//! JSON-file-backed decision store.
//!
//! Keeps the full journal in memory behind a mutex and rewrites the file on
//! every mutation (temp file + rename, so a failed write never leaves a
//! partial row behind). Suited to single-process deployments without a
//! database; query behavior matches the `SQLite` store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::model::{Decision, DecisionStatus, DecisionType, NewDecision, ReviewOutcome};
use super::store::DecisionStore;
use crate::Result;
use crate::signal::UserId;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Journal {
    next_id: i64,
    decisions: Vec<Decision>,
}

/// Decision store persisting to a single JSON document.
pub struct FileDecisionStore {
    path: PathBuf,
    journal: Mutex<Journal>,
}

impl FileDecisionStore {
    /// Open (or create) the journal at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let journal = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Journal::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            journal: Mutex::new(journal),
        })
    }

    async fn persist(&self, journal: &Journal) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(journal)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl DecisionStore for FileDecisionStore {
    async fn insert(&self, decision: &NewDecision) -> Result<i64> {
        let mut journal = self.journal.lock().await;

        let id = journal.next_id + 1;
        journal.decisions.push(Decision {
            id,
            user_id: decision.user_id,
            message_id: decision.message_id.clone(),
            decision_type: decision.decision_data.kind(),
            decision_data: decision.decision_data.clone(),
            reasoning: decision.reasoning.clone(),
            confidence: decision.confidence,
            status: decision.status,
            created_at: decision.created_at,
            reviewed_at: None,
            correction: None,
            correction_reasoning: None,
        });
        journal.next_id = id;

        if let Err(e) = self.persist(&journal).await {
            // Roll back so no partial row survives a failed write
            journal.decisions.pop();
            journal.next_id = id - 1;
            return Err(e);
        }

        Ok(id)
    }

    async fn fetch_owned(&self, decision_id: i64, user_id: UserId) -> Result<Option<Decision>> {
        let journal = self.journal.lock().await;
        Ok(journal
            .decisions
            .iter()
            .find(|d| d.id == decision_id && d.user_id == user_id)
            .cloned())
    }

    async fn complete_review(
        &self,
        decision_id: i64,
        user_id: UserId,
        outcome: &ReviewOutcome,
    ) -> Result<bool> {
        let mut journal = self.journal.lock().await;

        let Some(index) = journal
            .decisions
            .iter()
            .position(|d| d.id == decision_id && d.user_id == user_id && !d.status.is_terminal())
        else {
            return Ok(false);
        };

        let previous = journal.decisions[index].clone();
        {
            let decision = &mut journal.decisions[index];
            decision.status = outcome.status;
            decision.reviewed_at = Some(outcome.reviewed_at);
            decision.correction = outcome.correction.clone();
            decision
                .correction_reasoning
                .clone_from(&outcome.correction_reasoning);
        }

        if let Err(e) = self.persist(&journal).await {
            journal.decisions[index] = previous;
            return Err(e);
        }

        Ok(true)
    }

    async fn pending(
        &self,
        user_id: UserId,
        handled_cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Decision>> {
        let journal = self.journal.lock().await;

        let mut rows: Vec<Decision> = journal
            .decisions
            .iter()
            .filter(|d| {
                d.user_id == user_id
                    && match d.status {
                        DecisionStatus::Suggested | DecisionStatus::YourCall => true,
                        DecisionStatus::Handled => d.created_at >= handled_cutoff,
                        DecisionStatus::UserApproved | DecisionStatus::UserCorrected => false,
                    }
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn history(
        &self,
        user_id: UserId,
        message_id: Option<&str>,
        decision_type: Option<DecisionType>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Decision>> {
        let journal = self.journal.lock().await;

        let mut rows: Vec<Decision> = journal
            .decisions
            .iter()
            .filter(|d| {
                d.user_id == user_id
                    && d.created_at >= since
                    && message_id.is_none_or(|m| d.message_id.as_deref() == Some(m))
                    && decision_type.is_none_or(|t| d.decision_type == t)
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn reviewed(
        &self,
        user_id: UserId,
        decision_type: Option<DecisionType>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Decision>> {
        let journal = self.journal.lock().await;

        let mut rows: Vec<Decision> = journal
            .decisions
            .iter()
            .filter(|d| {
                d.user_id == user_id
                    && d.created_at >= since
                    && d.reviewed_at.is_some()
                    && decision_type.is_none_or(|t| d.decision_type == t)
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn corrected(&self, user_id: UserId, limit: u32) -> Result<Vec<Decision>> {
        let journal = self.journal.lock().await;

        let mut rows: Vec<Decision> = journal
            .decisions
            .iter()
            .filter(|d| d.user_id == user_id && d.status == DecisionStatus::UserCorrected)
            .cloned()
            .collect();

        rows.sort_by(|a, b| b.reviewed_at.cmp(&a.reviewed_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}
