//! `SQLite`-backed decision store.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use super::model::{Decision, DecisionType, NewDecision, ReviewOutcome};
use super::store::DecisionStore;
use crate::Result;
use crate::signal::UserId;

/// Decision store persisting to a `SQLite` database.
#[derive(Clone)]
pub struct SqliteDecisionStore {
    pool: SqlitePool,
}

impl SqliteDecisionStore {
    /// Create a new store with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation
    /// fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation
    /// fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS decisions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                message_id TEXT,
                decision_type TEXT NOT NULL,
                decision_data TEXT NOT NULL,
                reasoning TEXT NOT NULL,
                confidence REAL NOT NULL,
                status TEXT NOT NULL DEFAULT 'suggested',
                created_at TEXT NOT NULL,
                reviewed_at TEXT,
                correction TEXT,
                correction_reasoning TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_decisions_user_created
            ON decisions(user_id, created_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_decisions_user_status
            ON decisions(user_id, status)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl DecisionStore for SqliteDecisionStore {
    async fn insert(&self, decision: &NewDecision) -> Result<i64> {
        let data_json = serde_json::to_string(&decision.decision_data)?;

        let result = sqlx::query(
            r"
            INSERT INTO decisions
                (user_id, message_id, decision_type, decision_data,
                 reasoning, confidence, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(decision.user_id.0)
        .bind(decision.message_id.as_deref())
        .bind(decision.decision_data.kind().as_str())
        .bind(&data_json)
        .bind(&decision.reasoning)
        .bind(decision.confidence)
        .bind(decision.status.as_str())
        .bind(decision.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn fetch_owned(&self, decision_id: i64, user_id: UserId) -> Result<Option<Decision>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, message_id, decision_data, reasoning, confidence,
                   status, created_at, reviewed_at, correction, correction_reasoning
            FROM decisions
            WHERE id = ? AND user_id = ?
            ",
        )
        .bind(decision_id)
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_decision(&r)).transpose()
    }

    async fn complete_review(
        &self,
        decision_id: i64,
        user_id: UserId,
        outcome: &ReviewOutcome,
    ) -> Result<bool> {
        let correction_json = outcome
            .correction
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        // Conditional on a non-terminal status so that concurrent reviews
        // serialize to exactly one winner.
        let updated = sqlx::query(
            r"
            UPDATE decisions
            SET status = ?,
                reviewed_at = ?,
                correction = ?,
                correction_reasoning = ?
            WHERE id = ? AND user_id = ?
              AND status IN ('suggested', 'handled', 'your_call')
            ",
        )
        .bind(outcome.status.as_str())
        .bind(outcome.reviewed_at)
        .bind(correction_json.as_deref())
        .bind(outcome.correction_reasoning.as_deref())
        .bind(decision_id)
        .bind(user_id.0)
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() > 0)
    }

    async fn pending(
        &self,
        user_id: UserId,
        handled_cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Decision>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, message_id, decision_data, reasoning, confidence,
                   status, created_at, reviewed_at, correction, correction_reasoning
            FROM decisions
            WHERE user_id = ?
              AND (status IN ('suggested', 'your_call')
                   OR (status = 'handled' AND created_at >= ?))
            ORDER BY created_at DESC
            LIMIT ?
            ",
        )
        .bind(user_id.0)
        .bind(handled_cutoff)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_decision).collect()
    }

    async fn history(
        &self,
        user_id: UserId,
        message_id: Option<&str>,
        decision_type: Option<DecisionType>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Decision>> {
        let kind = decision_type.as_ref().map(DecisionType::as_str);

        let rows = sqlx::query(
            r"
            SELECT id, user_id, message_id, decision_data, reasoning, confidence,
                   status, created_at, reviewed_at, correction, correction_reasoning
            FROM decisions
            WHERE user_id = ? AND created_at >= ?
              AND (? IS NULL OR message_id = ?)
              AND (? IS NULL OR decision_type = ?)
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id.0)
        .bind(since)
        .bind(message_id)
        .bind(message_id)
        .bind(kind)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_decision).collect()
    }

    async fn reviewed(
        &self,
        user_id: UserId,
        decision_type: Option<DecisionType>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Decision>> {
        let kind = decision_type.as_ref().map(DecisionType::as_str);

        let rows = sqlx::query(
            r"
            SELECT id, user_id, message_id, decision_data, reasoning, confidence,
                   status, created_at, reviewed_at, correction, correction_reasoning
            FROM decisions
            WHERE user_id = ? AND created_at >= ? AND reviewed_at IS NOT NULL
              AND (? IS NULL OR decision_type = ?)
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id.0)
        .bind(since)
        .bind(kind)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_decision).collect()
    }

    async fn corrected(&self, user_id: UserId, limit: u32) -> Result<Vec<Decision>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, message_id, decision_data, reasoning, confidence,
                   status, created_at, reviewed_at, correction, correction_reasoning
            FROM decisions
            WHERE user_id = ? AND status = 'user_corrected'
            ORDER BY reviewed_at DESC
            LIMIT ?
            ",
        )
        .bind(user_id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_decision).collect()
    }
}

/// Convert a database row to a `Decision`.
fn row_to_decision(row: &SqliteRow) -> Result<Decision> {
    let decision_data: super::model::DecisionData =
        serde_json::from_str(row.get::<&str, _>("decision_data"))?;
    let correction = row
        .get::<Option<String>, _>("correction")
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;

    Ok(Decision {
        id: row.get("id"),
        user_id: UserId::new(row.get("user_id")),
        message_id: row.get("message_id"),
        decision_type: decision_data.kind(),
        decision_data,
        reasoning: row.get("reasoning"),
        confidence: row.get("confidence"),
        status: super::model::DecisionStatus::parse(row.get("status")),
        created_at: row.get("created_at"),
        reviewed_at: row.get("reviewed_at"),
        correction,
        correction_reasoning: row.get("correction_reasoning"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::decision::model::{DecisionData, DecisionStatus};
    use chrono::Duration;

    fn new_decision(user: i64, status: DecisionStatus) -> NewDecision {
        NewDecision {
            user_id: UserId::new(user),
            message_id: Some("msg-1".to_string()),
            decision_data: DecisionData::ImportanceScoring {
                importance_score: 70,
                sender_email: Some("boss@corp.com".to_string()),
                suggested_action: None,
            },
            reasoning: "test".to_string(),
            confidence: 0.7,
            status,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_roundtrip() {
        let store = SqliteDecisionStore::in_memory().await.unwrap();
        let input = new_decision(1, DecisionStatus::Suggested);

        let id = store.insert(&input).await.unwrap();
        let fetched = store.fetch_owned(id, UserId::new(1)).await.unwrap().unwrap();

        assert_eq!(fetched.id, id);
        assert_eq!(fetched.decision_data, input.decision_data);
        assert_eq!(fetched.decision_type, DecisionType::ImportanceScoring);
        assert_eq!(fetched.status, DecisionStatus::Suggested);
        assert!(fetched.reviewed_at.is_none());
    }

    #[tokio::test]
    async fn test_fetch_is_scoped_to_owner() {
        let store = SqliteDecisionStore::in_memory().await.unwrap();
        let id = store
            .insert(&new_decision(1, DecisionStatus::Suggested))
            .await
            .unwrap();

        assert!(store.fetch_owned(id, UserId::new(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_review_is_conditional_on_non_terminal_status() {
        let store = SqliteDecisionStore::in_memory().await.unwrap();
        let user = UserId::new(1);
        let id = store
            .insert(&new_decision(1, DecisionStatus::Suggested))
            .await
            .unwrap();

        let outcome = ReviewOutcome {
            status: DecisionStatus::UserApproved,
            reviewed_at: Utc::now(),
            correction: None,
            correction_reasoning: None,
        };

        assert!(store.complete_review(id, user, &outcome).await.unwrap());
        assert!(!store.complete_review(id, user, &outcome).await.unwrap());

        let decision = store.fetch_owned(id, user).await.unwrap().unwrap();
        assert_eq!(decision.status, DecisionStatus::UserApproved);
        assert!(decision.reviewed_at.is_some());
    }

    #[tokio::test]
    async fn test_pending_includes_recent_handled_only() {
        let store = SqliteDecisionStore::in_memory().await.unwrap();
        let user = UserId::new(1);
        let now = Utc::now();

        let mut old_handled = new_decision(1, DecisionStatus::Handled);
        old_handled.created_at = now - Duration::hours(48);
        store.insert(&old_handled).await.unwrap();

        store
            .insert(&new_decision(1, DecisionStatus::Handled))
            .await
            .unwrap();
        store
            .insert(&new_decision(1, DecisionStatus::Suggested))
            .await
            .unwrap();
        store
            .insert(&new_decision(1, DecisionStatus::YourCall))
            .await
            .unwrap();

        let cutoff = now - Duration::hours(24);
        let pending = store.pending(user, cutoff, 50).await.unwrap();

        assert_eq!(pending.len(), 3);
        assert!(
            pending
                .iter()
                .all(|d| d.status != DecisionStatus::Handled || d.created_at >= cutoff)
        );
    }

    #[tokio::test]
    async fn test_history_filters() {
        let store = SqliteDecisionStore::in_memory().await.unwrap();
        let user = UserId::new(1);
        let since = Utc::now() - Duration::days(30);

        store
            .insert(&new_decision(1, DecisionStatus::Suggested))
            .await
            .unwrap();

        let mut other_message = new_decision(1, DecisionStatus::Suggested);
        other_message.message_id = Some("msg-2".to_string());
        other_message.decision_data = DecisionData::AutoArchive { archive: true };
        store.insert(&other_message).await.unwrap();

        let all = store.history(user, None, None, since).await.unwrap();
        assert_eq!(all.len(), 2);

        let by_message = store
            .history(user, Some("msg-1"), None, since)
            .await
            .unwrap();
        assert_eq!(by_message.len(), 1);

        let by_kind = store
            .history(user, None, Some(DecisionType::AutoArchive), since)
            .await
            .unwrap();
        assert_eq!(by_kind.len(), 1);
        assert_eq!(by_kind[0].message_id.as_deref(), Some("msg-2"));
    }

    #[tokio::test]
    async fn test_reviewed_and_corrected_queries() {
        let store = SqliteDecisionStore::in_memory().await.unwrap();
        let user = UserId::new(1);
        let since = Utc::now() - Duration::days(30);

        let approved_id = store
            .insert(&new_decision(1, DecisionStatus::Suggested))
            .await
            .unwrap();
        let corrected_id = store
            .insert(&new_decision(1, DecisionStatus::Suggested))
            .await
            .unwrap();
        store
            .insert(&new_decision(1, DecisionStatus::Suggested))
            .await
            .unwrap();

        store
            .complete_review(
                approved_id,
                user,
                &ReviewOutcome {
                    status: DecisionStatus::UserApproved,
                    reviewed_at: Utc::now(),
                    correction: None,
                    correction_reasoning: None,
                },
            )
            .await
            .unwrap();
        store
            .complete_review(
                corrected_id,
                user,
                &ReviewOutcome {
                    status: DecisionStatus::UserCorrected,
                    reviewed_at: Utc::now(),
                    correction: Some(DecisionData::ImportanceScoring {
                        importance_score: 20,
                        sender_email: None,
                        suggested_action: None,
                    }),
                    correction_reasoning: Some("automated report".to_string()),
                },
            )
            .await
            .unwrap();

        let reviewed = store.reviewed(user, None, since).await.unwrap();
        assert_eq!(reviewed.len(), 2);

        let corrected = store.corrected(user, 10).await.unwrap();
        assert_eq!(corrected.len(), 1);
        assert_eq!(corrected[0].id, corrected_id);
        assert_eq!(
            corrected[0].correction_reasoning.as_deref(),
            Some("automated report")
        );
    }
}
