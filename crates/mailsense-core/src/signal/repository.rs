//! Read-side repository for scoring signals.
//!
//! Interaction counters are owned by behavior tracking and user/trust data
//! by profile management; this repository is the engine's read model plus
//! the ingestion hooks those collaborators call.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{InteractionCounters, InteractionKind, SenderHistory, TrustLevel, UserContext};
use crate::Result;
use crate::signal::UserId;

/// Repository for sender counters, trust designations, and user context.
#[derive(Clone)]
pub struct SignalRepository {
    pool: SqlitePool,
}

impl SignalRepository {
    /// Create a new repository with the given database path.
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

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
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

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// The underlying pool, shared with sibling repositories.
    pub(crate) const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS sender_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                sender_email TEXT NOT NULL,
                total_messages INTEGER NOT NULL DEFAULT 0,
                responded INTEGER NOT NULL DEFAULT 0,
                archived INTEGER NOT NULL DEFAULT 0,
                marked_important INTEGER NOT NULL DEFAULT 0,
                marked_interesting INTEGER NOT NULL DEFAULT 0,
                marked_unimportant INTEGER NOT NULL DEFAULT 0,
                trashed INTEGER NOT NULL DEFAULT 0,
                importance_weight REAL,
                last_interaction TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, sender_email)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS trusted_senders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                sender_email TEXT NOT NULL,
                trust_level TEXT NOT NULL DEFAULT 'neutral',
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, sender_email)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS user_profiles (
                user_id INTEGER PRIMARY KEY,
                role TEXT,
                priorities TEXT,
                communication_style TEXT,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Index for memory catalog queries over learned weights
        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_sender_stats_weighted
            ON sender_stats(user_id, importance_weight) WHERE importance_weight IS NOT NULL
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record one received message from a sender.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn record_message(&self, user_id: UserId, sender_email: &str) -> Result<()> {
        let normalized_email = sender_email.to_lowercase();

        let updated = sqlx::query(
            r"
            UPDATE sender_stats
            SET total_messages = total_messages + 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE user_id = ? AND sender_email = ?
            ",
        )
        .bind(user_id.0)
        .bind(&normalized_email)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                r"
                INSERT INTO sender_stats (user_id, sender_email, total_messages)
                VALUES (?, ?, 1)
                ",
            )
            .bind(user_id.0)
            .bind(&normalized_email)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Record one tracked interaction with a sender's mail.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn record_interaction(
        &self,
        user_id: UserId,
        sender_email: &str,
        kind: InteractionKind,
    ) -> Result<()> {
        let normalized_email = sender_email.to_lowercase();
        let column = kind.column();
        let now = Utc::now();

        let sql = format!(
            "UPDATE sender_stats
             SET {column} = {column} + 1,
                 last_interaction = ?,
                 updated_at = CURRENT_TIMESTAMP
             WHERE user_id = ? AND sender_email = ?"
        );
        let updated = sqlx::query(&sql)
            .bind(now)
            .bind(user_id.0)
            .bind(&normalized_email)
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            let sql = format!(
                "INSERT INTO sender_stats (user_id, sender_email, {column}, last_interaction)
                 VALUES (?, ?, 1, ?)"
            );
            sqlx::query(&sql)
                .bind(user_id.0)
                .bind(&normalized_email)
                .bind(now)
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    /// Behavioral history for a sender, derived from the stored counters.
    ///
    /// An unseen sender resolves to [`SenderHistory::absent`], never an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn sender_history(
        &self,
        user_id: UserId,
        sender_email: &str,
    ) -> Result<SenderHistory> {
        let normalized_email = sender_email.to_lowercase();

        let row = sqlx::query(
            r"
            SELECT total_messages, responded, archived, marked_important,
                   marked_interesting, marked_unimportant, trashed,
                   importance_weight, last_interaction
            FROM sender_stats
            WHERE user_id = ? AND sender_email = ?
            ",
        )
        .bind(user_id.0)
        .bind(&normalized_email)
        .fetch_optional(&self.pool)
        .await?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(row.map_or_else(
            || SenderHistory::absent(&normalized_email),
            |r| {
                let counters = InteractionCounters {
                    total_messages: r.get::<i64, _>("total_messages") as u32,
                    responded: r.get::<i64, _>("responded") as u32,
                    archived: r.get::<i64, _>("archived") as u32,
                    marked_important: r.get::<i64, _>("marked_important") as u32,
                    marked_interesting: r.get::<i64, _>("marked_interesting") as u32,
                    marked_unimportant: r.get::<i64, _>("marked_unimportant") as u32,
                    trashed: r.get::<i64, _>("trashed") as u32,
                };
                SenderHistory::from_counters(
                    &normalized_email,
                    counters,
                    r.get::<Option<f64>, _>("importance_weight"),
                    r.get::<Option<DateTime<Utc>>, _>("last_interaction"),
                )
            },
        ))
    }

    /// Trust designation for a sender; unseen senders are neutral.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn trust(&self, user_id: UserId, sender_email: &str) -> Result<TrustLevel> {
        let normalized_email = sender_email.to_lowercase();

        let row = sqlx::query(
            r"
            SELECT trust_level FROM trusted_senders
            WHERE user_id = ? AND sender_email = ?
            ",
        )
        .bind(user_id.0)
        .bind(&normalized_email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map_or(TrustLevel::Neutral, |r| {
            TrustLevel::parse(r.get("trust_level"))
        }))
    }

    /// Set or replace the trust designation for a sender.
    ///
    /// Normally called by profile management; the engine itself only reads.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn set_trust(
        &self,
        user_id: UserId,
        sender_email: &str,
        level: TrustLevel,
    ) -> Result<()> {
        let normalized_email = sender_email.to_lowercase();

        sqlx::query(
            r"
            INSERT INTO trusted_senders (user_id, sender_email, trust_level)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, sender_email)
            DO UPDATE SET trust_level = excluded.trust_level, updated_at = CURRENT_TIMESTAMP
            ",
        )
        .bind(user_id.0)
        .bind(&normalized_email)
        .bind(level.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// User context; users without a stored profile get the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or the stored
    /// priorities are not valid JSON.
    pub async fn user_context(&self, user_id: UserId) -> Result<UserContext> {
        let row = sqlx::query(
            r"
            SELECT role, priorities, communication_style
            FROM user_profiles
            WHERE user_id = ?
            ",
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(UserContext::default());
        };

        let defaults = UserContext::default();
        let priorities = match row.get::<Option<String>, _>("priorities") {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };

        Ok(UserContext {
            role: row
                .get::<Option<String>, _>("role")
                .unwrap_or(defaults.role),
            priorities,
            communication_style: row
                .get::<Option<String>, _>("communication_style")
                .unwrap_or(defaults.communication_style),
        })
    }

    /// Store or replace a user's context.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database operation fails.
    pub async fn set_user_context(&self, user_id: UserId, context: &UserContext) -> Result<()> {
        let priorities = serde_json::to_string(&context.priorities)?;

        sqlx::query(
            r"
            INSERT INTO user_profiles (user_id, role, priorities, communication_style)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id)
            DO UPDATE SET role = excluded.role,
                          priorities = excluded.priorities,
                          communication_style = excluded.communication_style,
                          updated_at = CURRENT_TIMESTAMP
            ",
        )
        .bind(user_id.0)
        .bind(&context.role)
        .bind(&priorities)
        .bind(&context.communication_style)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Senders with a learned importance weight, strongest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn weighted_senders(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<WeightedSender>> {
        let rows = sqlx::query(
            r"
            SELECT id, sender_email, importance_weight, last_interaction,
                   (responded + archived + marked_important + marked_interesting
                    + marked_unimportant + trashed) AS interactions
            FROM sender_stats
            WHERE user_id = ? AND importance_weight IS NOT NULL
            ORDER BY importance_weight DESC
            LIMIT ?
            ",
        )
        .bind(user_id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(rows
            .iter()
            .map(|r| WeightedSender {
                id: r.get("id"),
                sender_email: r.get("sender_email"),
                importance_weight: r.get("importance_weight"),
                interaction_count: r.get::<i64, _>("interactions") as u32,
                last_interaction: r.get("last_interaction"),
            })
            .collect())
    }

    /// Set the learned importance weight of a sender (by stats row id).
    ///
    /// The weight is clamped to [0, 1]. Returns false if no such sender
    /// exists for this user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn set_importance_weight(
        &self,
        user_id: UserId,
        stats_id: i64,
        weight: f64,
    ) -> Result<bool> {
        let updated = sqlx::query(
            r"
            UPDATE sender_stats
            SET importance_weight = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND user_id = ?
            ",
        )
        .bind(weight.clamp(0.0, 1.0))
        .bind(stats_id)
        .bind(user_id.0)
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() > 0)
    }

    /// Set the learned importance weight of a sender by email address.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn set_importance_weight_for(
        &self,
        user_id: UserId,
        sender_email: &str,
        weight: f64,
    ) -> Result<bool> {
        let normalized_email = sender_email.to_lowercase();

        let updated = sqlx::query(
            r"
            UPDATE sender_stats
            SET importance_weight = ?, updated_at = CURRENT_TIMESTAMP
            WHERE user_id = ? AND sender_email = ?
            ",
        )
        .bind(weight.clamp(0.0, 1.0))
        .bind(user_id.0)
        .bind(&normalized_email)
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() > 0)
    }

    /// Clear a sender's learned weight (by stats row id).
    ///
    /// Future scoring for this sender falls back to the plain relationship
    /// classification. Returns false if no such sender exists for this user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn clear_importance_weight(&self, user_id: UserId, stats_id: i64) -> Result<bool> {
        let updated = sqlx::query(
            r"
            UPDATE sender_stats
            SET importance_weight = NULL, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND user_id = ? AND importance_weight IS NOT NULL
            ",
        )
        .bind(stats_id)
        .bind(user_id.0)
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() > 0)
    }
}

/// One sender with a learned importance weight.
#[derive(Debug, Clone)]
pub struct WeightedSender {
    /// Stats row id (stable handle for memory edits).
    pub id: i64,
    /// Sender email.
    pub sender_email: String,
    /// Learned weight in [0, 1].
    pub importance_weight: f64,
    /// Total tracked interactions.
    pub interaction_count: u32,
    /// Most recent tracked interaction.
    pub last_interaction: Option<DateTime<Utc>>,
}
