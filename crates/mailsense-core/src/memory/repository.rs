//! Persistence for correction-pattern overrides.
//!
//! Pattern statistics are derived from corrected decisions on read; this
//! table only stores what the user did to a pattern - a weight multiplier
//! and the deletion watermark that resets its influence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::CorrectionPattern;
use crate::Result;
use crate::signal::UserId;

/// User-applied state of one correction pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternOverride {
    /// Influence multiplier (1.0 = unchanged).
    pub weight: f64,
    /// Corrections reviewed at or before this instant no longer count.
    pub muted_at: Option<DateTime<Utc>>,
}

impl Default for PatternOverride {
    fn default() -> Self {
        Self {
            weight: 1.0,
            muted_at: None,
        }
    }
}

/// Repository for correction-pattern overrides.
#[derive(Clone)]
pub struct PatternRepository {
    pool: SqlitePool,
}

impl PatternRepository {
    /// Create a repository sharing an existing pool.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
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
        Self::from_pool(pool).await
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS correction_patterns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                pattern TEXT NOT NULL,
                weight REAL NOT NULL DEFAULT 1.0,
                muted_at TEXT,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, pattern)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All overrides for a user, keyed by pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn overrides(
        &self,
        user_id: UserId,
    ) -> Result<HashMap<CorrectionPattern, PatternOverride>> {
        let rows = sqlx::query(
            r"
            SELECT pattern, weight, muted_at
            FROM correction_patterns
            WHERE user_id = ?
            ",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|r| {
                CorrectionPattern::parse(r.get("pattern")).map(|pattern| {
                    (
                        pattern,
                        PatternOverride {
                            weight: r.get("weight"),
                            muted_at: r.get("muted_at"),
                        },
                    )
                })
            })
            .collect())
    }

    /// Make sure a pattern row exists (called when a correction lands).
    ///
    /// Existing weight and mute state are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn record(&self, user_id: UserId, pattern: CorrectionPattern) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO correction_patterns (user_id, pattern)
            VALUES (?, ?)
            ON CONFLICT(user_id, pattern) DO NOTHING
            ",
        )
        .bind(user_id.0)
        .bind(pattern.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Set the influence multiplier for a pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn set_weight(
        &self,
        user_id: UserId,
        pattern: CorrectionPattern,
        weight: f64,
    ) -> Result<bool> {
        sqlx::query(
            r"
            INSERT INTO correction_patterns (user_id, pattern, weight)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, pattern)
            DO UPDATE SET weight = excluded.weight, updated_at = CURRENT_TIMESTAMP
            ",
        )
        .bind(user_id.0)
        .bind(pattern.as_str())
        .bind(weight)
        .execute(&self.pool)
        .await?;

        Ok(true)
    }

    /// Mute a pattern: corrections reviewed so far stop counting, so only
    /// new corrections can re-learn it. Influence resets to neutral.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn mute(&self, user_id: UserId, pattern: CorrectionPattern) -> Result<bool> {
        sqlx::query(
            r"
            INSERT INTO correction_patterns (user_id, pattern, weight, muted_at)
            VALUES (?, ?, 1.0, ?)
            ON CONFLICT(user_id, pattern)
            DO UPDATE SET muted_at = excluded.muted_at,
                          weight = 1.0,
                          updated_at = CURRENT_TIMESTAMP
            ",
        )
        .bind(user_id.0)
        .bind(pattern.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(true)
    }
}
