//! Storage interface for the decision ledger.
//!
//! One trait, two implementations (`SQLite` and JSON file), selected once at
//! startup via [`StorageConfig`] - never per call.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::file::FileDecisionStore;
use super::model::{Decision, DecisionType, NewDecision, ReviewOutcome};
use super::sqlite::SqliteDecisionStore;
use crate::Result;
use crate::signal::UserId;

/// Persistence contract the decision ledger requires.
///
/// Implementations must make [`DecisionStore::complete_review`] a conditional
/// write keyed on the current status being non-terminal, so that two
/// concurrent reviews of the same decision serialize to exactly one winner.
#[allow(async_fn_in_trait)] // static dispatch only
pub trait DecisionStore: Send + Sync {
    /// Append one decision row and return its new unique id.
    async fn insert(&self, decision: &NewDecision) -> Result<i64>;

    /// Fetch a decision if it exists *and* is owned by `user_id`.
    async fn fetch_owned(&self, decision_id: i64, user_id: UserId) -> Result<Option<Decision>>;

    /// Write the terminal review fields if the row is owned by `user_id`
    /// and still in a non-terminal status. Returns whether the row
    /// transitioned.
    async fn complete_review(
        &self,
        decision_id: i64,
        user_id: UserId,
        outcome: &ReviewOutcome,
    ) -> Result<bool>;

    /// Decisions awaiting review: suggested or your-call at any age, plus
    /// handled ones created after `handled_cutoff`. Newest first.
    async fn pending(
        &self,
        user_id: UserId,
        handled_cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Decision>>;

    /// Decisions created after `since`, optionally filtered by message and
    /// kind. Newest first.
    async fn history(
        &self,
        user_id: UserId,
        message_id: Option<&str>,
        decision_type: Option<DecisionType>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Decision>>;

    /// Reviewed decisions created after `since`, optionally filtered by
    /// kind.
    async fn reviewed(
        &self,
        user_id: UserId,
        decision_type: Option<DecisionType>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Decision>>;

    /// Most recently corrected decisions, newest review first.
    async fn corrected(&self, user_id: UserId, limit: u32) -> Result<Vec<Decision>>;
}

/// Which persistence backend to use, chosen once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StorageConfig {
    /// `SQLite` database at the given path.
    Sqlite {
        /// Database file path.
        path: String,
    },
    /// JSON document at the given path.
    File {
        /// Document file path.
        path: PathBuf,
    },
}

/// A decision store selected from configuration.
pub enum StorageBackend {
    /// `SQLite`-backed store.
    Sqlite(SqliteDecisionStore),
    /// JSON-file-backed store.
    File(FileDecisionStore),
}

impl StorageBackend {
    /// Opens the backend named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened or initialized.
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        match config {
            StorageConfig::Sqlite { path } => {
                Ok(Self::Sqlite(SqliteDecisionStore::new(path).await?))
            }
            StorageConfig::File { path } => Ok(Self::File(FileDecisionStore::open(path).await?)),
        }
    }
}

impl DecisionStore for StorageBackend {
    async fn insert(&self, decision: &NewDecision) -> Result<i64> {
        match self {
            Self::Sqlite(store) => store.insert(decision).await,
            Self::File(store) => store.insert(decision).await,
        }
    }

    async fn fetch_owned(&self, decision_id: i64, user_id: UserId) -> Result<Option<Decision>> {
        match self {
            Self::Sqlite(store) => store.fetch_owned(decision_id, user_id).await,
            Self::File(store) => store.fetch_owned(decision_id, user_id).await,
        }
    }

    async fn complete_review(
        &self,
        decision_id: i64,
        user_id: UserId,
        outcome: &ReviewOutcome,
    ) -> Result<bool> {
        match self {
            Self::Sqlite(store) => store.complete_review(decision_id, user_id, outcome).await,
            Self::File(store) => store.complete_review(decision_id, user_id, outcome).await,
        }
    }

    async fn pending(
        &self,
        user_id: UserId,
        handled_cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Decision>> {
        match self {
            Self::Sqlite(store) => store.pending(user_id, handled_cutoff, limit).await,
            Self::File(store) => store.pending(user_id, handled_cutoff, limit).await,
        }
    }

    async fn history(
        &self,
        user_id: UserId,
        message_id: Option<&str>,
        decision_type: Option<DecisionType>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Decision>> {
        match self {
            Self::Sqlite(store) => store.history(user_id, message_id, decision_type, since).await,
            Self::File(store) => store.history(user_id, message_id, decision_type, since).await,
        }
    }

    async fn reviewed(
        &self,
        user_id: UserId,
        decision_type: Option<DecisionType>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Decision>> {
        match self {
            Self::Sqlite(store) => store.reviewed(user_id, decision_type, since).await,
            Self::File(store) => store.reviewed(user_id, decision_type, since).await,
        }
    }

    async fn corrected(&self, user_id: UserId, limit: u32) -> Result<Vec<Decision>> {
        match self {
            Self::Sqlite(store) => store.corrected(user_id, limit).await,
            Self::File(store) => store.corrected(user_id, limit).await,
        }
    }
}
