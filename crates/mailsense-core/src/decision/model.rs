//! Decision data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::SuggestedAction;
use crate::signal::{MailCategory, UserId};

/// Kinds of judgment the engine records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    /// An importance score was assigned to a message.
    ImportanceScoring,
    /// A message was assigned to a category.
    CategoryAssignment,
    /// A handling action was suggested.
    SuggestedAction,
    /// A message was archived automatically.
    AutoArchive,
    /// A message was starred automatically.
    AutoStar,
    /// A message was ranked against its peers.
    PriorityRanking,
}

impl DecisionType {
    /// Parse from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "importance_scoring" => Some(Self::ImportanceScoring),
            "category_assignment" => Some(Self::CategoryAssignment),
            "suggested_action" => Some(Self::SuggestedAction),
            "auto_archive" => Some(Self::AutoArchive),
            "auto_star" => Some(Self::AutoStar),
            "priority_ranking" => Some(Self::PriorityRanking),
            _ => None,
        }
    }

    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ImportanceScoring => "importance_scoring",
            Self::CategoryAssignment => "category_assignment",
            Self::SuggestedAction => "suggested_action",
            Self::AutoArchive => "auto_archive",
            Self::AutoStar => "auto_star",
            Self::PriorityRanking => "priority_ranking",
        }
    }
}

/// Lifecycle status of a decision.
///
/// A decision starts in one of the three transient states, purely as a
/// function of confidence, and review moves it to a terminal state exactly
/// once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// The engine suggests; the user confirms.
    #[default]
    Suggested,
    /// High confidence; the engine acted autonomously.
    Handled,
    /// Low confidence; the user must decide.
    YourCall,
    /// The user reviewed and approved (terminal).
    UserApproved,
    /// The user reviewed and corrected (terminal).
    UserCorrected,
}

impl DecisionStatus {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "handled" => Self::Handled,
            "your_call" => Self::YourCall,
            "user_approved" => Self::UserApproved,
            "user_corrected" => Self::UserCorrected,
            _ => Self::Suggested,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Suggested => "suggested",
            Self::Handled => "handled",
            Self::YourCall => "your_call",
            Self::UserApproved => "user_approved",
            Self::UserCorrected => "user_corrected",
        }
    }

    /// Whether this status ends the lifecycle.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::UserApproved | Self::UserCorrected)
    }
}

/// The payload of a decision, typed per decision kind.
///
/// Corrections reuse the same shape: a correction must carry the same tag
/// as the decision it corrects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision_type", rename_all = "snake_case")]
pub enum DecisionData {
    /// Payload of an importance-scoring decision.
    ImportanceScoring {
        /// The assigned score in [0, 100].
        importance_score: u8,
        /// Sender the score applies to, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_email: Option<String>,
        /// Action recommended alongside the score.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suggested_action: Option<SuggestedAction>,
    },
    /// Payload of a category assignment.
    CategoryAssignment {
        /// The assigned category.
        category: MailCategory,
    },
    /// Payload of a suggested action.
    #[serde(rename = "suggested_action")]
    ActionSuggestion {
        /// The suggested action.
        action: SuggestedAction,
    },
    /// Payload of an auto-archive decision.
    AutoArchive {
        /// Whether the message was archived.
        archive: bool,
    },
    /// Payload of an auto-star decision.
    AutoStar {
        /// Whether the message was starred.
        star: bool,
    },
    /// Payload of a priority ranking.
    PriorityRanking {
        /// Position in the ranked list (1 is highest).
        position: u32,
    },
}

impl DecisionData {
    /// The decision kind this payload belongs to.
    #[must_use]
    pub const fn kind(&self) -> DecisionType {
        match self {
            Self::ImportanceScoring { .. } => DecisionType::ImportanceScoring,
            Self::CategoryAssignment { .. } => DecisionType::CategoryAssignment,
            Self::ActionSuggestion { .. } => DecisionType::SuggestedAction,
            Self::AutoArchive { .. } => DecisionType::AutoArchive,
            Self::AutoStar { .. } => DecisionType::AutoStar,
            Self::PriorityRanking { .. } => DecisionType::PriorityRanking,
        }
    }

    /// The importance score this payload carries, if any.
    #[must_use]
    pub fn importance_score(&self) -> Option<f64> {
        match self {
            Self::ImportanceScoring {
                importance_score, ..
            } => Some(f64::from(*importance_score)),
            _ => None,
        }
    }
}

/// One recorded judgment, with its reviewable lifecycle.
///
/// Serializes to the stable JSON shape consumed outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Unique id, assigned on creation and immutable.
    pub id: i64,
    /// Owning user; decisions are visible only to their owner.
    pub user_id: UserId,
    /// Provider message id, if the decision concerns a single message.
    pub message_id: Option<String>,
    /// Kind of judgment.
    pub decision_type: DecisionType,
    /// The judgment itself.
    pub decision_data: DecisionData,
    /// Why the engine decided this.
    pub reasoning: String,
    /// Engine confidence at decision time, in [0, 1].
    pub confidence: f64,
    /// Lifecycle status.
    pub status: DecisionStatus,
    /// When the decision was recorded.
    pub created_at: DateTime<Utc>,
    /// When the user reviewed it, if they have.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// What the user changed it to, for corrections.
    pub correction: Option<DecisionData>,
    /// Why the user corrected it.
    pub correction_reasoning: Option<String>,
}

/// Input for recording a decision.
#[derive(Debug, Clone)]
pub struct NewDecision {
    /// Owning user.
    pub user_id: UserId,
    /// Provider message id, if applicable.
    pub message_id: Option<String>,
    /// The judgment.
    pub decision_data: DecisionData,
    /// Why the engine decided this.
    pub reasoning: String,
    /// Engine confidence, already clamped to [0, 1].
    pub confidence: f64,
    /// Initial lifecycle status, derived from confidence.
    pub status: DecisionStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Terminal fields written by a review.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    /// The terminal status (approved or corrected).
    pub status: DecisionStatus,
    /// Review timestamp.
    pub reviewed_at: DateTime<Utc>,
    /// Correction payload, for corrections.
    pub correction: Option<DecisionData>,
    /// Why the user corrected.
    pub correction_reasoning: Option<String>,
}
