//! Signal data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl UserId {
    /// Create a new user ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Explicit user-set trust override for a sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    /// Explicitly trusted contact.
    Trusted,
    /// Explicitly blocked sender.
    Blocked,
    /// No explicit designation.
    #[default]
    Neutral,
}

impl TrustLevel {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trusted" => Self::Trusted,
            "blocked" => Self::Blocked,
            _ => Self::Neutral,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trusted => "trusted",
            Self::Blocked => "blocked",
            Self::Neutral => "neutral",
        }
    }
}

/// A trust designation for one (user, sender) pair.
///
/// At most one exists per pair; maintained by profile management and
/// read-only inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustDesignation {
    /// Owning user.
    pub user_id: UserId,
    /// Sender email (normalized to lowercase).
    pub sender_email: String,
    /// The designation.
    pub trust_level: TrustLevel,
}

/// Platform-provided category of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailCategory {
    /// Personal or direct mail.
    Primary,
    /// Marketing and offers.
    Promotional,
    /// Social-network notifications.
    Social,
    /// Transactional updates, receipts, statements.
    Updates,
    /// Mailing lists and discussion groups.
    Forums,
    /// No category reported.
    #[default]
    Unknown,
}

impl MailCategory {
    /// Parse from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "primary" => Self::Primary,
            "promotional" => Self::Promotional,
            "social" => Self::Social,
            "updates" => Self::Updates,
            "forums" => Self::Forums,
            _ => Self::Unknown,
        }
    }

    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Promotional => "promotional",
            Self::Social => "social",
            Self::Updates => "updates",
            Self::Forums => "forums",
            Self::Unknown => "unknown",
        }
    }
}

/// Signals reported by the mail platform for one message.
///
/// Extraction from the provider payload happens upstream; the engine only
/// sees this struct.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PlatformSignals {
    /// The user starred the message.
    pub is_starred: bool,
    /// The platform flagged the message important.
    pub is_flagged_important: bool,
    /// Platform category.
    pub category: MailCategory,
    /// The message body carries an unsubscribe link.
    pub has_unsubscribe_link: bool,
}

/// Who the user is, as far as scoring is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// Professional role (e.g. "Founder", "Engineer").
    pub role: String,
    /// Current priorities, most important first.
    pub priorities: Vec<String>,
    /// Preferred communication style.
    pub communication_style: String,
}

impl Default for UserContext {
    fn default() -> Self {
        Self {
            role: "Professional".to_string(),
            priorities: Vec::new(),
            communication_style: "professional".to_string(),
        }
    }
}

/// One kind of tracked interaction with a sender's mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    /// The user replied.
    Responded,
    /// The user archived without replying.
    Archived,
    /// The user marked the message important.
    MarkedImportant,
    /// The user marked the message interesting.
    MarkedInteresting,
    /// The user marked the message unimportant.
    MarkedUnimportant,
    /// The user deleted the message.
    Trashed,
}

impl InteractionKind {
    /// Counter column this interaction increments.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Responded => "responded",
            Self::Archived => "archived",
            Self::MarkedImportant => "marked_important",
            Self::MarkedInteresting => "marked_interesting",
            Self::MarkedUnimportant => "marked_unimportant",
            Self::Trashed => "trashed",
        }
    }
}

/// Raw per-sender interaction counters, owned by behavior tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionCounters {
    /// Messages received from the sender.
    pub total_messages: u32,
    /// Replies sent.
    pub responded: u32,
    /// Messages archived.
    pub archived: u32,
    /// Messages marked important.
    pub marked_important: u32,
    /// Messages marked interesting.
    pub marked_interesting: u32,
    /// Messages marked unimportant.
    pub marked_unimportant: u32,
    /// Messages trashed.
    pub trashed: u32,
}

impl InteractionCounters {
    /// Total tracked interactions (not message volume).
    #[must_use]
    pub const fn interactions(&self) -> u32 {
        self.responded
            + self.archived
            + self.marked_important
            + self.marked_interesting
            + self.marked_unimportant
            + self.trashed
    }
}

/// Behavioral history of one sender, derived on read.
///
/// Rates are always recomputed from [`InteractionCounters`]; only the
/// counters and the learned `importance_weight` are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderHistory {
    /// Sender email (normalized to lowercase).
    pub sender_email: String,
    /// Messages received from this sender.
    pub total_messages: u32,
    /// Fraction of interactions that were replies, in [0, 1].
    pub response_rate: f64,
    /// Fraction of interactions that were archives, in [0, 1].
    pub archive_rate: f64,
    /// Fraction of interactions that marked the mail important, in [0, 1].
    pub importance_rate: f64,
    /// Learned importance weight in [0, 1], if one exists.
    pub importance_weight: Option<f64>,
    /// Most recent tracked interaction.
    pub last_interaction: Option<DateTime<Utc>>,
}

impl SenderHistory {
    /// Derives a history from raw counters.
    #[must_use]
    pub fn from_counters(
        sender_email: impl Into<String>,
        counters: InteractionCounters,
        importance_weight: Option<f64>,
        last_interaction: Option<DateTime<Utc>>,
    ) -> Self {
        let interactions = counters.interactions();
        let rate = |count: u32| {
            if interactions == 0 {
                0.0
            } else {
                f64::from(count) / f64::from(interactions)
            }
        };

        Self {
            sender_email: sender_email.into(),
            total_messages: counters.total_messages,
            response_rate: rate(counters.responded),
            archive_rate: rate(counters.archived),
            importance_rate: rate(counters.marked_important),
            importance_weight,
            last_interaction,
        }
    }

    /// History for a sender that has never been seen.
    #[must_use]
    pub fn absent(sender_email: impl Into<String>) -> Self {
        Self::from_counters(sender_email, InteractionCounters::default(), None, None)
    }

    /// Returns true if no mail from this sender has been seen.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.total_messages == 0
    }
}
