//! Scoring data models.

use serde::{Deserialize, Serialize};

/// Classification of a sender's historical engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// The user frequently engages with this sender.
    Vip,
    /// The user marks this sender's mail important.
    Important,
    /// The user sometimes engages.
    Occasional,
    /// The user reads but does not respond.
    Informational,
    /// The user consistently archives.
    Noise,
    /// Not enough data to classify.
    #[default]
    Unknown,
}

impl RelationshipType {
    /// Parse from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "vip" => Self::Vip,
            "important" => Self::Important,
            "occasional" => Self::Occasional,
            "informational" => Self::Informational,
            "noise" => Self::Noise,
            _ => Self::Unknown,
        }
    }

    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vip => "vip",
            Self::Important => "important",
            Self::Occasional => "occasional",
            Self::Informational => "informational",
            Self::Noise => "noise",
            Self::Unknown => "unknown",
        }
    }
}

/// What the engine suggests doing with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// High importance; reply promptly.
    ReplyNow,
    /// Worth a look before the day is out.
    ReviewToday,
    /// Read when there is time.
    ReadLater,
    /// Archive unless something urgent stands out.
    ArchiveIfNotUrgent,
    /// Archive without asking.
    AutoArchive,
    /// No strong signal either way; the user decides.
    UserDecides,
}

impl SuggestedAction {
    /// Parse from string representation.
    ///
    /// Returns `None` for unrecognized input so callers can keep their
    /// current action instead of silently downgrading.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "reply_now" => Some(Self::ReplyNow),
            "review_today" => Some(Self::ReviewToday),
            "read_later" => Some(Self::ReadLater),
            "archive_if_not_urgent" | "archive" => Some(Self::ArchiveIfNotUrgent),
            "auto_archive" => Some(Self::AutoArchive),
            "user_decides" => Some(Self::UserDecides),
            _ => None,
        }
    }

    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReplyNow => "reply_now",
            Self::ReviewToday => "review_today",
            Self::ReadLater => "read_later",
            Self::ArchiveIfNotUrgent => "archive_if_not_urgent",
            Self::AutoArchive => "auto_archive",
            Self::UserDecides => "user_decides",
        }
    }
}

/// Outcome of scoring one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Importance score in [0, 100].
    pub importance_score: u8,
    /// Self-assessed reliability of the score, in [0, 1]. Driven by the
    /// volume of sender history only.
    pub confidence: f64,
    /// Sender relationship classification.
    pub relationship: RelationshipType,
    /// Human-readable explanation, reproducible from the same inputs.
    pub reasoning: String,
    /// Recommended handling.
    pub suggested_action: SuggestedAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_roundtrip() {
        for relationship in [
            RelationshipType::Vip,
            RelationshipType::Important,
            RelationshipType::Occasional,
            RelationshipType::Informational,
            RelationshipType::Noise,
            RelationshipType::Unknown,
        ] {
            assert_eq!(RelationshipType::parse(relationship.as_str()), relationship);
        }
    }

    #[test]
    fn test_action_roundtrip() {
        for action in [
            SuggestedAction::ReplyNow,
            SuggestedAction::ReviewToday,
            SuggestedAction::ReadLater,
            SuggestedAction::ArchiveIfNotUrgent,
            SuggestedAction::AutoArchive,
            SuggestedAction::UserDecides,
        ] {
            assert_eq!(SuggestedAction::parse(action.as_str()), Some(action));
        }
    }

    #[test]
    fn test_action_parse_rejects_unknown() {
        assert_eq!(SuggestedAction::parse("defenestrate"), None);
    }

    #[test]
    fn test_action_parse_accepts_bare_archive() {
        // The reasoning service abbreviates to "archive"
        assert_eq!(
            SuggestedAction::parse("archive"),
            Some(SuggestedAction::ArchiveIfNotUrgent)
        );
    }
}
