//! Memory data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, recurring type of user correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionPattern {
    /// Corrections about automated mail and reports.
    AutomatedReports,
    /// Corrections about promotional or spam content.
    PromotionalContent,
    /// Corrections raising something the engine underrated.
    ImportanceOverride,
    /// Everything else.
    OtherCorrections,
}

impl CorrectionPattern {
    /// Derive the pattern from a correction's reasoning text.
    #[must_use]
    pub fn from_reasoning(reasoning: &str) -> Self {
        let lower = reasoning.to_lowercase();
        if lower.contains("automated") || lower.contains("report") {
            Self::AutomatedReports
        } else if lower.contains("spam") || lower.contains("promotional") {
            Self::PromotionalContent
        } else if lower.contains("important") {
            Self::ImportanceOverride
        } else {
            Self::OtherCorrections
        }
    }

    /// Parse from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "automated_reports" => Some(Self::AutomatedReports),
            "promotional_content" => Some(Self::PromotionalContent),
            "importance_override" => Some(Self::ImportanceOverride),
            "other_corrections" => Some(Self::OtherCorrections),
            _ => None,
        }
    }

    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AutomatedReports => "automated_reports",
            Self::PromotionalContent => "promotional_content",
            Self::ImportanceOverride => "importance_override",
            Self::OtherCorrections => "other_corrections",
        }
    }

    /// Human-readable display name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::AutomatedReports => "Automated Reports",
            Self::PromotionalContent => "Promotional Content",
            Self::ImportanceOverride => "Importance Override",
            Self::OtherCorrections => "Other Corrections",
        }
    }
}

/// A learned sender importance weight, visible to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderMemory {
    /// Stable handle for edits ("sender_<id>").
    pub id: String,
    /// The sender this weight applies to.
    pub sender_email: String,
    /// Learned weight in [0, 1]; the scorer's historical signal.
    pub importance_weight: f64,
    /// How settled this memory is, from interaction volume.
    pub confidence: f64,
    /// Tracked interactions behind the weight.
    pub interaction_count: u32,
    /// Most recent tracked interaction.
    pub last_interaction: Option<DateTime<Utc>>,
    /// Why this weight was learned.
    pub reasoning: String,
}

/// A mined correction pattern, visible to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionMemory {
    /// Stable handle for edits ("correction_<pattern>").
    pub id: String,
    /// The pattern.
    pub pattern: CorrectionPattern,
    /// Corrections grouped under this pattern.
    pub correction_count: u32,
    /// Mean corrected score minus mean original score.
    pub average_adjustment: f64,
    /// Mean original importance score.
    pub original_score_avg: f64,
    /// Mean corrected importance score.
    pub corrected_score_avg: f64,
    /// User-adjustable influence multiplier (1.0 by default).
    pub weight: f64,
    /// Most recent correction in the group.
    pub last_correction: Option<DateTime<Utc>>,
    /// Why this memory exists.
    pub reasoning: String,
}

impl CorrectionMemory {
    /// The adjustment after the user's weight multiplier.
    #[must_use]
    pub fn effective_adjustment(&self) -> f64 {
        self.average_adjustment * self.weight
    }
}

/// One memory of either kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Memory {
    /// A learned sender weight.
    Sender(SenderMemory),
    /// A mined correction pattern.
    Correction(CorrectionMemory),
}

impl Memory {
    /// The memory's stable handle.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Sender(memory) => &memory.id,
            Self::Correction(memory) => &memory.id,
        }
    }
}

/// Everything the engine has learned for one user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryCatalog {
    /// Learned sender weights, strongest first.
    pub sender_memories: Vec<SenderMemory>,
    /// Mined correction patterns.
    pub correction_memories: Vec<CorrectionMemory>,
}

impl MemoryCatalog {
    /// Total memories in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sender_memories.len() + self.correction_memories.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A parsed memory handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRef {
    /// A sender memory, by stats row id.
    Sender(i64),
    /// A correction-pattern memory.
    Correction(CorrectionPattern),
}

impl MemoryRef {
    /// Parse a memory id of the form `sender_<id>` or
    /// `correction_<pattern>`.
    #[must_use]
    pub fn parse(memory_id: &str) -> Option<Self> {
        if let Some(raw) = memory_id.strip_prefix("sender_") {
            return raw.parse().ok().map(Self::Sender);
        }
        if let Some(raw) = memory_id.strip_prefix("correction_") {
            return CorrectionPattern::parse(raw).map(Self::Correction);
        }
        None
    }
}

/// Fields a memory edit may change.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MemoryUpdate {
    /// New sender importance weight (sender memories only).
    pub importance_weight: Option<f64>,
    /// New influence multiplier (correction memories only).
    pub weight: Option<f64>,
}

/// How strongly a timeline event reshaped a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    /// A notable correction.
    Medium,
    /// A correction that moved the score by half the scale or more.
    High,
}

/// One significant correction on the learning timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// When the user corrected.
    pub reviewed_at: DateTime<Utc>,
    /// The engine's original importance score.
    pub original_score: f64,
    /// The user's corrected importance score.
    pub corrected_score: f64,
    /// The user's stated reason, if any.
    pub reasoning: Option<String>,
    /// How strongly the correction moved the score.
    pub impact: Impact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_from_reasoning_keywords() {
        assert_eq!(
            CorrectionPattern::from_reasoning("this is an automated report"),
            CorrectionPattern::AutomatedReports
        );
        assert_eq!(
            CorrectionPattern::from_reasoning("promotional junk"),
            CorrectionPattern::PromotionalContent
        );
        assert_eq!(
            CorrectionPattern::from_reasoning("actually IMPORTANT to me"),
            CorrectionPattern::ImportanceOverride
        );
        assert_eq!(
            CorrectionPattern::from_reasoning("just wrong"),
            CorrectionPattern::OtherCorrections
        );
    }

    #[test]
    fn test_pattern_keyword_priority() {
        // "report" outranks "important" when both appear
        assert_eq!(
            CorrectionPattern::from_reasoning("important weekly report"),
            CorrectionPattern::AutomatedReports
        );
    }

    #[test]
    fn test_pattern_roundtrip() {
        for pattern in [
            CorrectionPattern::AutomatedReports,
            CorrectionPattern::PromotionalContent,
            CorrectionPattern::ImportanceOverride,
            CorrectionPattern::OtherCorrections,
        ] {
            assert_eq!(CorrectionPattern::parse(pattern.as_str()), Some(pattern));
        }
    }

    #[test]
    fn test_memory_ref_parse() {
        assert_eq!(MemoryRef::parse("sender_42"), Some(MemoryRef::Sender(42)));
        assert_eq!(
            MemoryRef::parse("correction_promotional_content"),
            Some(MemoryRef::Correction(CorrectionPattern::PromotionalContent))
        );
        assert_eq!(MemoryRef::parse("sender_abc"), None);
        assert_eq!(MemoryRef::parse("correction_unheard_of"), None);
        assert_eq!(MemoryRef::parse("behavior_x"), None);
    }

    #[test]
    fn test_effective_adjustment_scales_with_weight() {
        let memory = CorrectionMemory {
            id: "correction_automated_reports".to_string(),
            pattern: CorrectionPattern::AutomatedReports,
            correction_count: 3,
            average_adjustment: -30.0,
            original_score_avg: 60.0,
            corrected_score_avg: 30.0,
            weight: 0.5,
            last_correction: None,
            reasoning: String::new(),
        };
        assert!((memory.effective_adjustment() - -15.0).abs() < 1e-9);
    }
}
