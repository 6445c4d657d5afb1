//! Importance scoring - relationship classification and the composite
//! scorer.
//!
//! Both stages are deterministic: the classifier is a pure threshold
//! cascade over derived behavioral rates, and the scorer is an additive
//! combination of relationship, learned history, trust, platform, and
//! content signals, clamped to [0, 100]. Repeated calls with the same
//! inputs return identical results.

mod classify;
mod composite;
mod model;

pub use classify::classify_relationship;
pub use composite::CompositeScorer;
pub use model::{RelationshipType, ScoringResult, SuggestedAction};
