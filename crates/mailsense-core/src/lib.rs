//! # mailsense-core
//!
//! Contextual importance scoring and decision transparency engine for
//! `MailSense` inbox triage.
//!
//! This crate provides:
//! - **Signal model** - typed sender history, trust designations, user
//!   context, and platform signals, with a read-side repository that derives
//!   behavioral rates from raw interaction counters
//! - **Relationship classification** - deterministic sender categorization
//!   (vip / important / occasional / informational / noise / unknown)
//! - **Composite scoring** - bounded importance score, volume-driven
//!   confidence, suggested action, and reproducible reasoning
//! - **Decision ledger** - append-only audit records with a confidence-gated
//!   lifecycle and one-shot user review
//! - **Memories** - correction-pattern mining plus user-editable learned
//!   sender weights
//! - **Accuracy metrics** - approval rates and confidence calibration
//! - **Escalation** - bounded low-confidence batches sent to an external
//!   reasoning service with per-item fallback

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod decision;
mod error;
pub mod escalate;
pub mod memory;
pub mod metrics;
pub mod scoring;
pub mod service;
pub mod signal;

pub use config::{EngineConfig, ScoringConfig};
pub use decision::{
    Decision, DecisionData, DecisionLedger, DecisionStatus, DecisionStore, DecisionType,
    FileDecisionStore, SqliteDecisionStore, StorageBackend, StorageConfig,
};
pub use error::{Error, Result};
pub use escalate::{Escalator, ScoredMessage};
pub use memory::{Memory, MemoryCatalog, MemoryService, MemoryUpdate};
pub use metrics::{AccuracyMetrics, ReviewQueue};
pub use scoring::{
    CompositeScorer, RelationshipType, ScoringResult, SuggestedAction, classify_relationship,
};
pub use service::TriageService;
pub use signal::{
    InteractionKind, MailCategory, PlatformSignals, SenderHistory, SignalRepository, TrustLevel,
    UserContext, UserId,
};
