//! Decision ledger - append-only audit trail with a reviewable lifecycle.
//!
//! Every judgment the engine makes is recorded as a [`Decision`]:
//! - What was decided ([`DecisionData`], typed per decision kind)
//! - Why ([`Decision::reasoning`], shown to the user)
//! - How confident the engine was, which gates the initial status
//! - What the user later said about it (approval or correction)
//!
//! Rows are append-only: review sets the terminal fields of the same row
//! exactly once and nothing else ever mutates a recorded decision.

mod file;
mod ledger;
mod model;
mod sqlite;
mod store;

pub use file::FileDecisionStore;
pub use ledger::DecisionLedger;
pub use model::{Decision, DecisionData, DecisionStatus, DecisionType, NewDecision, ReviewOutcome};
pub use sqlite::SqliteDecisionStore;
pub use store::{DecisionStore, StorageBackend, StorageConfig};
