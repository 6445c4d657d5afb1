//! Scoring signals - typed inputs the engine combines into a score.
//!
//! Four independent signal families feed the scorer:
//! - **Sender history**: behavioral rates derived on read from raw
//!   interaction counters (never stored directly)
//! - **Trust designations**: explicit user overrides (trusted / blocked)
//! - **User context**: role, priorities, communication style
//! - **Platform signals**: star/importance flags and category from the mail
//!   provider, extracted upstream and passed in as a struct

mod model;
mod repository;

pub use model::{
    InteractionCounters, InteractionKind, MailCategory, PlatformSignals, SenderHistory,
    TrustDesignation, TrustLevel, UserContext, UserId,
};
pub use repository::{SignalRepository, WeightedSender};
