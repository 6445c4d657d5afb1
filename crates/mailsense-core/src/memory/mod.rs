//! Memories - what the engine has learned, under user control.
//!
//! Two kinds of memory shape future scoring:
//! - **Sender memories**: learned importance weights that feed the
//!   composite scorer's historical signal. Editable (adjust the weight) and
//!   deletable (clear it, so scoring falls back to the plain relationship
//!   classification).
//! - **Correction memories**: recurring patterns mined from user
//!   corrections, grouped by keyword matching on the correction reasoning.
//!   A pattern becomes visible once it has two corrections; it can be
//!   re-weighted or deleted (deletion resets its influence, and only new
//!   corrections can re-learn it).

mod miner;
mod model;
mod repository;
mod service;

pub use model::{
    CorrectionMemory, CorrectionPattern, Impact, Memory, MemoryCatalog, MemoryRef, MemoryUpdate,
    SenderMemory, TimelineEvent,
};
pub use repository::{PatternOverride, PatternRepository};
pub use service::MemoryService;
