//! Engine services.

mod triage;

pub use triage::TriageService;
