//! # mailsense-reason
//!
//! Client for the external reasoning/completion service used by the
//! `MailSense` deep-triage escalation path.
//!
//! The engine core only ever needs "prompt in, text out". That contract is
//! the [`Completer`] trait; [`HttpCompleter`] is the production transport
//! speaking the messages API of the hosted completion service. Tests inject
//! scripted fakes instead of going over the network.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsense_reason::{Completer, HttpCompleter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let completer = HttpCompleter::new(std::env::var("REASONING_API_KEY")?)
//!         .with_model("claude-sonnet-4-20250514")
//!         .with_temperature(0.3);
//!
//!     let reply = completer.complete("Which of these messages matter?").await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;

pub use client::{Completer, HttpCompleter};
pub use error::{Error, Result};
