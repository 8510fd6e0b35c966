//! Shared data models for the audio effects service.
//!
//! This crate provides Serde-serializable types for:
//! - Effect kinds and their parameter sets
//! - Job ids and terminal outcomes
//! - Processing history entries
//! - The client-facing status payload

pub mod effect;
pub mod history;
pub mod job;
pub mod status;

pub use effect::{EffectKind, EffectParams, EffectRequest, ParamsError};
pub use history::HistoryEntry;
pub use job::{JobId, JobOutcome, JobPoll};
pub use status::StatusView;
