//! Shared types and pure functions for the vista viewer.
//!
//! This crate has no internal dependencies and holds the pieces every
//! other crate agrees on: the backend identity record, the derived
//! recognition candidate, and the normalization that produces it.

pub mod candidate;
pub mod types;

pub use candidate::{normalize_candidates, Candidate, DetectionStat};
pub use types::{Identity, Timestamp};
