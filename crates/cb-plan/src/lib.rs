//! Planning features: needs analysis, goal generation and service
//! coordination.
//!
//! Unlike the search pipeline, these components have no safe deterministic
//! substitute for their output, so extraction failures propagate to the
//! caller instead of degrading. The one exception is per-facility scoring
//! inside `ServiceCoordinator::rank_facilities`, which isolates failures
//! per candidate.

pub mod goals;
pub mod needs;
pub mod services;

pub use goals::{GoalGenerator, GoalType};
pub use needs::NeedsAnalyzer;
pub use services::{FALLBACK_SERVICE_TYPES, NEUTRAL_MATCH_REASON, ServiceCoordinator};
