//! Search run orchestration.
//!
//! This module wires together grid sampling, the shared rate limiter, lookups
//! with retry, deduplication and stats accumulation.

mod control;
mod outcome;
mod pipeline;
mod probe;
mod state;

pub use outcome::{AbortCause, SearchOutcome};
pub use pipeline::SearchOrchestrator;
pub use state::RunState;
