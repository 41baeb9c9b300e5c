//! Concurrency serialization for per-client components.
//!
//! A per-client instance's state must never see concurrent reentry. Rather
//! than rejecting concurrent calls outright, the [`CallGate`] serializes
//! them: callers beyond the first block with a bounded wait, trading latency
//! for correctness.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod gate;

pub use gate::{CallGate, GateGuard};
