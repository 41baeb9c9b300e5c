//! Behavioral tests for the container: transaction policy, per-client
//! serialization, instance pooling, and lifecycle management.

mod common;
mod lifecycle;
