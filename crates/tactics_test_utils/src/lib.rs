//! # Tactics Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Fixture builders (balancing tables, maps, duel sessions)
//! - Recording presentation gateway
//! - Scripted battles for balance checks
//! - Determinism test harness and property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod determinism;
pub mod fixtures;
pub mod recording;

/// Re-export proptest for convenience.
pub use proptest;
