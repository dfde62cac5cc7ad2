//! # Duckov Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Sample catalog, formulas and game fixtures
//! - Item world invariant checks
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod invariants;

/// Re-export proptest for convenience.
pub use proptest;
