//! Utility modules providing cross-cutting functionality.
//!
//! Currently this holds the parallel iteration shim used by batch operations.

pub mod parallel;
