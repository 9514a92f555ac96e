//! High-level operations deriving new molecules from parsed ones.
//!
//! The assembly builder lives here: it replays the symmetry operators registered on a
//! molecule to reconstruct biological assemblies, one at a time or all at once. Operations
//! report failures with the crate's model [`Error`](crate::Error).

mod assembly;

pub use assembly::{build_all_assemblies, build_assembly, copied_chain_name};
