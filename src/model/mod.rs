//! Core data structures of the molecular graph.
//!
//! This module defines atoms, bonds, residues, chains, and the [`Molecule`](molecule::Molecule)
//! arena that owns them, together with the format-neutral [`StructureRecord`](record::StructureRecord)
//! the parsers emit and the biological-assembly registry built from it.

pub mod atom;
pub mod bioassembly;
pub mod bond;
pub mod chain;
pub mod config;
pub mod element;
pub mod error;
pub mod molecule;
pub mod record;
pub mod residue;
pub mod transform;
pub mod types;
