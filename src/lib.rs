//! # MolForge
//!
//! **MolForge** is a pure-Rust molecular graph library that ingests small-molecule and macromolecular structure files into one format-neutral model and rebuilds biological assemblies from asymmetric units. Every parser emits the same intermediate record, so the model never branches on file format.
//!
//! ## Features
//!
//! - **Arena-backed graph model** – `Molecule` exclusively owns its `Atom`, `Bond`, `Residue`, and `Chain` entities and addresses them by stable index, so clones are deep and independent.
//! - **Multi-format ingestion** – Buffered readers for PDB, mmCIF, SDF/MOL, MOL2, and XYZ produce a `StructureRecord` with precise line-level diagnostics.
//! - **Bioassembly registry** – Symmetry operators from `REMARK 350` and `_pdbx_struct_assembly_gen` are validated at construction and exposed per assembly id.
//! - **Assembly reconstruction** – `ops::build_assembly` replays the registered operators on chain copies without touching the source; `ops::build_all_assemblies` builds every assembly in parallel.
//! - **Embedded element data** – Isotope and average masses, names, and default valences ship inside the crate.
//!
//! ## Example
//!
//! ```
//! use mol_forge::io::{Format, read};
//! use std::io::Cursor;
//!
//! let xyz = "3\nwater\nO 0.0 0.0 0.0\nH 0.9572 0.0 0.0\nH -0.2400 0.9266 0.0\n";
//! let water = read(Cursor::new(xyz), Format::Xyz)?;
//!
//! assert_eq!(water.num_atoms(), 3);
//! assert!((water.mass() - 18.0106).abs() < 1e-3);
//! # Ok::<(), mol_forge::io::Error>(())
//! ```

mod db;
mod model;
mod utils;

pub mod io;
pub mod ops;

pub use model::atom::Atom;
pub use model::bioassembly::{AssemblyOperation, Bioassembly, Properties};
pub use model::bond::Bond;
pub use model::chain::Chain;
pub use model::config::ValidationConfig;
pub use model::element::{Element, ParseElementError};
pub use model::error::{EntityKind, Error};
pub use model::molecule::Molecule;
pub use model::record::{
    AssemblyRecord, AtomRecord, BondRecord, ChainRecord, OperationRecord, ResidueRecord,
    StructureRecord,
};
pub use model::residue::{Residue, ResidueKind};
pub use model::transform::Transform;
pub use model::types::{BondOrder, LengthUnit, Point};
