//! Error type for molecule construction and lookups.

use std::fmt;
use thiserror::Error;

/// Kind of entity a failed lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Atom,
    Residue,
    Chain,
    Assembly,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Atom => "atom",
            EntityKind::Residue => "residue",
            EntityKind::Chain => "chain",
            EntityKind::Assembly => "assembly",
        };
        f.write_str(name)
    }
}

/// Errors raised while building or querying a [`Molecule`](super::molecule::Molecule).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The record breaks a structural invariant: an out-of-range or self bond, an atom listed
    /// in two residues, a duplicate chain id, an unknown element, or an implausible mass.
    #[error("malformed structure record: {details}")]
    MalformedRecord { details: String },

    /// An assembly names an unknown chain, has no operations, or carries a non-orthonormal
    /// rotation.
    #[error("invalid bioassembly '{assembly}': {details}")]
    InvalidAssembly { assembly: String, details: String },

    /// A lookup by id found nothing.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },
}

impl Error {
    pub fn malformed(details: impl Into<String>) -> Self {
        Self::MalformedRecord {
            details: details.into(),
        }
    }

    pub fn invalid_assembly(assembly: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidAssembly {
            assembly: assembly.into(),
            details: details.into(),
        }
    }

    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}
