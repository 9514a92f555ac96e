//! Chains: named, index-based views over residues and atoms.

use std::fmt;

/// Named chain of a molecule.
///
/// A chain references its residues and atoms by index into the owning molecule. Polymer
/// chains reach their atoms through residues; non-polymeric chains may also hold atoms
/// directly. `atom_indices` always lists every atom of the chain in ascending (declaration)
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub(crate) name: String,
    pub(crate) index: usize,
    pub(crate) residues: Vec<usize>,
    pub(crate) atoms: Vec<usize>,
}

impl Chain {
    /// Chain identifier, unique within the owning molecule.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn residue_indices(&self) -> &[usize] {
        &self.residues
    }

    pub fn atom_indices(&self) -> &[usize] {
        &self.atoms
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn contains_atom(&self, atom_idx: usize) -> bool {
        self.atoms.binary_search(&atom_idx).is_ok()
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chain {{ name: \"{}\", residues: {}, atoms: {} }}",
            self.name,
            self.residue_count(),
            self.atom_count()
        )
    }
}
