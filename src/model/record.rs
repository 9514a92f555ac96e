//! Format-neutral intermediate records produced by the parsers.
//!
//! A [`StructureRecord`] is plain data: atoms with positions in a declared unit, bonds by atom
//! index, chain/residue groupings, and optional assembly operators. Nothing here is validated;
//! [`Molecule::from_record`](super::molecule::Molecule::from_record) performs every consistency
//! check when the record is turned into a molecule.

use super::types::{BondOrder, LengthUnit};
use std::collections::BTreeMap;

/// One atom as read from a file.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    pub name: String,
    /// Element symbol; may be empty when only `atomic_number` is known.
    pub symbol: String,
    pub atomic_number: Option<u8>,
    /// Coordinates in the record's [`LengthUnit`].
    pub position: [f64; 3],
    pub formal_charge: f64,
    /// Explicit valence overriding the element default.
    pub valence: Option<u32>,
    /// Explicit mass (amu); checked against the element table.
    pub mass: Option<f64>,
}

impl AtomRecord {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, position: [f64; 3]) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            atomic_number: None,
            position,
            formal_charge: 0.0,
            valence: None,
            mass: None,
        }
    }

    pub fn with_charge(mut self, formal_charge: f64) -> Self {
        self.formal_charge = formal_charge;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondRecord {
    pub a: usize,
    pub b: usize,
    pub order: BondOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResidueRecord {
    pub name: String,
    pub seq: i32,
    pub insertion_code: Option<char>,
    pub atoms: Vec<usize>,
}

impl ResidueRecord {
    pub fn new(name: impl Into<String>, seq: i32) -> Self {
        Self {
            name: name.into(),
            seq,
            insertion_code: None,
            atoms: Vec::new(),
        }
    }
}

/// A chain grouping. Polymer atoms sit in `residues`; `atoms` lists atoms the chain owns
/// directly without a residue.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainRecord {
    pub id: String,
    pub residues: Vec<ResidueRecord>,
    pub atoms: Vec<usize>,
}

impl ChainRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            residues: Vec::new(),
            atoms: Vec::new(),
        }
    }
}

/// One assembly operator: a 4×4 row-major affine matrix and the chains it applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRecord {
    pub matrix: [[f64; 4]; 4],
    pub chains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyRecord {
    pub id: String,
    pub operations: Vec<OperationRecord>,
}

/// Everything a parser extracts from one structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureRecord {
    pub name: Option<String>,
    pub length_unit: LengthUnit,
    pub atoms: Vec<AtomRecord>,
    pub bonds: Vec<BondRecord>,
    pub chains: Vec<ChainRecord>,
    pub assemblies: Vec<AssemblyRecord>,
    pub metadata: BTreeMap<String, String>,
}

impl StructureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an atom and returns its index.
    pub fn push_atom(&mut self, atom: AtomRecord) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    pub fn push_bond(&mut self, a: usize, b: usize, order: BondOrder) {
        self.bonds.push(BondRecord { a, b, order });
    }

    /// Appends a chain and returns a mutable handle for filling in residues.
    pub fn push_chain(&mut self, chain: ChainRecord) -> &mut ChainRecord {
        self.chains.push(chain);
        let last = self.chains.len() - 1;
        &mut self.chains[last]
    }

    /// Finds a chain by id, creating it at the end when absent.
    pub(crate) fn chain_mut_or_insert(&mut self, id: &str) -> &mut ChainRecord {
        match self.chains.iter().position(|c| c.id == id) {
            Some(pos) => &mut self.chains[pos],
            None => self.push_chain(ChainRecord::new(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_helpers_return_indices_and_handles() {
        let mut record = StructureRecord::new();
        let a = record.push_atom(AtomRecord::new("O", "O", [0.0, 0.0, 0.0]));
        let b = record.push_atom(AtomRecord::new("H1", "H", [0.96, 0.0, 0.0]));
        record.push_bond(a, b, BondOrder::Single);

        let chain = record.push_chain(ChainRecord::new("W"));
        let mut residue = ResidueRecord::new("HOH", 1);
        residue.atoms = vec![a, b];
        chain.residues.push(residue);

        assert_eq!((a, b), (0, 1));
        assert_eq!(record.bonds.len(), 1);
        assert_eq!(record.chains[0].residues[0].atoms, vec![0, 1]);
        assert_eq!(record.length_unit, LengthUnit::Angstrom);
    }

    #[test]
    fn chain_mut_or_insert_reuses_existing_chain() {
        let mut record = StructureRecord::new();
        record.chain_mut_or_insert("A").atoms.push(0);
        record.chain_mut_or_insert("B").atoms.push(1);
        record.chain_mut_or_insert("A").atoms.push(2);

        assert_eq!(record.chains.len(), 2);
        assert_eq!(record.chains[0].atoms, vec![0, 2]);
    }

    #[test]
    fn atom_record_with_charge_sets_formal_charge() {
        let atom = AtomRecord::new("N1", "N", [1.0, 2.0, 3.0]).with_charge(-1.0);
        assert_eq!(atom.formal_charge, -1.0);
        assert!(atom.mass.is_none());
    }
}
