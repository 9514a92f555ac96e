//! The molecular graph: an arena of atoms, bonds, residues, and chains.
//!
//! A [`Molecule`] exclusively owns every entity it contains. Atoms, residues, and chains refer
//! to one another by their index in the molecule's arenas, so cloning a molecule is a deep copy
//! with no shared state. Topology is fixed once construction succeeds; only coordinates may be
//! changed afterwards, and only through rigid-body operations.

use super::atom::Atom;
use super::bioassembly::{AssemblyOperation, Bioassembly, Properties};
use super::bond::Bond;
use super::chain::Chain;
use super::config::ValidationConfig;
use super::element::Element;
use super::error::{EntityKind, Error};
use super::record::{AssemblyRecord, AtomRecord, StructureRecord};
use super::residue::Residue;
use super::transform::Transform;
use super::types::Point;
use log::debug;
use nalgebra::{Rotation3, Vector3};
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};
use std::fmt;

const DEFAULT_CHAIN_ID: &str = "A";
const DEFAULT_RESIDUE_NAME: &str = "UNL";

/// Aggregate root of the molecular graph.
///
/// A molecule is built once from a [`StructureRecord`] and afterwards only allows rigid-body
/// coordinate changes. It remembers the [`ValidationConfig`] it was built with, so later
/// tolerance-dependent work (equality, assembly building) uses the same thresholds.
#[derive(Debug, Clone)]
pub struct Molecule {
    /// Record name, usually the PDB id or the small-molecule title line.
    pub(crate) name: Option<String>,
    /// Atoms in declaration order; an atom's index is its position here.
    pub(crate) atoms: Vec<Atom>,
    /// Unique unordered bonds.
    pub(crate) bonds: Vec<Bond>,
    pub(crate) residues: Vec<Residue>,
    pub(crate) chains: Vec<Chain>,
    /// Bioassembly registry and format metadata.
    pub(crate) properties: Properties,
    /// Validation settings used at construction.
    pub(crate) config: ValidationConfig,
    /// Bond indices incident to each atom.
    adjacency: Vec<Vec<usize>>,
}

impl Molecule {
    /// Builds a molecule from a parsed record using [`ValidationConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] when the record is self-inconsistent and
    /// [`Error::InvalidAssembly`] when an assembly references unknown chains or carries a
    /// non-orthonormal rotation.
    pub fn from_record(record: &StructureRecord) -> Result<Self, Error> {
        Self::from_record_with(record, &ValidationConfig::default())
    }

    /// Builds a molecule from a parsed record with explicit validation settings.
    ///
    /// Positions and assembly translations are converted from the record's length unit into
    /// ångströms. A record without chain groupings receives a single chain `A` with one residue
    /// named after the record, so every atom of a small molecule has a chain.
    ///
    /// # Arguments
    ///
    /// * `record` - Parser output to validate and convert.
    /// * `config` - Tolerances and switches; a copy is stored on the molecule and reused by
    ///   equality and by [`crate::ops::build_assembly`].
    ///
    /// # Returns
    ///
    /// The validated molecule with its bioassembly registry populated.
    ///
    /// # Errors
    ///
    /// Same as [`Molecule::from_record`].
    pub fn from_record_with(
        record: &StructureRecord,
        config: &ValidationConfig,
    ) -> Result<Self, Error> {
        let scale = record.length_unit.to_angstrom();

        let atoms = record
            .atoms
            .iter()
            .enumerate()
            .map(|(index, atom)| build_atom(index, atom, scale, config))
            .collect::<Result<Vec<_>, _>>()?;

        let mut molecule = Self {
            name: record.name.clone(),
            adjacency: vec![Vec::new(); atoms.len()],
            atoms,
            bonds: Vec::with_capacity(record.bonds.len()),
            residues: Vec::new(),
            chains: Vec::new(),
            properties: Properties {
                bioassemblies: Default::default(),
                metadata: record.metadata.clone(),
            },
            config: config.clone(),
        };

        molecule.add_bonds(record)?;

        if record.chains.is_empty() {
            molecule.add_default_chain(record);
        } else {
            molecule.add_chains(record)?;
        }

        for assembly in &record.assemblies {
            let built = molecule.build_bioassembly(assembly, scale, config)?;
            if molecule
                .properties
                .bioassemblies
                .insert(built.id().to_string(), built)
                .is_some()
            {
                return Err(Error::invalid_assembly(
                    &assembly.id,
                    "assembly id is declared more than once",
                ));
            }
        }

        debug!(
            "built molecule {:?}: {} atoms, {} bonds, {} chains, {} residues, {} assemblies",
            molecule.name,
            molecule.atoms.len(),
            molecule.bonds.len(),
            molecule.chains.len(),
            molecule.residues.len(),
            molecule.properties.bioassemblies.len()
        );

        Ok(molecule)
    }

    fn add_bonds(&mut self, record: &StructureRecord) -> Result<(), Error> {
        let mut seen = HashSet::with_capacity(record.bonds.len());
        for bond in &record.bonds {
            for idx in [bond.a, bond.b] {
                if idx >= self.atoms.len() {
                    return Err(Error::malformed(format!(
                        "bond {}-{} references unknown atom {} (record has {} atoms)",
                        bond.a,
                        bond.b,
                        idx,
                        self.atoms.len()
                    )));
                }
            }
            if bond.a == bond.b {
                return Err(Error::malformed(format!(
                    "atom {} is bonded to itself",
                    bond.a
                )));
            }
            let bond = Bond::new(bond.a, bond.b, bond.order);
            if !seen.insert(bond.key()) {
                return Err(Error::malformed(format!(
                    "duplicate bond between atoms {} and {}",
                    bond.a1_idx, bond.a2_idx
                )));
            }
            self.push_bond(bond);
        }
        Ok(())
    }

    fn add_default_chain(&mut self, record: &StructureRecord) {
        if self.atoms.is_empty() {
            return;
        }
        let atoms: Vec<usize> = (0..self.atoms.len()).collect();
        let residue_name = record
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_RESIDUE_NAME);

        for atom in &mut self.atoms {
            atom.chain = Some(0);
            atom.residue = Some(0);
        }
        self.residues.push(Residue {
            name: SmolStr::new(residue_name),
            seq: 1,
            insertion_code: None,
            index: 0,
            chain: 0,
            atoms: atoms.clone(),
        });
        self.chains.push(Chain {
            name: DEFAULT_CHAIN_ID.to_string(),
            index: 0,
            residues: vec![0],
            atoms,
        });
    }

    fn add_chains(&mut self, record: &StructureRecord) -> Result<(), Error> {
        let mut names = HashSet::with_capacity(record.chains.len());

        for chain_record in &record.chains {
            if !names.insert(chain_record.id.as_str()) {
                return Err(Error::malformed(format!(
                    "chain id '{}' is declared more than once",
                    chain_record.id
                )));
            }

            let chain_idx = self.chains.len();
            let mut chain_atoms = Vec::new();
            let mut chain_residues = Vec::with_capacity(chain_record.residues.len());

            for residue_record in &chain_record.residues {
                let residue_idx = self.residues.len();
                for &atom_idx in &residue_record.atoms {
                    self.claim_atom(atom_idx, chain_idx, Some(residue_idx), &chain_record.id)?;
                }
                chain_atoms.extend_from_slice(&residue_record.atoms);
                chain_residues.push(residue_idx);
                self.residues.push(Residue {
                    name: SmolStr::new(residue_record.name.trim()),
                    seq: residue_record.seq,
                    insertion_code: residue_record.insertion_code,
                    index: residue_idx,
                    chain: chain_idx,
                    atoms: residue_record.atoms.clone(),
                });
            }

            for &atom_idx in &chain_record.atoms {
                self.claim_atom(atom_idx, chain_idx, None, &chain_record.id)?;
            }
            chain_atoms.extend_from_slice(&chain_record.atoms);
            chain_atoms.sort_unstable();

            self.chains.push(Chain {
                name: chain_record.id.clone(),
                index: chain_idx,
                residues: chain_residues,
                atoms: chain_atoms,
            });
        }
        Ok(())
    }

    fn claim_atom(
        &mut self,
        atom_idx: usize,
        chain_idx: usize,
        residue_idx: Option<usize>,
        chain_id: &str,
    ) -> Result<(), Error> {
        let count = self.atoms.len();
        let atom = self.atoms.get_mut(atom_idx).ok_or_else(|| {
            Error::malformed(format!(
                "chain '{}' references unknown atom {} (record has {} atoms)",
                chain_id, atom_idx, count
            ))
        })?;
        if atom.chain.is_some() {
            return Err(Error::malformed(format!(
                "atom {} is claimed by more than one chain or residue",
                atom_idx
            )));
        }
        atom.chain = Some(chain_idx);
        atom.residue = residue_idx;
        Ok(())
    }

    fn build_bioassembly(
        &self,
        record: &AssemblyRecord,
        scale: f64,
        config: &ValidationConfig,
    ) -> Result<Bioassembly, Error> {
        if record.operations.is_empty() {
            return Err(Error::invalid_assembly(&record.id, "no operations declared"));
        }

        let mut operations = Vec::with_capacity(record.operations.len());
        for (op_idx, op) in record.operations.iter().enumerate() {
            let mut transform = Transform::from_rows(op.matrix);
            transform.scale_translation(scale);

            if op.matrix.iter().flatten().any(|v| !v.is_finite()) {
                return Err(Error::invalid_assembly(
                    &record.id,
                    format!("operation {} has non-finite matrix entries", op_idx),
                ));
            }
            if config.validate_rotations && !transform.is_orthonormal(config.rotation_tolerance) {
                return Err(Error::invalid_assembly(
                    &record.id,
                    format!("operation {} has a non-orthonormal rotation", op_idx),
                ));
            }

            // An empty scope applies the operator to every chain.
            let chains = if op.chains.is_empty() {
                self.chains.iter().map(|c| c.name.clone()).collect()
            } else {
                let mut scope: Vec<String> = Vec::with_capacity(op.chains.len());
                for chain in &op.chains {
                    if self.chain_index(chain).is_none() {
                        return Err(Error::invalid_assembly(
                            &record.id,
                            format!("operation {} references unknown chain '{}'", op_idx, chain),
                        ));
                    }
                    // Repeated ids (e.g. `AND CHAINS:` restating a chain) collapse to one.
                    if !scope.contains(chain) {
                        scope.push(chain.clone());
                    }
                }
                scope
            };

            operations.push(AssemblyOperation::new(transform, chains));
        }

        Ok(Bioassembly::new(record.id.clone(), operations))
    }

    fn push_bond(&mut self, bond: Bond) {
        let bond_idx = self.bonds.len();
        self.adjacency[bond.a1_idx].push(bond_idx);
        self.adjacency[bond.a2_idx].push(bond_idx);
        self.bonds.push(bond);
    }

    /// Record name, if the source file carried one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// All atoms; slice position equals [`Atom::index`].
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Chains in declaration order, with any assembly copies appended after the source chains.
    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn num_bonds(&self) -> usize {
        self.bonds.len()
    }

    pub fn num_chains(&self) -> usize {
        self.chains.len()
    }

    pub fn num_residues(&self) -> usize {
        self.residues.len()
    }

    /// Total mass in amu.
    pub fn mass(&self) -> f64 {
        self.atoms.iter().map(|a| a.mass).sum()
    }

    /// Net formal charge.
    pub fn charge(&self) -> f64 {
        self.atoms.iter().map(|a| a.formal_charge).sum()
    }

    /// Looks up a chain by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no chain carries `id`.
    pub fn chain(&self, id: &str) -> Result<&Chain, Error> {
        self.chain_index(id)
            .map(|idx| &self.chains[idx])
            .ok_or_else(|| Error::not_found(EntityKind::Chain, id))
    }

    /// Arena index of chain `id`, or `None` if absent.
    pub fn chain_index(&self, id: &str) -> Option<usize> {
        self.chains.iter().position(|c| c.name == id)
    }

    pub fn chain_at(&self, index: usize) -> Option<&Chain> {
        self.chains.get(index)
    }

    /// Atoms of `chain` in atom-index order.
    pub fn chain_atoms<'a>(&'a self, chain: &'a Chain) -> impl Iterator<Item = &'a Atom> + 'a {
        chain.atoms.iter().map(move |&idx| &self.atoms[idx])
    }

    /// Positions of the atoms of chain `id` in atom-index order.
    pub fn chain_positions(&self, id: &str) -> Result<Vec<Point>, Error> {
        let chain = self.chain(id)?;
        Ok(self.chain_atoms(chain).map(|a| a.pos).collect())
    }

    pub fn residue_atoms<'a>(
        &'a self,
        residue: &'a Residue,
    ) -> impl Iterator<Item = &'a Atom> + 'a {
        residue.atoms.iter().map(move |&idx| &self.atoms[idx])
    }

    pub fn positions(&self) -> Vec<Point> {
        self.atoms.iter().map(|a| a.pos).collect()
    }

    /// Bonds incident to the atom at `atom_idx`; empty for an unknown index.
    pub fn bonds_of(&self, atom_idx: usize) -> impl Iterator<Item = &Bond> + '_ {
        self.adjacency
            .get(atom_idx)
            .into_iter()
            .flatten()
            .map(move |&bond_idx| &self.bonds[bond_idx])
    }

    /// Atom indices bonded to `atom_idx`.
    pub fn neighbors_of(&self, atom_idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.bonds_of(atom_idx)
            .filter_map(move |bond| bond.partner(atom_idx))
    }

    /// Bioassembly registry and format metadata carried over from the record.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Validation settings this molecule was constructed with.
    pub fn validation_config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Looks up a registered biological assembly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when `id` is not registered.
    pub fn bioassembly(&self, id: &str) -> Result<&Bioassembly, Error> {
        self.properties
            .bioassembly(id)
            .ok_or_else(|| Error::not_found(EntityKind::Assembly, id))
    }

    /// Unweighted centroid; the origin for an empty molecule.
    pub fn geometric_center(&self) -> Point {
        if self.atoms.is_empty() {
            return Point::origin();
        }
        let sum = self
            .atoms
            .iter()
            .fold(Vector3::zeros(), |acc, atom| acc + atom.pos.coords);
        Point::from(sum / self.atoms.len() as f64)
    }

    /// Mass-weighted centroid; the origin for an empty or massless molecule.
    pub fn center_of_mass(&self) -> Point {
        let total = self.mass();
        if total <= 0.0 {
            return Point::origin();
        }
        let weighted = self
            .atoms
            .iter()
            .fold(Vector3::zeros(), |acc, atom| acc + atom.pos.coords * atom.mass);
        Point::from(weighted / total)
    }

    /// Moves a single atom.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when `index` is out of range.
    pub fn set_position(&mut self, index: usize, pos: Point) -> Result<(), Error> {
        let atom = self
            .atoms
            .get_mut(index)
            .ok_or_else(|| Error::not_found(EntityKind::Atom, index.to_string()))?;
        atom.pos = pos;
        Ok(())
    }

    pub fn translate(&mut self, offset: &Vector3<f64>) {
        for atom in &mut self.atoms {
            atom.pos += *offset;
        }
    }

    /// Rotates every atom about the origin.
    pub fn rotate(&mut self, rotation: &Rotation3<f64>) {
        for atom in &mut self.atoms {
            atom.pos = rotation * atom.pos;
        }
    }

    pub fn apply_transform(&mut self, transform: &Transform) {
        for atom in &mut self.atoms {
            atom.pos = transform.apply(&atom.pos);
        }
    }

    /// Compares atom content (element, formal charge, position within `tolerance`), bond
    /// topology with orders, and chain membership. Names, identifiers, metadata, and the
    /// bioassembly registry are ignored.
    ///
    /// # Arguments
    ///
    /// * `other` - Molecule to compare against.
    /// * `tolerance` - Maximum per-coordinate and per-charge deviation.
    ///
    /// # Returns
    ///
    /// `true` when both molecules describe the same graph; tolerance misses are not errors.
    pub fn structurally_eq(&self, other: &Molecule, tolerance: f64) -> bool {
        if self.atoms.len() != other.atoms.len()
            || self.bonds.len() != other.bonds.len()
            || self.chains.len() != other.chains.len()
        {
            return false;
        }

        let atoms_match = self
            .atoms
            .iter()
            .zip(&other.atoms)
            .all(|(a, b)| a.same_content(b, tolerance));
        if !atoms_match {
            return false;
        }

        let mut own_bonds: Vec<_> = self.bonds.iter().map(|b| (b.key(), b.order.code())).collect();
        let mut other_bonds: Vec<_> = other
            .bonds
            .iter()
            .map(|b| (b.key(), b.order.code()))
            .collect();
        own_bonds.sort_unstable();
        other_bonds.sort_unstable();
        if own_bonds != other_bonds {
            return false;
        }

        self.chains
            .iter()
            .zip(&other.chains)
            .all(|(a, b)| a.atoms == b.atoms)
    }

    /// Moves every atom of chain `chain_idx` through `transform`, leaving other chains alone.
    pub(crate) fn transform_chain(&mut self, chain_idx: usize, transform: &Transform) {
        let Some(chain) = self.chains.get(chain_idx) else {
            return;
        };
        for &atom_idx in &chain.atoms {
            let atom = &mut self.atoms[atom_idx];
            atom.pos = transform.apply(&atom.pos);
        }
    }

    /// Appends a copy of `chain_idx` from `source` under `name`, moving every copied atom
    /// through `transform`. Residues and bonds internal to the chain are replicated.
    pub(crate) fn append_chain_copy(
        &mut self,
        source: &Molecule,
        chain_idx: usize,
        name: String,
        transform: &Transform,
    ) {
        let source_chain = &source.chains[chain_idx];
        let new_chain_idx = self.chains.len();
        let mut atom_map = HashMap::with_capacity(source_chain.atoms.len());
        let mut new_atoms = Vec::with_capacity(source_chain.atoms.len());

        for &old_idx in &source_chain.atoms {
            let new_idx = self.atoms.len();
            let mut atom = source.atoms[old_idx].clone();
            atom.index = new_idx;
            atom.chain = Some(new_chain_idx);
            atom.residue = None;
            atom.pos = transform.apply(&atom.pos);
            self.atoms.push(atom);
            self.adjacency.push(Vec::new());
            atom_map.insert(old_idx, new_idx);
            new_atoms.push(new_idx);
        }

        let mut new_residues = Vec::with_capacity(source_chain.residues.len());
        for &old_res in &source_chain.residues {
            let source_residue = &source.residues[old_res];
            let new_res = self.residues.len();
            let atoms: Vec<usize> = source_residue
                .atoms
                .iter()
                .filter_map(|old| atom_map.get(old).copied())
                .collect();
            for &idx in &atoms {
                self.atoms[idx].residue = Some(new_res);
            }
            self.residues.push(Residue {
                name: source_residue.name.clone(),
                seq: source_residue.seq,
                insertion_code: source_residue.insertion_code,
                index: new_res,
                chain: new_chain_idx,
                atoms,
            });
            new_residues.push(new_res);
        }

        for &old_idx in &source_chain.atoms {
            for bond in source.bonds_of(old_idx) {
                let Some(partner) = bond.partner(old_idx) else {
                    continue;
                };
                if partner < old_idx {
                    continue;
                }
                if let (Some(&a), Some(&b)) = (atom_map.get(&old_idx), atom_map.get(&partner)) {
                    self.push_bond(Bond::new(a, b, bond.order));
                }
            }
        }

        self.chains.push(Chain {
            name,
            index: new_chain_idx,
            residues: new_residues,
            atoms: new_atoms,
        });
    }
}

impl PartialEq for Molecule {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_eq(other, self.config.position_tolerance)
    }
}

impl fmt::Display for Molecule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Molecule {{ name: \"{}\", atoms: {}, bonds: {}, chains: {}, residues: {}, assemblies: {} }}",
            self.name.as_deref().unwrap_or(""),
            self.num_atoms(),
            self.num_bonds(),
            self.num_chains(),
            self.num_residues(),
            self.properties.bioassemblies.len()
        )
    }
}

fn build_atom(
    index: usize,
    record: &AtomRecord,
    scale: f64,
    config: &ValidationConfig,
) -> Result<Atom, Error> {
    let symbol = record.symbol.trim();
    let by_symbol = if symbol.is_empty() {
        None
    } else {
        Some(Element::from_symbol(symbol).ok_or_else(|| {
            Error::malformed(format!("atom {}: unknown element symbol '{}'", index, symbol))
        })?)
    };
    let by_number = match record.atomic_number {
        Some(number) => Some(Element::from_atomic_number(number).ok_or_else(|| {
            Error::malformed(format!("atom {}: invalid atomic number {}", index, number))
        })?),
        None => None,
    };

    let element = match (by_symbol, by_number) {
        (Some(a), Some(b)) if a != b => {
            return Err(Error::malformed(format!(
                "atom {}: symbol '{}' disagrees with atomic number {}",
                index,
                symbol,
                b.atomic_number()
            )));
        }
        (Some(element), _) | (None, Some(element)) => element,
        (None, None) => {
            return Err(Error::malformed(format!(
                "atom {} ('{}') has neither an element symbol nor an atomic number",
                index, record.name
            )));
        }
    };

    let mass = match record.mass {
        Some(mass) => {
            let near_isotope = (mass - element.mass()).abs() <= config.mass_tolerance;
            let near_average = (mass - element.average_mass()).abs() <= config.mass_tolerance;
            if !near_isotope && !near_average {
                return Err(Error::malformed(format!(
                    "atom {}: mass {:.4} does not match element {} ({:.4} or {:.4})",
                    index,
                    mass,
                    element,
                    element.mass(),
                    element.average_mass()
                )));
            }
            mass
        }
        None => element.mass(),
    };

    let [x, y, z] = record.position;
    if !(x.is_finite() && y.is_finite() && z.is_finite()) {
        return Err(Error::malformed(format!(
            "atom {} has a non-finite coordinate",
            index
        )));
    }

    let mut atom = Atom::new(record.name.trim(), element, Point::new(x, y, z) * scale);
    atom.index = index;
    atom.mass = mass;
    atom.formal_charge = record.formal_charge;
    if let Some(valence) = record.valence {
        atom.valence = valence;
    }
    Ok(atom)
}
