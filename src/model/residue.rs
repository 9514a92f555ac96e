//! Residues and their coarse classification.

use smol_str::SmolStr;
use std::fmt;

/// Coarse classification of a residue derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResidueKind {
    Protein,
    Nucleic,
    Water,
    Ion,
    Other,
}

impl ResidueKind {
    /// Classifies a residue name, case-insensitively. Unknown names are [`ResidueKind::Other`].
    pub fn classify(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "ALA" | "ARG" | "ASN" | "ASP" | "CYS" | "GLN" | "GLU" | "GLY" | "HIS" | "ILE"
            | "LEU" | "LYS" | "MET" | "PHE" | "PRO" | "SER" | "THR" | "TRP" | "TYR" | "VAL"
            | "SEC" | "PYL" | "MSE" | "HID" | "HIE" | "HIP" | "CYX" | "ASH" | "GLH" | "LYN" => {
                ResidueKind::Protein
            }
            "A" | "C" | "G" | "U" | "I" | "DA" | "DC" | "DG" | "DT" | "DI" | "DU" => {
                ResidueKind::Nucleic
            }
            "HOH" | "WAT" | "H2O" | "SOL" | "TIP3" | "DOD" => ResidueKind::Water,
            "NA" | "K" | "CL" | "MG" | "CA" | "ZN" | "MN" | "FE" | "FE2" | "CU" | "CU1"
            | "CO" | "NI" | "CD" | "BR" | "IOD" | "LI" | "CS" | "RB" | "SR" | "BA" => {
                ResidueKind::Ion
            }
            _ => ResidueKind::Other,
        }
    }

    pub fn is_polymer(&self) -> bool {
        matches!(self, ResidueKind::Protein | ResidueKind::Nucleic)
    }
}

impl fmt::Display for ResidueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ResidueKind::Protein => "Protein",
            ResidueKind::Nucleic => "Nucleic Acid",
            ResidueKind::Water => "Water",
            ResidueKind::Ion => "Ion",
            ResidueKind::Other => "Other",
        };
        write!(f, "{}", name)
    }
}

/// Named group of atoms inside a chain (an amino acid, nucleotide, ligand, or water).
#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    /// Residue name (e.g. `ALA`, `HOH`, `UNL`).
    pub name: SmolStr,
    /// Sequence number from the source file.
    pub seq: i32,
    /// Insertion code disambiguating residues that share `seq`.
    pub insertion_code: Option<char>,
    pub(crate) index: usize,
    pub(crate) chain: usize,
    pub(crate) atoms: Vec<usize>,
}

impl Residue {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Index of the owning chain within the molecule.
    pub fn chain_index(&self) -> usize {
        self.chain
    }

    /// Molecule atom indices belonging to this residue, in declaration order.
    pub fn atom_indices(&self) -> &[usize] {
        &self.atoms
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn kind(&self) -> ResidueKind {
        ResidueKind::classify(&self.name)
    }
}

impl fmt::Display for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.insertion_code {
            Some(code) => write!(
                f,
                "Residue {{ name: \"{}\", seq: {}{}, atoms: {} }}",
                self.name,
                self.seq,
                code,
                self.atom_count()
            ),
            None => write!(
                f,
                "Residue {{ name: \"{}\", seq: {}, atoms: {} }}",
                self.name,
                self.seq,
                self.atom_count()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residue(name: &str, seq: i32, insertion_code: Option<char>) -> Residue {
        Residue {
            name: SmolStr::new(name),
            seq,
            insertion_code,
            index: 0,
            chain: 0,
            atoms: vec![0, 1, 2],
        }
    }

    #[test]
    fn classify_recognizes_common_residue_families() {
        assert_eq!(ResidueKind::classify("GLY"), ResidueKind::Protein);
        assert_eq!(ResidueKind::classify("mse"), ResidueKind::Protein);
        assert_eq!(ResidueKind::classify("DA"), ResidueKind::Nucleic);
        assert_eq!(ResidueKind::classify("U"), ResidueKind::Nucleic);
        assert_eq!(ResidueKind::classify("WAT"), ResidueKind::Water);
        assert_eq!(ResidueKind::classify("ZN"), ResidueKind::Ion);
        assert_eq!(ResidueKind::classify("UNL"), ResidueKind::Other);
    }

    #[test]
    fn polymer_kinds_are_protein_and_nucleic() {
        assert!(ResidueKind::Protein.is_polymer());
        assert!(ResidueKind::Nucleic.is_polymer());
        assert!(!ResidueKind::Water.is_polymer());
        assert!(!ResidueKind::Ion.is_polymer());
        assert!(!ResidueKind::Other.is_polymer());
    }

    #[test]
    fn residue_reports_atoms_and_kind() {
        let res = residue("ALA", 4, None);

        assert_eq!(res.atom_indices(), &[0, 1, 2]);
        assert_eq!(res.atom_count(), 3);
        assert!(!res.is_empty());
        assert_eq!(res.kind(), ResidueKind::Protein);
    }

    #[test]
    fn residue_display_includes_insertion_code() {
        assert_eq!(
            residue("SER", 10, Some('A')).to_string(),
            "Residue { name: \"SER\", seq: 10A, atoms: 3 }"
        );
        assert_eq!(
            residue("SER", 10, None).to_string(),
            "Residue { name: \"SER\", seq: 10, atoms: 3 }"
        );
    }
}
