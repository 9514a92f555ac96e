//! Format parsers producing [`StructureRecord`]s.
//!
//! Each submodule exposes a `read` function turning a buffered text stream into a
//! format-neutral record. [`Format`] selects the parser; [`read`] and [`read_file`] go one step
//! further and build the [`Molecule`].

mod error;
mod mmcif;
mod mol2;
mod pdb;
mod sdf;
mod xyz;

use crate::model::molecule::Molecule;
use crate::model::record::StructureRecord;
use log::debug;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

pub use error::Error;

pub use mmcif::reader::read as read_mmcif;
pub use mol2::reader::read as read_mol2;
pub use pdb::reader::read as read_pdb;
pub use sdf::reader::read as read_sdf;
pub use xyz::reader::read as read_xyz;

/// Supported structure file formats.
///
/// Parses from a name or extension through [`FromStr`] (`"cif".parse()` gives
/// [`Format::Mmcif`]) and displays as the conventional format name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Protein Data Bank fixed-column format (`.pdb`, `.ent`).
    Pdb,
    /// PDBx/mmCIF (`.cif`, `.mmcif`).
    Mmcif,
    /// MDL V2000 connection table (`.sdf`, `.mol`, `.sd`).
    Sdf,
    /// Tripos MOL2 (`.mol2`).
    Mol2,
    /// Element and coordinate rows (`.xyz`).
    Xyz,
}

impl Format {
    /// Maps a file extension (case-insensitive, without the dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdb" | "ent" => Some(Format::Pdb),
            "cif" | "mmcif" => Some(Format::Mmcif),
            "sdf" | "mol" | "sd" => Some(Format::Sdf),
            "mol2" => Some(Format::Mol2),
            "xyz" => Some(Format::Xyz),
            _ => None,
        }
    }

    /// Infers the format from the extension of `path`.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Pdb => "PDB",
            Format::Mmcif => "mmCIF",
            Format::Sdf => "SDF",
            Format::Mol2 => "MOL2",
            Format::Xyz => "XYZ",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim().trim_start_matches('.'))
            .ok_or_else(|| Error::unsupported_format(s))
    }
}

/// Parses a stream into a record with the parser for `format`.
///
/// Use this to inspect or adjust a record before building, e.g. with a custom
/// [`ValidationConfig`](crate::ValidationConfig) through
/// [`Molecule::from_record_with`](crate::Molecule::from_record_with).
///
/// # Errors
///
/// Returns [`Error::Parse`] or [`Error::Io`] from the format parser.
pub fn read_record<R: BufRead>(reader: R, format: Format) -> Result<StructureRecord, Error> {
    let record = match format {
        Format::Pdb => read_pdb(reader),
        Format::Mmcif => read_mmcif(reader),
        Format::Sdf => read_sdf(reader),
        Format::Mol2 => read_mol2(reader),
        Format::Xyz => read_xyz(reader),
    }?;

    debug!(
        "parsed {} record: {} atoms, {} bonds, {} chains, {} assemblies",
        format,
        record.atoms.len(),
        record.bonds.len(),
        record.chains.len(),
        record.assemblies.len()
    );

    Ok(record)
}

/// Parses a stream and builds the molecule with default validation.
///
/// # Errors
///
/// Returns the parser's errors, or [`Error::Model`] when the record fails validation.
pub fn read<R: BufRead>(reader: R, format: Format) -> Result<Molecule, Error> {
    let record = read_record(reader, format)?;
    Ok(Molecule::from_record(&record)?)
}

/// Reads a structure file, inferring the format from its extension.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for an unknown extension, [`Error::Io`] if the file
/// cannot be opened, [`Error::Parse`] for malformed content, and [`Error::Model`] when the
/// parsed record fails molecule validation.
pub fn read_file(path: impl AsRef<Path>) -> Result<Molecule, Error> {
    let path = path.as_ref();
    let format = Format::from_path(path)
        .ok_or_else(|| Error::unsupported_format(path.display().to_string()))?;
    let file = File::open(path).map_err(|e| Error::from_io(e, Some(path.to_path_buf())))?;

    read(BufReader::new(file), format).map_err(|e| e.at_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn format_from_extension_is_case_insensitive() {
        assert_eq!(Format::from_extension("PDB"), Some(Format::Pdb));
        assert_eq!(Format::from_extension("cif"), Some(Format::Mmcif));
        assert_eq!(Format::from_extension("mol"), Some(Format::Sdf));
        assert_eq!(Format::from_extension("Mol2"), Some(Format::Mol2));
        assert_eq!(Format::from_extension("xyz"), Some(Format::Xyz));
        assert_eq!(Format::from_extension("gro"), None);
    }

    #[test]
    fn format_from_path_uses_extension() {
        assert_eq!(Format::from_path(Path::new("data/1abc.cif")), Some(Format::Mmcif));
        assert_eq!(Format::from_path(Path::new("README")), None);
        assert!(".sdf".parse::<Format>().is_ok());
        assert!(matches!(
            "pqr".parse::<Format>(),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn read_file_rejects_unknown_extension() {
        assert!(matches!(
            read_file("structure.unknown"),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn read_file_reports_missing_files() {
        let err = read_file("definitely/missing/file.pdb").unwrap_err();
        assert!(matches!(err, Error::Io { path: Some(_), .. }));
    }

    #[test]
    fn read_builds_molecule_through_record() {
        let xyz = "3\nwater\nO 0.0 0.0 0.0\nH 0.9572 0.0 0.0\nH -0.24 0.927 0.0\n";
        let mol = read(Cursor::new(xyz), Format::Xyz).unwrap();

        assert_eq!(mol.num_atoms(), 3);
        assert_eq!(mol.name(), Some("water"));
        assert_eq!(mol.num_bonds(), 0);
    }
}
