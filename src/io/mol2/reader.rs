//! Reader for Tripos MOL2 files.
//!
//! Sections are introduced by `@<TRIPOS>` tags; `MOLECULE`, `ATOM`, `BOND`, and
//! `SUBSTRUCTURE` are understood and every other section is skipped.

use crate::io::Format;
use crate::io::error::Error;
use crate::model::record::{AtomRecord, ChainRecord, ResidueRecord, StructureRecord};
use crate::model::types::BondOrder;
use log::warn;
use std::collections::HashMap;
use std::io::BufRead;

const FORMAT: Format = Format::Mol2;

/// Chain assigned to substructure-annotated MOL2 atoms; the format has no chain column.
const MOL2_CHAIN_ID: &str = "A";

struct Substructure {
    id: String,
    name: String,
    atoms: Vec<usize>,
}

/// Reads the first molecule of a Tripos MOL2 file.
///
/// Elements come from the SYBYL atom type prefix (`C.ar` → C). When atoms carry
/// substructure ids, each substructure becomes a residue of chain `A`. Partial charges are
/// not formal charges and are ignored.
///
/// # Errors
///
/// Returns [`Error::Parse`] when a required section is missing, a row cannot be parsed, a bond
/// names an unknown atom id or type, or the declared atom/bond counts disagree with the rows.
pub fn read<R: BufRead>(reader: R) -> Result<StructureRecord, Error> {
    let mut record = StructureRecord::new();
    record.metadata.insert("format".to_string(), "mol2".to_string());

    let mut section = Section::None;
    let mut molecule_lines_seen = 0usize;
    let mut molecules_seen = 0usize;

    let mut expected_atoms: Option<usize> = None;
    let mut expected_bonds: Option<usize> = None;

    let mut atom_ids: HashMap<usize, usize> = HashMap::new();
    let mut substructures: Vec<Substructure> = Vec::new();
    let mut unassigned_atoms = 0usize;
    let mut bond_records: Vec<(usize, usize, usize, BondOrder)> = Vec::new();

    for (idx, line_res) in reader.lines().enumerate() {
        let line = line_res.map_err(|e| Error::from_io(e, None))?;
        let line_number = idx + 1;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix("@<TRIPOS>") {
            section = match header {
                "MOLECULE" => {
                    molecules_seen += 1;
                    if molecules_seen > 1 {
                        warn!("MOL2: only the first molecule is read");
                        break;
                    }
                    molecule_lines_seen = 0;
                    Section::Molecule
                }
                "ATOM" => Section::Atom,
                "BOND" => Section::Bond,
                _ => Section::None,
            };
            continue;
        }

        match section {
            Section::Molecule => {
                molecule_lines_seen += 1;
                match molecule_lines_seen {
                    1 if trimmed != "****" => record.name = Some(trimmed.to_string()),
                    2 => {
                        let (atoms, bonds) = parse_expected_counts(trimmed, line_number)?;
                        expected_atoms = Some(atoms);
                        expected_bonds = bonds;
                    }
                    3 => {
                        record
                            .metadata
                            .insert("molecule_type".to_string(), trimmed.to_string());
                    }
                    4 => {
                        record
                            .metadata
                            .insert("charge_type".to_string(), trimmed.to_string());
                    }
                    _ => {}
                }
            }
            Section::Atom => {
                let tokens: Vec<&str> = trimmed.split_whitespace().collect();
                if tokens.len() < 6 {
                    return Err(Error::parse(
                        FORMAT,
                        line_number,
                        "ATOM record must include id, name, coordinates, and type",
                    ));
                }
                let atom_id = tokens[0]
                    .parse::<usize>()
                    .map_err(|_| Error::parse(FORMAT, line_number, "Invalid atom id"))?;
                if atom_ids.contains_key(&atom_id) {
                    return Err(Error::parse(
                        FORMAT,
                        line_number,
                        format!("Duplicate atom id {atom_id}"),
                    ));
                }

                let mut position = [0.0; 3];
                for (slot, token) in position.iter_mut().zip(&tokens[2..5]) {
                    *slot = token.parse::<f64>().map_err(|_| {
                        Error::parse(FORMAT, line_number, format!("Invalid coordinate '{token}'"))
                    })?;
                }
                let symbol = element_from_sybyl_type(tokens[5]).ok_or_else(|| {
                    Error::parse(
                        FORMAT,
                        line_number,
                        format!("Atom type '{}' has no element", tokens[5]),
                    )
                })?;

                let atom_idx = record.push_atom(AtomRecord::new(tokens[1], symbol, position));
                atom_ids.insert(atom_id, atom_idx);

                match (tokens.get(6), tokens.get(7)) {
                    (Some(subst_id), subst_name) => {
                        let name = subst_name.copied().unwrap_or("UNL");
                        match substructures.iter_mut().find(|s| s.id == *subst_id) {
                            Some(existing) => existing.atoms.push(atom_idx),
                            None => substructures.push(Substructure {
                                id: subst_id.to_string(),
                                name: name.to_string(),
                                atoms: vec![atom_idx],
                            }),
                        }
                    }
                    (None, _) => unassigned_atoms += 1,
                }
            }
            Section::Bond => {
                let tokens: Vec<&str> = trimmed.split_whitespace().collect();
                if tokens.len() < 4 {
                    return Err(Error::parse(
                        FORMAT,
                        line_number,
                        "BOND record must include id, endpoints, and bond type",
                    ));
                }

                let origin = tokens[1].parse::<usize>().map_err(|_| {
                    Error::parse(FORMAT, line_number, "Invalid origin atom id")
                })?;
                let target = tokens[2].parse::<usize>().map_err(|_| {
                    Error::parse(FORMAT, line_number, "Invalid target atom id")
                })?;
                match parse_bond_order_token(tokens[3], line_number)? {
                    Some(order) => bond_records.push((line_number, origin, target, order)),
                    None => continue,
                }
            }
            Section::None => {}
        }
    }

    if molecules_seen == 0 {
        return Err(Error::parse(
            FORMAT,
            0,
            "Missing @<TRIPOS>MOLECULE section",
        ));
    }

    if let Some(expected) = expected_atoms {
        if expected != record.atoms.len() {
            return Err(Error::parse(
                FORMAT,
                0,
                format!("Declared {expected} atoms but parsed {}", record.atoms.len()),
            ));
        }
    }
    if let Some(expected) = expected_bonds {
        if expected != bond_records.len() {
            return Err(Error::parse(
                FORMAT,
                0,
                format!(
                    "Declared {expected} bonds but parsed {}",
                    bond_records.len()
                ),
            ));
        }
    }

    for (line_number, origin, target, order) in bond_records {
        let resolve = |id: usize| {
            atom_ids.get(&id).copied().ok_or_else(|| {
                Error::parse(
                    FORMAT,
                    line_number,
                    format!("Bond references unknown atom id {id}"),
                )
            })
        };
        let a = resolve(origin)?;
        let b = resolve(target)?;
        record.push_bond(a, b, order);
    }

    if !substructures.is_empty() {
        if unassigned_atoms > 0 {
            warn!(
                "MOL2: {} atoms have no substructure and stay outside chain {}",
                unassigned_atoms, MOL2_CHAIN_ID
            );
        }
        let chain = record.push_chain(ChainRecord::new(MOL2_CHAIN_ID));
        for (position, substructure) in substructures.into_iter().enumerate() {
            let seq = substructure
                .id
                .parse::<i32>()
                .unwrap_or(position as i32 + 1);
            let mut residue = ResidueRecord::new(substructure.name, seq);
            residue.atoms = substructure.atoms;
            chain.residues.push(residue);
        }
    }

    Ok(record)
}

enum Section {
    None,
    Molecule,
    Atom,
    Bond,
}

fn parse_expected_counts(
    line: &str,
    line_number: usize,
) -> Result<(usize, Option<usize>), Error> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let atoms = fields
        .first()
        .and_then(|f| f.parse::<usize>().ok())
        .ok_or_else(|| Error::parse(FORMAT, line_number, "Invalid atom count"))?;
    let bonds = match fields.get(1) {
        Some(field) => Some(
            field
                .parse::<usize>()
                .map_err(|_| Error::parse(FORMAT, line_number, "Invalid bond count"))?,
        ),
        None => None,
    };
    Ok((atoms, bonds))
}

/// Returns `None` for `nc` (not connected) bonds, which are skipped.
fn parse_bond_order_token(token: &str, line_number: usize) -> Result<Option<BondOrder>, Error> {
    match token.to_ascii_lowercase().as_str() {
        "1" | "am" => Ok(Some(BondOrder::Single)),
        "2" => Ok(Some(BondOrder::Double)),
        "3" => Ok(Some(BondOrder::Triple)),
        "ar" => Ok(Some(BondOrder::Aromatic)),
        "nc" => Ok(None),
        other => Err(Error::parse(
            FORMAT,
            line_number,
            format!("Unsupported bond type '{other}'"),
        )),
    }
}

/// Element symbol from a SYBYL atom type (`C.ar`, `N.pl3`, `Cl`, `Du` has none).
fn element_from_sybyl_type(atom_type: &str) -> Option<&str> {
    let symbol = atom_type.split('.').next()?;
    match symbol.to_ascii_lowercase().as_str() {
        "" | "du" | "lp" | "any" | "hal" | "het" | "hev" => None,
        _ => Some(symbol),
    }
}
