//! Reader for fixed-column Protein Data Bank files.
//!
//! Only the records that feed the molecular graph are interpreted: `ATOM`/`HETATM`, `CONECT`,
//! `MODEL`/`ENDMDL`, a few header records, and `REMARK 350` biological assemblies.

use crate::io::Format;
use crate::io::error::Error;
use crate::model::element::Element;
use crate::model::record::{
    AssemblyRecord, AtomRecord, OperationRecord, ResidueRecord, StructureRecord,
};
use crate::model::types::BondOrder;
use log::warn;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::BufRead;

const FORMAT: Format = Format::Pdb;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AtomKey {
    chain_id: String,
    res_seq: i32,
    i_code: Option<char>,
    name: String,
}

/// Reads the first model of a PDB file.
///
/// Alternate locations keep the first conformer listed for each atom. `CONECT` records become
/// bonds whose order is the number of times the pair is repeated (capped at triple), and
/// `REMARK 350` blocks become assembly records.
///
/// # Arguments
///
/// * `reader` - Buffered source positioned at the start of the file.
///
/// # Returns
///
/// The parsed [`StructureRecord`] in ångströms, with `HEADER`, `TITLE` and `COMPND` fields in
/// its metadata.
///
/// # Errors
///
/// Returns [`Error::Parse`] with the offending line for unreadable coordinates, malformed
/// `BIOMT` rows, or bad `CONECT` serials, and [`Error::Io`] when the stream fails.
pub fn read<R: BufRead>(reader: R) -> Result<StructureRecord, Error> {
    let mut record = StructureRecord::new();
    record.metadata.insert("format".to_string(), "pdb".to_string());

    let mut serial_map: HashMap<i64, usize> = HashMap::new();
    let mut seen_atoms: HashSet<AtomKey> = HashSet::new();
    let mut conect: Vec<(usize, i64, i64)> = Vec::new();
    let mut remark = Remark350::default();
    let mut title = String::new();
    let mut compound = String::new();

    let mut first_model_done = false;
    let mut skipped_model_atoms = 0usize;
    let mut skipped_altlocs = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line.map_err(|e| Error::from_io(e, None))?;
        let tag = line.get(0..6).unwrap_or(line.as_str()).trim_end();

        match tag {
            "HEADER" => {
                let classification = column(&line, 10, 50).trim();
                if !classification.is_empty() {
                    record
                        .metadata
                        .insert("classification".to_string(), classification.to_string());
                }
                let id_code = column(&line, 62, 66).trim();
                if !id_code.is_empty() {
                    record.metadata.insert("id".to_string(), id_code.to_string());
                    record.name = Some(id_code.to_string());
                }
            }
            "TITLE" => append_continuation(&mut title, &line),
            "COMPND" => append_continuation(&mut compound, &line),
            "REMARK" if column(&line, 6, 10).trim() == "350" => {
                remark.parse_line(&line, line_number)?;
            }
            "ENDMDL" => first_model_done = true,
            "ATOM" | "HETATM" => {
                if first_model_done {
                    skipped_model_atoms += 1;
                    continue;
                }
                parse_atom_record(
                    &line,
                    line_number,
                    &mut record,
                    &mut serial_map,
                    &mut seen_atoms,
                    &mut skipped_altlocs,
                )?;
            }
            "CONECT" => parse_conect(&line, line_number, &mut conect)?,
            "END" => break,
            _ => {}
        }
    }

    if skipped_altlocs > 0 {
        warn!(
            "PDB: skipped {} alternate-location atoms, keeping the first conformer",
            skipped_altlocs
        );
    }
    if skipped_model_atoms > 0 {
        warn!(
            "PDB: ignored {} atoms from models after the first",
            skipped_model_atoms
        );
    }

    if !title.is_empty() {
        record.metadata.insert("title".to_string(), title);
    }
    if !compound.is_empty() {
        record.metadata.insert("compound".to_string(), compound);
    }

    resolve_conect(&mut record, &serial_map, &conect);
    record.assemblies = remark.finish();

    Ok(record)
}

fn column(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("")
}

fn append_continuation(target: &mut String, line: &str) {
    let text = column(line, 10, 80).trim();
    if text.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

fn parse_atom_record(
    line: &str,
    line_number: usize,
    record: &mut StructureRecord,
    serial_map: &mut HashMap<i64, usize>,
    seen_atoms: &mut HashSet<AtomKey>,
    skipped_altlocs: &mut usize,
) -> Result<(), Error> {
    if line.len() < 54 {
        return Err(Error::parse(FORMAT, line_number, "atom record too short"));
    }

    let serial = column(line, 6, 11).trim().parse::<i64>().ok();
    let raw_name = column(line, 12, 16);
    let name = raw_name.trim();
    let alt_loc = column(line, 16, 17).chars().next().unwrap_or(' ');
    let res_name = column(line, 17, 20).trim();
    let chain_id = column(line, 21, 22).trim();
    let res_seq = column(line, 22, 26)
        .trim()
        .parse::<i32>()
        .map_err(|_| Error::parse(FORMAT, line_number, "invalid residue sequence number"))?;
    let i_code = column(line, 26, 27).chars().next().filter(|c| *c != ' ');

    let x = parse_coordinate(column(line, 30, 38), "X", line_number)?;
    let y = parse_coordinate(column(line, 38, 46), "Y", line_number)?;
    let z = parse_coordinate(column(line, 46, 54), "Z", line_number)?;

    let element_field = column(line, 76, 78).trim();
    let symbol = if element_field.is_empty() {
        infer_element_symbol(raw_name).ok_or_else(|| {
            Error::parse(
                FORMAT,
                line_number,
                format!("cannot infer element from atom name '{name}'"),
            )
        })?
    } else {
        element_field.to_string()
    };
    let formal_charge = parse_charge(column(line, 78, 80), line_number)?;

    let key = AtomKey {
        chain_id: chain_id.to_string(),
        res_seq,
        i_code,
        name: name.to_string(),
    };
    if !seen_atoms.insert(key) && alt_loc != ' ' {
        *skipped_altlocs += 1;
        return Ok(());
    }

    let atom_idx =
        record.push_atom(AtomRecord::new(name, symbol, [x, y, z]).with_charge(formal_charge));
    if let Some(serial) = serial {
        serial_map.insert(serial, atom_idx);
    }

    let chain = record.chain_mut_or_insert(chain_id);
    match chain.residues.last_mut() {
        Some(residue)
            if residue.seq == res_seq
                && residue.insertion_code == i_code
                && residue.name == res_name =>
        {
            residue.atoms.push(atom_idx);
        }
        _ => {
            let mut residue = ResidueRecord::new(res_name, res_seq);
            residue.insertion_code = i_code;
            residue.atoms.push(atom_idx);
            chain.residues.push(residue);
        }
    }

    Ok(())
}

fn parse_coordinate(value: &str, axis: &str, line_number: usize) -> Result<f64, Error> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::parse(FORMAT, line_number, format!("invalid {axis} coordinate")))
}

/// Parses the charge columns (`2+`, `1-`, `+`, or blank).
fn parse_charge(field: &str, line_number: usize) -> Result<f64, Error> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(0.0);
    }
    let (digits, sign) = if let Some(d) = field.strip_suffix('+') {
        (d, 1.0)
    } else if let Some(d) = field.strip_suffix('-') {
        (d, -1.0)
    } else if let Some(d) = field.strip_prefix('+') {
        (d, 1.0)
    } else if let Some(d) = field.strip_prefix('-') {
        (d, -1.0)
    } else {
        return Err(Error::parse(
            FORMAT,
            line_number,
            format!("invalid formal charge '{field}'"),
        ));
    };
    let magnitude = if digits.is_empty() {
        1.0
    } else {
        digits.parse::<f64>().map_err(|_| {
            Error::parse(
                FORMAT,
                line_number,
                format!("invalid formal charge '{field}'"),
            )
        })?
    };
    Ok(sign * magnitude)
}

/// Guesses the element from the four-character atom name field.
///
/// Names starting in column 13 with a letter (`CA  `, `CL1 `) may carry a two-letter element;
/// names starting with a blank or a digit (` CA `, `1HB `) carry a one-letter element.
fn infer_element_symbol(raw_name: &str) -> Option<String> {
    let trimmed = raw_name.trim();
    let letters: String = trimmed
        .chars()
        .skip_while(|c| c.is_ascii_digit())
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }

    let starts_in_first_column = raw_name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic());
    if starts_in_first_column && trimmed.len() < 4 && letters.len() >= 2 {
        let two = &letters[..2];
        if Element::from_symbol(two).is_some() {
            return Some(two.to_string());
        }
    }

    let one = &letters[..1];
    Element::from_symbol(one).map(|_| one.to_string())
}

fn parse_conect(
    line: &str,
    line_number: usize,
    conect: &mut Vec<(usize, i64, i64)>,
) -> Result<(), Error> {
    let origin = column(line, 6, 11)
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::parse(FORMAT, line_number, "invalid CONECT origin serial"))?;
    for (start, end) in [(11, 16), (16, 21), (21, 26), (26, 31)] {
        let field = column(line, start, end).trim();
        if field.is_empty() {
            continue;
        }
        let target = field
            .parse::<i64>()
            .map_err(|_| Error::parse(FORMAT, line_number, "invalid CONECT partner serial"))?;
        conect.push((line_number, origin, target));
    }
    Ok(())
}

fn resolve_conect(
    record: &mut StructureRecord,
    serial_map: &HashMap<i64, usize>,
    conect: &[(usize, i64, i64)],
) {
    let mut directed: HashMap<(usize, usize), u8> = HashMap::new();
    for &(line_number, origin, target) in conect {
        let (Some(&a), Some(&b)) = (serial_map.get(&origin), serial_map.get(&target)) else {
            warn!(
                "PDB line {}: CONECT {}-{} references an atom that was not read",
                line_number, origin, target
            );
            continue;
        };
        if a == b {
            continue;
        }
        *directed.entry((a, b)).or_insert(0) += 1;
    }

    // Bonds are usually listed from both ends; the multiplicity is the larger of the two.
    let mut orders: BTreeMap<(usize, usize), u8> = BTreeMap::new();
    for ((a, b), count) in directed {
        let entry = orders.entry((a.min(b), a.max(b))).or_insert(0);
        *entry = (*entry).max(count);
    }

    for ((a, b), count) in orders {
        let order = match count {
            1 => BondOrder::Single,
            2 => BondOrder::Double,
            _ => BondOrder::Triple,
        };
        record.push_bond(a, b, order);
    }
}

#[derive(Default)]
struct Remark350 {
    assemblies: Vec<AssemblyRecord>,
    scope: Vec<String>,
    pending: Option<(String, [[f64; 4]; 4])>,
}

impl Remark350 {
    fn parse_line(&mut self, line: &str, line_number: usize) -> Result<(), Error> {
        let content = column(line, 10, line.len()).trim();

        if let Some(rest) = content.strip_prefix("BIOMOLECULE:") {
            self.assemblies.push(AssemblyRecord {
                id: rest.trim().to_string(),
                operations: Vec::new(),
            });
            self.scope.clear();
            self.pending = None;
        } else if let Some(rest) = content.strip_prefix("APPLY THE FOLLOWING TO CHAINS:") {
            self.scope = split_chain_list(rest);
        } else if let Some(rest) = content.strip_prefix("AND CHAINS:") {
            self.scope.extend(split_chain_list(rest));
        } else if content.starts_with("BIOMT") {
            self.parse_biomt(content, line_number)?;
        }
        Ok(())
    }

    fn parse_biomt(&mut self, content: &str, line_number: usize) -> Result<(), Error> {
        let tokens: Vec<&str> = content.split_whitespace().collect();
        if tokens.len() < 6 {
            return Err(Error::parse(
                FORMAT,
                line_number,
                "BIOMT record must contain a serial, three rotation values, and a translation",
            ));
        }
        let row = match tokens[0] {
            "BIOMT1" => 0,
            "BIOMT2" => 1,
            "BIOMT3" => 2,
            other => {
                return Err(Error::parse(
                    FORMAT,
                    line_number,
                    format!("unexpected BIOMT row '{other}'"),
                ));
            }
        };
        let serial = tokens[1].to_string();
        let mut values = [0.0; 4];
        for (slot, token) in values.iter_mut().zip(&tokens[2..6]) {
            *slot = token.parse::<f64>().map_err(|_| {
                Error::parse(FORMAT, line_number, format!("invalid BIOMT value '{token}'"))
            })?;
        }

        let Some(assembly) = self.assemblies.last_mut() else {
            return Err(Error::parse(
                FORMAT,
                line_number,
                "BIOMT record appears before any BIOMOLECULE",
            ));
        };

        if row == 0 {
            let mut matrix = [[0.0; 4]; 4];
            matrix[3] = [0.0, 0.0, 0.0, 1.0];
            self.pending = Some((serial.clone(), matrix));
        }
        let Some((pending_serial, matrix)) = self.pending.as_mut() else {
            return Err(Error::parse(
                FORMAT,
                line_number,
                format!("BIOMT{} without a preceding BIOMT1", row + 1),
            ));
        };
        if *pending_serial != serial {
            return Err(Error::parse(
                FORMAT,
                line_number,
                format!("BIOMT operator {serial} interleaves with operator {pending_serial}"),
            ));
        }
        matrix[row] = values;

        if row == 2 {
            assembly.operations.push(OperationRecord {
                matrix: *matrix,
                chains: self.scope.clone(),
            });
            self.pending = None;
        }
        Ok(())
    }

    fn finish(self) -> Vec<AssemblyRecord> {
        self.assemblies
            .into_iter()
            .filter(|assembly| {
                if assembly.operations.is_empty() {
                    warn!(
                        "PDB: biomolecule {} declares no BIOMT operators, skipping",
                        assembly.id
                    );
                    false
                } else {
                    true
                }
            })
            .collect()
    }
}

fn split_chain_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[allow(clippy::too_many_arguments)]
    fn atom_line(
        tag: &str,
        serial: usize,
        name: &str,
        alt_loc: char,
        res_name: &str,
        chain: char,
        seq: i32,
        pos: [f64; 3],
        element: &str,
        charge: &str,
    ) -> String {
        format!(
            "{:<6}{:>5} {:<4}{}{:>3} {}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}{:<2}",
            tag, serial, name, alt_loc, res_name, chain, seq, pos[0], pos[1], pos[2], 1.0, 0.0,
            element, charge
        )
    }

    fn read_str(content: &str) -> StructureRecord {
        read(Cursor::new(content)).unwrap()
    }

    #[test]
    fn reads_atoms_residues_and_chains() {
        let content = [
            atom_line("ATOM", 1, " N", ' ', "GLY", 'A', 1, [0.0, 0.0, 0.0], "N", ""),
            atom_line("ATOM", 2, " CA", ' ', "GLY", 'A', 1, [1.458, 0.0, 0.0], "C", ""),
            atom_line("ATOM", 3, " N", ' ', "ALA", 'A', 2, [3.0, 1.0, 0.0], "N", ""),
            atom_line("HETATM", 4, "ZN", ' ', "ZN", 'B', 101, [5.0, 5.0, 5.0], "ZN", "2+"),
            "END".to_string(),
        ]
        .join("\n");
        let record = read_str(&content);

        assert_eq!(record.atoms.len(), 4);
        assert_eq!(record.chains.len(), 2);
        assert_eq!(record.chains[0].id, "A");
        assert_eq!(record.chains[0].residues.len(), 2);
        assert_eq!(record.chains[0].residues[0].atoms, vec![0, 1]);
        assert_eq!(record.chains[1].residues[0].name, "ZN");
        assert_eq!(record.atoms[1].name, "CA");
        assert_eq!(record.atoms[1].symbol, "C");
        assert!((record.atoms[1].position[0] - 1.458).abs() < 1e-9);
        assert_eq!(record.atoms[3].formal_charge, 2.0);
    }

    #[test]
    fn infers_elements_from_atom_names() {
        assert_eq!(infer_element_symbol(" CA ").as_deref(), Some("C"));
        assert_eq!(infer_element_symbol("CA  ").as_deref(), Some("CA"));
        assert_eq!(infer_element_symbol("1HB ").as_deref(), Some("H"));
        assert_eq!(infer_element_symbol("HG12").as_deref(), Some("H"));
        assert_eq!(infer_element_symbol("CL1 ").as_deref(), Some("CL"));
        assert_eq!(infer_element_symbol(" 123").as_deref(), None);
    }

    #[test]
    fn parses_formal_charges() {
        assert_eq!(parse_charge("", 1).unwrap(), 0.0);
        assert_eq!(parse_charge("2+", 1).unwrap(), 2.0);
        assert_eq!(parse_charge("1-", 1).unwrap(), -1.0);
        assert_eq!(parse_charge("-", 1).unwrap(), -1.0);
        assert!(parse_charge("x", 1).is_err());
    }

    #[test]
    fn keeps_first_alternate_location() {
        let content = [
            atom_line("ATOM", 1, " CB", 'A', "SER", 'A', 5, [1.0, 0.0, 0.0], "C", ""),
            atom_line("ATOM", 2, " CB", 'B', "SER", 'A', 5, [1.5, 0.0, 0.0], "C", ""),
            atom_line("ATOM", 3, " OG", 'A', "SER", 'A', 5, [2.0, 0.0, 0.0], "O", ""),
        ]
        .join("\n");
        let record = read_str(&content);

        assert_eq!(record.atoms.len(), 2);
        assert_eq!(record.atoms[0].position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn reads_only_the_first_model() {
        let content = [
            "MODEL        1".to_string(),
            atom_line("ATOM", 1, " O", ' ', "HOH", 'W', 1, [0.0, 0.0, 0.0], "O", ""),
            "ENDMDL".to_string(),
            "MODEL        2".to_string(),
            atom_line("ATOM", 1, " O", ' ', "HOH", 'W', 1, [9.0, 0.0, 0.0], "O", ""),
            "ENDMDL".to_string(),
        ]
        .join("\n");
        let record = read_str(&content);

        assert_eq!(record.atoms.len(), 1);
        assert_eq!(record.atoms[0].position, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn conect_repeats_raise_bond_order() {
        let content = [
            atom_line("HETATM", 1, " C1", ' ', "ETH", 'A', 1, [0.0, 0.0, 0.0], "C", ""),
            atom_line("HETATM", 2, " C2", ' ', "ETH", 'A', 1, [1.34, 0.0, 0.0], "C", ""),
            atom_line("HETATM", 3, " O1", ' ', "ETH", 'A', 1, [2.0, 1.0, 0.0], "O", ""),
            "CONECT    1    2    2".to_string(),
            "CONECT    2    1    1    3".to_string(),
            "CONECT    3    2".to_string(),
        ]
        .join("\n");
        let record = read_str(&content);

        assert_eq!(record.bonds.len(), 2);
        assert_eq!((record.bonds[0].a, record.bonds[0].b), (0, 1));
        assert_eq!(record.bonds[0].order, BondOrder::Double);
        assert_eq!((record.bonds[1].a, record.bonds[1].b), (1, 2));
        assert_eq!(record.bonds[1].order, BondOrder::Single);
    }

    #[test]
    fn reads_header_and_title_metadata() {
        let content = [
            "HEADER    TRANSFERASE                             01-JAN-00   1ABC              ",
            "TITLE     A SMALL TEST",
            "TITLE    2 STRUCTURE",
        ]
        .join("\n");
        let record = read_str(&content);

        assert_eq!(record.name.as_deref(), Some("1ABC"));
        assert_eq!(record.metadata["classification"], "TRANSFERASE");
        assert_eq!(record.metadata["title"], "A SMALL TEST STRUCTURE");
        assert_eq!(record.metadata["format"], "pdb");
    }

    #[test]
    fn parses_remark_350_assemblies() {
        let content = "\
REMARK 350 BIOMOLECULE: 1
REMARK 350 AUTHOR DETERMINED BIOLOGICAL UNIT: DIMERIC
REMARK 350 APPLY THE FOLLOWING TO CHAINS: A, B,
REMARK 350                    AND CHAINS: C
REMARK 350   BIOMT1   1  1.000000  0.000000  0.000000        0.00000
REMARK 350   BIOMT2   1  0.000000  1.000000  0.000000        0.00000
REMARK 350   BIOMT3   1  0.000000  0.000000  1.000000        0.00000
REMARK 350   BIOMT1   2 -1.000000  0.000000  0.000000       10.00000
REMARK 350   BIOMT2   2  0.000000 -1.000000  0.000000        0.00000
REMARK 350   BIOMT3   2  0.000000  0.000000  1.000000       -5.00000
REMARK 350 BIOMOLECULE: 2
REMARK 350 APPLY THE FOLLOWING TO CHAINS: A
REMARK 350   BIOMT1   1  1.000000  0.000000  0.000000        0.00000
REMARK 350   BIOMT2   1  0.000000  1.000000  0.000000        0.00000
REMARK 350   BIOMT3   1  0.000000  0.000000  1.000000        0.00000
REMARK 350 BIOMOLECULE: 3
";
        let record = read_str(content);

        assert_eq!(record.assemblies.len(), 2);
        let first = &record.assemblies[0];
        assert_eq!(first.id, "1");
        assert_eq!(first.operations.len(), 2);
        assert_eq!(first.operations[0].chains, vec!["A", "B", "C"]);
        assert_eq!(first.operations[1].matrix[0], [-1.0, 0.0, 0.0, 10.0]);
        assert_eq!(first.operations[1].matrix[2][3], -5.0);
        assert_eq!(first.operations[1].matrix[3], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(record.assemblies[1].operations[0].chains, vec!["A"]);
    }

    #[test]
    fn rejects_malformed_biomt() {
        let content = "\
REMARK 350 BIOMOLECULE: 1
REMARK 350   BIOMT2   1  0.000000  1.000000  0.000000        0.00000
";
        assert!(matches!(
            read(Cursor::new(content)),
            Err(Error::Parse { line_number: 2, .. })
        ));
    }

    #[test]
    fn rejects_bad_coordinates() {
        let line = atom_line("ATOM", 1, " N", ' ', "GLY", 'A', 1, [0.0, 0.0, 0.0], "N", "")
            .replace("   0.000   0.000   0.000", "   abcde   0.000   0.000");
        assert!(matches!(
            read(Cursor::new(line)),
            Err(Error::Parse { line_number: 1, .. })
        ));
    }
}
