//! Reader for MDL SDF/MOL connection tables (V2000).

use crate::io::Format;
use crate::io::error::Error;
use crate::model::record::{AtomRecord, StructureRecord};
use crate::model::types::BondOrder;
use std::io::BufRead;

const FORMAT: Format = Format::Sdf;

/// Reads the first record of an SDF/MOL (V2000) file.
///
/// Data items following `M  END` (`> <FIELD>` blocks) are stored in the record metadata.
///
/// # Errors
///
/// Returns [`Error::Parse`] for a short header, an unsupported (V3000) counts line, bad atom or
/// bond rows, or a bond whose endpoints are out of range.
pub fn read<R: BufRead>(reader: R) -> Result<StructureRecord, Error> {
    let lines = collect_first_block(reader)?;
    if lines.len() < 4 {
        return Err(Error::parse(
            FORMAT,
            lines.len().max(1),
            "SDF block must contain a header and a counts line",
        ));
    }

    let counts_line_no = lines[3].0;
    let counts_line = &lines[3].1;
    if counts_line.contains("V3000") {
        return Err(Error::parse(FORMAT, counts_line_no, "V3000 is not supported"));
    }

    let (atom_count, bond_count) = parse_counts(counts_line, counts_line_no)?;
    let atom_start = 4;
    let bond_start = atom_start + atom_count;
    let property_start = bond_start + bond_count;

    if lines.len() < property_start {
        return Err(Error::parse(
            FORMAT,
            lines.last().map_or(counts_line_no, |(ln, _)| *ln),
            "SDF block ended before atoms and bonds were fully specified",
        ));
    }

    let mut record = StructureRecord::new();
    record.metadata.insert("format".to_string(), "sdf".to_string());
    let name = lines[0].1.trim();
    if !name.is_empty() {
        record.name = Some(name.to_string());
    }
    let comment = lines[2].1.trim();
    if !comment.is_empty() {
        record
            .metadata
            .insert("comment".to_string(), comment.to_string());
    }

    for (ln, raw) in &lines[atom_start..bond_start] {
        record.push_atom(parse_atom(raw, *ln)?);
    }
    for (ln, raw) in &lines[bond_start..property_start] {
        let (a, b, order) = parse_bond(raw, *ln, atom_count)?;
        record.push_bond(a, b, order);
    }

    parse_properties(&lines[property_start..], &mut record)?;

    Ok(record)
}

fn collect_first_block<R: BufRead>(reader: R) -> Result<Vec<(usize, String)>, Error> {
    let mut lines = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let content = line.map_err(|e| Error::from_io(e, None))?;
        if content.trim() == "$$$$" {
            break;
        }
        lines.push((i + 1, content));
    }
    Ok(lines)
}

fn field(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn parse_counts(line: &str, line_no: usize) -> Result<(usize, usize), Error> {
    let atoms = field(line, 0, 3)
        .parse::<usize>()
        .map_err(|_| Error::parse(FORMAT, line_no, "invalid atom count"))?;
    let bonds = field(line, 3, 6)
        .parse::<usize>()
        .map_err(|_| Error::parse(FORMAT, line_no, "invalid bond count"))?;
    Ok((atoms, bonds))
}

fn parse_atom(raw: &str, ln: usize) -> Result<AtomRecord, Error> {
    let coordinate = |start: usize, axis: &str| {
        field(raw, start, start + 10)
            .parse::<f64>()
            .map_err(|_| Error::parse(FORMAT, ln, format!("invalid {axis} coordinate in atom line")))
    };
    let position = [coordinate(0, "x")?, coordinate(10, "y")?, coordinate(20, "z")?];

    let symbol = field(raw, 31, 34);
    if symbol.is_empty() {
        return Err(Error::parse(FORMAT, ln, "atom line has no element symbol"));
    }

    let charge_code = match field(raw, 36, 39) {
        "" => 0,
        text => text
            .parse::<u8>()
            .map_err(|_| Error::parse(FORMAT, ln, "invalid charge code in atom line"))?,
    };
    let formal_charge = match charge_code {
        0 | 4 => 0.0,
        1 => 3.0,
        2 => 2.0,
        3 => 1.0,
        5 => -1.0,
        6 => -2.0,
        7 => -3.0,
        other => {
            return Err(Error::parse(
                FORMAT,
                ln,
                format!("unsupported charge code {other}"),
            ));
        }
    };

    Ok(AtomRecord::new(symbol, symbol, position).with_charge(formal_charge))
}

fn parse_bond(raw: &str, ln: usize, atom_count: usize) -> Result<(usize, usize, BondOrder), Error> {
    let a1 = field(raw, 0, 3)
        .parse::<usize>()
        .map_err(|_| Error::parse(FORMAT, ln, "invalid first atom index"))?;
    let a2 = field(raw, 3, 6)
        .parse::<usize>()
        .map_err(|_| Error::parse(FORMAT, ln, "invalid second atom index"))?;
    let code = field(raw, 6, 9)
        .parse::<u8>()
        .map_err(|_| Error::parse(FORMAT, ln, "invalid bond order value"))?;
    let order = BondOrder::from_code(code)
        .ok_or_else(|| Error::parse(FORMAT, ln, format!("unsupported bond type {code}")))?;

    if a1 == 0 || a2 == 0 || a1 > atom_count || a2 > atom_count {
        return Err(Error::parse(
            FORMAT,
            ln,
            "bond references atom outside declared range",
        ));
    }
    Ok((a1 - 1, a2 - 1, order))
}

fn parse_properties(lines: &[(usize, String)], record: &mut StructureRecord) -> Result<(), Error> {
    let mut charges_reset = false;
    let mut iter = lines.iter();

    while let Some((ln, line)) = iter.next() {
        if line.starts_with("M  END") {
            break;
        }
        if !line.starts_with("M  CHG") {
            continue;
        }
        if !charges_reset {
            // The first CHG line supersedes every charge from the atom block.
            for atom in &mut record.atoms {
                atom.formal_charge = 0.0;
            }
            charges_reset = true;
        }

        let tokens: Vec<&str> = line.split_whitespace().skip(2).collect();
        let count = tokens
            .first()
            .and_then(|t| t.parse::<usize>().ok())
            .ok_or_else(|| Error::parse(FORMAT, *ln, "invalid M  CHG entry count"))?;
        if tokens.len() < 1 + 2 * count {
            return Err(Error::parse(FORMAT, *ln, "M  CHG line is shorter than its count"));
        }
        for pair in tokens[1..1 + 2 * count].chunks(2) {
            let atom = pair[0]
                .parse::<usize>()
                .ok()
                .filter(|idx| *idx >= 1 && *idx <= record.atoms.len())
                .ok_or_else(|| Error::parse(FORMAT, *ln, "M  CHG references an unknown atom"))?;
            let charge = pair[1]
                .parse::<i32>()
                .map_err(|_| Error::parse(FORMAT, *ln, "invalid charge in M  CHG"))?;
            record.atoms[atom - 1].formal_charge = f64::from(charge);
        }
    }

    // Data items: `> <NAME>` header, value lines, blank terminator.
    let mut current: Option<(String, Vec<&str>)> = None;
    for (_, line) in iter {
        if let Some((name, values)) = current.as_mut() {
            if line.trim().is_empty() {
                record
                    .metadata
                    .insert(std::mem::take(name), values.join("\n"));
                current = None;
            } else {
                values.push(line.trim_end());
            }
            continue;
        }
        if line.starts_with('>') {
            if let (Some(open), Some(close)) = (line.find('<'), line.rfind('>')) {
                if close > open {
                    current = Some((line[open + 1..close].to_string(), Vec::new()));
                }
            }
        }
    }
    if let Some((name, values)) = current {
        record.metadata.insert(name, values.join("\n"));
    }

    Ok(())
}
