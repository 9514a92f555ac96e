//! Reader for plain XYZ coordinate files.

use crate::io::Format;
use crate::io::error::Error;
use crate::model::record::{AtomRecord, StructureRecord};
use std::io::BufRead;

const FORMAT: Format = Format::Xyz;

/// Reads the first frame of an XYZ file.
///
/// The comment line becomes the record name. Rows start with an element symbol or an atomic
/// number followed by three coordinates; trailing columns are ignored. XYZ carries no
/// connectivity, so the record has no bonds.
///
/// # Errors
///
/// Returns [`Error::Parse`] when the count line is not a number, a row has fewer than four
/// columns or an unknown element, or the frame ends before the declared atom count.
pub fn read<R: BufRead>(reader: R) -> Result<StructureRecord, Error> {
    let mut lines = reader.lines().enumerate();

    let (count_line_no, count_line) = loop {
        match lines.next() {
            Some((i, line)) => {
                let line = line.map_err(|e| Error::from_io(e, None))?;
                if !line.trim().is_empty() {
                    break (i + 1, line);
                }
            }
            None => return Err(Error::parse(FORMAT, 0, "missing atom count line")),
        }
    };
    let atom_count = count_line
        .split_whitespace()
        .next()
        .and_then(|t| t.parse::<usize>().ok())
        .ok_or_else(|| Error::parse(FORMAT, count_line_no, "invalid atom count"))?;

    let mut record = StructureRecord::new();
    record.metadata.insert("format".to_string(), "xyz".to_string());

    if let Some((_, line)) = lines.next() {
        let comment = line.map_err(|e| Error::from_io(e, None))?;
        let comment = comment.trim();
        if !comment.is_empty() {
            record.name = Some(comment.to_string());
        }
    }

    let mut last_line_no = count_line_no + 1;
    while record.atoms.len() < atom_count {
        let Some((i, line)) = lines.next() else {
            return Err(Error::parse(
                FORMAT,
                last_line_no,
                format!(
                    "declared {} atoms but the frame ends after {}",
                    atom_count,
                    record.atoms.len()
                ),
            ));
        };
        let line = line.map_err(|e| Error::from_io(e, None))?;
        last_line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        record.push_atom(parse_atom(&line, last_line_no)?);
    }

    Ok(record)
}

fn parse_atom(line: &str, line_no: usize) -> Result<AtomRecord, Error> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 4 {
        return Err(Error::parse(
            FORMAT,
            line_no,
            "atom row must contain an element and three coordinates",
        ));
    }

    let mut position = [0.0; 3];
    for (slot, token) in position.iter_mut().zip(&tokens[1..4]) {
        *slot = token.parse::<f64>().map_err(|_| {
            Error::parse(FORMAT, line_no, format!("invalid coordinate '{token}'"))
        })?;
    }

    let label = tokens[0];
    let atom = match label.parse::<u8>() {
        Ok(number) => {
            let mut atom = AtomRecord::new(label, "", position);
            atom.atomic_number = Some(number);
            atom
        }
        Err(_) => AtomRecord::new(label, label, position),
    };
    Ok(atom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const METHANOL: &str = "\
6
methanol
C     -0.046520    0.663166    0.000000
O     -0.046520   -0.754501    0.000000
H     -1.086272    0.975669    0.000000
H      0.437654    1.071811    0.888427
H      0.437654    1.071811   -0.888427
H      0.846828   -1.086937    0.000000
";

    #[test]
    fn reads_symbols_positions_and_name() {
        let record = read(Cursor::new(METHANOL)).unwrap();

        assert_eq!(record.name.as_deref(), Some("methanol"));
        assert_eq!(record.metadata["format"], "xyz");
        assert_eq!(record.atoms.len(), 6);
        assert_eq!(record.atoms[1].symbol, "O");
        assert_eq!(record.atoms[3].position, [0.437654, 1.071811, 0.888427]);
        assert!(record.bonds.is_empty());
        assert!(record.chains.is_empty());
    }

    #[test]
    fn accepts_atomic_numbers() {
        let record = read(Cursor::new("2\n\n8 0 0 0\n1 0.96 0 0\n")).unwrap();

        assert_eq!(record.name, None);
        assert_eq!(record.atoms[0].atomic_number, Some(8));
        assert_eq!(record.atoms[0].symbol, "");
        assert_eq!(record.atoms[1].atomic_number, Some(1));
    }

    #[test]
    fn reads_only_the_first_frame() {
        let content = format!("{METHANOL}1\nsecond frame\nHe 0 0 0\n");
        let record = read(Cursor::new(content)).unwrap();

        assert_eq!(record.atoms.len(), 6);
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let content = METHANOL.replace("6\n", "7\n");
        assert!(matches!(
            read(Cursor::new(content)),
            Err(Error::Parse { line_number: 8, .. })
        ));
    }

    #[test]
    fn malformed_rows_report_their_line() {
        let content = METHANOL.replace("O     -0.046520", "O     abc");
        assert!(matches!(
            read(Cursor::new(content)),
            Err(Error::Parse { line_number: 4, .. })
        ));
    }
}
