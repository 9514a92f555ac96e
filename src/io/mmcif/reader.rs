//! Reader for PDBx/mmCIF files.
//!
//! The file is tokenized into categories first; atoms, chains, and assemblies are then read
//! from the categories they live in, so item order inside a data block does not matter.

use crate::io::Format;
use crate::io::error::Error;
use crate::model::record::{
    AssemblyRecord, AtomRecord, OperationRecord, ResidueRecord, StructureRecord,
};
use crate::model::transform::Transform;
use log::warn;
use std::collections::{HashMap, HashSet};
use std::io::BufRead;

const FORMAT: Format = Format::Mmcif;

#[derive(Debug, Clone, PartialEq)]
struct Token {
    value: String,
    line: usize,
    quoted: bool,
}

impl Token {
    fn is_reserved(&self) -> bool {
        if self.quoted {
            return false;
        }
        let lower = self.value.to_ascii_lowercase();
        lower.starts_with('_')
            || lower == "loop_"
            || lower.starts_with("data_")
            || lower.starts_with("save_")
            || lower == "global_"
            || lower == "stop_"
    }

    /// Value with CIF null markers (`?`, `.`) mapped to `None`.
    fn into_value(self) -> Option<String> {
        if !self.quoted && (self.value == "?" || self.value == ".") {
            None
        } else {
            Some(self.value)
        }
    }
}

#[derive(Debug, Clone)]
struct Row {
    values: Vec<Option<String>>,
    line: usize,
}

/// One CIF category: the rows of a `loop_`, or a single row of key-value items.
#[derive(Debug, Clone, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn first_column(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| self.column(name))
    }

    fn value<'a>(&self, row: &'a Row, column: Option<usize>) -> Option<&'a str> {
        column
            .and_then(|idx| row.values.get(idx))
            .and_then(|v| v.as_deref())
    }

    fn first_value(&self, name: &str) -> Option<&str> {
        let row = self.rows.first()?;
        self.value(row, self.column(name))
    }
}

/// Reads the first data block of an mmCIF file.
///
/// Atoms come from `_atom_site` (first model, first alternate location, author identifiers
/// preferred). Assemblies are expanded from `_pdbx_struct_assembly_gen` operator expressions
/// against `_pdbx_struct_oper_list`, with label chain ids translated to author chain ids.
///
/// # Errors
///
/// Returns [`Error::Parse`] for unterminated text fields, ragged loops, missing required
/// `_atom_site` columns, or operator expressions naming unknown operators.
pub fn read<R: BufRead>(reader: R) -> Result<StructureRecord, Error> {
    let tokens = tokenize(reader)?;
    let tables = parse_tables(tokens)?;

    let mut record = StructureRecord::new();
    record
        .metadata
        .insert("format".to_string(), "mmcif".to_string());

    if let Some(id) = tables.get("entry").and_then(|t| t.first_value("id")) {
        record.name = Some(id.to_string());
        record.metadata.insert("id".to_string(), id.to_string());
    }
    if let Some(title) = tables.get("struct").and_then(|t| t.first_value("title")) {
        record
            .metadata
            .insert("title".to_string(), title.trim().to_string());
    }

    let atom_site = tables
        .get("atom_site")
        .ok_or_else(|| Error::parse(FORMAT, 0, "missing _atom_site category"))?;
    let label_to_auth = read_atom_site(atom_site, &mut record)?;

    if let (Some(opers), Some(generators)) = (
        tables.get("pdbx_struct_oper_list"),
        tables.get("pdbx_struct_assembly_gen"),
    ) {
        record.assemblies = read_assemblies(opers, generators, &label_to_auth)?;
    }

    Ok(record)
}

fn tokenize<R: BufRead>(reader: R) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut text_field: Option<(usize, String)> = None;

    for (idx, line) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line.map_err(|e| Error::from_io(e, None))?;

        if let Some((start, mut text)) = text_field.take() {
            if let Some(rest) = line.strip_prefix(';') {
                tokens.push(Token {
                    value: text.trim_end_matches('\n').to_string(),
                    line: start,
                    quoted: true,
                });
                tokenize_line(rest, line_number, &mut tokens)?;
            } else {
                text.push_str(&line);
                text.push('\n');
                text_field = Some((start, text));
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix(';') {
            let mut text = rest.to_string();
            if !text.is_empty() {
                text.push('\n');
            }
            text_field = Some((line_number, text));
            continue;
        }

        tokenize_line(&line, line_number, &mut tokens)?;
    }

    if let Some((start, _)) = text_field {
        return Err(Error::parse(FORMAT, start, "unterminated text field"));
    }
    Ok(tokens)
}

fn tokenize_line(line: &str, line_number: usize, tokens: &mut Vec<Token>) -> Result<(), Error> {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '#' {
            break;
        }

        if c == '\'' || c == '"' {
            // A quote only closes when followed by whitespace or the end of the line.
            let start = i + 1;
            let mut end = start;
            loop {
                if end >= chars.len() {
                    return Err(Error::parse(FORMAT, line_number, "unterminated quoted string"));
                }
                if chars[end] == c && chars.get(end + 1).is_none_or(|n| n.is_whitespace()) {
                    break;
                }
                end += 1;
            }
            tokens.push(Token {
                value: chars[start..end].iter().collect(),
                line: line_number,
                quoted: true,
            });
            i = end + 1;
            continue;
        }

        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() {
            i += 1;
        }
        tokens.push(Token {
            value: chars[start..i].iter().collect(),
            line: line_number,
            quoted: false,
        });
    }
    Ok(())
}

/// Splits `_category.attribute` into lowercase parts.
fn split_tag(tag: &str) -> (String, String) {
    let tag = tag.trim_start_matches('_').to_ascii_lowercase();
    if let Some((category, attribute)) = tag.split_once('.') {
        return (category.to_string(), attribute.to_string());
    }
    (tag, String::new())
}

fn parse_tables(tokens: Vec<Token>) -> Result<HashMap<String, Table>, Error> {
    let mut tables: HashMap<String, Table> = HashMap::new();
    let mut iter = tokens.into_iter().peekable();
    let mut seen_block = false;

    while let Some(token) = iter.next() {
        let lower = token.value.to_ascii_lowercase();

        if !token.quoted && lower.starts_with("data_") {
            if seen_block {
                warn!("mmCIF: only the first data block is read");
                break;
            }
            seen_block = true;
            continue;
        }

        if !token.quoted && lower == "loop_" {
            let mut headers = Vec::new();
            while let Some(header) = iter.next_if(|t| !t.quoted && t.value.starts_with('_')) {
                headers.push(header);
            }
            let Some(first) = headers.first() else {
                return Err(Error::parse(FORMAT, token.line, "loop_ without column headers"));
            };
            let (category, _) = split_tag(&first.value);

            let mut columns = Vec::with_capacity(headers.len());
            for header in &headers {
                let (header_category, attribute) = split_tag(&header.value);
                if header_category != category {
                    return Err(Error::parse(
                        FORMAT,
                        header.line,
                        format!("loop mixes categories '{category}' and '{header_category}'"),
                    ));
                }
                columns.push(attribute);
            }

            let mut values = Vec::new();
            while let Some(value) = iter.next_if(|t| !t.is_reserved()) {
                values.push(value);
            }
            if values.len() % columns.len() != 0 {
                let line = values.last().map_or(token.line, |v| v.line);
                return Err(Error::parse(
                    FORMAT,
                    line,
                    format!(
                        "loop for '{}' has {} values, not a multiple of {} columns",
                        category,
                        values.len(),
                        columns.len()
                    ),
                ));
            }

            let mut rows = Vec::with_capacity(values.len() / columns.len());
            let mut values = values.into_iter();
            loop {
                let chunk: Vec<Token> = values.by_ref().take(columns.len()).collect();
                if chunk.is_empty() {
                    break;
                }
                let line = chunk[0].line;
                rows.push(Row {
                    values: chunk.into_iter().map(Token::into_value).collect(),
                    line,
                });
            }

            tables.insert(category, Table { columns, rows });
            continue;
        }

        if !token.quoted && token.value.starts_with('_') {
            let Some(value) = iter.next_if(|t| !t.is_reserved()) else {
                return Err(Error::parse(
                    FORMAT,
                    token.line,
                    format!("item '{}' has no value", token.value),
                ));
            };
            let (category, attribute) = split_tag(&token.value);
            let table = tables.entry(category).or_default();
            if table.rows.is_empty() {
                table.rows.push(Row {
                    values: Vec::new(),
                    line: token.line,
                });
            }
            table.columns.push(attribute);
            table.rows[0].values.push(value.into_value());
            continue;
        }

        if !token.quoted && (lower.starts_with("save_") || lower == "global_" || lower == "stop_") {
            continue;
        }

        return Err(Error::parse(
            FORMAT,
            token.line,
            format!("unexpected value '{}' outside of an item or loop", token.value),
        ));
    }

    Ok(tables)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AtomKey {
    chain_id: String,
    res_seq: i32,
    i_code: Option<char>,
    name: String,
}

/// Fills atoms, chains, and residues; returns the label→author chain id map.
fn read_atom_site(
    table: &Table,
    record: &mut StructureRecord,
) -> Result<HashMap<String, String>, Error> {
    let missing = |what: &str| Error::parse(FORMAT, 0, format!("_atom_site is missing {what}"));

    let name_col = table
        .first_column(&["auth_atom_id", "label_atom_id"])
        .ok_or_else(|| missing("atom identifier columns"))?;
    let comp_col = table
        .first_column(&["auth_comp_id", "label_comp_id"])
        .ok_or_else(|| missing("residue identifier columns"))?;
    let chain_col = table
        .first_column(&["auth_asym_id", "label_asym_id"])
        .ok_or_else(|| missing("chain identifier columns"))?;
    let seq_cols = [table.column("auth_seq_id"), table.column("label_seq_id")];
    let symbol_col = table
        .column("type_symbol")
        .ok_or_else(|| missing("the type_symbol column"))?;
    let x_col = table.column("cartn_x").ok_or_else(|| missing("Cartn_x"))?;
    let y_col = table.column("cartn_y").ok_or_else(|| missing("Cartn_y"))?;
    let z_col = table.column("cartn_z").ok_or_else(|| missing("Cartn_z"))?;
    let label_asym_col = table.column("label_asym_id");
    let alt_col = table.column("label_alt_id");
    let ins_col = table.column("pdbx_pdb_ins_code");
    let charge_col = table.column("pdbx_formal_charge");
    let model_col = table.column("pdbx_pdb_model_num");

    let mut label_to_auth: HashMap<String, String> = HashMap::new();
    let mut seen_atoms: HashSet<AtomKey> = HashSet::new();
    let mut first_model: Option<String> = None;
    let mut skipped_model_atoms = 0usize;
    let mut skipped_altlocs = 0usize;

    for row in &table.rows {
        let line = row.line;

        if let Some(model) = table.value(row, model_col) {
            match &first_model {
                None => first_model = Some(model.to_string()),
                Some(first) if first != model => {
                    skipped_model_atoms += 1;
                    continue;
                }
                Some(_) => {}
            }
        }

        let name = table
            .value(row, Some(name_col))
            .ok_or_else(|| Error::parse(FORMAT, line, "atom has no name"))?;
        let comp = table.value(row, Some(comp_col)).unwrap_or("UNL");
        let chain_id = table.value(row, Some(chain_col)).unwrap_or("");
        let seq_text = seq_cols
            .iter()
            .find_map(|col| table.value(row, *col))
            .ok_or_else(|| Error::parse(FORMAT, line, "atom has no residue sequence number"))?;
        let res_seq = seq_text.parse::<i32>().map_err(|_| {
            Error::parse(FORMAT, line, format!("invalid residue sequence number '{seq_text}'"))
        })?;
        let i_code = table.value(row, ins_col).and_then(|v| v.chars().next());
        let symbol = table
            .value(row, Some(symbol_col))
            .ok_or_else(|| Error::parse(FORMAT, line, "atom has no type_symbol"))?;

        let coordinate = |col: usize, axis: &str| -> Result<f64, Error> {
            table
                .value(row, Some(col))
                .and_then(|v| v.parse::<f64>().ok())
                .ok_or_else(|| Error::parse(FORMAT, line, format!("invalid {axis} coordinate")))
        };
        let position = [
            coordinate(x_col, "X")?,
            coordinate(y_col, "Y")?,
            coordinate(z_col, "Z")?,
        ];

        let formal_charge = match table.value(row, charge_col) {
            Some(text) => text.parse::<f64>().map_err(|_| {
                Error::parse(FORMAT, line, format!("invalid formal charge '{text}'"))
            })?,
            None => 0.0,
        };

        let key = AtomKey {
            chain_id: chain_id.to_string(),
            res_seq,
            i_code,
            name: name.to_string(),
        };
        if !seen_atoms.insert(key) && table.value(row, alt_col).is_some() {
            skipped_altlocs += 1;
            continue;
        }

        if let Some(label) = table.value(row, label_asym_col) {
            label_to_auth
                .entry(label.to_string())
                .or_insert_with(|| chain_id.to_string());
        }

        let atom_idx =
            record.push_atom(AtomRecord::new(name, symbol, position).with_charge(formal_charge));

        let chain = record.chain_mut_or_insert(chain_id);
        match chain.residues.last_mut() {
            Some(residue)
                if residue.seq == res_seq
                    && residue.insertion_code == i_code
                    && residue.name == comp =>
            {
                residue.atoms.push(atom_idx);
            }
            _ => {
                let mut residue = ResidueRecord::new(comp, res_seq);
                residue.insertion_code = i_code;
                residue.atoms.push(atom_idx);
                chain.residues.push(residue);
            }
        }
    }

    if skipped_altlocs > 0 {
        warn!(
            "mmCIF: skipped {} alternate-location atoms, keeping the first conformer",
            skipped_altlocs
        );
    }
    if skipped_model_atoms > 0 {
        warn!(
            "mmCIF: ignored {} atoms from models after the first",
            skipped_model_atoms
        );
    }

    Ok(label_to_auth)
}

fn read_operators(table: &Table) -> Result<HashMap<String, Transform>, Error> {
    let id_col = table.column("id");
    let mut operators = HashMap::new();

    for row in &table.rows {
        let id = table
            .value(row, id_col)
            .ok_or_else(|| Error::parse(FORMAT, row.line, "struct_oper_list entry has no id"))?;

        let mut rows = [[0.0; 4]; 4];
        rows[3][3] = 1.0;
        for (r, matrix_row) in rows.iter_mut().take(3).enumerate() {
            for (c, slot) in matrix_row.iter_mut().take(3).enumerate() {
                *slot = operator_value(table, row, &format!("matrix[{}][{}]", r + 1, c + 1))?;
            }
            matrix_row[3] = operator_value(table, row, &format!("vector[{}]", r + 1))?;
        }
        operators.insert(id.to_string(), Transform::from_rows(rows));
    }
    Ok(operators)
}

fn operator_value(table: &Table, row: &Row, column: &str) -> Result<f64, Error> {
    let text = table.value(row, table.column(column)).ok_or_else(|| {
        Error::parse(FORMAT, row.line, format!("struct_oper_list is missing {column}"))
    })?;
    text.parse::<f64>().map_err(|_| {
        Error::parse(FORMAT, row.line, format!("invalid {column} value '{text}'"))
    })
}

fn read_assemblies(
    opers: &Table,
    generators: &Table,
    label_to_auth: &HashMap<String, String>,
) -> Result<Vec<AssemblyRecord>, Error> {
    let operators = read_operators(opers)?;
    let assembly_col = generators.column("assembly_id");
    let expression_col = generators.column("oper_expression");
    let asym_col = generators.column("asym_id_list");

    let mut assemblies: Vec<AssemblyRecord> = Vec::new();

    for row in &generators.rows {
        let (Some(assembly_id), Some(expression), Some(asym_list)) = (
            generators.value(row, assembly_col),
            generators.value(row, expression_col),
            generators.value(row, asym_col),
        ) else {
            return Err(Error::parse(
                FORMAT,
                row.line,
                "assembly_gen entry needs assembly_id, oper_expression, and asym_id_list",
            ));
        };

        let Some(groups) = parse_oper_expression(expression) else {
            warn!(
                "mmCIF line {}: ignoring unsupported operator expression '{}'",
                row.line, expression
            );
            continue;
        };

        let mut chains: Vec<String> = Vec::new();
        for label in asym_list.split(',').map(str::trim).filter(|l| !l.is_empty()) {
            match label_to_auth.get(label) {
                Some(auth) if !chains.contains(auth) => chains.push(auth.clone()),
                Some(_) => {}
                None => warn!(
                    "mmCIF line {}: asym id '{}' has no atoms, dropping it from assembly {}",
                    row.line, label, assembly_id
                ),
            }
        }
        if chains.is_empty() {
            warn!(
                "mmCIF line {}: assembly {} generator selects no chains, skipping",
                row.line, assembly_id
            );
            continue;
        }

        let position = match assemblies.iter().position(|a| a.id == assembly_id) {
            Some(pos) => pos,
            None => {
                assemblies.push(AssemblyRecord {
                    id: assembly_id.to_string(),
                    operations: Vec::new(),
                });
                assemblies.len() - 1
            }
        };

        for sequence in cartesian_product(&groups) {
            let mut transform = Transform::identity();
            for id in sequence {
                let operator = operators.get(id).ok_or_else(|| {
                    Error::parse(
                        FORMAT,
                        row.line,
                        format!("operator expression references unknown operator '{id}'"),
                    )
                })?;
                transform = transform.compose(operator);
            }
            assemblies[position].operations.push(OperationRecord {
                matrix: transform.to_rows(),
                chains: chains.clone(),
            });
        }
    }

    Ok(assemblies)
}

/// Parses `1`, `1,2`, `(1-4)`, or `(1,2)(3-5)` into operator groups whose Cartesian product
/// gives the operator sequences to apply.
fn parse_oper_expression(expression: &str) -> Option<Vec<Vec<String>>> {
    let compact: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    if !compact.contains('(') {
        return Some(vec![expand_operator_list(&compact)?]);
    }

    let mut groups = Vec::new();
    let mut rest = compact.as_str();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('(')?;
        let close = inner.find(')')?;
        groups.push(expand_operator_list(&inner[..close])?);
        rest = &inner[close + 1..];
    }
    Some(groups)
}

fn expand_operator_list(list: &str) -> Option<Vec<String>> {
    let mut ids = Vec::new();
    for item in list.split(',') {
        if item.is_empty() {
            return None;
        }
        match item.split_once('-') {
            Some((start, end)) => {
                let start = start.parse::<i64>().ok()?;
                let end = end.parse::<i64>().ok()?;
                if end < start {
                    return None;
                }
                ids.extend((start..=end).map(|n| n.to_string()));
            }
            None => ids.push(item.to_string()),
        }
    }
    Some(ids)
}

fn cartesian_product(groups: &[Vec<String>]) -> Vec<Vec<&str>> {
    let mut sequences: Vec<Vec<&str>> = vec![Vec::new()];
    for group in groups {
        sequences = sequences
            .into_iter()
            .flat_map(|prefix| {
                group.iter().map(move |id| {
                    let mut next = prefix.clone();
                    next.push(id.as_str());
                    next
                })
            })
            .collect();
    }
    sequences
}
