//! Loads the element table compiled into the binary.

use super::schema::ElementTableFile;
use super::store::DataStore;
use std::collections::HashMap;

const ELEMENT_TABLE: &str = include_str!("../../data/elements.toml");

/// Parses the embedded periodic table.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed, out of atomic-number order, or repeats a symbol.
/// The table ships with the crate, so any of these is a build defect.
pub fn load_element_table() -> DataStore {
    let table: ElementTableFile = toml::from_str(ELEMENT_TABLE)
        .unwrap_or_else(|e| panic!("Failed to parse embedded element table: {}", e));

    let mut by_symbol = HashMap::with_capacity(table.element.len());
    for (position, record) in table.element.iter().enumerate() {
        if usize::from(record.number) != position + 1 {
            panic!(
                "Element table is not ordered by atomic number: found {} at position {}",
                record.number,
                position + 1
            );
        }

        if by_symbol
            .insert(record.symbol.to_ascii_uppercase(), record.number)
            .is_some()
        {
            panic!("Duplicate element symbol found: {}", record.symbol);
        }
    }

    DataStore {
        elements: table.element,
        by_symbol,
    }
}
