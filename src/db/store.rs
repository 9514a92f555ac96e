//! Lazily initialized, process-wide element store.

use super::loader;
use super::schema::ElementRecord;
use std::collections::HashMap;
use std::sync::OnceLock;

pub struct DataStore {
    pub elements: Vec<ElementRecord>,
    pub by_symbol: HashMap<String, u8>,
}

impl DataStore {
    pub fn element(&self, number: u8) -> Option<&ElementRecord> {
        usize::from(number)
            .checked_sub(1)
            .and_then(|idx| self.elements.get(idx))
    }

    pub fn number_for_symbol(&self, symbol: &str) -> Option<u8> {
        self.by_symbol.get(&symbol.to_ascii_uppercase()).copied()
    }
}

static STORE: OnceLock<DataStore> = OnceLock::new();

/// Returns the process-wide element store, loading it on first use.
pub fn get_store() -> &'static DataStore {
    STORE.get_or_init(loader::load_element_table)
}
