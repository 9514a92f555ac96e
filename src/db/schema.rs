//! Serde schema of `data/elements.toml`.

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ElementTableFile {
    pub element: Vec<ElementRecord>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ElementRecord {
    pub number: u8,
    pub symbol: String,
    pub name: String,
    pub mass: f64,
    pub average_mass: f64,
    pub valence: u32,
}
