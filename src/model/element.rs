//! Chemical elements backed by the embedded periodic table.
//!
//! An [`Element`] is a validated atomic number. Symbol, isotope mass, standard atomic weight,
//! and default valence are looked up in the reference table shipped with the crate, so every
//! atom created by the model carries data that is consistent with its element by construction.

use crate::db::{ElementRecord, get_store};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chemical element identified by its atomic number (1 through 118).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Element(u8);

/// Error returned when a string does not name a known element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown element '{0}'")]
pub struct ParseElementError(pub String);

impl Element {
    pub const H: Element = Element(1);
    pub const B: Element = Element(5);
    pub const C: Element = Element(6);
    pub const N: Element = Element(7);
    pub const O: Element = Element(8);
    pub const F: Element = Element(9);
    pub const NA: Element = Element(11);
    pub const MG: Element = Element(12);
    pub const P: Element = Element(15);
    pub const S: Element = Element(16);
    pub const CL: Element = Element(17);
    pub const K: Element = Element(19);
    pub const CA: Element = Element(20);
    pub const FE: Element = Element(26);
    pub const ZN: Element = Element(30);
    pub const SE: Element = Element(34);
    pub const BR: Element = Element(35);
    pub const I: Element = Element(53);

    /// Largest atomic number present in the reference table.
    pub const MAX_ATOMIC_NUMBER: u8 = 118;

    /// Looks up an element by atomic number.
    ///
    /// Returns `None` for `0` and anything above [`Element::MAX_ATOMIC_NUMBER`].
    pub fn from_atomic_number(number: u8) -> Option<Self> {
        (1..=Self::MAX_ATOMIC_NUMBER)
            .contains(&number)
            .then_some(Element(number))
    }

    /// Looks up an element by symbol, ignoring ASCII case (`"CL"`, `"cl"`, and `"Cl"` all
    /// resolve to chlorine).
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        get_store()
            .number_for_symbol(symbol.trim())
            .map(Element)
    }

    pub fn atomic_number(self) -> u8 {
        self.0
    }

    pub fn symbol(self) -> &'static str {
        &self.record().symbol
    }

    pub fn name(self) -> &'static str {
        &self.record().name
    }

    /// Mass of the most abundant isotope in atomic mass units.
    ///
    /// This is the per-atom mass used throughout the model, so molecular masses are
    /// monoisotopic (bipyridine, C₁₀H₈N₂, weighs ≈156.069 amu).
    pub fn mass(self) -> f64 {
        self.record().mass
    }

    /// Standard atomic weight in atomic mass units.
    pub fn average_mass(self) -> f64 {
        self.record().average_mass
    }

    /// Default bonding capacity of the element.
    pub fn valence(self) -> u32 {
        self.record().valence
    }

    fn record(self) -> &'static ElementRecord {
        // Element values are only ever built from numbers in 1..=118, all of which the
        // embedded table covers.
        &get_store().elements[usize::from(self.0) - 1]
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Element {
    type Err = ParseElementError;

    /// Accepts either a symbol or a decimal atomic number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed.parse::<u8>() {
            Ok(number) => Element::from_atomic_number(number),
            Err(_) => Element::from_symbol(trimmed),
        };
        parsed.ok_or_else(|| ParseElementError(trimmed.to_string()))
    }
}
