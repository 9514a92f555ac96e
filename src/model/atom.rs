//! Atom representation stored in a [`Molecule`](super::molecule::Molecule) arena.
//!
//! Atoms carry their chemical identity (element, valence, isotope mass, formal charge) next
//! to the Cartesian position, plus index back-references into the owning molecule. The
//! back-references are plain integers: the molecule owns every atom, chain, and residue, so an
//! atom never keeps its parents alive.

use super::element::Element;
use super::types::Point;
use smol_str::SmolStr;
use std::fmt;

/// Labeled atom with element data and a position in ångströms.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Atom name as it appears in the source file (e.g. `CA`, `N1`).
    pub name: SmolStr,
    /// Chemical element.
    pub element: Element,
    /// Expected bonding capacity of the element.
    pub valence: u32,
    /// Atom mass in amu.
    pub mass: f64,
    /// Formal charge in elementary charges.
    pub formal_charge: f64,
    /// Cartesian coordinates in ångströms.
    pub pos: Point,
    pub(crate) index: usize,
    pub(crate) chain: Option<usize>,
    pub(crate) residue: Option<usize>,
}

impl Atom {
    /// Creates a detached, neutral atom whose valence and mass come from the element table.
    ///
    /// The atom only receives an index and parent references once a molecule adopts it.
    ///
    /// # Arguments
    ///
    /// * `name` - Atom label such as `"CA"` or `"H3"`.
    /// * `element` - Chemical element of the atom.
    /// * `pos` - Position in ångströms.
    pub fn new(name: &str, element: Element, pos: Point) -> Self {
        Self {
            name: SmolStr::new(name),
            element,
            valence: element.valence(),
            mass: element.mass(),
            formal_charge: 0.0,
            pos,
            index: 0,
            chain: None,
            residue: None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        self.element.symbol()
    }

    pub fn atomic_number(&self) -> u8 {
        self.element.atomic_number()
    }

    /// Position of the atom in its molecule's atom list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Index of the chain owning this atom, if any.
    pub fn chain_index(&self) -> Option<usize> {
        self.chain
    }

    /// Index of the residue owning this atom, if any.
    pub fn residue_index(&self) -> Option<usize> {
        self.residue
    }

    /// Squared Euclidean distance to another atom in Å².
    pub fn distance_squared(&self, other: &Atom) -> f64 {
        nalgebra::distance_squared(&self.pos, &other.pos)
    }

    /// Euclidean distance to another atom in Å.
    pub fn distance(&self, other: &Atom) -> f64 {
        nalgebra::distance(&self.pos, &other.pos)
    }

    /// Compares element, formal charge, and position within `tolerance`.
    ///
    /// Names, arena indices, and the per-atom mass and valence are ignored; the latter two are
    /// fixed by the element up to the isotope/average choice a record may make.
    pub(crate) fn same_content(&self, other: &Atom, tolerance: f64) -> bool {
        self.element == other.element
            && (self.formal_charge - other.formal_charge).abs() <= tolerance
            && (self.pos - other.pos).amax() <= tolerance
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Atom {{ index: {}, name: \"{}\", element: {}, pos: [{:.3}, {:.3}, {:.3}] }}",
            self.index, self.name, self.element, self.pos.x, self.pos.y, self.pos.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_new_takes_valence_and_mass_from_element() {
        let atom = Atom::new("N1", Element::N, Point::new(1.0, 2.0, 3.0));

        assert_eq!(atom.name, "N1");
        assert_eq!(atom.symbol(), "N");
        assert_eq!(atom.atomic_number(), 7);
        assert_eq!(atom.valence, 3);
        assert!((atom.mass - 14.003).abs() < 0.001);
        assert_eq!(atom.formal_charge, 0.0);
        assert!(atom.chain_index().is_none());
        assert!(atom.residue_index().is_none());
    }

    #[test]
    fn atom_distance_calculates_correctly() {
        let atom1 = Atom::new("A", Element::H, Point::new(0.0, 0.0, 0.0));
        let atom2 = Atom::new("B", Element::H, Point::new(3.0, 4.0, 0.0));

        assert!((atom1.distance_squared(&atom2) - 25.0).abs() < 1e-10);
        assert!((atom1.distance(&atom2) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn same_content_ignores_names_but_not_positions() {
        let atom1 = Atom::new("C1", Element::C, Point::new(1.0, 2.0, 3.0));
        let mut atom2 = Atom::new("CA", Element::C, Point::new(1.0, 2.0, 3.0 + 1e-9));

        assert!(atom1.same_content(&atom2, 1e-6));

        atom2.pos.z += 0.1;
        assert!(!atom1.same_content(&atom2, 1e-6));

        let charged = Atom {
            formal_charge: 1.0,
            ..atom1.clone()
        };
        assert!(!atom1.same_content(&charged, 1e-6));
    }

    #[test]
    fn same_content_ignores_supplied_average_mass() {
        let isotope = Atom::new("C1", Element::C, Point::new(0.5, 0.0, -0.5));
        let average = Atom {
            mass: Element::C.average_mass(),
            ..isotope.clone()
        };

        assert!((isotope.mass - average.mass).abs() > 1e-3);
        assert!(isotope.same_content(&average, 1e-6));
    }

    #[test]
    fn atom_display_formats_correctly() {
        let atom = Atom::new("CA", Element::C, Point::new(1.234, -5.678, 9.012));

        assert_eq!(
            format!("{}", atom),
            "Atom { index: 0, name: \"CA\", element: C, pos: [1.234, -5.678, 9.012] }"
        );
    }
}
