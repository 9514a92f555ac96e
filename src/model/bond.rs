//! Bonds between atoms of one molecule.

use super::types::BondOrder;
use std::fmt;

/// Undirected bond between two atoms of the same molecule.
///
/// Endpoints are stored in ascending index order so that equality and hashing do not
/// depend on the order in which the bond was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    /// Index of the first atom (always the lesser index).
    pub a1_idx: usize,
    /// Index of the second atom.
    pub a2_idx: usize,
    /// Chemical multiplicity of the bond.
    pub order: BondOrder,
}

impl Bond {
    /// Creates a bond, canonicalizing the endpoint order.
    pub fn new(idx1: usize, idx2: usize, order: BondOrder) -> Self {
        let (a1_idx, a2_idx) = if idx1 <= idx2 {
            (idx1, idx2)
        } else {
            (idx2, idx1)
        };
        Self {
            a1_idx,
            a2_idx,
            order,
        }
    }

    /// The unordered atom pair as a canonical tuple.
    pub fn key(&self) -> (usize, usize) {
        (self.a1_idx, self.a2_idx)
    }

    pub fn contains(&self, atom_idx: usize) -> bool {
        self.a1_idx == atom_idx || self.a2_idx == atom_idx
    }

    /// Returns the atom on the other side of the bond, or `None` if `atom_idx` is not an
    /// endpoint.
    pub fn partner(&self, atom_idx: usize) -> Option<usize> {
        if self.a1_idx == atom_idx {
            Some(self.a2_idx)
        } else if self.a2_idx == atom_idx {
            Some(self.a1_idx)
        } else {
            None
        }
    }
}

impl fmt::Display for Bond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bond {{ atoms: {}-{}, order: {} }}",
            self.a1_idx, self.a2_idx, self.order
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bond_new_creates_bond_with_canonical_ordering() {
        let bond = Bond::new(5, 2, BondOrder::Single);

        assert_eq!(bond.a1_idx, 2);
        assert_eq!(bond.a2_idx, 5);
        assert_eq!(bond, Bond::new(2, 5, BondOrder::Single));
        assert_eq!(bond.key(), (2, 5));
    }

    #[test]
    fn partner_returns_opposite_endpoint() {
        let bond = Bond::new(3, 7, BondOrder::Double);

        assert!(bond.contains(3));
        assert!(bond.contains(7));
        assert!(!bond.contains(4));
        assert_eq!(bond.partner(3), Some(7));
        assert_eq!(bond.partner(7), Some(3));
        assert_eq!(bond.partner(1), None);
    }

    #[test]
    fn bond_display_reports_endpoints_and_order() {
        let bond = Bond::new(1, 0, BondOrder::Aromatic);
        assert_eq!(bond.to_string(), "Bond { atoms: 0-1, order: 1.5 }");
    }
}
