//! Biological-assembly registry attached to a molecule.
//!
//! A [`Bioassembly`] lists the operators that rebuild a biological oligomer from the
//! asymmetric unit. Each [`AssemblyOperation`] carries its own chain scope, so heteromeric
//! assemblies can apply different operators to different chains. Assemblies are read-only once
//! the owning molecule is built.

use super::transform::Transform;
use std::collections::BTreeMap;
use std::fmt;

/// A single operator and the chain ids it replicates.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyOperation {
    /// Operator mapping asymmetric-unit coordinates into the assembly frame.
    pub transform: Transform,
    /// Distinct chain ids the operator applies to, in record order. Never empty once the
    /// owning molecule is built; an empty scope in the record expands to every chain.
    pub chains: Vec<String>,
}

impl AssemblyOperation {
    /// Pairs an operator with its chain scope. Scope validation happens in the molecule.
    pub fn new(transform: Transform, chains: Vec<String>) -> Self {
        Self { transform, chains }
    }
}

/// A named biological assembly: an ordered list of scoped operators.
///
/// Operation order is significant. The builder walks operations in order and applies the first
/// operator that touches a chain to the chain itself, so order decides chain naming.
#[derive(Debug, Clone, PartialEq)]
pub struct Bioassembly {
    id: String,
    operations: Vec<AssemblyOperation>,
}

impl Bioassembly {
    /// Creates an assembly.
    ///
    /// # Arguments
    ///
    /// * `id` - Assembly identifier, e.g. `"1"` from `REMARK 350 BIOMOLECULE: 1`.
    /// * `operations` - Scoped operators in application order.
    ///
    /// # Returns
    ///
    /// The assembly, unvalidated. [`crate::Molecule`] checks chain ids and rotations when it
    /// registers the assembly.
    pub fn new(id: impl Into<String>, operations: Vec<AssemblyOperation>) -> Self {
        Self {
            id: id.into(),
            operations,
        }
    }

    /// Assembly identifier as written in the source record.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Operations in application order.
    pub fn operations(&self) -> &[AssemblyOperation] {
        &self.operations
    }

    /// Number of operations, counting identity operators.
    pub fn num_operations(&self) -> usize {
        self.operations.len()
    }

    /// Operators in application order.
    pub fn transforms(&self) -> impl Iterator<Item = &Transform> + '_ {
        self.operations.iter().map(|op| &op.transform)
    }

    /// Every chain id referenced by any operation, in first-seen order.
    pub fn chains(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for chain in self.operations.iter().flat_map(|op| op.chains.iter()) {
            if !seen.contains(&chain.as_str()) {
                seen.push(chain);
            }
        }
        seen
    }
}

impl fmt::Display for Bioassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bioassembly {{ id: \"{}\", operations: {}, chains: [{}] }}",
            self.id,
            self.num_operations(),
            self.chains().join(", ")
        )
    }
}

/// Format-specific metadata carried by a molecule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    /// Registered assemblies keyed by id.
    pub bioassemblies: BTreeMap<String, Bioassembly>,
    /// Free-form key/value pairs such as `format`, `title`, or SDF data items.
    pub metadata: BTreeMap<String, String>,
}

impl Properties {
    /// Looks up an assembly by id; `None` when it is not registered.
    pub fn bioassembly(&self, id: &str) -> Option<&Bioassembly> {
        self.bioassemblies.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Vector3};

    fn scoped(chains: &[&str]) -> Vec<String> {
        chains.iter().map(|c| c.to_string()).collect()
    }

    fn assembly() -> Bioassembly {
        let shift = Transform::from_parts(Matrix3::identity(), Vector3::new(0.0, 0.0, 12.0));
        Bioassembly::new(
            "1",
            vec![
                AssemblyOperation::new(Transform::identity(), scoped(&["B", "A"])),
                AssemblyOperation::new(shift, scoped(&["A", "C"])),
            ],
        )
    }

    #[test]
    fn chains_are_unioned_in_first_seen_order() {
        assert_eq!(assembly().chains(), vec!["B", "A", "C"]);
    }

    #[test]
    fn transforms_follow_operation_order() {
        let assembly = assembly();
        let transforms: Vec<&Transform> = assembly.transforms().collect();

        assert_eq!(assembly.num_operations(), 2);
        assert!(transforms[0].is_identity(1e-12));
        assert_eq!(transforms[1].translation(), Vector3::new(0.0, 0.0, 12.0));
    }

    #[test]
    fn display_summarizes_assembly() {
        assert_eq!(
            assembly().to_string(),
            "Bioassembly { id: \"1\", operations: 2, chains: [B, A, C] }"
        );
    }

    #[test]
    fn properties_lookup_by_id() {
        let mut properties = Properties::default();
        properties
            .bioassemblies
            .insert("1".to_string(), assembly());

        assert!(properties.bioassembly("1").is_some());
        assert!(properties.bioassembly("2").is_none());
    }
}
