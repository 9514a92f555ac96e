//! Biological assembly reconstruction.
//!
//! An assembly is rebuilt from the asymmetric unit by replaying the symmetry operators stored in
//! the source molecule's [`Bioassembly`](crate::Bioassembly) registry. The source is never
//! modified; every build allocates an independent result.

use crate::model::error::{EntityKind, Error};
use crate::model::molecule::Molecule;
use crate::model::transform::Transform;
use crate::utils::parallel::*;
use log::{debug, trace};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Builds the biological assembly `assembly_id` of `source`.
///
/// The result starts as a deep copy of `source`. Operations are walked in order and each scoped
/// chain is handled once per distinct operator:
///
/// - the first operator that reaches a chain moves the copied chain in place (an identity
///   leaves it where it is);
/// - a later, different operator appends a transformed copy of the source chain, named through
///   [`copied_chain_name`], with its residues, atoms and intra-chain bonds;
/// - an operator equal (within the molecule's `rotation_tolerance`) to one already applied to
///   that chain adds nothing.
///
/// Chains outside every operation scope are kept unchanged. The result carries the source
/// metadata plus an `assembly` entry with the built id. Its bioassembly registry is empty, since
/// the source operators describe the asymmetric unit.
///
/// # Arguments
///
/// * `source` - Asymmetric unit holding the assembly registry. It is not modified.
/// * `assembly_id` - Registered assembly to build.
///
/// # Returns
///
/// A new molecule holding the assembled chains.
///
/// # Errors
///
/// Returns [`Error::NotFound`] when `assembly_id` is not registered on `source`.
///
/// # Examples
///
/// ```no_run
/// use mol_forge::io::read_file;
/// use mol_forge::ops::build_assembly;
///
/// let unit = read_file("1kbu.pdb")?;
/// let assembly = build_assembly(&unit, "1")?;
/// assert_eq!(assembly.num_chains(), unit.num_chains() * 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn build_assembly(source: &Molecule, assembly_id: &str) -> Result<Molecule, Error> {
    let assembly = source.bioassembly(assembly_id)?;
    let tolerance = source.validation_config().rotation_tolerance;

    let mut result = source.clone();
    result.properties.bioassemblies.clear();
    result
        .properties
        .metadata
        .insert("assembly".to_string(), assembly_id.to_string());

    let mut taken: HashSet<String> = source
        .chains()
        .iter()
        .map(|chain| chain.name().to_string())
        .collect();
    // Operators already realised for each source chain, in place or as a copy.
    let mut applied: HashMap<usize, Vec<Transform>> = HashMap::new();

    for (op_idx, op) in assembly.operations().iter().enumerate() {
        let mut copied = 0usize;

        for chain_id in &op.chains {
            let chain_idx = source
                .chain_index(chain_id)
                .ok_or_else(|| Error::not_found(EntityKind::Chain, chain_id))?;
            let seen = applied.entry(chain_idx).or_default();

            if seen.iter().any(|t| t.approx_eq(&op.transform, tolerance)) {
                trace!(
                    "assembly '{}': operation {} repeats an operator already applied to chain '{}'",
                    assembly_id, op_idx, chain_id
                );
                continue;
            }

            if seen.is_empty() {
                if !op.transform.is_identity(tolerance) {
                    result.transform_chain(chain_idx, &op.transform);
                }
            } else {
                let name = copied_chain_name(chain_id, op_idx, &taken);
                if name != *chain_id {
                    debug!(
                        "assembly '{}': copy of chain '{}' by operation {} renamed to '{}'",
                        assembly_id, chain_id, op_idx, name
                    );
                }
                taken.insert(name.clone());
                result.append_chain_copy(source, chain_idx, name, &op.transform);
                copied += 1;
            }
            seen.push(op.transform);
        }

        trace!(
            "assembly '{}': operation {} added {} chain copies with {}",
            assembly_id, op_idx, copied, op.transform
        );
    }

    debug!(
        "built assembly '{}': {} operations, {} chains, {} atoms",
        assembly_id,
        assembly.num_operations(),
        result.num_chains(),
        result.num_atoms()
    );

    Ok(result)
}

/// Builds every assembly registered on `source`, keyed by assembly id.
///
/// Builds are independent and run in parallel when the `parallel` feature is enabled.
///
/// # Errors
///
/// Propagates the first failing [`build_assembly`] call.
pub fn build_all_assemblies(source: &Molecule) -> Result<BTreeMap<String, Molecule>, Error> {
    source
        .properties()
        .bioassemblies
        .par_iter()
        .map(|(id, _)| build_assembly(source, id).map(|molecule| (id.clone(), molecule)))
        .collect()
}

/// Chooses the name for a copy of chain `name` made by operation `op_idx`.
///
/// The source name is kept when free. Otherwise the operation index is appended (`A` → `A1`),
/// and if that is taken too, the smallest free `_<n>` suffix with `n ≥ 1` (`A1_1`, `A1_2`, ...).
pub fn copied_chain_name(name: &str, op_idx: usize, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let indexed = format!("{name}{op_idx}");
    if !taken.contains(&indexed) {
        return indexed;
    }
    (1..)
        .map(|n| format!("{indexed}_{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(indexed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::ValidationConfig;
    use crate::model::record::{
        AssemblyRecord, AtomRecord, ChainRecord, OperationRecord, ResidueRecord, StructureRecord,
    };
    use crate::model::types::BondOrder;

    const IDENTITY: [[f64; 4]; 4] = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    // Half turn about z followed by a shift.
    const HALF_TURN: [[f64; 4]; 4] = [
        [-1.0, 0.0, 0.0, 20.0],
        [0.0, -1.0, 0.0, 10.0],
        [0.0, 0.0, 1.0, -5.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    fn operation(matrix: [[f64; 4]; 4], chains: &[&str]) -> OperationRecord {
        OperationRecord {
            matrix,
            chains: chains.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn dimer_record(chain_ids: [&str; 2], assemblies: Vec<AssemblyRecord>) -> StructureRecord {
        let mut record = StructureRecord::new();
        record.name = Some("dimer".to_string());

        for (c, chain_id) in chain_ids.iter().enumerate() {
            let offset = c as f64 * 4.0;
            let n = record.push_atom(AtomRecord::new("N", "N", [offset, 1.0, 0.5]));
            let ca = record.push_atom(
                AtomRecord::new("CA", "C", [offset + 1.2, 1.5, -0.5]).with_charge(c as f64),
            );
            record.push_bond(n, ca, BondOrder::Single);

            let chain = record.push_chain(ChainRecord::new(*chain_id));
            let mut residue = ResidueRecord::new("GLY", 1);
            residue.atoms = vec![n, ca];
            chain.residues.push(residue);
        }
        // Inter-chain contact, only present in the source copy.
        record.push_bond(1, 2, BondOrder::Single);
        record.assemblies = assemblies;
        record
    }

    fn dimer(chain_ids: [&str; 2], assemblies: Vec<AssemblyRecord>) -> Molecule {
        Molecule::from_record(&dimer_record(chain_ids, assemblies)).unwrap()
    }

    fn two_operator_dimer() -> Molecule {
        dimer(
            ["A", "B"],
            vec![AssemblyRecord {
                id: "1".to_string(),
                operations: vec![
                    operation(IDENTITY, &["A", "B"]),
                    operation(HALF_TURN, &["A", "B"]),
                ],
            }],
        )
    }

    fn chain_names(molecule: &Molecule) -> Vec<&str> {
        molecule.chains().iter().map(|c| c.name()).collect()
    }

    #[test]
    fn building_doubles_chains_and_replicates_intra_chain_bonds() {
        let source = two_operator_dimer();
        let built = build_assembly(&source, "1").unwrap();

        assert_eq!(built.num_chains(), source.num_chains() * 2);
        assert_eq!(built.num_atoms(), 8);
        assert_eq!(built.num_residues(), 4);
        assert_eq!(built.num_bonds(), source.num_bonds() + 2);
        assert_eq!(chain_names(&built), vec!["A", "B", "A1", "B1"]);
        assert!((built.mass() - 2.0 * source.mass()).abs() < 1e-9);
        assert!((built.charge() - 2.0 * source.charge()).abs() < 1e-12);
    }

    #[test]
    fn source_is_left_untouched() {
        let source = two_operator_dimer();
        let before = source.clone();

        let _ = build_assembly(&source, "1").unwrap();

        assert_eq!(source, before);
        assert!(source.bioassembly("1").is_ok());
    }

    #[test]
    fn copied_positions_follow_the_operator() {
        let source = two_operator_dimer();
        let built = build_assembly(&source, "1").unwrap();
        let transform = Transform::from_rows(HALF_TURN);

        for (original, copy) in [("A", "A1"), ("B", "B1")] {
            let expected = source.chain_positions(original).unwrap();
            let actual = built.chain_positions(copy).unwrap();
            assert_eq!(expected.len(), actual.len());
            for (p, q) in expected.iter().zip(&actual) {
                assert!((transform.apply(p) - q).norm() < 1e-9);
            }
        }

        // The identity leaves the in-place chains on their source coordinates.
        assert_eq!(
            built.chain_positions("A").unwrap(),
            source.chain_positions("A").unwrap()
        );
    }

    #[test]
    fn copies_keep_atom_properties_and_residues() {
        let source = two_operator_dimer();
        let built = build_assembly(&source, "1").unwrap();

        let copy = built.chain("B1").unwrap();
        let atoms: Vec<_> = built.chain_atoms(copy).collect();
        assert_eq!(atoms[1].name, "CA");
        assert_eq!(atoms[1].formal_charge, 1.0);
        assert_eq!(atoms[1].chain_index(), Some(copy.index()));

        let residue = &built.residues()[copy.residue_indices()[0]];
        assert_eq!(residue.name, "GLY");
        assert_eq!(residue.chain_index(), copy.index());
        assert_eq!(residue.atom_indices(), copy.atom_indices());
    }

    #[test]
    fn result_drops_registry_and_records_assembly_id() {
        let built = build_assembly(&two_operator_dimer(), "1").unwrap();

        assert!(built.properties().bioassemblies.is_empty());
        assert_eq!(built.properties().metadata["assembly"], "1");
    }

    #[test]
    fn identity_only_assembly_equals_source() {
        let source = dimer(
            ["A", "B"],
            vec![AssemblyRecord {
                id: "1".to_string(),
                operations: vec![operation(IDENTITY, &[])],
            }],
        );
        let built = build_assembly(&source, "1").unwrap();

        assert_eq!(built, source);
    }

    #[test]
    fn scoped_operations_copy_only_their_chains() {
        let source = dimer(
            ["A", "B"],
            vec![AssemblyRecord {
                id: "2".to_string(),
                operations: vec![operation(IDENTITY, &["A"]), operation(HALF_TURN, &["A"])],
            }],
        );
        let built = build_assembly(&source, "2").unwrap();

        assert_eq!(chain_names(&built), vec!["A", "B", "A1"]);
    }

    #[test]
    fn non_identity_first_operation_moves_chains_in_place() {
        let source = dimer(
            ["A", "B"],
            vec![AssemblyRecord {
                id: "1".to_string(),
                operations: vec![operation(HALF_TURN, &[])],
            }],
        );
        let built = build_assembly(&source, "1").unwrap();
        let transform = Transform::from_rows(HALF_TURN);

        assert_eq!(chain_names(&built), vec!["A", "B"]);
        assert_eq!(built.num_atoms(), source.num_atoms());
        for chain in ["A", "B"] {
            let expected = source.chain_positions(chain).unwrap();
            let actual = built.chain_positions(chain).unwrap();
            for (p, q) in expected.iter().zip(&actual) {
                assert!((transform.apply(p) - q).norm() < 1e-9);
            }
        }
    }

    #[test]
    fn chains_outside_every_scope_stay_in_place() {
        let source = dimer(
            ["A", "B"],
            vec![AssemblyRecord {
                id: "1".to_string(),
                operations: vec![operation(HALF_TURN, &["A"])],
            }],
        );
        let built = build_assembly(&source, "1").unwrap();

        assert_eq!(chain_names(&built), vec!["A", "B"]);
        assert_eq!(
            built.chain_positions("B").unwrap(),
            source.chain_positions("B").unwrap()
        );
        assert_ne!(
            built.chain_positions("A").unwrap(),
            source.chain_positions("A").unwrap()
        );
    }

    #[test]
    fn per_chain_blocks_copy_each_chain_once() {
        // Two `APPLY THE FOLLOWING TO CHAINS` blocks, each restating the identity.
        let source = dimer(
            ["A", "B"],
            vec![AssemblyRecord {
                id: "1".to_string(),
                operations: vec![
                    operation(IDENTITY, &["A"]),
                    operation(HALF_TURN, &["A"]),
                    operation(IDENTITY, &["B"]),
                    operation(HALF_TURN, &["B"]),
                ],
            }],
        );
        let built = build_assembly(&source, "1").unwrap();

        assert_eq!(chain_names(&built), vec!["A", "B", "A1", "B3"]);
        assert_eq!(built.num_atoms(), 2 * source.num_atoms());
        assert_eq!(
            built.chain_positions("B").unwrap(),
            source.chain_positions("B").unwrap()
        );

        let transform = Transform::from_rows(HALF_TURN);
        let expected = source.chain_positions("B").unwrap();
        let actual = built.chain_positions("B3").unwrap();
        for (p, q) in expected.iter().zip(&actual) {
            assert!((transform.apply(p) - q).norm() < 1e-9);
        }
    }

    #[test]
    fn repeated_operators_add_nothing() {
        let source = dimer(
            ["A", "B"],
            vec![AssemblyRecord {
                id: "1".to_string(),
                operations: vec![
                    operation(IDENTITY, &[]),
                    operation(IDENTITY, &["A"]),
                    operation(HALF_TURN, &["B"]),
                    operation(HALF_TURN, &["B", "A"]),
                    operation(IDENTITY, &["B"]),
                ],
            }],
        );
        let built = build_assembly(&source, "1").unwrap();

        assert_eq!(chain_names(&built), vec!["A", "B", "B2", "A3"]);
    }

    #[test]
    fn operator_matching_uses_the_molecule_tolerance() {
        let mut nearly_identity = IDENTITY;
        nearly_identity[0][3] = 1e-4;
        let assemblies = vec![AssemblyRecord {
            id: "1".to_string(),
            operations: vec![operation(IDENTITY, &[]), operation(nearly_identity, &[])],
        }];

        let strict = dimer(["A", "B"], assemblies.clone());
        assert_eq!(build_assembly(&strict, "1").unwrap().num_chains(), 4);

        let loose = ValidationConfig {
            rotation_tolerance: 1e-3,
            ..Default::default()
        };
        let record = dimer_record(["A", "B"], assemblies);
        let lenient = Molecule::from_record_with(&record, &loose).unwrap();
        let built = build_assembly(&lenient, "1").unwrap();
        assert_eq!(built, lenient);
        assert_eq!(built.num_chains(), 2);
    }

    #[test]
    fn colliding_names_get_numeric_suffixes() {
        let source = dimer(
            ["A", "A1"],
            vec![AssemblyRecord {
                id: "1".to_string(),
                operations: vec![operation(IDENTITY, &[]), operation(HALF_TURN, &[])],
            }],
        );
        let built = build_assembly(&source, "1").unwrap();

        assert_eq!(chain_names(&built), vec!["A", "A1", "A1_1", "A11"]);
    }

    #[test]
    fn copied_chain_name_prefers_source_name() {
        let taken: HashSet<String> = ["B", "B3", "B3_1"].iter().map(|s| s.to_string()).collect();

        assert_eq!(copied_chain_name("C", 3, &taken), "C");
        assert_eq!(copied_chain_name("B", 2, &taken), "B2");
        assert_eq!(copied_chain_name("B", 3, &taken), "B3_2");
    }

    #[test]
    fn unknown_assembly_is_not_found() {
        let err = build_assembly(&two_operator_dimer(), "7").unwrap_err();
        assert_eq!(err, Error::not_found(EntityKind::Assembly, "7"));
    }

    #[test]
    fn build_all_assemblies_returns_every_registered_id() {
        let source = dimer(
            ["A", "B"],
            vec![
                AssemblyRecord {
                    id: "1".to_string(),
                    operations: vec![operation(IDENTITY, &[]), operation(HALF_TURN, &[])],
                },
                AssemblyRecord {
                    id: "2".to_string(),
                    operations: vec![operation(IDENTITY, &["B"])],
                },
            ],
        );
        let all = build_all_assemblies(&source).unwrap();

        assert_eq!(all.keys().map(String::as_str).collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(all["1"].num_chains(), 4);
        assert_eq!(all["2"].num_chains(), 2);
        assert_eq!(all["2"].properties().metadata["assembly"], "2");
    }
}
