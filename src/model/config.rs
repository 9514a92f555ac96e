//! Tolerances and switches applied while building a [`Molecule`](super::molecule::Molecule).

use serde::Deserialize;

/// Construction-time validation settings.
///
/// # Examples
///
/// ```
/// use mol_forge::ValidationConfig;
///
/// let strict = ValidationConfig {
///     mass_tolerance: 1e-4,
///     ..Default::default()
/// };
/// assert!(strict.validate_rotations);
///
/// let loaded = ValidationConfig::from_toml_str("validate_rotations = false").unwrap();
/// assert!(!loaded.validate_rotations);
/// assert_eq!(loaded.rotation_tolerance, 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Largest accepted deviation (amu) between a record-supplied atom mass and the
    /// element's isotope mass.
    pub mass_tolerance: f64,
    /// Largest accepted element-wise deviation of `R·Rᵗ` from the identity.
    pub rotation_tolerance: f64,
    /// Reject assemblies whose rotation blocks are not orthonormal.
    pub validate_rotations: bool,
    /// Coordinate tolerance (Å) used by structural equality.
    pub position_tolerance: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            mass_tolerance: 0.01,
            rotation_tolerance: 1e-6,
            validate_rotations: true,
            position_tolerance: 1e-6,
        }
    }
}

impl ValidationConfig {
    /// Parses a configuration from TOML; omitted keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = ValidationConfig::default();
        assert_eq!(config.mass_tolerance, 0.01);
        assert_eq!(config.rotation_tolerance, 1e-6);
        assert!(config.validate_rotations);
        assert_eq!(config.position_tolerance, 1e-6);
    }

    #[test]
    fn toml_overrides_only_named_fields() {
        let config = ValidationConfig::from_toml_str(
            "mass_tolerance = 0.5\nposition_tolerance = 1e-3\n",
        )
        .unwrap();

        assert_eq!(config.mass_tolerance, 0.5);
        assert_eq!(config.position_tolerance, 1e-3);
        assert!(config.validate_rotations);
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        assert!(ValidationConfig::from_toml_str("tolerance = 1.0").is_err());
    }
}
