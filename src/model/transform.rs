//! Rigid-body operators used by biological assemblies.

use super::types::Point;
use nalgebra::{Matrix3, Matrix4, Vector3};
use std::fmt;

/// 4×4 affine operator whose upper-left 3×3 block is a rotation and whose upper-right
/// column is a translation in ångströms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    matrix: Matrix4<f64>,
}

impl Transform {
    /// Returns the operator that leaves every point in place.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Builds an operator from row-major matrix entries. The bottom row is taken as given.
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        Self {
            matrix: Matrix4::from_fn(|r, c| rows[r][c]),
        }
    }

    /// Builds an operator from a 3×3 rotation and a translation vector.
    ///
    /// # Arguments
    ///
    /// * `rotation` - Linear part, applied first. It is not checked for orthonormality.
    /// * `translation` - Offset added after rotating, in ångströms.
    pub fn from_parts(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        let mut matrix = Matrix4::identity();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
        Self { matrix }
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.matrix[(r, c)];
            }
        }
        rows
    }

    pub fn rotation(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Maps a position: `R · p + t`.
    pub fn apply(&self, point: &Point) -> Point {
        Point::from(self.rotation() * point.coords + self.translation())
    }

    /// Returns `self ∘ other`, i.e. `other` is applied first.
    pub fn compose(&self, other: &Transform) -> Transform {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    pub fn is_identity(&self, tolerance: f64) -> bool {
        (self.matrix - Matrix4::identity()).amax() <= tolerance
    }

    /// Returns `true` when every matrix entry differs from `other` by at most `tolerance`.
    pub fn approx_eq(&self, other: &Transform, tolerance: f64) -> bool {
        (self.matrix - other.matrix).amax() <= tolerance
    }

    /// Checks `R · Rᵗ ≈ I₃` element-wise within `tolerance`.
    pub fn is_orthonormal(&self, tolerance: f64) -> bool {
        let rotation = self.rotation();
        (rotation * rotation.transpose() - Matrix3::identity()).amax() <= tolerance
    }

    /// Multiplies the translation column by `factor` (unit conversion).
    pub(crate) fn scale_translation(&mut self, factor: f64) {
        let scaled = self.translation() * factor;
        self.matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&scaled);
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.translation();
        write!(
            f,
            "Transform {{ identity: {}, translation: [{:.3}, {:.3}, {:.3}] }}",
            self.is_identity(1e-9),
            t.x,
            t.y,
            t.z
        )
    }
}
