#![warn(missing_docs)]

//! Math types for the arris B-rep kernel.
//!
//! Thin wrappers around nalgebra providing domain-specific types for
//! 3D CAD geometry: points, vectors, directions, transforms, and the
//! tolerance pair (linear and chord) that the boolean engine applies
//! throughout.

use nalgebra::{Matrix4, Unit, Vector2, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Rotation about the X axis by `angle` radians.
    pub fn rotation_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(1, 1)] = c;
        m[(1, 2)] = -s;
        m[(2, 1)] = s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self { matrix: m }
    }

    /// Compose: apply `other` first, then `self`.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tolerance constants for geometric comparisons.
///
/// `linear` is the short-length epsilon: two points closer than this are
/// the same point, and a point closer than this to a line lies on it.
/// `chord` is the maximum allowed deviation between a curve and its
/// piecewise-linear sampling; the engine also uses it as boundary slop
/// and as the probe offset when classifying an edge against a shell.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in mm.
    pub linear: f64,
    /// Chord tolerance in mm.
    pub chord: f64,
}

impl Tolerance {
    /// Default CAD tolerances (1e-6 mm linear, 1e-2 mm chord).
    pub const DEFAULT: Self = Self {
        linear: 1e-6,
        chord: 1e-2,
    };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Distance from `pt` to the line through `a` with direction `dir`.
///
/// With `as_segment` the line is bounded to `[a, a + dir]` and the
/// distance to the nearest endpoint is returned outside that range.
pub fn distance_to_line_2d(pt: Point2, a: Point2, dir: Vec2, as_segment: bool) -> f64 {
    let len_sq = dir.norm_squared();
    if len_sq < f64::MIN_POSITIVE {
        return (pt - a).norm();
    }
    let t = (pt - a).dot(&dir) / len_sq;
    if as_segment {
        if t < 0.0 {
            return (pt - a).norm();
        }
        if t > 1.0 {
            return (pt - (a + dir)).norm();
        }
    }
    (pt - (a + t * dir)).norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_identity_transform() {
        let t = Transform::identity();
        let p = Point3::new(1.0, 2.0, 3.0);
        assert!((t.apply_point(&p) - p).norm() < 1e-12);
    }

    #[test]
    fn test_translation() {
        let t = Transform::translation(10.0, 20.0, 30.0);
        let p = t.apply_point(&Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(p.x, 11.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 22.0, epsilon = 1e-12);
        assert_relative_eq!(p.z, 33.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_z_90() {
        let t = Transform::rotation_z(PI / 2.0);
        let p = t.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert!(p.x.abs() < 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_compose_and_inverse() {
        let t = Transform::rotation_x(0.3).then(&Transform::translation(1.0, 2.0, 3.0));
        let inv = t.inverse().unwrap();
        let p = Point3::new(5.0, 6.0, 7.0);
        let roundtrip = inv.apply_point(&t.apply_point(&p));
        assert!((roundtrip - p).norm() < 1e-12);
    }

    #[test]
    fn test_tolerance_points_equal() {
        let tol = Tolerance::DEFAULT;
        let a = Point3::new(1.0, 2.0, 3.0);
        assert!(tol.points_equal(&a, &Point3::new(1.0 + 1e-7, 2.0, 3.0)));
        assert!(!tol.points_equal(&a, &Point3::new(1.001, 2.0, 3.0)));
    }

    #[test]
    fn test_distance_to_line_2d() {
        let a = Point2::new(0.0, 0.0);
        let dir = Vec2::new(10.0, 0.0);
        assert_relative_eq!(
            distance_to_line_2d(Point2::new(5.0, 3.0), a, dir, true),
            3.0,
            epsilon = 1e-12
        );
        // Beyond the segment end, distance is to the endpoint
        assert_relative_eq!(
            distance_to_line_2d(Point2::new(14.0, 3.0), a, dir, true),
            5.0,
            epsilon = 1e-12
        );
        // As an infinite line it is still the perpendicular distance
        assert_relative_eq!(
            distance_to_line_2d(Point2::new(14.0, 3.0), a, dir, false),
            3.0,
            epsilon = 1e-12
        );
    }
}
