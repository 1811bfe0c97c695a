#![warn(missing_docs)]

//! Analytic surface and curve types for the arris kernel.
//!
//! Provides trait-based abstractions for parametric surfaces and exact
//! curves, with concrete implementations for the analytic types the
//! boolean engine operates on: planes, spheres, lines, and circles.
//! Also provides the numeric routines the engine leans on: closest-point
//! projection, segment-surface intersection, surface-surface intersection
//! ([`ssi`]), and multi-surface refinement ([`refine`]).

use std::any::Any;
use std::f64::consts::PI;

use arris_kernel_math::{Dir3, Point2, Point3, Transform, Vec3};

pub mod refine;
pub mod ssi;

/// The kind of a surface (for match-based dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Infinite plane.
    Plane,
    /// Spherical surface.
    Sphere,
}

/// A parametric surface in 3D space.
///
/// The orientation convention matters: `normal` must equal the direction
/// of `d_du × d_dv`, and shells built from these surfaces orient trim
/// loops so the face material lies to the right of the loop direction.
pub trait Surface: Send + Sync + std::fmt::Debug {
    /// Evaluate the surface at parameter `(u, v)` to get a 3D point.
    fn evaluate(&self, uv: Point2) -> Point3;

    /// Surface normal at parameter `(u, v)`.
    fn normal(&self, uv: Point2) -> Dir3;

    /// Partial derivative with respect to u at `(u, v)`.
    fn d_du(&self, uv: Point2) -> Vec3;

    /// Partial derivative with respect to v at `(u, v)`.
    fn d_dv(&self, uv: Point2) -> Vec3;

    /// Parameter of the surface point nearest to `p`.
    ///
    /// Best effort: for points far from the surface this returns the
    /// projection, which is all the engine requires.
    fn closest_point(&self, p: &Point3) -> Point2;

    /// Append every intersection of the segment (or infinite line)
    /// `a..b` with this surface to `out`.
    fn line_intersections(&self, a: &Point3, b: &Point3, as_segment: bool, out: &mut Vec<Point3>);

    /// Parameter domain as `((u_min, u_max), (v_min, v_max))`.
    fn domain(&self) -> ((f64, f64), (f64, f64));

    /// The kind of this surface.
    fn surface_type(&self) -> SurfaceKind;

    /// Clone this surface into a boxed trait object.
    fn clone_box(&self) -> Box<dyn Surface>;

    /// Downcast to a concrete type via `Any`.
    fn as_any(&self) -> &dyn Any;

    /// Apply an affine transform to this surface, returning a new surface.
    fn transform(&self, t: &Transform) -> Box<dyn Surface>;
}

impl Clone for Box<dyn Surface> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Orientation-reverse a surface: same point set, flipped normal.
///
/// Reversing twice unwraps back to the original surface.
pub fn reversed(s: &dyn Surface) -> Box<dyn Surface> {
    if let Some(r) = s.as_any().downcast_ref::<ReversedSurface>() {
        return r.inner.clone_box();
    }
    Box::new(ReversedSurface {
        inner: s.clone_box(),
    })
}

/// Strip the reversal wrapper, if any, for concrete-type dispatch.
pub fn underlying(s: &dyn Surface) -> &dyn Surface {
    match s.as_any().downcast_ref::<ReversedSurface>() {
        Some(r) => r.inner.as_ref(),
        None => s,
    }
}

// =============================================================================
// Plane
// =============================================================================

/// An infinite plane defined by an origin point and a coordinate frame.
///
/// Parameterization: `P(u, v) = origin + u * x_dir + v * y_dir`
#[derive(Debug, Clone)]
pub struct Plane {
    /// Origin point on the plane.
    pub origin: Point3,
    /// Unit vector along the u direction.
    pub x_dir: Dir3,
    /// Unit vector along the v direction.
    pub y_dir: Dir3,
    /// Unit normal (x_dir × y_dir).
    pub normal_dir: Dir3,
}

impl Plane {
    /// Create a plane from origin and two orthogonal direction vectors.
    /// The vectors do not need to be normalized.
    pub fn new(origin: Point3, x_dir: Vec3, y_dir: Vec3) -> Self {
        let x = Dir3::new_normalize(x_dir);
        let y = Dir3::new_normalize(y_dir);
        let n = Dir3::new_normalize(x_dir.cross(&y_dir));
        Self {
            origin,
            x_dir: x,
            y_dir: y,
            normal_dir: n,
        }
    }

    /// XY plane at the origin.
    pub fn xy() -> Self {
        Self::new(Point3::origin(), Vec3::x(), Vec3::y())
    }

    /// XZ plane at the origin.
    pub fn xz() -> Self {
        Self::new(Point3::origin(), Vec3::x(), Vec3::z())
    }

    /// Signed distance from a point to this plane.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(self.normal_dir.as_ref())
    }
}

impl Surface for Plane {
    fn evaluate(&self, uv: Point2) -> Point3 {
        self.origin + uv.x * self.x_dir.as_ref() + uv.y * self.y_dir.as_ref()
    }

    fn normal(&self, _uv: Point2) -> Dir3 {
        self.normal_dir
    }

    fn d_du(&self, _uv: Point2) -> Vec3 {
        *self.x_dir.as_ref()
    }

    fn d_dv(&self, _uv: Point2) -> Vec3 {
        *self.y_dir.as_ref()
    }

    fn closest_point(&self, p: &Point3) -> Point2 {
        let d = p - self.origin;
        Point2::new(d.dot(self.x_dir.as_ref()), d.dot(self.y_dir.as_ref()))
    }

    fn line_intersections(&self, a: &Point3, b: &Point3, as_segment: bool, out: &mut Vec<Point3>) {
        let d = b - a;
        let denom = d.dot(self.normal_dir.as_ref());
        if denom.abs() < 1e-12 {
            // Parallel (or in-plane); an in-plane segment has no
            // transversal crossing to report.
            return;
        }
        let t = (self.origin - a).dot(self.normal_dir.as_ref()) / denom;
        if as_segment && !(-1e-9..=1.0 + 1e-9).contains(&t) {
            return;
        }
        out.push(a + t * d);
    }

    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        ((-1e10, 1e10), (-1e10, 1e10))
    }

    fn surface_type(&self) -> SurfaceKind {
        SurfaceKind::Plane
    }

    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn transform(&self, t: &Transform) -> Box<dyn Surface> {
        Box::new(Plane::new(
            t.apply_point(&self.origin),
            t.apply_vec(self.x_dir.as_ref()),
            t.apply_vec(self.y_dir.as_ref()),
        ))
    }
}

// =============================================================================
// Sphere
// =============================================================================

/// A spherical surface defined by center and radius.
///
/// Parameterization:
/// `P(u, v) = center + radius * (cos(v) * (cos(u) * ref + sin(u) * y) + sin(v) * axis)`
///
/// Where `u ∈ [0, 2π)` is longitude and `v ∈ [-π/2, π/2]` is latitude.
#[derive(Debug, Clone)]
pub struct SphereSurface {
    /// Center of the sphere.
    pub center: Point3,
    /// Radius of the sphere.
    pub radius: f64,
    /// Reference direction for u=0 (perpendicular to axis).
    pub ref_dir: Dir3,
    /// Axis direction (north pole).
    pub axis: Dir3,
}

impl SphereSurface {
    /// Create a sphere centered at origin with the given radius.
    pub fn new(radius: f64) -> Self {
        Self {
            center: Point3::origin(),
            radius,
            ref_dir: Dir3::new_normalize(Vec3::x()),
            axis: Dir3::new_normalize(Vec3::z()),
        }
    }

    /// Create a sphere with a custom center.
    pub fn with_center(center: Point3, radius: f64) -> Self {
        Self {
            center,
            ..Self::new(radius)
        }
    }

    fn y_dir(&self) -> Vec3 {
        self.axis.as_ref().cross(self.ref_dir.as_ref())
    }
}

impl Surface for SphereSurface {
    fn evaluate(&self, uv: Point2) -> Point3 {
        let (sin_u, cos_u) = uv.x.sin_cos();
        let (sin_v, cos_v) = uv.y.sin_cos();
        self.center
            + self.radius
                * (cos_v * (cos_u * self.ref_dir.as_ref() + sin_u * self.y_dir())
                    + sin_v * self.axis.as_ref())
    }

    fn normal(&self, uv: Point2) -> Dir3 {
        let (sin_u, cos_u) = uv.x.sin_cos();
        let (sin_v, cos_v) = uv.y.sin_cos();
        Dir3::new_normalize(
            cos_v * (cos_u * self.ref_dir.as_ref() + sin_u * self.y_dir())
                + sin_v * self.axis.as_ref(),
        )
    }

    fn d_du(&self, uv: Point2) -> Vec3 {
        let (sin_u, cos_u) = uv.x.sin_cos();
        let cos_v = uv.y.cos();
        self.radius * cos_v * (-sin_u * self.ref_dir.as_ref() + cos_u * self.y_dir())
    }

    fn d_dv(&self, uv: Point2) -> Vec3 {
        let (sin_u, cos_u) = uv.x.sin_cos();
        let (sin_v, cos_v) = uv.y.sin_cos();
        self.radius
            * (-sin_v * (cos_u * self.ref_dir.as_ref() + sin_u * self.y_dir())
                + cos_v * self.axis.as_ref())
    }

    fn closest_point(&self, p: &Point3) -> Point2 {
        let d = p - self.center;
        let n = d.norm();
        if n < 1e-12 {
            return Point2::origin();
        }
        let d = d / n;
        let v = d.dot(self.axis.as_ref()).clamp(-1.0, 1.0).asin();
        let cos_v = v.cos();
        let u = if cos_v.abs() < 1e-12 {
            0.0
        } else {
            let du = d.dot(self.ref_dir.as_ref());
            let dy = d.dot(&self.y_dir());
            let u = dy.atan2(du);
            if u < 0.0 {
                u + 2.0 * PI
            } else {
                u
            }
        };
        Point2::new(u, v)
    }

    fn line_intersections(&self, a: &Point3, b: &Point3, as_segment: bool, out: &mut Vec<Point3>) {
        let d = b - a;
        let m = a - self.center;
        let qa = d.norm_squared();
        if qa < f64::MIN_POSITIVE {
            return;
        }
        let qb = 2.0 * m.dot(&d);
        let qc = m.norm_squared() - self.radius * self.radius;
        let disc = qb * qb - 4.0 * qa * qc;
        if disc < 0.0 {
            return;
        }
        let sq = disc.sqrt();
        for t in [(-qb - sq) / (2.0 * qa), (-qb + sq) / (2.0 * qa)] {
            if as_segment && !(-1e-9..=1.0 + 1e-9).contains(&t) {
                continue;
            }
            out.push(a + t * d);
        }
    }

    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        ((0.0, 2.0 * PI), (-PI / 2.0, PI / 2.0))
    }

    fn surface_type(&self) -> SurfaceKind {
        SurfaceKind::Sphere
    }

    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn transform(&self, t: &Transform) -> Box<dyn Surface> {
        let new_ref = t.apply_vec(self.ref_dir.as_ref());
        let scale = new_ref.norm();
        Box::new(SphereSurface {
            center: t.apply_point(&self.center),
            radius: self.radius * scale,
            ref_dir: Dir3::new_normalize(new_ref),
            axis: Dir3::new_normalize(t.apply_vec(self.axis.as_ref())),
        })
    }
}

// =============================================================================
// ReversedSurface
// =============================================================================

/// An orientation-reversed view of another surface.
///
/// Swaps the u and v parameters, which exchanges the tangents and
/// therefore flips the geometric normal while leaving the point set
/// untouched. Used when the second operand of a difference is turned
/// inside out.
#[derive(Debug, Clone)]
pub struct ReversedSurface {
    /// The surface being presented inside out.
    pub inner: Box<dyn Surface>,
}

fn swap_uv(uv: Point2) -> Point2 {
    Point2::new(uv.y, uv.x)
}

impl Surface for ReversedSurface {
    fn evaluate(&self, uv: Point2) -> Point3 {
        self.inner.evaluate(swap_uv(uv))
    }

    fn normal(&self, uv: Point2) -> Dir3 {
        -self.inner.normal(swap_uv(uv))
    }

    fn d_du(&self, uv: Point2) -> Vec3 {
        self.inner.d_dv(swap_uv(uv))
    }

    fn d_dv(&self, uv: Point2) -> Vec3 {
        self.inner.d_du(swap_uv(uv))
    }

    fn closest_point(&self, p: &Point3) -> Point2 {
        swap_uv(self.inner.closest_point(p))
    }

    fn line_intersections(&self, a: &Point3, b: &Point3, as_segment: bool, out: &mut Vec<Point3>) {
        self.inner.line_intersections(a, b, as_segment, out);
    }

    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        let (u, v) = self.inner.domain();
        (v, u)
    }

    fn surface_type(&self) -> SurfaceKind {
        self.inner.surface_type()
    }

    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn transform(&self, t: &Transform) -> Box<dyn Surface> {
        Box::new(ReversedSurface {
            inner: self.inner.transform(t),
        })
    }
}

// =============================================================================
// Curves
// =============================================================================

/// The kind of an exact curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    /// Straight line.
    Line,
    /// Circle.
    Circle,
}

/// An exact parametric curve in 3D space.
pub trait Curve3d: Send + Sync + std::fmt::Debug {
    /// Evaluate the curve at parameter `t`.
    fn evaluate(&self, t: f64) -> Point3;

    /// Tangent vector at parameter `t`.
    fn tangent(&self, t: f64) -> Vec3;

    /// Parameter of the curve point nearest to `p` (best effort).
    fn closest_point(&self, p: &Point3) -> f64;

    /// Parameter domain `(t_min, t_max)`.
    fn domain(&self) -> (f64, f64);

    /// The kind of this curve.
    fn curve_type(&self) -> CurveKind;

    /// Clone into a boxed trait object.
    fn clone_box(&self) -> Box<dyn Curve3d>;

    /// Apply an affine transform, returning a new curve.
    fn transform(&self, t: &Transform) -> Box<dyn Curve3d>;
}

impl Clone for Box<dyn Curve3d> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A 3D line defined by origin and direction.
///
/// Parameterization: `P(t) = origin + t * direction`
#[derive(Debug, Clone)]
pub struct Line3d {
    /// Starting point.
    pub origin: Point3,
    /// Direction (magnitude determines parameter speed).
    pub direction: Vec3,
}

impl Line3d {
    /// Create a line from two points, with `t=0` at `start` and `t=1` at `end`.
    pub fn from_points(start: Point3, end: Point3) -> Self {
        Self {
            origin: start,
            direction: end - start,
        }
    }
}

impl Curve3d for Line3d {
    fn evaluate(&self, t: f64) -> Point3 {
        self.origin + t * self.direction
    }

    fn tangent(&self, _t: f64) -> Vec3 {
        self.direction
    }

    fn closest_point(&self, p: &Point3) -> f64 {
        let len_sq = self.direction.norm_squared();
        if len_sq < f64::MIN_POSITIVE {
            return 0.0;
        }
        (p - self.origin).dot(&self.direction) / len_sq
    }

    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn curve_type(&self) -> CurveKind {
        CurveKind::Line
    }

    fn clone_box(&self) -> Box<dyn Curve3d> {
        Box::new(self.clone())
    }

    fn transform(&self, t: &Transform) -> Box<dyn Curve3d> {
        Box::new(Line3d {
            origin: t.apply_point(&self.origin),
            direction: t.apply_vec(&self.direction),
        })
    }
}

/// A circle in 3D space defined by center, in-plane frame, and radius.
///
/// Parameterization: `P(t) = center + radius * (cos(t) * x_dir + sin(t) * y_dir)`
#[derive(Debug, Clone)]
pub struct Circle3d {
    /// Center of the circle.
    pub center: Point3,
    /// Radius.
    pub radius: f64,
    /// Reference direction for t=0.
    pub x_dir: Dir3,
    /// Second in-plane direction.
    pub y_dir: Dir3,
    /// Normal to the circle plane.
    pub normal: Dir3,
}

impl Circle3d {
    /// Create a circle with a custom normal direction.
    pub fn with_normal(center: Point3, radius: f64, normal: Vec3) -> Self {
        let n = Dir3::new_normalize(normal);
        let arbitrary = if n.as_ref().x.abs() < 0.9 {
            Vec3::x()
        } else {
            Vec3::y()
        };
        let x = Dir3::new_normalize(arbitrary.cross(n.as_ref()));
        let y = Dir3::new_normalize(n.as_ref().cross(x.as_ref()));
        Self {
            center,
            radius,
            x_dir: x,
            y_dir: y,
            normal: n,
        }
    }
}

impl Curve3d for Circle3d {
    fn evaluate(&self, t: f64) -> Point3 {
        let (sin_t, cos_t) = t.sin_cos();
        self.center + self.radius * (cos_t * self.x_dir.as_ref() + sin_t * self.y_dir.as_ref())
    }

    fn tangent(&self, t: f64) -> Vec3 {
        let (sin_t, cos_t) = t.sin_cos();
        self.radius * (-sin_t * self.x_dir.as_ref() + cos_t * self.y_dir.as_ref())
    }

    fn closest_point(&self, p: &Point3) -> f64 {
        let d = p - self.center;
        let x = d.dot(self.x_dir.as_ref());
        let y = d.dot(self.y_dir.as_ref());
        if x.abs() < 1e-15 && y.abs() < 1e-15 {
            return 0.0;
        }
        let t = y.atan2(x);
        if t < 0.0 {
            t + 2.0 * PI
        } else {
            t
        }
    }

    fn domain(&self) -> (f64, f64) {
        (0.0, 2.0 * PI)
    }

    fn curve_type(&self) -> CurveKind {
        CurveKind::Circle
    }

    fn clone_box(&self) -> Box<dyn Curve3d> {
        Box::new(self.clone())
    }

    fn transform(&self, t: &Transform) -> Box<dyn Curve3d> {
        let new_x = t.apply_vec(self.x_dir.as_ref());
        let scale = new_x.norm();
        Box::new(Circle3d {
            center: t.apply_point(&self.center),
            radius: self.radius * scale,
            x_dir: Dir3::new_normalize(new_x),
            y_dir: Dir3::new_normalize(t.apply_vec(self.y_dir.as_ref())),
            normal: Dir3::new_normalize(t.apply_vec(self.normal.as_ref())),
        })
    }
}
