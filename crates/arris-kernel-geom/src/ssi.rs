//! Surface-surface intersection for analytic surfaces.
//!
//! Computes the intersection curve between two parametric surfaces.
//! Every pair in the analytic set carried here (plane, sphere) has a
//! closed-form intersection; anything else falls back to a marching
//! method that returns a sampled polyline.

use arris_kernel_math::{Dir3, Point2, Point3};

use crate::refine;
use crate::{underlying, Circle3d, Line3d, Plane, SphereSurface, Surface, SurfaceKind};

/// Result of a surface-surface intersection.
#[derive(Debug, Clone)]
pub enum SurfaceIntersection {
    /// No intersection (includes coincident surfaces, which are handled
    /// by classification rather than by an intersection curve).
    Empty,
    /// Single point of tangency.
    Point(Point3),
    /// Line intersection (plane-plane).
    Line(Line3d),
    /// Circle intersection (plane-sphere, sphere-sphere).
    Circle(Circle3d),
    /// Sampled polyline for intersections with no closed form.
    Sampled(Vec<Point3>),
}

// Model-space step for the marching fallback when the caller has no
// better scale; matches the default chord tolerance's order.
const DEFAULT_SAMPLE_STEP: f64 = 1e-2;

/// Compute the intersection of two surfaces.
///
/// Dispatches on the underlying concrete types; orientation wrappers are
/// looked through, since the curve geometry does not depend on which way
/// either surface faces. Pairs with no closed-form branch fall back to
/// [`sampled_intersection`].
pub fn intersect_surfaces(a: &dyn Surface, b: &dyn Surface) -> SurfaceIntersection {
    let a = underlying(a);
    let b = underlying(b);
    match (a.surface_type(), b.surface_type()) {
        (SurfaceKind::Plane, SurfaceKind::Plane) => match (downcast_plane(a), downcast_plane(b)) {
            (Some(pa), Some(pb)) => plane_plane(pa, pb),
            _ => sampled_intersection(a, b, DEFAULT_SAMPLE_STEP),
        },
        (SurfaceKind::Plane, SurfaceKind::Sphere) => {
            match (downcast_plane(a), downcast_sphere(b)) {
                (Some(p), Some(s)) => plane_sphere(p, s),
                _ => sampled_intersection(a, b, DEFAULT_SAMPLE_STEP),
            }
        }
        (SurfaceKind::Sphere, SurfaceKind::Plane) => {
            match (downcast_sphere(a), downcast_plane(b)) {
                (Some(s), Some(p)) => plane_sphere(p, s),
                _ => sampled_intersection(a, b, DEFAULT_SAMPLE_STEP),
            }
        }
        (SurfaceKind::Sphere, SurfaceKind::Sphere) => {
            match (downcast_sphere(a), downcast_sphere(b)) {
                (Some(sa), Some(sb)) => sphere_sphere(sa, sb),
                _ => sampled_intersection(a, b, DEFAULT_SAMPLE_STEP),
            }
        }
    }
}

const SEED_GRID: usize = 8;
const MAX_SAMPLE_POINTS: usize = 256;
const ON_SURFACE_EPS: f64 = 1e-9;

/// March along the intersection, appending points after the seed.
/// Returns true when the march arrived back at the seed.
fn march(
    a: &dyn Surface,
    b: &dyn Surface,
    seed: Point3,
    step: f64,
    sign: f64,
    out: &mut Vec<Point3>,
) -> bool {
    let mut p = seed;
    for _ in 0..MAX_SAMPLE_POINTS {
        let na = a.normal(a.closest_point(&p)).into_inner();
        let nb = b.normal(b.closest_point(&p)).into_inner();
        let t = na.cross(&nb);
        if t.norm() < 1e-12 {
            // Tangent contact, no direction to follow
            return false;
        }
        let next =
            refine::closest_point_on_two_surfaces(a, b, p + sign * step * t.normalize());
        if (next - p).norm() < 0.25 * step {
            return false;
        }
        if out.len() > 1 && (next - seed).norm() < step {
            return true;
        }
        out.push(next);
        p = next;
    }
    false
}

/// Numeric fallback intersection: find a seed point lying on both
/// surfaces by alternating projection from a coarse grid over `a`'s
/// domain, then march along `na × nb` with the given model-space step,
/// reprojecting onto both surfaces after every step.
///
/// Best effort: a closed intersection loop comes back as a closed
/// polyline; an open one is traced in both directions from the seed.
pub fn sampled_intersection(a: &dyn Surface, b: &dyn Surface, step: f64) -> SurfaceIntersection {
    let ((u0, u1), (v0, v1)) = a.domain();
    let (u0, u1) = (u0.max(-50.0), u1.min(50.0));
    let (v0, v1) = (v0.max(-50.0), v1.min(50.0));

    let mut seed = None;
    'grid: for i in 0..=SEED_GRID {
        for j in 0..=SEED_GRID {
            let uv = Point2::new(
                u0 + (u1 - u0) * i as f64 / SEED_GRID as f64,
                v0 + (v1 - v0) * j as f64 / SEED_GRID as f64,
            );
            let p = refine::closest_point_on_two_surfaces(a, b, a.evaluate(uv));
            let da = (a.evaluate(a.closest_point(&p)) - p).norm();
            let db = (b.evaluate(b.closest_point(&p)) - p).norm();
            if da < ON_SURFACE_EPS && db < ON_SURFACE_EPS {
                seed = Some(p);
                break 'grid;
            }
        }
    }
    let Some(seed) = seed else {
        return SurfaceIntersection::Empty;
    };

    let mut fwd = Vec::new();
    if march(a, b, seed, step, 1.0, &mut fwd) {
        let mut pts = Vec::with_capacity(fwd.len() + 2);
        pts.push(seed);
        pts.extend(fwd);
        pts.push(seed);
        return SurfaceIntersection::Sampled(pts);
    }

    let mut bwd = Vec::new();
    let _ = march(a, b, seed, step, -1.0, &mut bwd);
    bwd.reverse();
    let mut pts = bwd;
    pts.push(seed);
    pts.extend(fwd);
    if pts.len() < 2 {
        return SurfaceIntersection::Point(seed);
    }
    SurfaceIntersection::Sampled(pts)
}

fn downcast_plane(s: &dyn Surface) -> Option<&Plane> {
    s.as_any().downcast_ref::<Plane>()
}

fn downcast_sphere(s: &dyn Surface) -> Option<&SphereSurface> {
    s.as_any().downcast_ref::<SphereSurface>()
}

/// Intersection of two planes.
///
/// - Parallel (coincident or not) → Empty
/// - Otherwise → Line along the cross product of the normals
fn plane_plane(a: &Plane, b: &Plane) -> SurfaceIntersection {
    let n1 = a.normal_dir;
    let n2 = b.normal_dir;

    let dir = n1.as_ref().cross(n2.as_ref());
    if dir.norm() < 1e-12 {
        return SurfaceIntersection::Empty;
    }

    // Point on the line: solve n1·p = d1, n2·p = d2 in span(n1, n2)
    let d1 = n1.as_ref().dot(&a.origin.coords);
    let d2 = n2.as_ref().dot(&b.origin.coords);
    let n1n2 = n1.as_ref().dot(n2.as_ref());
    let det = 1.0 - n1n2 * n1n2;
    if det.abs() < 1e-15 {
        return SurfaceIntersection::Empty;
    }
    let c1 = (d1 - d2 * n1n2) / det;
    let c2 = (d2 - d1 * n1n2) / det;
    let origin = Point3::from(c1 * n1.into_inner() + c2 * n2.into_inner());

    SurfaceIntersection::Line(Line3d {
        origin,
        direction: dir,
    })
}

/// Intersection of a plane and a sphere.
///
/// - Distance > radius → Empty
/// - Distance = radius → Point (tangent)
/// - Distance < radius → Circle
fn plane_sphere(plane: &Plane, sphere: &SphereSurface) -> SurfaceIntersection {
    let dist = plane.signed_distance(&sphere.center);
    let abs_dist = dist.abs();

    if abs_dist > sphere.radius + 1e-9 {
        return SurfaceIntersection::Empty;
    }

    if (abs_dist - sphere.radius).abs() < 1e-9 {
        let point = sphere.center - dist * plane.normal_dir.into_inner();
        return SurfaceIntersection::Point(point);
    }

    let circle_radius = (sphere.radius * sphere.radius - dist * dist).sqrt();
    let circle_center = sphere.center - dist * plane.normal_dir.into_inner();

    SurfaceIntersection::Circle(Circle3d::with_normal(
        circle_center,
        circle_radius,
        *plane.normal_dir.as_ref(),
    ))
}

/// Intersection of two spheres.
fn sphere_sphere(a: &SphereSurface, b: &SphereSurface) -> SurfaceIntersection {
    let ab = b.center - a.center;
    let d = ab.norm();

    if d < 1e-12 {
        // Concentric: coincident or disjoint, either way no curve
        return SurfaceIntersection::Empty;
    }
    if d > a.radius + b.radius + 1e-9 {
        return SurfaceIntersection::Empty;
    }
    if d < (a.radius - b.radius).abs() - 1e-9 {
        return SurfaceIntersection::Empty;
    }

    if (d - a.radius - b.radius).abs() < 1e-9 {
        return SurfaceIntersection::Point(a.center + (a.radius / d) * ab);
    }
    if (d - (a.radius - b.radius).abs()).abs() < 1e-9 {
        let point = if a.radius > b.radius {
            a.center + (a.radius / d) * ab
        } else {
            a.center - (a.radius / d) * ab
        };
        return SurfaceIntersection::Point(point);
    }

    // The circle lies in the plane perpendicular to the center line at
    // h = (d² + r1² - r2²) / (2d) from center A.
    let h = (d * d + a.radius * a.radius - b.radius * b.radius) / (2.0 * d);
    let circle_center = a.center + (h / d) * ab;
    let circle_radius = (a.radius * a.radius - h * h).max(0.0).sqrt();
    let normal = Dir3::new_normalize(ab);

    SurfaceIntersection::Circle(Circle3d::with_normal(
        circle_center,
        circle_radius,
        *normal.as_ref(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reversed;
    use approx::assert_relative_eq;
    use arris_kernel_math::Vec3;

    #[test]
    fn test_plane_plane_perpendicular() {
        let result = plane_plane(&Plane::xy(), &Plane::xz());
        match result {
            SurfaceIntersection::Line(line) => {
                // XY ∩ XZ is the X axis
                assert!(line.direction.x.abs() > 0.5);
                assert!(line.direction.y.abs() < 1e-10);
                assert!(line.direction.z.abs() < 1e-10);
                assert!(line.origin.y.abs() < 1e-10);
                assert!(line.origin.z.abs() < 1e-10);
            }
            _ => panic!("expected Line intersection"),
        }
    }

    #[test]
    fn test_plane_plane_parallel() {
        let a = Plane::xy();
        let b = Plane::new(Point3::new(0.0, 0.0, 5.0), Vec3::x(), Vec3::y());
        assert!(matches!(plane_plane(&a, &b), SurfaceIntersection::Empty));
    }

    #[test]
    fn test_plane_plane_coincident() {
        let a = Plane::xy();
        let b = Plane::new(Point3::origin(), Vec3::y(), Vec3::x());
        assert!(matches!(plane_plane(&a, &b), SurfaceIntersection::Empty));
    }

    #[test]
    fn test_plane_sphere_through_center() {
        let result = plane_sphere(&Plane::xy(), &SphereSurface::new(10.0));
        match result {
            SurfaceIntersection::Circle(circle) => {
                assert_relative_eq!(circle.radius, 10.0, epsilon = 1e-10);
                assert!(circle.center.z.abs() < 1e-10);
            }
            _ => panic!("expected Circle intersection"),
        }
    }

    #[test]
    fn test_plane_sphere_tangent() {
        let plane = Plane::new(Point3::new(0.0, 0.0, 10.0), Vec3::x(), Vec3::y());
        let result = plane_sphere(&plane, &SphereSurface::new(10.0));
        match result {
            SurfaceIntersection::Point(p) => assert_relative_eq!(p.z, 10.0, epsilon = 1e-9),
            other => panic!("expected Point tangency, got {:?}", other),
        }
    }

    #[test]
    fn test_sphere_sphere_circle() {
        let a = SphereSurface::new(10.0);
        let b = SphereSurface::with_center(Point3::new(15.0, 0.0, 0.0), 10.0);
        match sphere_sphere(&a, &b) {
            SurfaceIntersection::Circle(circle) => {
                assert_relative_eq!(circle.center.x, 7.5, epsilon = 1e-10);
                assert!(circle.radius > 0.0);
            }
            _ => panic!("expected Circle intersection"),
        }
    }

    #[test]
    fn test_dispatch_looks_through_reversal() {
        let p = Plane::xy();
        let s = SphereSurface::new(10.0);
        let rp = reversed(&p);
        match intersect_surfaces(rp.as_ref(), &s) {
            SurfaceIntersection::Circle(c) => {
                assert_relative_eq!(c.radius, 10.0, epsilon = 1e-10)
            }
            _ => panic!("expected Circle through the reversal wrapper"),
        }
    }

    #[test]
    fn test_sampled_intersection_marches_plane_sphere() {
        // The marching fallback, checked against the analytic answer:
        // a plane through a unit sphere meets it in a circle.
        let plane = Plane::xy();
        let sphere = SphereSurface::new(1.0);
        let result = sampled_intersection(&plane, &sphere, 0.05);
        let SurfaceIntersection::Sampled(pts) = result else {
            panic!("expected a sampled polyline");
        };
        assert!(pts.len() > 20);
        for p in &pts {
            assert!(p.z.abs() < 1e-6);
            assert_relative_eq!((p - Point3::origin()).norm(), 1.0, epsilon = 1e-6);
        }
        // The loop closed back onto the seed
        assert!((pts[0] - pts[pts.len() - 1]).norm() < 1e-9);
    }

    #[test]
    fn test_circle_stable_under_tiny_translation() {
        // A 1e-6 nudge of the sphere moves the intersection circle by a
        // comparably tiny amount; nothing flips or vanishes.
        let plane = Plane::xy();
        let s0 = SphereSurface::with_center(Point3::new(0.0, 0.0, 0.5), 1.0);
        let s1 = SphereSurface::with_center(Point3::new(1e-6, 0.0, 0.5 + 1e-6), 1.0);
        let (c0, c1) = match (plane_sphere(&plane, &s0), plane_sphere(&plane, &s1)) {
            (SurfaceIntersection::Circle(c0), SurfaceIntersection::Circle(c1)) => (c0, c1),
            _ => panic!("expected circles"),
        };
        assert!((c1.center - c0.center).norm() < 1e-5);
        assert!((c1.radius - c0.radius).abs() < 1e-5);
    }
}
