//! Multi-surface refinement of approximate points.
//!
//! The splitter produces intersection points that lie on a chord of a
//! piecewise-linear curve, not exactly on the surfaces involved. These
//! routines pull such a point onto three surfaces simultaneously, or
//! onto the intersection of two, by iterating on local linearizations.

use arris_kernel_math::{Point3, Vec3};
use nalgebra::{Matrix3, Vector3};

use crate::Surface;

const MAX_ITERATIONS: usize = 20;
const CONVERGENCE_EPS: f64 = 1e-12;

fn tangent_plane(s: &dyn Surface, p: &Point3) -> (Point3, Vec3) {
    let uv = s.closest_point(p);
    (s.evaluate(uv), s.normal(uv).into_inner())
}

/// Refine `guess` to a point lying on all three surfaces.
///
/// Each iteration linearizes the surfaces about the current point and
/// intersects the three tangent planes. For planar inputs this converges
/// in one step. If the planes become degenerate (two surfaces with the
/// same tangent plane make the system singular), the current best point
/// is returned; callers treat the result as best-effort.
pub fn point_on_three_surfaces(
    sa: &dyn Surface,
    sb: &dyn Surface,
    sc: &dyn Surface,
    guess: Point3,
) -> Point3 {
    let mut p = guess;
    for _ in 0..MAX_ITERATIONS {
        let (qa, na) = tangent_plane(sa, &p);
        let (qb, nb) = tangent_plane(sb, &p);
        let (qc, nc) = tangent_plane(sc, &p);

        let m = Matrix3::from_rows(&[na.transpose(), nb.transpose(), nc.transpose()]);
        let rhs = Vector3::new(
            na.dot(&qa.coords),
            nb.dot(&qb.coords),
            nc.dot(&qc.coords),
        );
        let Some(x) = m.lu().solve(&rhs) else {
            return p;
        };
        let next = Point3::from(x);
        let step = (next - p).norm();
        p = next;
        if step < CONVERGENCE_EPS {
            break;
        }
    }
    p
}

/// Refine `guess` toward the intersection curve of two surfaces by
/// alternating closest-point projections.
pub fn closest_point_on_two_surfaces(sa: &dyn Surface, sb: &dyn Surface, guess: Point3) -> Point3 {
    let mut p = guess;
    for _ in 0..MAX_ITERATIONS {
        let qa = sa.evaluate(sa.closest_point(&p));
        let qb = sb.evaluate(sb.closest_point(&qa));
        let step = (qb - p).norm();
        p = qb;
        if step < CONVERGENCE_EPS {
            break;
        }
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Plane;
    use arris_kernel_math::Vec3;

    #[test]
    fn test_three_planes_corner() {
        let px = Plane::new(Point3::new(1.0, 0.0, 0.0), Vec3::y(), Vec3::z());
        let py = Plane::new(Point3::new(0.0, 2.0, 0.0), Vec3::z(), Vec3::x());
        let pz = Plane::new(Point3::new(0.0, 0.0, 3.0), Vec3::x(), Vec3::y());
        let p = point_on_three_surfaces(&px, &py, &pz, Point3::new(0.9, 2.2, 2.8));
        assert!((p - Point3::new(1.0, 2.0, 3.0)).norm() < 1e-10);
    }

    #[test]
    fn test_three_surfaces_singular_returns_best_effort() {
        // Two identical planes make the system singular; the routine
        // must not loop or panic.
        let p1 = Plane::xy();
        let p2 = Plane::xy();
        let p3 = Plane::xz();
        let guess = Point3::new(0.5, 0.5, 0.5);
        let p = point_on_three_surfaces(&p1, &p2, &p3, guess);
        assert!(p.coords.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_two_surface_projection_lands_on_both() {
        let a = Plane::xy();
        let b = Plane::xz();
        let p = closest_point_on_two_surfaces(&a, &b, Point3::new(5.0, 0.3, 0.4));
        // The intersection is the X axis
        assert!(p.y.abs() < 1e-9);
        assert!(p.z.abs() < 1e-9);
    }
}
