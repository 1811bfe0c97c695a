//! Intersection curve construction.
//!
//! For every cross-shell surface pair, asks the analytic
//! surface-surface intersector for the exact curve, samples a
//! piecewise-linear form, splits it against both shells so no segment
//! crosses any surface, and records it in the result shell. Curves
//! that never come near both faces' trimmed regions are not emitted.

use std::f64::consts::PI;

use arris_kernel_geom::ssi::{intersect_surfaces, SurfaceIntersection};
use arris_kernel_geom::{Circle3d, Curve3d, Line3d};
use arris_kernel_math::{Point2, Point3, Tolerance};
use arris_kernel_shell::bsp::BspClass;
use arris_kernel_shell::{
    Curve, CurvePt, CurveSource, ExactCurve, Operand, Shell, SurfaceId, SurfacePatch,
};

use crate::split::make_copy_split_against;

/// Intersect every surface of `a` against every surface of `b`,
/// appending the resulting curves to `into`.
pub(crate) fn make_intersection_curves(a: &Shell, b: &Shell, into: &mut Shell, tol: &Tolerance) {
    for ia in 0..a.surfaces.len() {
        for ib in 0..b.surfaces.len() {
            intersect_pair(a, b, SurfaceId(ia as u32), SurfaceId(ib as u32), into, tol);
        }
    }
}

/// Parameter range of an infinite intersection line worth sampling:
/// the hull of both faces' trim boundary points projected onto the
/// line, with a little padding. Anything beyond cannot touch either
/// face; a degenerate hull means the line passes the faces edge-on.
fn clip_line_to_trims(
    line: &Line3d,
    a: &Shell,
    sa: &SurfacePatch,
    b: &Shell,
    sb: &SurfacePatch,
) -> Option<(f64, f64)> {
    let len_sq = line.direction.norm_squared();
    if len_sq < f64::MIN_POSITIVE {
        return None;
    }
    let mut lo = f64::MAX;
    let mut hi = f64::MIN;
    for (sh, sp) in [(a, sa), (b, sb)] {
        for stb in &sp.trim {
            for cp in &sh.curves[stb.curve.index()].pts {
                let t = (cp.p - line.origin).dot(&line.direction) / len_sq;
                lo = lo.min(t);
                hi = hi.max(t);
            }
        }
    }
    if lo > hi || hi - lo < 1e-12 {
        return None;
    }
    let pad = (hi - lo) * 0.01;
    Some((lo - pad, hi + pad))
}

fn circle_segment_count(circle: &Circle3d, tol: &Tolerance) -> usize {
    if circle.radius <= tol.chord {
        return 16;
    }
    let dtheta = 2.0 * (1.0 - tol.chord / circle.radius).clamp(-1.0, 1.0).acos();
    if dtheta <= 0.0 {
        return 256;
    }
    ((2.0 * PI / dtheta).ceil() as usize).clamp(16, 256)
}

/// True when `p` is on or within chord tolerance of the face's
/// trimmed region.
fn near_face(sp: &SurfacePatch, p: &Point3, tol: &Tolerance) -> bool {
    let Some(bsp) = &sp.bsp else { return false };
    let uv = sp.geom.closest_point(p);
    match bsp.classify_point(uv, Point2::origin(), sp.geom.as_ref(), tol) {
        BspClass::Outside => bsp.minimum_distance_to_edge(uv, sp.geom.as_ref()) <= tol.chord,
        _ => true,
    }
}

fn intersect_pair(
    a: &Shell,
    b: &Shell,
    sa_id: SurfaceId,
    sb_id: SurfaceId,
    into: &mut Shell,
    tol: &Tolerance,
) {
    let sa = &a.surfaces[sa_id.index()];
    let sb = &b.surfaces[sb_id.index()];

    let (exact, pts) = match intersect_surfaces(sa.geom.as_ref(), sb.geom.as_ref()) {
        SurfaceIntersection::Empty | SurfaceIntersection::Point(_) => return,
        SurfaceIntersection::Line(line) => {
            let Some((t0, t1)) = clip_line_to_trims(&line, a, sa, b, sb) else {
                return;
            };
            let p0 = line.evaluate(t0);
            let p1 = line.evaluate(t1);
            (
                Some(ExactCurve {
                    geom: Box::new(Line3d::from_points(p0, p1)),
                    degree: 1,
                }),
                vec![
                    CurvePt { p: p0, vertex: true },
                    CurvePt { p: p1, vertex: true },
                ],
            )
        }
        SurfaceIntersection::Circle(circle) => {
            let n = circle_segment_count(&circle, tol);
            let pts = (0..=n)
                .map(|i| {
                    let t = 2.0 * PI * i as f64 / n as f64;
                    CurvePt {
                        p: circle.evaluate(t),
                        vertex: i == 0 || i == n,
                    }
                })
                .collect();
            (
                Some(ExactCurve {
                    geom: Box::new(circle.clone()),
                    degree: 2,
                }),
                pts,
            )
        }
        SurfaceIntersection::Sampled(samples) => {
            if samples.len() < 2 {
                return;
            }
            // No exact form: downstream consumers refine against the
            // two bounding surfaces instead
            let last = samples.len() - 1;
            let pts = samples
                .iter()
                .enumerate()
                .map(|(i, p)| CurvePt {
                    p: *p,
                    vertex: i == 0 || i == last,
                })
                .collect();
            (None, pts)
        }
    };

    let curve = Curve {
        surf_a: sa_id,
        surf_b: sb_id,
        exact,
        pts,
        source: CurveSource::Intersection,
        new_h: None,
    };

    // Subdivide at every crossing with either shell, then keep the
    // curve only if some segment runs near both trimmed regions.
    let split = make_copy_split_against(
        &curve,
        Some((a, Operand::A)),
        Some((b, Operand::B)),
        (Operand::A, sa_id),
        (Operand::B, sb_id),
        sa,
        sb,
        tol,
    );
    let touches_both = split.pts.windows(2).any(|w| {
        let mid = Point3::from((w[0].p.coords + w[1].p.coords) * 0.5);
        near_face(sa, &mid, tol) && near_face(sb, &mid, tol)
    });
    if !touches_both {
        return;
    }
    into.add_curve(split);
}

#[cfg(test)]
mod tests {
    use super::*;
    use arris_kernel_math::Transform;
    use arris_kernel_primitives::make_box;

    fn prepared(offset: (f64, f64, f64)) -> (Shell, Shell) {
        let tol = Tolerance::DEFAULT;
        let mut a = make_box(1.0, 1.0, 1.0);
        let mut b = make_box(1.0, 1.0, 1.0)
            .transformed(&Transform::translation(offset.0, offset.1, offset.2));
        a.make_classifying_bsps(None, &tol);
        b.make_classifying_bsps(None, &tol);
        (a, b)
    }

    #[test]
    fn test_disjoint_boxes_no_curves() {
        let tol = Tolerance::DEFAULT;
        let (a, b) = prepared((3.0, 0.0, 0.0));
        let mut into = Shell::new();
        make_intersection_curves(&a, &b, &mut into, &tol);
        assert!(into.curves.is_empty());
    }

    #[test]
    fn test_overlapping_boxes_six_curves() {
        // Offset boxes intersect along a closed six-edge stair
        let tol = Tolerance::DEFAULT;
        let (a, b) = prepared((0.5, 0.5, 0.5));
        let mut into = Shell::new();
        make_intersection_curves(&a, &b, &mut into, &tol);
        assert_eq!(into.curves.len(), 6);
        for c in &into.curves {
            assert_eq!(c.source, CurveSource::Intersection);
            assert!(c.pts.len() >= 2);
            // Every PWL point lies on both carrier planes
            let sa = &a.surfaces[c.surf_a.index()];
            let sb = &b.surfaces[c.surf_b.index()];
            for cp in &c.pts {
                let da = (sa.geom.evaluate(sa.geom.closest_point(&cp.p)) - cp.p).norm();
                let db = (sb.geom.evaluate(sb.geom.closest_point(&cp.p)) - cp.p).norm();
                assert!(da < 1e-9 && db < 1e-9);
            }
        }
    }

    #[test]
    fn test_face_sharing_boxes_no_interior_curves() {
        // Stacked boxes: the only candidate curves lie on the shared
        // boundary plane, where the faces are parallel (no curve) or
        // meet edge-on; nothing crosses a face interior.
        let tol = Tolerance::DEFAULT;
        let (a, b) = prepared((0.0, 0.0, 1.0));
        let mut into = Shell::new();
        make_intersection_curves(&a, &b, &mut into, &tol);
        for c in &into.curves {
            // Whatever is emitted must hug the z=1 plane
            for cp in &c.pts {
                assert!((cp.p.z - 1.0).abs() < 1e-6);
            }
        }
    }
}
