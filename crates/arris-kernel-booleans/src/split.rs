//! Curve splitting against opposing shells.
//!
//! Takes a curve's piecewise-linear form and subdivides it wherever a
//! PWL segment crosses a surface of an opposing shell, so that no
//! segment of the result crosses any such surface. Split points are
//! refined to lie on three surfaces at once: the intersecting surface
//! and the curve's own two bounding surfaces.

use arris_kernel_geom::refine::point_on_three_surfaces;
use arris_kernel_math::{Point2, Tolerance};
use arris_kernel_shell::bsp::BspClass;
use arris_kernel_shell::raycast::Inter;
use arris_kernel_shell::{Curve, CurvePt, CurveSource, Operand, Shell, SurfaceId, SurfacePatch};

fn resolve_shell<'s>(
    op: Operand,
    agnst_a: Option<(&'s Shell, Operand)>,
    agnst_b: Option<(&'s Shell, Operand)>,
) -> &'s Shell {
    if let Some((sh, o)) = agnst_a {
        if o == op {
            return sh;
        }
    }
    if let Some((sh, o)) = agnst_b {
        if o == op {
            return sh;
        }
    }
    unreachable!("intersection record from a shell that was never queried")
}

/// Copy `curve` with its PWL split at every intersection with the
/// surfaces of `agnst_a` and `agnst_b`.
///
/// `excl_a`/`excl_b` name the curve's own bounding surfaces; the curve
/// trivially meets those at its endpoints, and refining against them
/// would make the three-surface system singular, so their hits are
/// discarded up front. An intersection is kept when it falls inside
/// the hit surface's trim region, or outside but within the chord
/// tolerance of the trim boundary (slop for points near an edge of a
/// coarsely sampled curve; splitting unnecessarily is harmless).
#[allow(clippy::too_many_arguments)]
pub(crate) fn make_copy_split_against(
    curve: &Curve,
    agnst_a: Option<(&Shell, Operand)>,
    agnst_b: Option<(&Shell, Operand)>,
    excl_a: (Operand, SurfaceId),
    excl_b: (Operand, SurfaceId),
    srf_a: &SurfacePatch,
    srf_b: &SurfacePatch,
    tol: &Tolerance,
) -> Curve {
    assert!(!curve.pts.is_empty(), "cannot split an empty curve");
    let mut ret = curve.clone();
    ret.pts.clear();
    ret.new_h = None;

    let mut prev = curve.pts[0];
    ret.pts.push(prev);

    for p in &curve.pts[1..] {
        let mut il: Vec<Inter> = Vec::new();
        if let Some((sh, op)) = agnst_a {
            sh.all_points_intersecting(&prev.p, &p.p, op, true, &mut il);
        }
        if let Some((sh, op)) = agnst_b {
            sh.all_points_intersecting(&prev.p, &p.p, op, true, &mut il);
        }

        if !il.is_empty() {
            let mut kept: Vec<Inter> = Vec::new();
            for mut pi in il {
                if (pi.operand, pi.srf) == excl_a || (pi.operand, pi.srf) == excl_b {
                    continue;
                }
                let sh = resolve_shell(pi.operand, agnst_a, agnst_b);
                let srf = &sh.surfaces[pi.srf.index()];
                let puv = srf.geom.closest_point(&pi.p);
                let class = match &srf.bsp {
                    Some(bsp) => bsp.classify_point(puv, Point2::origin(), srf.geom.as_ref(), tol),
                    None => BspClass::Outside,
                };
                if class == BspClass::Outside {
                    let d = match &srf.bsp {
                        Some(bsp) => bsp.minimum_distance_to_edge(puv, srf.geom.as_ref()),
                        None => f64::MAX,
                    };
                    if d > tol.chord {
                        continue;
                    }
                }
                pi.p = point_on_three_surfaces(
                    srf.geom.as_ref(),
                    srf_a.geom.as_ref(),
                    srf_b.geom.as_ref(),
                    pi.p,
                );
                kept.push(pi);
            }

            // Sort along the chord only after refinement, in case
            // refining made two points switch places.
            let start = prev.p;
            let dir = p.p - start;
            kept.sort_by(|x, y| {
                let tx = (x.p - start).dot(&dir);
                let ty = (y.p - start).dot(&dir);
                tx.partial_cmp(&ty).unwrap_or(std::cmp::Ordering::Equal)
            });

            // Emit subdivision points strictly between the segment
            // endpoints, skipping duplicates: an on-edge intersection
            // produces the same point from both surfaces.
            let mut last = prev.p;
            for pi in &kept {
                if !tol.points_equal(&last, &pi.p) && !tol.points_equal(&pi.p, &p.p) {
                    ret.pts.push(CurvePt {
                        p: pi.p,
                        vertex: true,
                    });
                }
                last = pi.p;
            }
        }

        ret.pts.push(*p);
        prev = *p;
    }
    ret
}

/// Split every curve of `shell` against `agnst`, adding the split
/// copies to `into` and recording each source curve's new handle for
/// the trim-rewrite stage.
pub(crate) fn copy_curves_split_against(
    shell: &mut Shell,
    op_a: bool,
    agnst: &Shell,
    into: &mut Shell,
    tol: &Tolerance,
) {
    let own = if op_a { Operand::A } else { Operand::B };
    let other = if op_a { Operand::B } else { Operand::A };
    for i in 0..shell.curves.len() {
        let scn = {
            let c = &shell.curves[i];
            let srf_a = &shell.surfaces[c.surf_a.index()];
            let srf_b = &shell.surfaces[c.surf_b.index()];
            let mut scn = make_copy_split_against(
                c,
                Some((agnst, other)),
                None,
                (own, c.surf_a),
                (own, c.surf_b),
                srf_a,
                srf_b,
                tol,
            );
            scn.source = if op_a { CurveSource::A } else { CurveSource::B };
            scn
        };
        let h = into.add_curve(scn);
        shell.curves[i].new_h = Some(h);
    }
}
