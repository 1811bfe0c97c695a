//! Boolean and assembly orchestration.
//!
//! Sequences the full pipeline: classifying BSPs on the inputs, curve
//! splitting, intersection curves, BSP rebuild over the split curves,
//! per-surface trimming, and handle rewriting. The assembly path is
//! the same id-rewriting plumbing without any intersection processing.

use arris_kernel_math::Tolerance;
use arris_kernel_shell::{CurveSource, Operand, Shell, SurfaceId, SurfacePatch};

use crate::{intersect, split, trim, BooleanOp};

/// Compute the regular union of two shells.
///
/// The operands are read-only except for their scratch fields, which
/// are reset on the way out.
pub fn union_of(a: &mut Shell, b: &mut Shell, tol: &Tolerance) -> Shell {
    boolean_of(a, b, BooleanOp::Union, tol)
}

/// Compute the regular difference `a - b` of two shells.
pub fn difference_of(a: &mut Shell, b: &mut Shell, tol: &Tolerance) -> Shell {
    boolean_of(a, b, BooleanOp::Difference, tol)
}

/// Run the boolean pipeline for `op` over two shells, producing the
/// result shell. Failure to close some face's trim loops is reported
/// through the result's `boolean_failed` flag, never by aborting.
pub fn boolean_of(a: &mut Shell, b: &mut Shell, op: BooleanOp, tol: &Tolerance) -> Shell {
    let mut into = Shell::new();
    into.boolean_failed = false;

    a.make_classifying_bsps(None, tol);
    b.make_classifying_bsps(None, tol);

    // Copy over all the original curves, splitting them so that a
    // piecewise-linear segment never crosses a surface from the other
    // shell
    split::copy_curves_split_against(a, true, b, &mut into, tol);
    split::copy_curves_split_against(b, false, a, &mut into, tol);

    // Intersection curves for each surface of A against all of B,
    // which is all of the intersection curves
    intersect::make_intersection_curves(a, b, &mut into, tol);

    for sc in &mut into.curves {
        sc.remove_short_segments(tol);
    }

    // Remake the classifying BSPs with the split (and
    // short-segment-removed) curves
    a.cleanup_after_boolean();
    b.cleanup_after_boolean();
    a.make_classifying_bsps(Some(&into), tol);
    b.make_classifying_bsps(Some(&into), tol);

    // Trim and copy the surfaces
    copy_surfaces_trim_against(true, a, b, &mut into, op, tol);
    copy_surfaces_trim_against(false, a, b, &mut into, op, tol);

    // Now that the surfaces have their new handles, rewrite the curves
    // to refer to surfaces in the result
    rewrite_surface_handles_for_curves(&mut into, a, b);

    a.cleanup_after_boolean();
    b.cleanup_after_boolean();
    into
}

fn copy_surfaces_trim_against(
    op_a: bool,
    a: &mut Shell,
    b: &mut Shell,
    into: &mut Shell,
    op: BooleanOp,
    tol: &Tolerance,
) {
    let n = if op_a {
        a.surfaces.len()
    } else {
        b.surfaces.len()
    };
    for i in 0..n {
        let sid = SurfaceId(i as u32);
        let (ssn, failed) = {
            let parent = if op_a { &*a } else { &*b };
            trim::make_copy_trim_against(parent, sid, op_a, &*a, &*b, &*into, op, tol)
        };
        let h = into.add_surface(ssn);
        if failed {
            into.boolean_failed = true;
        }
        if op_a {
            a.surfaces[i].new_h = Some(h);
        } else {
            b.surfaces[i].new_h = Some(h);
        }
    }
}

/// All curves hold handles to the two surfaces they trim; after a
/// boolean or assembly those must be rewritten to the surfaces' new
/// ids in the result.
fn rewrite_surface_handles_for_curves(into: &mut Shell, a: &Shell, b: &Shell) {
    for sc in &mut into.curves {
        let sa = match sc.owner_of_a() {
            Operand::A => &a.surfaces[sc.surf_a.index()],
            Operand::B => &b.surfaces[sc.surf_a.index()],
        };
        let sb = match sc.owner_of_b() {
            Operand::A => &a.surfaces[sc.surf_b.index()],
            Operand::B => &b.surfaces[sc.surf_b.index()],
        };
        sc.surf_a = sa.new_h.expect("surface was not copied into the result");
        sc.surf_b = sb.new_h.expect("surface was not copied into the result");
    }
}

/// Copy the surfaces and curves of two shells into one, rewriting all
/// of their handles, without looking for intersections. If the shells
/// interfere, the result is simply self-intersecting; this is what
/// assemblies use, since it is much faster than merging as union.
pub fn assembly_of(a: &mut Shell, b: &mut Shell) -> Shell {
    let mut into = Shell::new();
    into.boolean_failed = false;

    // Curves first, noting which shell each came from; surfA and surfB
    // cannot be fixed until the surfaces have ids, so that comes last
    for op_a in [true, false] {
        let sh = if op_a { &mut *a } else { &mut *b };
        for i in 0..sh.curves.len() {
            let mut cn = sh.curves[i].clone();
            cn.source = if op_a { CurveSource::A } else { CurveSource::B };
            cn.new_h = None;
            let h = into.add_curve(cn);
            sh.curves[i].new_h = Some(h);
        }
    }

    // Likewise the surfaces, rewriting trim curve ids as we go
    for op_a in [true, false] {
        let sh = if op_a { &mut *a } else { &mut *b };
        for i in 0..sh.surfaces.len() {
            let mut sn = SurfacePatch::new(sh.surfaces[i].geom.clone());
            for stb in &sh.surfaces[i].trim {
                let mut stn = stb.clone();
                stn.curve = sh.curves[stb.curve.index()]
                    .new_h
                    .expect("curve was not copied into the result");
                sn.trim.push(stn);
            }
            let h = into.add_surface(sn);
            sh.surfaces[i].new_h = Some(h);
        }
    }

    rewrite_surface_handles_for_curves(&mut into, a, b);
    into
}
