//! Per-surface trim reconstruction.
//!
//! Rebuilds each surface's trim loops for the boolean result: lifts the
//! original and intersection edges into the surface's UV plane, groups
//! them into chains between choosing points, classifies each chain
//! against the other shell, applies the keep policy, and reassembles
//! the survivors into merged trim records.

use arris_kernel_geom::refine::closest_point_on_two_surfaces;
use arris_kernel_math::{Point2, Point3, Tolerance, Vec2, Vec3};
use arris_kernel_shell::bsp::{BspClass, UvBsp};
use arris_kernel_shell::list::{uv3, EdgeList, PointList};
use arris_kernel_shell::raycast::ShellClass;
use arris_kernel_shell::{
    project_uv, CurveId, CurveSource, EdgeSpace, Shell, SurfaceId, SurfacePatch, TrimBy,
};

use crate::BooleanOp;

/// Decide whether one side of an edge belongs to the output volume.
///
/// `orig` says whether the side lies within the surface's own original
/// trim polygon; a side outside the face is never kept. `shell` is the
/// side's status relative to the other shell. When the side lies on a
/// coincident face, the answer must not depend on the inside/outside
/// status, and the `CoincSame` branches keep exactly one representative
/// of duplicated geometry.
pub(crate) fn keep_region(
    op: BooleanOp,
    op_a: bool,
    shell: ShellClass,
    orig: ShellClass,
) -> bool {
    let in_shell = shell == ShellClass::Inside;
    let in_same = shell == ShellClass::CoincSame;
    let in_opp = shell == ShellClass::CoincOpp;
    let in_orig = orig == ShellClass::Inside;

    let in_face = in_same || in_opp;

    if !in_orig {
        return false;
    }
    match op {
        BooleanOp::Union => {
            if op_a {
                !in_shell && !in_face
            } else {
                (!in_shell && !in_face) || in_same
            }
        }
        BooleanOp::Difference => {
            if op_a {
                !in_shell && !in_face
            } else {
                (in_shell && !in_face) || in_same
            }
        }
    }
}

/// Keep an edge exactly when the region on its in-normal side is part
/// of the output and the region on its out-normal side is not. An edge
/// with both sides kept or both dropped separates nothing and is
/// discarded.
pub(crate) fn keep_edge(
    op: BooleanOp,
    op_a: bool,
    indir_shell: ShellClass,
    outdir_shell: ShellClass,
    indir_orig: ShellClass,
    outdir_orig: ShellClass,
) -> bool {
    keep_region(op, op_a, indir_shell, indir_orig)
        && !keep_region(op, op_a, outdir_shell, outdir_orig)
}

/// Translate an intersection chain's classification against the
/// surface's own original trim polygon into per-side statuses.
pub(crate) fn tag_by_classified_edge(c: BspClass) -> (ShellClass, ShellClass) {
    match c {
        BspClass::Inside => (ShellClass::Inside, ShellClass::Inside),
        BspClass::Outside => (ShellClass::Outside, ShellClass::Outside),
        BspClass::EdgeParallel => (ShellClass::Inside, ShellClass::Outside),
        BspClass::EdgeAntiparallel => (ShellClass::Outside, ShellClass::Inside),
        BspClass::EdgeOther => {
            debug_bool!("tag_by_classified_edge: crossing edge, dropping both sides");
            (ShellClass::Outside, ShellClass::Outside)
        }
    }
}

/// Extract a chain of endpoint-connected edges from `src` such that no
/// avoid-point ever occurs in the middle of the chain, consuming the
/// chain's edges from `src`.
///
/// Starts from an arbitrary edge and greedily extends at either end
/// while the active endpoint is not in the avoid set; a chain that
/// reaches an avoid point stops there, so every returned chain lies
/// entirely between choosing points (or is a closed loop through none).
pub(crate) fn find_chain_avoiding(
    src: &mut EdgeList,
    avoid: &PointList,
    tol: &Tolerance,
) -> EdgeList {
    assert!(!src.l.is_empty(), "need at least one edge");
    let mut dest = EdgeList::new();
    src.clear_tags();
    src.l[0].tag = 1;
    dest.l.push(src.l[0].clone());

    loop {
        let mut added = false;
        let mut s = dest.l[0].a;
        let mut f = dest.l[dest.l.len() - 1].b;
        let mut start_okay = !avoid.contains_point(&s, tol);
        let mut finish_okay = !avoid.contains_point(&f, tol);

        for j in 0..src.l.len() {
            if src.l[j].tag != 0 {
                continue;
            }
            if start_okay && tol.points_equal(&s, &src.l[j].b) {
                dest.l.insert(0, src.l[j].clone());
                s = src.l[j].a;
                src.l[j].tag = 1;
                start_okay = !avoid.contains_point(&s, tol);
                added = true;
            } else if finish_okay && tol.points_equal(&f, &src.l[j].a) {
                dest.l.push(src.l[j].clone());
                f = src.l[j].b;
                src.l[j].tag = 1;
                finish_okay = !avoid.contains_point(&f, tol);
                added = true;
            }
        }
        if !added {
            break;
        }
    }
    src.remove_tagged();
    dest
}

/// Compute the classification query for an edge within a surface: the
/// refined midpoint, the two probe offsets on either side of the edge
/// within the surface, and the surface normal there.
///
/// The PWL edge only approximates its curve; the midpoint is pulled
/// onto the exact curve (or, for inexact curves, onto the intersection
/// of its two bounding surfaces), so point-on-face tests against the
/// other shell see a point that actually lies on that shell.
#[allow(clippy::too_many_arguments)]
fn edge_normals_within_surface(
    patch: &SurfacePatch,
    auv: Point2,
    buv: Point2,
    curve: CurveId,
    into: &Shell,
    sha: &Shell,
    shb: &Shell,
    tol: &Tolerance,
) -> (Point3, Vec3, Vec3, Vec3) {
    let mut muv = Point2::from((auv.coords + buv.coords) * 0.5);
    let mut pt = patch.geom.evaluate(muv);

    let sc = &into.curves[curve.index()];
    match &sc.exact {
        Some(ex) if ex.degree != 1 => {
            pt = ex.geom.evaluate(ex.geom.closest_point(&pt));
            muv = patch.geom.closest_point(&pt);
        }
        None => {
            let ta = sc.get_surface_a(sha, shb);
            let tb = sc.get_surface_b(sha, shb);
            pt = closest_point_on_two_surfaces(ta.geom.as_ref(), tb.geom.as_ref(), pt);
            muv = patch.geom.closest_point(&pt);
        }
        _ => {}
    }

    let surfn = patch.geom.normal(muv).into_inner();

    // The edge's inner normal in model space: perpendicular to the
    // edge, in the tangent plane, chord-tolerance long.
    let ab = patch.geom.evaluate(auv) - patch.geom.evaluate(buv);
    let mut enxyz = ab.cross(&surfn);
    let len = enxyz.norm();
    if len > f64::MIN_POSITIVE {
        enxyz *= tol.chord / len;
    }

    // The same displacement in UV; perpendicular to the edge in model
    // space, not necessarily in UV.
    let tu = patch.geom.d_du(muv);
    let tv = patch.geom.d_dv(muv);
    let enuv = Vec2::new(
        enxyz.dot(&tu) / tu.norm_squared(),
        enxyz.dot(&tv) / tv.norm_squared(),
    );

    // Inner and outer probes, as offsets from the refined midpoint.
    // These are not necessarily antiparallel on a curved surface.
    let pin = patch.geom.evaluate(muv - enuv);
    let pout = patch.geom.evaluate(muv + enuv);
    (pt, pin - pt, pout - pt, surfn)
}

/// Rebuild a surface's trim records from a final edge list: greedily
/// merge head-to-tail runs of edges from the same curve and direction
/// into single records, lifting the run extremes from UV to model
/// space.
pub(crate) fn trim_from_edge_list(
    patch: &mut SurfacePatch,
    el: &mut EdgeList,
    as_uv: bool,
    tol: &Tolerance,
) {
    el.clear_tags();
    loop {
        // Find an edge, any edge; start a trim from there
        let Some(i0) = el.l.iter().position(|e| e.tag == 0) else {
            break;
        };
        el.l[i0].tag = 1;
        let mut start = el.l[i0].a;
        let mut finish = el.l[i0].b;
        let curve = el.l[i0].curve;
        let backwards = el.l[i0].backwards;

        // Adjoining edges from the same curve merge into a single trim
        loop {
            let mut merged = false;
            for j in 0..el.l.len() {
                if el.l[j].tag != 0 || el.l[j].curve != curve || el.l[j].backwards != backwards {
                    continue;
                }
                if tol.points_equal(&el.l[j].a, &finish) {
                    finish = el.l[j].b;
                    el.l[j].tag = 1;
                    merged = true;
                } else if tol.points_equal(&el.l[j].b, &start) {
                    start = el.l[j].a;
                    el.l[j].tag = 1;
                    merged = true;
                }
            }
            if !merged {
                break;
            }
        }

        let (s, f) = if as_uv {
            (
                patch.geom.evaluate(project_uv(&start)),
                patch.geom.evaluate(project_uv(&finish)),
            )
        } else {
            (start, finish)
        };
        patch.trim.push(TrimBy {
            curve: CurveId(curve),
            start: s,
            finish: f,
            backwards,
        });
    }
}

/// Trim one surface of `parent` against the other shell, producing the
/// surface's copy for the result along with a flag reporting whether
/// its final edge set failed to close.
#[allow(clippy::too_many_arguments)]
pub(crate) fn make_copy_trim_against(
    parent: &Shell,
    sid: SurfaceId,
    op_a: bool,
    sha: &Shell,
    shb: &Shell,
    into: &Shell,
    op: BooleanOp,
    tol: &Tolerance,
) -> (SurfacePatch, bool) {
    let agnst = if op_a { shb } else { sha };
    let parent_patch = &parent.surfaces[sid.index()];

    // The copy is identical, just the trim curves change; start from
    // the existing trims rewritten to the split curves
    let mut ret = SurfacePatch::new(parent_patch.geom.clone());
    for stb in &parent_patch.trim {
        let mut stn = stb.clone();
        stn.curve = parent.curves[stb.curve.index()]
            .new_h
            .expect("curve was not split into the result");
        ret.trim.push(stn);
    }

    // The second operand of a difference gets turned inside out
    if op == BooleanOp::Difference && !op_a {
        ret.reverse();
    }

    // The original trim polygon, over the split curves; coordinates
    // change if the surface was just flipped, which also means the
    // shell's own BSP is not reusable here
    let mut orig = EdgeList::new();
    ret.make_edges_into(into, &mut orig, EdgeSpace::Uv, None, tol);
    ret.trim.clear();
    let orig_bsp = UvBsp::build(&orig, ret.geom.as_ref(), tol);

    // Intersect the other shell against us: every intersection curve
    // between this surface and one of theirs contributes the segments
    // that fall within their trim region
    let mut inter = EdgeList::new();
    for (ss_i, ss) in agnst.surfaces.iter().enumerate() {
        let ss_id = SurfaceId(ss_i as u32);
        for (ci, sc) in into.curves.iter().enumerate() {
            if sc.source != CurveSource::Intersection {
                continue;
            }
            let ours = if op_a {
                sc.surf_a == sid && sc.surf_b == ss_id
            } else {
                sc.surf_b == sid && sc.surf_a == ss_id
            };
            if !ours {
                continue;
            }
            let Some(ss_bsp) = &ss.bsp else { continue };
            for w in sc.pts.windows(2) {
                let (pa, pb) = (w[0].p, w[1].p);
                let auv = ss.geom.closest_point(&pa);
                let buv = ss.geom.closest_point(&pb);
                if ss_bsp.classify_edge(auv, buv, ss.geom.as_ref(), tol) == BspClass::Outside {
                    continue;
                }
                let ta = ret.geom.closest_point(&pa);
                let tb = ret.geom.closest_point(&pb);
                let tn = ret.geom.normal(ta);
                let sn = ss.geom.normal(auv);

                // We are subtracting the portion of our surface inside
                // the other shell, so the in-plane edge normal points
                // opposite our surface normal crossed into the edge;
                // the second operand of a difference runs the other way
                let mut bkwds = true;
                if tn.as_ref().cross(&(pb - pa)).dot(sn.as_ref()) < 0.0 {
                    bkwds = !bkwds;
                }
                if op == BooleanOp::Difference && !op_a {
                    bkwds = !bkwds;
                }
                if bkwds {
                    inter.add_edge(uv3(tb), uv3(ta), ci as u32, true);
                } else {
                    inter.add_edge(uv3(ta), uv3(tb), ci as u32, false);
                }
            }
        }
    }

    // Choosing points: where more than two edges join, different sides
    // may need different keep decisions; where exactly two join, the
    // pair must live or die together or the contour opens
    let mut choosing = PointList::new();
    for e in orig.l.iter().chain(inter.l.iter()) {
        choosing.increment_tag_for(&e.a, tol);
        choosing.increment_tag_for(&e.b, tol);
    }
    choosing.l.retain(|tp| tp.tag != 2);

    let mut final_edges = EdgeList::new();

    while !orig.is_empty() {
        let chain = find_chain_avoiding(&mut orig, &choosing, tol);
        // Any edge within the chain classifies the whole chain; they
        // cannot differ without a choosing point between them
        let se = chain.l[chain.l.len() / 2].clone();
        let auv = project_uv(&se.a);
        let buv = project_uv(&se.b);

        let (pt, enin, enout, surfn) =
            edge_normals_within_surface(&ret, auv, buv, CurveId(se.curve), into, sha, shb, tol);
        let (indir_shell, outdir_shell) = agnst.classify_edge(
            &ret.geom.evaluate(auv),
            &ret.geom.evaluate(buv),
            &pt,
            &enin,
            &enout,
            &surfn,
            tol,
        );

        if keep_edge(
            op,
            op_a,
            indir_shell,
            outdir_shell,
            ShellClass::Inside,
            ShellClass::Outside,
        ) {
            for e in &chain.l {
                final_edges.add_edge(e.a, e.b, e.curve, e.backwards);
            }
        }
    }

    while !inter.is_empty() {
        let chain = find_chain_avoiding(&mut inter, &choosing, tol);
        let se = chain.l[chain.l.len() / 2].clone();
        let auv = project_uv(&se.a);
        let buv = project_uv(&se.b);

        let (pt, enin, enout, surfn) =
            edge_normals_within_surface(&ret, auv, buv, CurveId(se.curve), into, sha, shb, tol);

        let c_this = match &orig_bsp {
            Some(bsp) => bsp.classify_edge(auv, buv, ret.geom.as_ref(), tol),
            None => BspClass::Outside,
        };
        let (indir_orig, outdir_orig) = tag_by_classified_edge(c_this);

        let (indir_shell, outdir_shell) = agnst.classify_edge(
            &ret.geom.evaluate(auv),
            &ret.geom.evaluate(buv),
            &pt,
            &enin,
            &enout,
            &surfn,
            tol,
        );

        if keep_edge(op, op_a, indir_shell, outdir_shell, indir_orig, outdir_orig) {
            for e in &chain.l {
                final_edges.add_edge(e.a, e.b, e.curve, e.backwards);
            }
        }
    }

    // Coincident intersections generate duplicate and antiparallel
    // pairs; cull them before reassembly
    final_edges.cull_extraneous_edges(tol);

    trim_from_edge_list(&mut ret, &mut final_edges, true, tol);

    let mut failed = false;
    if !final_edges.assemble_polygon(tol) {
        failed = true;
        debug_bool!(
            "boolean: trim loops failed to close ({} edges, {} choosing points)",
            final_edges.len(),
            choosing.l.len()
        );
        for _e in &final_edges.l {
            debug_bool!(
                "  naked edge ({:.5}, {:.5}) -> ({:.5}, {:.5})",
                _e.a.x,
                _e.a.y,
                _e.b.x,
                _e.b.y
            );
        }
    }
    (ret, failed)
}
