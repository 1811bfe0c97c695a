#![warn(missing_docs)]

//! Boolean combination engine for trimmed-surface B-rep shells.
//!
//! Computes the regular union or difference of two [`Shell`]s, or
//! their assembly (a handle-rewriting merge without intersection
//! processing). The pipeline:
//!
//! 1. **Classifying BSPs** on every input surface
//! 2. **Curve splitting**: no PWL segment of a copied curve crosses a
//!    surface of the other shell
//! 3. **Intersection curves** between every cross-shell surface pair
//! 4. **BSP rebuild** over the split curves
//! 5. **Per-surface trimming**: chain classification, keep policy,
//!    and trim-loop reassembly for every face of the output
//! 6. **Handle rewriting** of the curve↔surface cross-references
//!
//! Failure to close some face's trim loops sets the result's
//! `boolean_failed` flag; the run always completes so the caller can
//! inspect the partial result.
//!
//! [`Shell`]: arris_kernel_shell::Shell

/// Debug logging macro - only prints when the debug-boolean feature is enabled
#[allow(unused_macros)]
#[cfg(feature = "debug-boolean")]
macro_rules! debug_bool {
    ($($arg:tt)*) => {
        eprintln!($($arg)*)
    };
}

/// No-op version when the debug-boolean feature is disabled
#[allow(unused_macros)]
#[cfg(not(feature = "debug-boolean"))]
macro_rules! debug_bool {
    ($($arg:tt)*) => {};
}

mod intersect;
mod pipeline;
mod split;
mod trim;

pub use pipeline::{assembly_of, boolean_of, difference_of, union_of};

/// Boolean operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    /// Regular union: combine both solids.
    Union,
    /// Regular difference: subtract the second operand from the first.
    Difference,
}

#[cfg(test)]
mod tests {
    use super::*;
    use arris_kernel_math::{Point3, Tolerance, Transform};
    use arris_kernel_primitives::{make_box, make_dome};
    use arris_kernel_shell::raycast::ShellClass;
    use arris_kernel_shell::{CurveSource, Shell};

    fn shifted_box(sx: f64, sy: f64, sz: f64, dx: f64, dy: f64, dz: f64) -> Shell {
        make_box(sx, sy, sz).transformed(&Transform::translation(dx, dy, dz))
    }

    /// Surfaces that still bound area after the boolean.
    fn trimmed_faces(shell: &Shell) -> usize {
        shell.surfaces.iter().filter(|s| !s.trim.is_empty()).count()
    }

    /// Point-in-solid query against a finished result shell.
    fn contains(result: &Shell, p: Point3) -> bool {
        let tol = Tolerance::DEFAULT;
        let mut probe = result.clone();
        probe.make_classifying_bsps(None, &tol);
        probe.classify_point_inout(&p, &tol) == ShellClass::Inside
    }

    fn intersection_curves(shell: &Shell) -> usize {
        shell
            .curves
            .iter()
            .filter(|c| c.source == CurveSource::Intersection)
            .count()
    }

    #[test]
    fn test_union_disjoint_boxes() {
        let tol = Tolerance::DEFAULT;
        let mut a = make_box(1.0, 1.0, 1.0);
        let mut b = shifted_box(1.0, 1.0, 1.0, 3.0, 0.0, 0.0);
        let result = union_of(&mut a, &mut b, &tol);

        assert!(!result.boolean_failed);
        assert_eq!(trimmed_faces(&result), 12);
        assert_eq!(intersection_curves(&result), 0);
        assert!(result.validate(&tol).is_ok());
        assert!(contains(&result, Point3::new(0.5, 0.5, 0.5)));
        assert!(contains(&result, Point3::new(3.5, 0.5, 0.5)));
        assert!(!contains(&result, Point3::new(2.0, 0.5, 0.5)));
    }

    #[test]
    fn test_difference_disjoint_boxes_is_first_operand() {
        let tol = Tolerance::DEFAULT;
        let mut a = make_box(1.0, 1.0, 1.0);
        let mut b = shifted_box(1.0, 1.0, 1.0, 3.0, 0.0, 0.0);
        let result = difference_of(&mut a, &mut b, &tol);

        assert!(!result.boolean_failed);
        assert_eq!(trimmed_faces(&result), 6);
        assert!(result.validate(&tol).is_ok());
        assert!(contains(&result, Point3::new(0.5, 0.5, 0.5)));
        assert!(!contains(&result, Point3::new(3.5, 0.5, 0.5)));
    }

    #[test]
    fn test_difference_interior_box_makes_cavity() {
        let tol = Tolerance::DEFAULT;
        let mut a = make_box(1.0, 1.0, 1.0);
        let mut b = shifted_box(0.5, 0.5, 0.5, 0.25, 0.25, 0.25);
        let result = difference_of(&mut a, &mut b, &tol);

        assert!(!result.boolean_failed);
        // 6 outer faces plus 6 inverted cavity faces
        assert_eq!(trimmed_faces(&result), 12);
        assert_eq!(intersection_curves(&result), 0);
        assert!(result.validate(&tol).is_ok());
        // Material between the walls, void in the cavity
        assert!(contains(&result, Point3::new(0.1, 0.1, 0.1)));
        assert!(!contains(&result, Point3::new(0.5, 0.5, 0.5)));
        assert!(!contains(&result, Point3::new(1.5, 0.5, 0.5)));
    }

    #[test]
    fn test_union_overlapping_boxes() {
        let tol = Tolerance::DEFAULT;
        let mut a = make_box(1.0, 1.0, 1.0);
        let mut b = shifted_box(1.0, 1.0, 1.0, 0.5, 0.5, 0.5);
        let result = union_of(&mut a, &mut b, &tol);

        assert!(!result.boolean_failed);
        // The boxes intersect in a closed stair of six new curves
        assert_eq!(intersection_curves(&result), 6);
        assert_eq!(trimmed_faces(&result), 12);
        assert!(result.validate(&tol).is_ok());

        assert!(contains(&result, Point3::new(0.25, 0.25, 0.25)));
        assert!(contains(&result, Point3::new(0.75, 0.75, 0.75)));
        assert!(contains(&result, Point3::new(1.25, 1.25, 1.25)));
        assert!(!contains(&result, Point3::new(1.25, 0.25, 0.25)));
        assert!(!contains(&result, Point3::new(-0.25, 0.5, 0.5)));
    }

    #[test]
    fn test_difference_overlapping_boxes() {
        let tol = Tolerance::DEFAULT;
        let mut a = make_box(1.0, 1.0, 1.0);
        let mut b = shifted_box(1.0, 1.0, 1.0, 0.5, 0.5, 0.5);
        let result = difference_of(&mut a, &mut b, &tol);

        assert!(!result.boolean_failed);
        // A keeps all six faces (three of them notched); B contributes
        // the three cavity walls, its far faces fall outside A
        assert_eq!(trimmed_faces(&result), 9);
        assert!(result.validate(&tol).is_ok());

        assert!(contains(&result, Point3::new(0.25, 0.25, 0.25)));
        assert!(!contains(&result, Point3::new(0.75, 0.75, 0.75)));
        assert!(!contains(&result, Point3::new(1.25, 1.25, 1.25)));
    }

    #[test]
    fn test_union_coincident_same_keeps_one_copy() {
        // B sits inside A with its top face on A's top face, normals
        // aligned: the shared region must be covered exactly once.
        let tol = Tolerance::DEFAULT;
        let mut a = make_box(1.0, 1.0, 1.0);
        let mut b = shifted_box(0.5, 0.5, 0.5, 0.25, 0.25, 0.5);
        let result = union_of(&mut a, &mut b, &tol);

        assert!(!result.boolean_failed);
        // A's five untouched faces, A's top as a frame around the
        // shared region, and B's top filling it
        assert_eq!(trimmed_faces(&result), 7);
        assert!(contains(&result, Point3::new(0.5, 0.5, 0.75)));
        assert!(contains(&result, Point3::new(0.1, 0.1, 0.9)));
        assert!(!contains(&result, Point3::new(0.5, 0.5, 1.1)));
    }

    #[test]
    fn test_union_coincident_opposite_drops_both() {
        // Stacked boxes share the z=1 plane with opposed normals; the
        // union drops both coincident faces and leaves the outer skin.
        let tol = Tolerance::DEFAULT;
        let mut a = make_box(1.0, 1.0, 1.0);
        let mut b = shifted_box(1.0, 1.0, 1.0, 0.0, 0.0, 1.0);
        let result = union_of(&mut a, &mut b, &tol);

        assert!(!result.boolean_failed);
        assert_eq!(trimmed_faces(&result), 10);
        assert!(contains(&result, Point3::new(0.5, 0.5, 0.5)));
        assert!(contains(&result, Point3::new(0.5, 0.5, 1.5)));
        assert!(!contains(&result, Point3::new(0.5, 0.5, 2.5)));
        assert!(!contains(&result, Point3::new(0.5, 0.5, -0.5)));
    }

    #[test]
    fn test_assembly_merges_without_intersection() {
        let tol = Tolerance::DEFAULT;
        let mut a = make_box(1.0, 1.0, 1.0);
        let mut b = shifted_box(1.0, 1.0, 1.0, 3.0, 0.0, 0.0);
        let result = assembly_of(&mut a, &mut b);

        assert!(!result.boolean_failed);
        assert_eq!(result.surfaces.len(), 12);
        assert_eq!(result.curves.len(), 24);
        assert!(result.validate(&tol).is_ok());
        assert!(contains(&result, Point3::new(0.5, 0.5, 0.5)));
        assert!(contains(&result, Point3::new(3.5, 0.5, 0.5)));
        assert!(!contains(&result, Point3::new(2.0, 0.5, 0.5)));
    }

    #[test]
    fn test_handle_bijection_after_boolean() {
        let tol = Tolerance::DEFAULT;
        let mut a = make_box(1.0, 1.0, 1.0);
        let mut b = shifted_box(1.0, 1.0, 1.0, 0.5, 0.5, 0.5);
        let result = union_of(&mut a, &mut b, &tol);

        // Every input surface and curve maps to exactly one result
        // entity through its recorded handle
        let mut seen_surfaces = std::collections::HashSet::new();
        for sp in a.surfaces.iter().chain(b.surfaces.iter()) {
            let h = sp.new_h.expect("every surface gets a new handle");
            assert!(h.index() < result.surfaces.len());
            assert!(seen_surfaces.insert(h), "surface handles must be distinct");
        }
        assert_eq!(seen_surfaces.len(), result.surfaces.len());

        let mut seen_curves = std::collections::HashSet::new();
        for c in a.curves.iter().chain(b.curves.iter()) {
            let h = c.new_h.expect("every curve gets a new handle");
            assert!(h.index() < result.curves.len());
            assert!(seen_curves.insert(h), "curve handles must be distinct");
        }

        // And every result curve's surfaces resolve within the result
        for c in &result.curves {
            assert!(c.surf_a.index() < result.surfaces.len());
            assert!(c.surf_b.index() < result.surfaces.len());
        }
    }

    #[test]
    fn test_operand_scratch_is_reset() {
        let tol = Tolerance::DEFAULT;
        let mut a = make_box(1.0, 1.0, 1.0);
        let mut b = shifted_box(1.0, 1.0, 1.0, 0.5, 0.5, 0.5);
        let _ = union_of(&mut a, &mut b, &tol);
        for sp in a.surfaces.iter().chain(b.surfaces.iter()) {
            assert!(sp.bsp.is_none());
            assert!(sp.edges.is_empty());
        }
    }

    #[test]
    fn test_union_sphere_dome_with_box() {
        // A spherical dome buried in the box pokes out through the top
        // face: the intersection is a circle, the top face gains a
        // round hole, and the dome keeps its cap above the plane.
        let tol = Tolerance::DEFAULT;
        let mut a = make_box(1.0, 1.0, 1.0);
        let mut b = make_dome(Point3::new(0.5, 0.5, 0.8), 0.4, 0.9);
        let result = union_of(&mut a, &mut b, &tol);

        assert!(!result.boolean_failed);
        // Five untouched box faces, the pierced top, and the cap zone
        // above it; the dome's base disk is swallowed whole
        assert_eq!(trimmed_faces(&result), 7);
        assert_eq!(intersection_curves(&result), 1);
        assert!(result.validate(&tol).is_ok());

        assert!(contains(&result, Point3::new(0.5, 0.5, 1.1)));
        assert!(contains(&result, Point3::new(0.5, 0.5, 0.95)));
        assert!(contains(&result, Point3::new(0.1, 0.1, 0.5)));
        assert!(!contains(&result, Point3::new(0.5, 0.5, 1.25)));
        assert!(!contains(&result, Point3::new(0.1, 0.1, 1.05)));
    }

    #[test]
    fn test_union_sphere_dome_stable_under_tiny_translation() {
        // Nudging the dome by 1e-6 must not change the result's shape:
        // same face count, same curve count, no spurious failure.
        let tol = Tolerance::DEFAULT;
        let run = |dx: f64| {
            let mut a = make_box(1.0, 1.0, 1.0);
            let mut b = make_dome(Point3::new(0.5 + dx, 0.5, 0.8 + dx), 0.4, 0.9 + dx);
            union_of(&mut a, &mut b, &tol)
        };
        let r1 = run(0.0);
        let r2 = run(1e-6);
        assert!(!r1.boolean_failed && !r2.boolean_failed);
        assert_eq!(trimmed_faces(&r1), trimmed_faces(&r2));
        assert_eq!(intersection_curves(&r1), intersection_curves(&r2));
    }

    #[test]
    fn test_union_stable_under_tiny_translation() {
        // Shifting one operand by 1e-6 must not change the face count
        // or flip the failure flag.
        let tol = Tolerance::DEFAULT;
        let mut a1 = make_box(1.0, 1.0, 1.0);
        let mut b1 = shifted_box(1.0, 1.0, 1.0, 0.5, 0.5, 0.5);
        let r1 = union_of(&mut a1, &mut b1, &tol);

        let mut a2 = make_box(1.0, 1.0, 1.0);
        let mut b2 = shifted_box(1.0, 1.0, 1.0, 0.5 + 1e-6, 0.5, 0.5);
        let r2 = union_of(&mut a2, &mut b2, &tol);

        assert!(!r1.boolean_failed && !r2.boolean_failed);
        assert_eq!(trimmed_faces(&r1), trimmed_faces(&r2));
        assert_eq!(intersection_curves(&r1), intersection_curves(&r2));
    }
}
