#![warn(missing_docs)]

//! B-rep shell construction for standard solids.
//!
//! Builds valid [`Shell`] values for primitive solids: surface patches
//! with outward normals, trim curves shared between adjacent patches,
//! and trim loops wound so the face material lies on the positive side
//! of every UV edge.

use std::collections::HashMap;
use std::f64::consts::PI;

use arris_kernel_geom::{Circle3d, Curve3d, Line3d, Plane, SphereSurface};
use arris_kernel_math::{Dir3, Point3, Vec3};
use arris_kernel_shell::{
    Curve, CurvePt, CurveSource, ExactCurve, Shell, SurfacePatch, TrimBy,
};

/// Build a box shell with one corner at the origin and dimensions
/// `(sx, sy, sz)`.
///
/// The box has 6 planar patches and 12 shared line curves. Vertex
/// layout (corner-aligned at origin):
/// ```text
///     v4----v5
///    /|    /|
///   v7----v6|    z
///   | v0--|-v1   | y
///   |/    |/     |/
///   v3----v2     +---x
/// ```
pub fn make_box(sx: f64, sy: f64, sz: f64) -> Shell {
    let v = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(sx, 0.0, 0.0),
        Point3::new(sx, sy, 0.0),
        Point3::new(0.0, sy, 0.0),
        Point3::new(0.0, 0.0, sz),
        Point3::new(sx, 0.0, sz),
        Point3::new(sx, sy, sz),
        Point3::new(0.0, sy, sz),
    ];

    // Corner loops counter-clockwise as seen from outside, with UV
    // frames chosen so x_dir × y_dir is the outward normal.
    let face_defs: [([usize; 4], Point3, Vec3, Vec3); 6] = [
        // Bottom (z=0), normal -Z
        ([0, 3, 2, 1], v[0], Vec3::y(), Vec3::x()),
        // Top (z=sz), normal +Z
        ([4, 5, 6, 7], v[4], Vec3::x(), Vec3::y()),
        // Front (y=0), normal -Y
        ([0, 1, 5, 4], v[0], Vec3::x(), Vec3::z()),
        // Back (y=sy), normal +Y
        ([2, 3, 7, 6], v[3], Vec3::z(), Vec3::x()),
        // Left (x=0), normal -X
        ([0, 4, 7, 3], v[0], Vec3::z(), Vec3::y()),
        // Right (x=sx), normal +X
        ([1, 2, 6, 5], v[1], Vec3::y(), Vec3::z()),
    ];

    let mut shell = Shell::new();
    let sids: Vec<_> = face_defs
        .iter()
        .map(|(_, origin, x_dir, y_dir)| {
            shell.add_surface(SurfacePatch::new(Box::new(Plane::new(
                *origin, *x_dir, *y_dir,
            ))))
        })
        .collect();

    // Trim loops run clockwise in UV (material on the positive side of
    // each segment), which is the corner order reversed.
    let loop_of = |corners: &[usize; 4]| -> [usize; 4] {
        [corners[3], corners[2], corners[1], corners[0]]
    };

    // Shared curves, one per undirected corner pair; remember the
    // corner the PWL starts at to set trim direction flags.
    let mut curve_map: HashMap<(usize, usize), (arris_kernel_shell::CurveId, usize)> =
        HashMap::new();
    for (fi, (corners, _, _, _)) in face_defs.iter().enumerate() {
        let lp = loop_of(corners);
        for j in 0..4 {
            let (c0, c1) = (lp[j], lp[(j + 1) % 4]);
            let key = (c0.min(c1), c0.max(c1));
            if let Some(&(cid, _)) = curve_map.get(&key) {
                shell.curves[cid.index()].surf_b = sids[fi];
            } else {
                let cid = shell.add_curve(Curve {
                    surf_a: sids[fi],
                    surf_b: sids[fi],
                    exact: Some(ExactCurve {
                        geom: Box::new(Line3d::from_points(v[c0], v[c1])),
                        degree: 1,
                    }),
                    pts: vec![
                        CurvePt {
                            p: v[c0],
                            vertex: true,
                        },
                        CurvePt {
                            p: v[c1],
                            vertex: true,
                        },
                    ],
                    source: CurveSource::A,
                    new_h: None,
                });
                curve_map.insert(key, (cid, c0));
            }
        }
    }

    for (fi, (corners, _, _, _)) in face_defs.iter().enumerate() {
        let lp = loop_of(corners);
        for j in 0..4 {
            let (c0, c1) = (lp[j], lp[(j + 1) % 4]);
            let key = (c0.min(c1), c0.max(c1));
            let (cid, first_corner) = curve_map[&key];
            shell.surfaces[sids[fi].index()].trim.push(TrimBy {
                curve: cid,
                start: v[c0],
                finish: v[c1],
                backwards: first_corner != c0,
            });
        }
    }

    shell
}

/// Build a dome shell: the portion of a sphere above `base_z`, closed
/// by a planar base disk. The two patches share the rim circle.
///
/// `base_z` must cut the upper half of the sphere. The sphere is
/// parameterized with its axis along X and u=0 along Y, which keeps
/// the cap away from the parameterization's seam and poles, so the rim
/// projects to one closed loop in the cap's UV plane.
pub fn make_dome(center: Point3, radius: f64, base_z: f64) -> Shell {
    let d = base_z - center.z;
    assert!(
        d > 0.0 && d < radius,
        "base plane must cut the upper half of the sphere"
    );
    let rim_radius = (radius * radius - d * d).sqrt();

    let mut shell = Shell::new();
    let cap = shell.add_surface(SurfacePatch::new(Box::new(SphereSurface {
        center,
        radius,
        ref_dir: Dir3::new_normalize(Vec3::y()),
        axis: Dir3::new_normalize(Vec3::x()),
    })));
    // Base normal points down, out of the dome
    let base = shell.add_surface(SurfacePatch::new(Box::new(Plane::new(
        Point3::new(center.x, center.y, base_z),
        Vec3::y(),
        Vec3::x(),
    ))));

    let rim = Circle3d::with_normal(
        Point3::new(center.x, center.y, base_z),
        rim_radius,
        Vec3::z(),
    );
    const RIM_SEGMENTS: usize = 64;
    let pts: Vec<CurvePt> = (0..=RIM_SEGMENTS)
        .map(|i| {
            let t = 2.0 * PI * i as f64 / RIM_SEGMENTS as f64;
            CurvePt {
                p: rim.evaluate(t),
                vertex: i == 0 || i == RIM_SEGMENTS,
            }
        })
        .collect();
    let anchor = pts[0].p;
    let cid = shell.add_curve(Curve {
        surf_a: cap,
        surf_b: base,
        exact: Some(ExactCurve {
            geom: Box::new(rim),
            degree: 2,
        }),
        pts,
        source: CurveSource::A,
        new_h: None,
    });

    // Forward rim traversal runs clockwise in the base plane's UV; the
    // cap sees the same loop mirrored, so it takes the curve backwards
    shell.surfaces[base.index()].trim.push(TrimBy {
        curve: cid,
        start: anchor,
        finish: anchor,
        backwards: false,
    });
    shell.surfaces[cap.index()].trim.push(TrimBy {
        curve: cid,
        start: anchor,
        finish: anchor,
        backwards: true,
    });
    shell
}
