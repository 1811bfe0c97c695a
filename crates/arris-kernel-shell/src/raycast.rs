//! Classification of points and edges against a whole shell.
//!
//! The boolean engine asks one question of an operand shell: for an
//! edge lying on some surface, where do the two sides of that edge sit
//! relative to the shell: inside it, outside it, or on a coincident
//! face (same or opposed orientation)?
//!
//! Coincidence is detected first, by closest-point projection onto each
//! surface and a trim-BSP test, guarded by a near-parallel normal check
//! so a face merely crossing the query point does not register. The
//! remaining cases reduce to point-in-shell parity ray casts, with the
//! ray direction retried whenever a hit grazes a trim boundary, a shell
//! edge, or strikes a surface tangentially.

use arris_kernel_math::{Point2, Point3, Tolerance, Vec3};

use crate::bsp::BspClass;
use crate::{Operand, Shell, SurfaceId};

/// Classification of a probe against a shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellClass {
    /// Strictly inside the shell.
    Inside,
    /// Strictly outside the shell.
    Outside,
    /// On a face of the shell with the same orientation.
    CoincSame,
    /// On a face of the shell with opposed orientation.
    CoincOpp,
}

/// A segment-surface intersection collected for the curve splitter.
#[derive(Debug, Clone)]
pub struct Inter {
    /// The intersection point.
    pub p: Point3,
    /// Which operand shell the surface belongs to.
    pub operand: Operand,
    /// The surface that generated this intersection.
    pub srf: SurfaceId,
}

// Fixed general-position ray directions (unit length, no zero or
// symmetric components, so axis-aligned geometry is never grazed by
// the first cast).
const RAY_DIRS: [[f64; 3]; 5] = [
    [0.218_217_890_2, 0.872_871_560_9, 0.436_435_780_5],
    [-0.485_071_250_1, 0.194_028_500_0, 0.852_725_386_9],
    [0.534_522_483_8, -0.801_783_725_7, 0.267_261_241_9],
    [0.811_107_105_7, 0.324_442_842_3, -0.486_664_263_4],
    [-0.301_511_344_6, -0.904_534_033_7, 0.301_511_344_6],
];

// A hit this close to a trim boundary (in scaled UV) makes the parity
// count unreliable; retry with the next direction.
const BOUNDARY_SLOP_FACTOR: f64 = 10.0;

impl Shell {
    /// Append every intersection of the segment (or line) `a..b` with
    /// the untrimmed surfaces of this shell. `operand` tags the records
    /// with the shell's role so the splitter can resolve them later.
    pub fn all_points_intersecting(
        &self,
        a: &Point3,
        b: &Point3,
        operand: Operand,
        as_segment: bool,
        out: &mut Vec<Inter>,
    ) {
        let mut hits = Vec::new();
        for (i, sp) in self.surfaces.iter().enumerate() {
            hits.clear();
            sp.geom.line_intersections(a, b, as_segment, &mut hits);
            for p in hits.drain(..) {
                out.push(Inter {
                    p,
                    operand,
                    srf: SurfaceId(i as u32),
                });
            }
        }
    }

    /// True when `p` lies on any surface's model-space trim edge.
    fn point_on_any_edge(&self, p: &Point3, tol: &Tolerance) -> bool {
        for sp in &self.surfaces {
            for e in &sp.edges.l {
                let d = e.b - e.a;
                let len_sq = d.norm_squared();
                if len_sq < f64::MIN_POSITIVE {
                    continue;
                }
                let t = (p - e.a).dot(&d) / len_sq;
                let q = e.a + t.clamp(0.0, 1.0) * d;
                if (p - q).norm() < tol.linear {
                    return true;
                }
            }
        }
        false
    }

    /// Classify a point strictly inside or outside the shell by parity
    /// ray casting. The caller is responsible for keeping coincident
    /// points away from here.
    pub fn classify_point_inout(&self, p: &Point3, tol: &Tolerance) -> ShellClass {
        'dirs: for d in RAY_DIRS {
            let dir = Vec3::new(d[0], d[1], d[2]);
            let far = p + dir;
            let mut crossings = 0usize;
            let mut hits = Vec::new();
            for sp in &self.surfaces {
                let Some(bsp) = &sp.bsp else { continue };
                hits.clear();
                sp.geom.line_intersections(p, &far, false, &mut hits);
                for h in hits.drain(..) {
                    let t = (h - p).dot(&dir);
                    if t < tol.linear {
                        continue;
                    }
                    if self.point_on_any_edge(&h, tol) {
                        continue 'dirs;
                    }
                    let uv = sp.geom.closest_point(&h);
                    let edge_dist = bsp.minimum_distance_to_edge(uv, sp.geom.as_ref());
                    if edge_dist < BOUNDARY_SLOP_FACTOR * tol.linear {
                        continue 'dirs;
                    }
                    match bsp.classify_point(uv, Point2::origin(), sp.geom.as_ref(), tol) {
                        BspClass::Inside => {
                            if sp.geom.normal(uv).dot(&dir).abs() < 1e-6 {
                                // Tangential strike
                                continue 'dirs;
                            }
                            crossings += 1;
                        }
                        BspClass::Outside => {}
                        _ => continue 'dirs,
                    }
                }
            }
            return if crossings % 2 == 1 {
                ShellClass::Inside
            } else {
                ShellClass::Outside
            };
        }
        debug_bool!("classify_point_inout: all ray directions were degenerate");
        ShellClass::Outside
    }

    /// Classify both sides of an edge lying on some other shell's
    /// surface against this shell.
    ///
    /// `ea`/`eb` are the edge endpoints in model space, `pmid` its
    /// (curve-refined) midpoint, `en_in`/`en_out` the in-plane probe
    /// offsets on either side, and `surf_n` the owning surface's normal
    /// at the midpoint. Returns `(in_side, out_side)`.
    #[allow(clippy::too_many_arguments)]
    pub fn classify_edge(
        &self,
        ea: &Point3,
        eb: &Point3,
        pmid: &Point3,
        en_in: &Vec3,
        en_out: &Vec3,
        surf_n: &Vec3,
        tol: &Tolerance,
    ) -> (ShellClass, ShellClass) {
        // Coincident-face check: the midpoint must lie on the surface,
        // the edge must project into its trimmed region, and the
        // normals must be near parallel (a perpendicular face through
        // the midpoint is a crossing, not a coincidence).
        for sp in &self.surfaces {
            let Some(bsp) = &sp.bsp else { continue };
            let uvm = sp.geom.closest_point(pmid);
            if (sp.geom.evaluate(uvm) - pmid).norm() >= tol.linear {
                continue;
            }
            let uva = sp.geom.closest_point(ea);
            let uvb = sp.geom.closest_point(eb);
            if bsp.classify_edge(uva, uvb, sp.geom.as_ref(), tol) == BspClass::Outside {
                continue;
            }
            let ncmp = sp.geom.normal(uvm).dot(surf_n) / surf_n.norm().max(f64::MIN_POSITIVE);
            if ncmp.abs() < 0.7 {
                continue;
            }
            let side = |en: &Vec3| {
                let q = pmid + en;
                let uvq = sp.geom.closest_point(&q);
                let on_face = (sp.geom.evaluate(uvq) - q).norm() < tol.linear
                    && bsp.classify_point(uvq, Point2::origin(), sp.geom.as_ref(), tol)
                        != BspClass::Outside;
                if on_face {
                    if ncmp > 0.0 {
                        ShellClass::CoincSame
                    } else {
                        ShellClass::CoincOpp
                    }
                } else {
                    self.classify_point_inout(&q, tol)
                }
            };
            return (side(en_in), side(en_out));
        }

        (
            self.classify_point_inout(&(pmid + en_in), tol),
            self.classify_point_inout(&(pmid + en_out), tol),
        )
    }
}
