#![warn(missing_docs)]

//! B-rep shell data model for the arris kernel.
//!
//! A [`Shell`] is the closed two-manifold boundary of a solid: a set of
//! trimmed surface patches plus the trim curves shared between pairs of
//! patches. Patches and curves reference each other through plain index
//! handles ([`SurfaceId`], [`CurveId`]) into the shell's arenas.
//!
//! The crate also carries the machinery the boolean engine hangs off
//! this model: tagged edge/point lists ([`list`]), the per-surface
//! UV-space BSP ([`bsp`]), and edge classification against a whole
//! shell ([`raycast`]).

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

pub mod bsp;
pub mod list;
pub mod raycast;

use arris_kernel_geom::{reversed, Curve3d, Surface};
use arris_kernel_math::{Point2, Point3, Tolerance, Transform};
use thiserror::Error;

use crate::bsp::UvBsp;
use crate::list::{uv3, EdgeList};

/// Handle of a surface patch within a shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u32);

impl SurfaceId {
    /// The arena index this handle addresses.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of a trim curve within a shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurveId(pub u32);

impl CurveId {
    /// The arena index this handle addresses.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which boolean operand a shell (or a record derived from one) plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// The first operand.
    A,
    /// The second operand.
    B,
}

/// Where a curve in a result shell came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveSource {
    /// Copied (and split) from operand A.
    A,
    /// Copied (and split) from operand B.
    B,
    /// Generated by intersecting a surface of A with a surface of B.
    Intersection,
}

/// One sample of a curve's piecewise-linear form.
#[derive(Debug, Clone, Copy)]
pub struct CurvePt {
    /// Position of the sample.
    pub p: Point3,
    /// True for points that must survive resampling: the curve ends,
    /// split points, and trim anchors.
    pub vertex: bool,
}

/// Exact parametric form of a curve, when one exists.
#[derive(Debug, Clone)]
pub struct ExactCurve {
    /// The parametric curve.
    pub geom: Box<dyn Curve3d>,
    /// Polynomial degree (1 for lines).
    pub degree: u32,
}

/// A trim curve: embedded on exactly two surfaces, bounding both.
#[derive(Debug, Clone)]
pub struct Curve {
    /// First bounding surface. For `source == A` or intersection
    /// curves this handle lives in shell A; see [`Curve::owner_of_a`].
    pub surf_a: SurfaceId,
    /// Second bounding surface; lives in shell B for intersection
    /// curves and shell-of-origin otherwise.
    pub surf_b: SurfaceId,
    /// Exact parametric form, if known.
    pub exact: Option<ExactCurve>,
    /// Piecewise-linear form; never empty.
    pub pts: Vec<CurvePt>,
    /// Provenance of this curve.
    pub source: CurveSource,
    /// Handle of this curve's copy in the result shell, set while a
    /// boolean is in flight. Scratch.
    pub new_h: Option<CurveId>,
}

impl Curve {
    /// Which operand shell owns `surf_a`.
    pub fn owner_of_a(&self) -> Operand {
        match self.source {
            CurveSource::B => Operand::B,
            _ => Operand::A,
        }
    }

    /// Which operand shell owns `surf_b`.
    pub fn owner_of_b(&self) -> Operand {
        match self.source {
            CurveSource::A => Operand::A,
            _ => Operand::B,
        }
    }

    /// Resolve the first bounding surface against the two operand shells.
    pub fn get_surface_a<'s>(&self, a: &'s Shell, b: &'s Shell) -> &'s SurfacePatch {
        match self.owner_of_a() {
            Operand::A => &a.surfaces[self.surf_a.index()],
            Operand::B => &b.surfaces[self.surf_a.index()],
        }
    }

    /// Resolve the second bounding surface against the two operand shells.
    pub fn get_surface_b<'s>(&self, a: &'s Shell, b: &'s Shell) -> &'s SurfacePatch {
        match self.owner_of_b() {
            Operand::A => &a.surfaces[self.surf_b.index()],
            Operand::B => &b.surfaces[self.surf_b.index()],
        }
    }

    /// Drop interior PWL points that sit within the linear tolerance of
    /// their predecessor. Vertex points (curve ends, split points, trim
    /// anchors) are never removed.
    pub fn remove_short_segments(&mut self, tol: &Tolerance) {
        if self.pts.len() <= 2 {
            return;
        }
        let mut kept: Vec<CurvePt> = Vec::with_capacity(self.pts.len());
        kept.push(self.pts[0]);
        let mut last = self.pts[0].p;
        for cp in &self.pts[1..self.pts.len() - 1] {
            if !cp.vertex && tol.points_equal(&last, &cp.p) {
                continue;
            }
            kept.push(*cp);
            last = cp.p;
        }
        kept.push(self.pts[self.pts.len() - 1]);
        self.pts = kept;
    }
}

/// Reference to a curve trimming a surface: the portion between `start`
/// and `finish`, traversed `backwards` relative to the curve's PWL order.
#[derive(Debug, Clone)]
pub struct TrimBy {
    /// The trimming curve.
    pub curve: CurveId,
    /// First point of the trimmed portion, in loop order.
    pub start: Point3,
    /// Last point of the trimmed portion, in loop order.
    pub finish: Point3,
    /// True when loop order opposes the curve's PWL order.
    pub backwards: bool,
}

/// Which space [`SurfacePatch::make_edges_into`] emits edges in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSpace {
    /// Edges in the surface's UV parameter plane (z = 0).
    Uv,
    /// Edges in model space.
    Xyz,
}

/// A trimmed surface: geometry plus the trim loops bounding the face.
///
/// `bsp`, `edges`, and `new_h` are scratch state for an in-flight
/// boolean; [`Shell::cleanup_after_boolean`] resets the first two.
#[derive(Debug, Clone)]
pub struct SurfacePatch {
    /// The untrimmed carrier geometry.
    pub geom: Box<dyn Surface>,
    /// Trim records; their edges form one or more closed loops wound so
    /// the face material lies on the positive (right-hand) side.
    pub trim: Vec<TrimBy>,
    /// Classifying BSP over this surface's trim loops. Scratch.
    pub bsp: Option<UvBsp>,
    /// This surface's trim edges in model space. Scratch.
    pub edges: EdgeList,
    /// Handle of this surface's copy in the result shell. Scratch.
    pub new_h: Option<SurfaceId>,
}

impl SurfacePatch {
    /// Create a patch over `geom` with no trims yet.
    pub fn new(geom: Box<dyn Surface>) -> Self {
        Self {
            geom,
            trim: Vec::new(),
            bsp: None,
            edges: EdgeList::new(),
            new_h: None,
        }
    }

    /// Turn the patch inside out: flip the carrier orientation and
    /// reverse the trim traversal so material stays on the positive
    /// side of the (now mirrored) UV loops.
    pub fn reverse(&mut self) {
        self.geom = reversed(self.geom.as_ref());
        self.trim.reverse();
        for stb in &mut self.trim {
            std::mem::swap(&mut stb.start, &mut stb.finish);
            stb.backwards = !stb.backwards;
        }
    }

    /// Emit this patch's trim edges into `out`.
    ///
    /// `shell` owns the curves the trim records reference. When
    /// `use_curves_from` is given, each curve is resolved through its
    /// `new_h` into that shell instead (used after splitting, when the
    /// split copies live in the result shell). Emitted edges carry the
    /// id of the curve in whichever shell was walked, and the trim's
    /// `backwards` flag.
    pub fn make_edges_into(
        &self,
        shell: &Shell,
        out: &mut EdgeList,
        space: EdgeSpace,
        use_curves_from: Option<&Shell>,
        tol: &Tolerance,
    ) {
        for stb in &self.trim {
            let mut sc = &shell.curves[stb.curve.index()];
            let mut cid = stb.curve;
            if let Some(from) = use_curves_from {
                cid = sc.new_h.expect("curve has no recorded copy in the result");
                sc = &from.curves[cid.index()];
            }
            let pts = &sc.pts;
            // A closed PWL duplicates its first point at the end; a
            // trim spanning the whole loop anchors at the seam, so the
            // anchor lookup must pick the seam copy that puts the walk
            // in the trim's direction.
            let (ia, ib) = if stb.backwards {
                (
                    pts.iter().rposition(|cp| tol.points_equal(&cp.p, &stb.start)),
                    pts.iter().position(|cp| tol.points_equal(&cp.p, &stb.finish)),
                )
            } else {
                (
                    pts.iter().position(|cp| tol.points_equal(&cp.p, &stb.start)),
                    pts.iter().rposition(|cp| tol.points_equal(&cp.p, &stb.finish)),
                )
            };
            let (Some(ia), Some(ib)) = (ia, ib) else {
                debug_bool!("make_edges_into: trim anchors not on curve pwl");
                continue;
            };
            let mut emit = |p0: Point3, p1: Point3| {
                let (ea, eb) = match space {
                    EdgeSpace::Xyz => (p0, p1),
                    EdgeSpace::Uv => (
                        uv3(self.geom.closest_point(&p0)),
                        uv3(self.geom.closest_point(&p1)),
                    ),
                };
                out.add_edge(ea, eb, cid.0, stb.backwards);
            };
            if ia == ib {
                // A full-loop trim whose anchor is not at the seam:
                // walk the whole loop cyclically from the anchor.
                let closed = pts.len() > 2
                    && tol.points_equal(&pts[0].p, &pts[pts.len() - 1].p);
                if !closed {
                    continue;
                }
                let n = pts.len() - 1;
                for k in 0..n {
                    let (i, j) = if stb.backwards {
                        ((ia + n - k) % n, (ia + 2 * n - k - 1) % n)
                    } else {
                        ((ia + k) % n, (ia + k + 1) % n)
                    };
                    emit(pts[i].p, pts[j].p);
                }
                continue;
            }
            let step: i64 = if ib > ia { 1 } else { -1 };
            let mut i = ia as i64;
            while i != ib as i64 {
                emit(pts[i as usize].p, pts[(i + step) as usize].p);
                i += step;
            }
        }
    }

    /// Build this patch's classifying BSP and model-space edge list.
    fn make_classifying_bsp(&self, shell: &Shell, use_curves_from: Option<&Shell>, tol: &Tolerance) -> (Option<UvBsp>, EdgeList) {
        let mut el = EdgeList::new();
        self.make_edges_into(shell, &mut el, EdgeSpace::Uv, use_curves_from, tol);
        let bsp = UvBsp::build(&el, self.geom.as_ref(), tol);
        let mut edges = EdgeList::new();
        self.make_edges_into(shell, &mut edges, EdgeSpace::Xyz, use_curves_from, tol);
        (bsp, edges)
    }
}

/// Structural defects reported by [`Shell::validate`].
#[derive(Debug, Error)]
pub enum ShellError {
    /// A trim record indexes a curve outside the shell's curve arena.
    #[error("trim {trim} of surface {surface} references a curve out of range")]
    DanglingCurveHandle {
        /// Offending surface index.
        surface: u32,
        /// Offending trim index within that surface.
        trim: usize,
    },
    /// A curve's bounding-surface handle is outside the surface arena.
    #[error("curve {curve} references a surface out of range")]
    DanglingSurfaceHandle {
        /// Offending curve index.
        curve: u32,
    },
    /// A referenced curve is not shared by exactly two surfaces.
    #[error("curve {curve} is referenced by {count} surfaces, expected 2")]
    TrimReferenceCount {
        /// Offending curve index.
        curve: u32,
        /// Number of referencing surfaces found.
        count: usize,
    },
    /// A surface's trim edges do not assemble into closed loops.
    #[error("trim edges of surface {surface} do not close")]
    OpenTrimLoop {
        /// Offending surface index.
        surface: u32,
    },
}

/// A set of trimmed surfaces and the curves shared between them.
#[derive(Debug, Clone, Default)]
pub struct Shell {
    /// Surface patch arena; [`SurfaceId`] indexes into this.
    pub surfaces: Vec<SurfacePatch>,
    /// Trim curve arena; [`CurveId`] indexes into this.
    pub curves: Vec<Curve>,
    /// Sticky soft-failure flag: set when some surface's final edge set
    /// failed to assemble into closed loops during a boolean.
    pub boolean_failed: bool,
}

impl Shell {
    /// Create an empty shell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a surface patch, returning its handle.
    pub fn add_surface(&mut self, patch: SurfacePatch) -> SurfaceId {
        let id = SurfaceId(self.surfaces.len() as u32);
        self.surfaces.push(patch);
        id
    }

    /// Add a curve, returning its handle.
    pub fn add_curve(&mut self, curve: Curve) -> CurveId {
        let id = CurveId(self.curves.len() as u32);
        self.curves.push(curve);
        id
    }

    /// Build every surface's classifying BSP (and model-space edge
    /// list). With `use_curves_from`, trims resolve through `new_h`
    /// into that shell, so the BSPs see the split curves.
    pub fn make_classifying_bsps(&mut self, use_curves_from: Option<&Shell>, tol: &Tolerance) {
        for i in 0..self.surfaces.len() {
            let (bsp, edges) = self.surfaces[i].make_classifying_bsp(self, use_curves_from, tol);
            let sp = &mut self.surfaces[i];
            sp.bsp = bsp;
            sp.edges = edges;
        }
    }

    /// Reset the scratch state built up during a boolean. The BSPs have
    /// a bulk lifetime spanning one operation; this is where it ends.
    pub fn cleanup_after_boolean(&mut self) {
        for sp in &mut self.surfaces {
            sp.edges.l.clear();
            sp.bsp = None;
        }
    }

    /// A deep copy of this shell with `t` applied to every surface,
    /// curve, and trim anchor. Scratch state is not carried over.
    pub fn transformed(&self, t: &Transform) -> Shell {
        let surfaces = self
            .surfaces
            .iter()
            .map(|sp| SurfacePatch {
                geom: sp.geom.transform(t),
                trim: sp
                    .trim
                    .iter()
                    .map(|stb| TrimBy {
                        curve: stb.curve,
                        start: t.apply_point(&stb.start),
                        finish: t.apply_point(&stb.finish),
                        backwards: stb.backwards,
                    })
                    .collect(),
                bsp: None,
                edges: EdgeList::new(),
                new_h: None,
            })
            .collect();
        let curves = self
            .curves
            .iter()
            .map(|c| Curve {
                surf_a: c.surf_a,
                surf_b: c.surf_b,
                exact: c.exact.as_ref().map(|e| ExactCurve {
                    geom: e.geom.transform(t),
                    degree: e.degree,
                }),
                pts: c
                    .pts
                    .iter()
                    .map(|cp| CurvePt {
                        p: t.apply_point(&cp.p),
                        vertex: cp.vertex,
                    })
                    .collect(),
                source: c.source,
                new_h: None,
            })
            .collect();
        Shell {
            surfaces,
            curves,
            boolean_failed: self.boolean_failed,
        }
    }

    /// Check the shell's structural invariants: handles resolve, every
    /// referenced curve bounds exactly two surfaces, and every
    /// surface's trim edges close into loops.
    pub fn validate(&self, tol: &Tolerance) -> Result<(), ShellError> {
        let mut ref_counts = vec![0usize; self.curves.len()];
        for (si, sp) in self.surfaces.iter().enumerate() {
            for (ti, stb) in sp.trim.iter().enumerate() {
                if stb.curve.index() >= self.curves.len() {
                    return Err(ShellError::DanglingCurveHandle {
                        surface: si as u32,
                        trim: ti,
                    });
                }
                ref_counts[stb.curve.index()] += 1;
            }
        }
        for (ci, c) in self.curves.iter().enumerate() {
            if c.surf_a.index() >= self.surfaces.len() || c.surf_b.index() >= self.surfaces.len() {
                return Err(ShellError::DanglingSurfaceHandle { curve: ci as u32 });
            }
        }
        // Count distinct referencing surfaces, not trim records: a
        // surface may reference the same curve through several trims
        // after splitting.
        for (ci, _) in self.curves.iter().enumerate() {
            if ref_counts[ci] == 0 {
                continue;
            }
            let referencing = self
                .surfaces
                .iter()
                .filter(|sp| sp.trim.iter().any(|stb| stb.curve.index() == ci))
                .count();
            if referencing != 2 {
                return Err(ShellError::TrimReferenceCount {
                    curve: ci as u32,
                    count: referencing,
                });
            }
        }
        for (si, sp) in self.surfaces.iter().enumerate() {
            let mut el = EdgeList::new();
            sp.make_edges_into(self, &mut el, EdgeSpace::Uv, None, tol);
            if !el.assemble_polygon(tol) {
                return Err(ShellError::OpenTrimLoop { surface: si as u32 });
            }
        }
        Ok(())
    }
}

/// Project a stored UV edge endpoint back to a 2D parameter point.
pub fn project_uv(p: &Point3) -> Point2 {
    Point2::new(p.x, p.y)
}
