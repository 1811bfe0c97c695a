//! 2D binary space partition over a surface's trim edges.
//!
//! Classifies points and edges in a surface's UV parameter plane
//! against the surface's trim loops. Loops are wound so the face
//! material lies on the positive side of each oriented segment, where
//! the positive side of `a → b` is to the right of travel; an
//! unpartitioned positive half-plane therefore classifies as inside.
//!
//! The points in the tree are in UV, but tolerances are meant in model
//! space: queries first scale the UV coordinates by the local tangent
//! magnitudes `|∂S/∂u|` and `|∂S/∂v|`, linearizing the surface about
//! the query point. That preserves point-on-line relationships, and
//! exactness only matters close to the line, which is where the
//! linearization is accurate.
//!
//! Nodes live in a flat arena indexed by `u32`; the arena's lifetime is
//! one boolean operation.

use arris_kernel_geom::Surface;
use arris_kernel_math::{distance_to_line_2d, Point2, Tolerance, Vec2};

use crate::list::EdgeList;
use crate::project_uv;

/// Classification of a UV point or edge against trim loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BspClass {
    /// On the material side of the loops.
    Inside,
    /// Off the material side.
    Outside,
    /// On a trim edge, running the same direction.
    EdgeParallel,
    /// On a trim edge, running the opposite direction.
    EdgeAntiparallel,
    /// On a trim edge, crossing it.
    EdgeOther,
}

#[derive(Debug, Clone)]
struct BspNode {
    a: Point2,
    b: Point2,
    pos: Option<u32>,
    neg: Option<u32>,
    more: Option<u32>,
}

/// A BSP over oriented trim segments in a surface's UV plane.
#[derive(Debug, Clone)]
pub struct UvBsp {
    nodes: Vec<BspNode>,
}

fn scale_points(
    pt: Point2,
    a: Point2,
    b: Point2,
    srf: &dyn Surface,
) -> (Point2, Point2, Point2) {
    let mu = srf.d_du(pt).norm();
    let mv = srf.d_dv(pt).norm();
    (
        Point2::new(pt.x * mu, pt.y * mv),
        Point2::new(a.x * mu, a.y * mv),
        Point2::new(b.x * mu, b.y * mv),
    )
}

fn scaled_signed_distance(pt: Point2, a: Point2, b: Point2, srf: &dyn Surface) -> f64 {
    let (pt, a, b) = scale_points(pt, a, b, srf);
    let d = b - a;
    let len = d.norm();
    if len < f64::MIN_POSITIVE {
        return 0.0;
    }
    let n = Vec2::new(d.y, -d.x) / len;
    (pt - a).dot(&n)
}

fn scaled_distance(pt: Point2, a: Point2, b: Point2, as_segment: bool, srf: &dyn Surface) -> f64 {
    let (pt, a, b) = scale_points(pt, a, b, srf);
    distance_to_line_2d(pt, a, b - a, as_segment)
}

impl UvBsp {
    /// Build a BSP from an edge list, or `None` for an empty list.
    ///
    /// Edges are inserted in order of descending length, which improves
    /// numerical stability of the partition normals.
    pub fn build(el: &EdgeList, srf: &dyn Surface, tol: &Tolerance) -> Option<UvBsp> {
        let mut work: Vec<(Point2, Point2)> = el
            .l
            .iter()
            .map(|e| (project_uv(&e.a), project_uv(&e.b)))
            .collect();
        work.sort_by(|x, y| {
            let lx = (x.1 - x.0).norm();
            let ly = (y.1 - y.0).norm();
            ly.partial_cmp(&lx).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut it = work.into_iter();
        let (a, b) = it.next()?;
        let mut bsp = UvBsp {
            nodes: vec![BspNode {
                a,
                b,
                pos: None,
                neg: None,
                more: None,
            }],
        };
        for (ea, eb) in it {
            bsp.insert_edge(0, ea, eb, srf, tol);
        }
        Some(bsp)
    }

    fn alloc(&mut self, a: Point2, b: Point2) -> u32 {
        let idx = self.nodes.len() as u32;
        self.nodes.push(BspNode {
            a,
            b,
            pos: None,
            neg: None,
            more: None,
        });
        idx
    }

    fn insert_child(&mut self, idx: usize, pos_side: bool, ea: Point2, eb: Point2, srf: &dyn Surface, tol: &Tolerance) {
        let child = if pos_side {
            self.nodes[idx].pos
        } else {
            self.nodes[idx].neg
        };
        match child {
            Some(c) => self.insert_edge(c as usize, ea, eb, srf, tol),
            None => {
                let c = self.alloc(ea, eb);
                if pos_side {
                    self.nodes[idx].pos = Some(c);
                } else {
                    self.nodes[idx].neg = Some(c);
                }
            }
        }
    }

    fn insert_edge(&mut self, idx: usize, ea: Point2, eb: Point2, srf: &dyn Surface, tol: &Tolerance) {
        let (a, b) = (self.nodes[idx].a, self.nodes[idx].b);
        let dea = scaled_signed_distance(ea, a, b, srf);
        let deb = scaled_signed_distance(eb, a, b, srf);

        if dea.abs() < tol.linear && deb.abs() < tol.linear {
            // Segment is coincident with this node's line; store it in
            // the same node's chain.
            let prev_more = self.nodes[idx].more;
            let m = self.alloc(ea, eb);
            self.nodes[m as usize].more = prev_more;
            self.nodes[idx].more = Some(m);
        } else if dea.abs() < tol.linear {
            // Point A lies on this line, point B does not
            self.insert_child(idx, deb > 0.0, ea, eb, srf, tol);
        } else if deb.abs() < tol.linear {
            // Point B lies on this line, point A does not
            self.insert_child(idx, dea > 0.0, ea, eb, srf, tol);
        } else if dea > 0.0 && deb > 0.0 {
            self.insert_child(idx, true, ea, eb, srf, tol);
        } else if dea < 0.0 && deb < 0.0 {
            self.insert_child(idx, false, ea, eb, srf, tol);
        } else {
            // New edge crosses this one; split at the line intersection.
            let d = b - a;
            let n = Vec2::new(d.y, -d.x).normalize();
            let dist = a.coords.dot(&n);
            let t = (dist - n.dot(&ea.coords)) / n.dot(&(eb - ea));
            let pi = ea + t * (eb - ea);
            if dea > 0.0 {
                self.insert_child(idx, true, ea, pi, srf, tol);
                self.insert_child(idx, false, pi, eb, srf, tol);
            } else {
                self.insert_child(idx, false, ea, pi, srf, tol);
                self.insert_child(idx, true, pi, eb, srf, tol);
            }
        }
    }

    /// Classify a UV point against the trim loops.
    ///
    /// `eref` is the far endpoint of the edge the caller is really
    /// asking about; it disambiguates on-edge hits into parallel,
    /// antiparallel, or crossing. Pass any point (conventionally the
    /// origin) when only in/out/on is needed.
    pub fn classify_point(&self, p: Point2, eref: Point2, srf: &dyn Surface, tol: &Tolerance) -> BspClass {
        self.classify_point_at(0, p, eref, srf, tol)
    }

    fn classify_point_at(
        &self,
        idx: usize,
        p: Point2,
        eref: Point2,
        srf: &dyn Surface,
        tol: &Tolerance,
    ) -> BspClass {
        let node = &self.nodes[idx];
        let dp = scaled_signed_distance(p, node.a, node.b, srf);

        if dp.abs() < tol.linear {
            let mut f = Some(idx);
            while let Some(fi) = f {
                let (fa, fb) = (self.nodes[fi].a, self.nodes[fi].b);
                if scaled_distance(p, fa, fb, true, srf) < tol.linear {
                    return if scaled_distance(eref, fa, fb, false, srf) < tol.linear {
                        if (fb - fa).dot(&(eref - p)) > 0.0 {
                            BspClass::EdgeParallel
                        } else {
                            BspClass::EdgeAntiparallel
                        }
                    } else {
                        BspClass::EdgeOther
                    };
                }
                f = self.nodes[fi].more.map(|m| m as usize);
            }
            // Near the partition line but on no segment: both subtrees
            // ought to agree; report when they do not and take neg.
            let c1 = match node.neg {
                Some(n) => self.classify_point_at(n as usize, p, eref, srf, tol),
                None => BspClass::Outside,
            };
            let c2 = match node.pos {
                Some(n) => self.classify_point_at(n as usize, p, eref, srf, tol),
                None => BspClass::Inside,
            };
            if c1 != c2 {
                debug_bool!("bsp: pos/neg disagree near partition line: {:?} vs {:?}", c2, c1);
            }
            return c1;
        }
        if dp > 0.0 {
            match node.pos {
                Some(n) => self.classify_point_at(n as usize, p, eref, srf, tol),
                None => BspClass::Inside,
            }
        } else {
            match node.neg {
                Some(n) => self.classify_point_at(n as usize, p, eref, srf, tol),
                None => BspClass::Outside,
            }
        }
    }

    /// Classify the edge `ea → eb` by classifying its midpoint.
    ///
    /// A crossing answer at the midpoint usually means the edge is
    /// tangent there and an earlier stage failed to split it; retry at
    /// 0.294 along the edge, a parameter chosen to escape symmetric
    /// tangent configurations.
    pub fn classify_edge(&self, ea: Point2, eb: Point2, srf: &dyn Surface, tol: &Tolerance) -> BspClass {
        let mid = Point2::from((ea.coords + eb.coords) * 0.5);
        let ret = self.classify_point(mid, eb, srf, tol);
        if ret == BspClass::EdgeOther {
            return self.classify_point(ea + 0.294 * (eb - ea), eb, srf, tol);
        }
        ret
    }

    /// Scale-adjusted distance from `p` to the nearest stored segment.
    pub fn minimum_distance_to_edge(&self, p: Point2, srf: &dyn Surface) -> f64 {
        self.min_dist_at(0, p, srf)
    }

    fn min_dist_at(&self, idx: usize, p: Point2, srf: &dyn Surface) -> f64 {
        let node = &self.nodes[idx];
        let dn = match node.neg {
            Some(n) => self.min_dist_at(n as usize, p, srf),
            None => f64::MAX,
        };
        let dp = match node.pos {
            Some(n) => self.min_dist_at(n as usize, p, srf),
            None => f64::MAX,
        };
        let d = scaled_distance(p, node.a, node.b, true, srf);
        d.min(dn.min(dp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arris_kernel_geom::Plane;
    use crate::list::uv3;
    use approx::assert_relative_eq;

    fn square_edges(order: &[usize]) -> EdgeList {
        // Unit square wound clockwise: material (the square interior)
        // on the positive side of every segment.
        let loop_pts = [
            (Point2::new(0.0, 0.0), Point2::new(0.0, 1.0)),
            (Point2::new(0.0, 1.0), Point2::new(1.0, 1.0)),
            (Point2::new(1.0, 1.0), Point2::new(1.0, 0.0)),
            (Point2::new(1.0, 0.0), Point2::new(0.0, 0.0)),
        ];
        let mut el = EdgeList::new();
        for &i in order {
            let (a, b) = loop_pts[i];
            el.add_edge(uv3(a), uv3(b), i as u32, false);
        }
        el
    }

    fn square_bsp() -> UvBsp {
        let srf = Plane::xy();
        UvBsp::build(&square_edges(&[0, 1, 2, 3]), &srf, &Tolerance::DEFAULT).unwrap()
    }

    #[test]
    fn test_empty_list_builds_nothing() {
        let srf = Plane::xy();
        assert!(UvBsp::build(&EdgeList::new(), &srf, &Tolerance::DEFAULT).is_none());
    }

    #[test]
    fn test_classify_inside_outside() {
        let srf = Plane::xy();
        let tol = Tolerance::DEFAULT;
        let bsp = square_bsp();
        let dummy = Point2::origin();
        assert_eq!(
            bsp.classify_point(Point2::new(0.5, 0.5), dummy, &srf, &tol),
            BspClass::Inside
        );
        assert_eq!(
            bsp.classify_point(Point2::new(1.5, 0.5), dummy, &srf, &tol),
            BspClass::Outside
        );
        assert_eq!(
            bsp.classify_point(Point2::new(-0.5, 0.5), dummy, &srf, &tol),
            BspClass::Outside
        );
        assert_eq!(
            bsp.classify_point(Point2::new(0.5, -0.5), dummy, &srf, &tol),
            BspClass::Outside
        );
    }

    #[test]
    fn test_classify_on_edge_directions() {
        let srf = Plane::xy();
        let tol = Tolerance::DEFAULT;
        let bsp = square_bsp();
        let p = Point2::new(0.0, 0.5);
        // Reference endpoint continuing up the stored edge (0,0)→(0,1)
        assert_eq!(
            bsp.classify_point(p, Point2::new(0.0, 1.0), &srf, &tol),
            BspClass::EdgeParallel
        );
        assert_eq!(
            bsp.classify_point(p, Point2::new(0.0, 0.0), &srf, &tol),
            BspClass::EdgeAntiparallel
        );
        assert_eq!(
            bsp.classify_point(p, Point2::new(1.0, 0.5), &srf, &tol),
            BspClass::EdgeOther
        );
    }

    #[test]
    fn test_classify_edge_midpoint() {
        let srf = Plane::xy();
        let tol = Tolerance::DEFAULT;
        let bsp = square_bsp();
        assert_eq!(
            bsp.classify_edge(Point2::new(0.2, 0.2), Point2::new(0.8, 0.8), &srf, &tol),
            BspClass::Inside
        );
        assert_eq!(
            bsp.classify_edge(Point2::new(2.0, 0.0), Point2::new(2.0, 1.0), &srf, &tol),
            BspClass::Outside
        );
        // An edge running along a trim edge
        assert_eq!(
            bsp.classify_edge(Point2::new(0.0, 0.2), Point2::new(0.0, 0.8), &srf, &tol),
            BspClass::EdgeParallel
        );
        assert_eq!(
            bsp.classify_edge(Point2::new(0.0, 0.8), Point2::new(0.0, 0.2), &srf, &tol),
            BspClass::EdgeAntiparallel
        );
    }

    #[test]
    fn test_insertion_order_independence() {
        // All square edges have equal length, so the sort preserves the
        // given order and each order builds a different tree. Far
        // points must classify identically regardless.
        let srf = Plane::xy();
        let tol = Tolerance::DEFAULT;
        let orders: [&[usize]; 3] = [&[0, 1, 2, 3], &[3, 2, 1, 0], &[2, 0, 3, 1]];
        let bsps: Vec<UvBsp> = orders
            .iter()
            .map(|o| UvBsp::build(&square_edges(o), &srf, &tol).unwrap())
            .collect();
        let probes = [
            Point2::new(0.3, 0.7),
            Point2::new(0.9, 0.1),
            Point2::new(1.2, 1.2),
            Point2::new(-0.2, 0.5),
            Point2::new(0.5, 2.0),
        ];
        let dummy = Point2::origin();
        for p in probes {
            let c0 = bsps[0].classify_point(p, dummy, &srf, &tol);
            for bsp in &bsps[1..] {
                assert_eq!(bsp.classify_point(p, dummy, &srf, &tol), c0, "probe {:?}", p);
            }
        }
    }

    #[test]
    fn test_minimum_distance() {
        let srf = Plane::xy();
        let bsp = square_bsp();
        assert_relative_eq!(
            bsp.minimum_distance_to_edge(Point2::new(0.5, 0.5), &srf),
            0.5,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            bsp.minimum_distance_to_edge(Point2::new(2.0, 0.5), &srf),
            1.0,
            epsilon = 1e-12
        );
        // Near a corner, the distance is to the corner point
        assert_relative_eq!(
            bsp.minimum_distance_to_edge(Point2::new(-3.0, -4.0), &srf),
            5.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_crossing_edge_gets_split() {
        // Insert a long diagonal that crosses the square's first
        // partition line; both halves must land in the tree and
        // classify consistently afterwards.
        let srf = Plane::xy();
        let tol = Tolerance::DEFAULT;
        let mut el = square_edges(&[0, 1, 2, 3]);
        el.add_edge(
            uv3(Point2::new(-1.0, 0.5)),
            uv3(Point2::new(2.0, 0.5)),
            9,
            false,
        );
        let bsp = UvBsp::build(&el, &srf, &tol).unwrap();
        // The diagonal is on no loop, but a point on it classifies as
        // on-edge (crossing, since the reference endpoint is off-line).
        let c = bsp.classify_point(Point2::new(0.5, 0.5), Point2::origin(), &srf, &tol);
        assert!(matches!(
            c,
            BspClass::EdgeOther | BspClass::EdgeParallel | BspClass::EdgeAntiparallel
        ));
    }
}
