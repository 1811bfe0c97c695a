#![warn(missing_docs)]

//! arris: boolean combination of B-rep shells in Rust.
//!
//! A solid is represented by its boundary [`Shell`]: a set of trimmed
//! surface patches plus the curves shared between them. The engine
//! combines two shells by regular union or difference, or merges them
//! as an assembly without intersection processing.
//!
//! # Example
//!
//! ```
//! use arris::{difference, make_box, Transform};
//!
//! let mut block = make_box(20.0, 10.0, 5.0);
//! let mut pocket = make_box(4.0, 4.0, 4.0)
//!     .transformed(&Transform::translation(8.0, 3.0, 2.0));
//! let result = difference(&mut block, &mut pocket);
//! assert!(!result.boolean_failed);
//! ```

pub use arris_kernel_booleans::{assembly_of, boolean_of, difference_of, union_of, BooleanOp};
pub use arris_kernel_geom::{
    Curve3d, Line3d, Plane, ReversedSurface, SphereSurface, Surface, SurfaceKind,
};
pub use arris_kernel_math::{Point2, Point3, Tolerance, Transform, Vec2, Vec3};
pub use arris_kernel_primitives::make_box;
pub use arris_kernel_shell::{
    Curve, CurveId, CurveSource, Shell, ShellError, SurfaceId, SurfacePatch, TrimBy,
};

/// Union of two shells with default tolerances.
pub fn union(a: &mut Shell, b: &mut Shell) -> Shell {
    union_of(a, b, &Tolerance::DEFAULT)
}

/// Difference `a - b` of two shells with default tolerances.
pub fn difference(a: &mut Shell, b: &mut Shell) -> Shell {
    difference_of(a, b, &Tolerance::DEFAULT)
}

/// Assembly merge of two shells (no intersection processing).
pub fn assembly(a: &mut Shell, b: &mut Shell) -> Shell {
    assembly_of(a, b)
}
