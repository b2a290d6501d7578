//! Scalar type selection and the numeric constants honoured by every phase.

// Our Real scalar type:
#[cfg(feature = "f32")]
pub type Real = f32;
#[cfg(feature = "f64")]
pub type Real = f64;

/// Vertex equality when matching edges during face merging.
pub const EQUAL_EPSILON: Real = 1e-4;

/// Bend tolerance for the coplanarity test in face merging. Joints within
/// this of straight are treated as collinear and the shared vertex dropped.
pub const CONTINUOUS_EPSILON: Real = 5e-3;

/// Perpendicular distance within which a vertex counts as lying on an edge
/// during T-junction repair.
pub const DEFAULT_ON_EPSILON: Real = 0.1;

/// Clip epsilon while building a node's base winding from its ancestors.
pub const BASE_WINDING_EPSILON: Real = 1e-3;

/// Clip epsilon while splitting portals across a node plane.
pub const SPLIT_WINDING_EPSILON: Real = 1e-3;

/// Two emitted vertices within this distance are the same vertex.
pub const POINT_EQUAL_EPSILON: Real = 0.05;

/// Padding added around the tree bounds for the head-node box portals,
/// so no leaf ever has a null volume against the outside.
pub const SIDESPACE: Real = 24.0;

/// Minimum interior angle, in degrees, for a triangle to be considered
/// non-degenerate by the T-junction repair passes.
pub const ANGLE_EPSILON: Real = 0.01;

/// A winding with fewer than three edges at least this long is tiny.
pub const TINY_EDGE_LENGTH: Real = 0.2;

/// Normal tolerance for plane registry lookups.
pub const NORMAL_EPSILON: Real = 1e-4;

/// Distance tolerance for plane registry lookups.
pub const DIST_EPSILON: Real = 1e-4;

/// Hard ceiling on vertices per emitted face; merge refuses to exceed it
/// and T-junction repair fragments anything above `Options::maxedges`.
pub const MAXEDGES: usize = 64;

/// Default half-extent of the world; used to size base windings and to
/// diagnose unbounded node volumes.
pub const DEFAULT_WORLD_EXTENT: Real = 65536.0;
