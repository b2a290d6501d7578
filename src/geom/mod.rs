//! Geometry primitives: planes, windings and axis-aligned boxes with the
//! epsilon-aware predicates the compile phases are built on.

pub mod aabb;
pub mod plane;
pub mod winding;

pub use aabb::Aabb;
pub use plane::Plane;
pub use winding::Winding;
