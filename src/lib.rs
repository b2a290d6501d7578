//! Brush-based BSP compiler core for Quake-family maps.
//!
//! From convex brushes in memory to a portal-annotated spatial tree with
//! topology-clean faces: BSP construction, portal generation, area flood,
//! coplanar face merging and T-junction repair. Map parsing, texture
//! lookup and lump serialization are the caller's business.

#![forbid(unsafe_code)]

pub mod areas;
pub mod brush;
pub mod bspbuild;
pub mod compiler;
pub mod contents;
pub mod errors;
pub mod faces;
pub mod float_types;
pub mod geom;
pub mod map;
pub mod merge;
pub mod planes;
pub mod portals;
pub mod tjunc;
pub mod tree;
pub mod vertices;

#[cfg(any(
    all(feature = "f64", feature = "f32"),
    not(any(feature = "f64", feature = "f32"))
))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use compiler::{CompileStats, compile_entity};
pub use contents::{ContentFlags, GameDef, Quake2Game};
pub use errors::CompileError;
pub use map::{MapData, MapEntity, Options, TjuncLevel};
pub use tree::Tree;
