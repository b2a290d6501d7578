//! The compile context: entities, the plane registry, the vertex table and
//! the knobs the phases read. One `MapData` is threaded `&mut` through the
//! whole compile; there is no global state.

use crate::brush::Brush;
use crate::float_types::{DEFAULT_WORLD_EXTENT, MAXEDGES, Real};
use crate::geom::Aabb;
use crate::planes::PlaneRegistry;
use crate::vertices::VertexTable;
use nalgebra::Point3;

/// How hard T-junction repair works on each face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TjuncLevel {
    /// Emit original windings untouched.
    None,
    /// Rotate the superface looking for a fan base with no degenerate
    /// triangles.
    Rotate,
    /// Additionally split rotation-resistant faces into several fans.
    Retopologize,
    /// Additionally try a minimum-weight triangulation first.
    Mwt,
}

#[derive(Clone, Debug)]
pub struct Options {
    /// General on-plane epsilon for portal-winding clips.
    pub epsilon: Real,
    /// Half-extent of the world; sizes base windings and bounds diagnostics.
    pub worldextent: Real,
    /// Fragment ceiling for emitted faces; 0 disables fragmentation.
    pub maxedges: usize,
    pub tjunc: TjuncLevel,
    /// Let visibility flood through water and slime.
    pub transwater: bool,
    /// Let visibility flood through sky.
    pub transsky: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            epsilon: 0.1,
            worldextent: DEFAULT_WORLD_EXTENT,
            maxedges: MAXEDGES,
            tjunc: TjuncLevel::Rotate,
            transwater: false,
            transsky: false,
        }
    }
}

/// Parsed map entity: key/value pairs in file order plus its brushes.
#[derive(Debug)]
pub struct MapEntity {
    pub epairs: Vec<(String, String)>,
    pub origin: Point3<Real>,
    pub brushes: Vec<Brush>,
    pub bounds: Aabb,
    /// The up-to-two areas an area-portal entity separates, filled in by the
    /// area flood. Zero means unset.
    pub portalareas: [u32; 2],
    pub areaportal_num: i32,
}

impl Default for MapEntity {
    fn default() -> Self {
        Self {
            epairs: Vec::new(),
            origin: Point3::origin(),
            brushes: Vec::new(),
            bounds: Aabb::default(),
            portalareas: [0, 0],
            areaportal_num: 0,
        }
    }
}

impl MapEntity {
    pub fn value(&self, key: &str) -> Option<&str> {
        self.epairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn classname(&self) -> &str {
        self.value("classname").unwrap_or("")
    }

    pub fn is_areaportal(&self) -> bool {
        self.classname() == "func_areaportal"
    }

    /// Union of the entity's brush bounds.
    pub fn calc_bounds(&mut self) {
        let mut bb = Aabb::default();
        for brush in &self.brushes {
            bb = bb.union(&brush.bounds);
        }
        self.bounds = bb;
    }
}

/// Everything that outlives a single phase: the deduplicated plane registry
/// (frozen once brushes are loaded), the entities, the vertex table and the
/// running area counter.
#[derive(Debug, Default)]
pub struct MapData {
    pub planes: PlaneRegistry,
    pub entities: Vec<MapEntity>,
    pub vertices: VertexTable,
    /// Number of areas assigned so far; areas are numbered from 1.
    pub c_areas: u32,
}

impl MapData {
    pub fn new() -> Self {
        Self::default()
    }
}
