//! Global deduplicated vertex table with a spatial hash.
//!
//! The key is the integer floor of each coordinate, and every vertex is
//! recorded under all 27 neighbouring buckets so a query within
//! `POINT_EQUAL_EPSILON` still hits across an integer boundary. Bucket scans
//! are most-recent-first.

use crate::float_types::{POINT_EQUAL_EPSILON, Real};
use crate::tree::Tree;
use hashbrown::HashMap;
use nalgebra::Point3;

#[derive(Debug, Default)]
pub struct VertexTable {
    verts: Vec<Point3<Real>>,
    buckets: HashMap<(i64, i64, i64), Vec<usize>>,
}

impl VertexTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.verts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }

    #[inline]
    pub fn get(&self, id: usize) -> Point3<Real> {
        self.verts[id]
    }

    pub fn points(&self) -> &[Point3<Real>] {
        &self.verts
    }

    fn key(p: &Point3<Real>) -> (i64, i64, i64) {
        (
            p.x.floor() as i64,
            p.y.floor() as i64,
            p.z.floor() as i64,
        )
    }

    /// Id of an already-emitted vertex within `POINT_EQUAL_EPSILON` of `p`.
    pub fn find_emitted(&self, p: &Point3<Real>) -> Option<usize> {
        let bucket = self.buckets.get(&Self::key(p))?;
        for &id in bucket.iter().rev() {
            if (self.verts[id] - p).norm() <= POINT_EQUAL_EPSILON {
                return Some(id);
            }
        }
        None
    }

    /// Existing id within epsilon, or a fresh one hashed under the 27
    /// buckets around `p`.
    pub fn add(&mut self, p: Point3<Real>) -> usize {
        if let Some(id) = self.find_emitted(&p) {
            return id;
        }

        let id = self.verts.len();
        self.verts.push(p);

        let (kx, ky, kz) = Self::key(&p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    self.buckets
                        .entry((kx + dx, ky + dy, kz + dz))
                        .or_default()
                        .push(id);
                }
            }
        }
        id
    }
}

/// Run every face winding through the vertex table, recording the resulting
/// indices as the face's original vertices. After this the table is frozen;
/// T-junction repair only reads it.
pub fn emit_vertices(tree: &mut Tree, table: &mut VertexTable) {
    let mut stack = vec![tree.headnode];
    while let Some(id) = stack.pop() {
        if let Some(children) = tree.node(id).children {
            stack.push(children[0]);
            stack.push(children[1]);
        }
        let face_count = tree.node(id).faces.len();
        for fi in 0..face_count {
            if tree.node(id).faces[fi].winding.is_empty() {
                continue;
            }
            let ids: Vec<usize> = tree.node(id).faces[fi]
                .winding
                .points
                .clone()
                .into_iter()
                .map(|p| table.add(p))
                .collect();
            tree.node_mut(id).faces[fi].original_vertices = ids;
        }
    }
}
