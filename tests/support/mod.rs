//! Shared helpers for the scenario tests.

use brushbsp::brush::{Brush, brush_from_bounds};
use brushbsp::contents::ContentFlags;
use brushbsp::float_types::Real;
use brushbsp::geom::Aabb;
use brushbsp::map::MapData;
use brushbsp::tjunc::point_on_edge;
use brushbsp::tree::Tree;
use brushbsp::vertices::VertexTable;
use nalgebra::Point3;

/// Axial solid brush for test scenes, textured so faces get emitted.
pub fn room_brush(
    map: &mut MapData,
    mins: [Real; 3],
    maxs: [Real; 3],
    contents: ContentFlags,
) -> Brush {
    let mut brush = brush_from_bounds(
        &mut map.planes,
        &Aabb::new(
            Point3::new(mins[0], mins[1], mins[2]),
            Point3::new(maxs[0], maxs[1], maxs[2]),
        ),
        contents,
        65536.0,
    )
    .expect("test brush");
    for side in &mut brush.sides {
        side.texinfo = 0;
    }
    brush
}

/// All faces in the tree, flattened.
pub fn all_faces(tree: &Tree) -> Vec<&brushbsp::faces::Face> {
    tree.preorder()
        .into_iter()
        .flat_map(|id| tree.node(id).faces.iter())
        .collect()
}

/// Every portal appears exactly once in each endpoint's list.
pub fn assert_portal_linkage(tree: &Tree) {
    for id in tree.preorder() {
        for (pid, s) in tree.portals_of(id) {
            let p = tree.portal(pid);
            assert_eq!(p.nodes[s], Some(id), "portal side mismatch");
            let occurrences = tree
                .portals_of(id)
                .iter()
                .filter(|(other, _)| *other == pid)
                .count();
            assert_eq!(occurrences, 1, "portal listed more than once");
        }
    }
}

/// After repair, no emitted vertex lies strictly interior to any fragment
/// edge.
pub fn assert_no_tjunctions(tree: &Tree, table: &VertexTable) {
    for face in all_faces(tree) {
        for frag in &face.fragments {
            let n = frag.output_vertices.len();
            assert!(n >= 3, "fragment with fewer than 3 vertices");
            for i in 0..n {
                let v1 = frag.output_vertices[i];
                let v2 = frag.output_vertices[(i + 1) % n];
                let a = table.get(v1);
                let b = table.get(v2);
                let dir = b - a;
                let len = dir.norm();
                assert!(len > 0.0, "zero-length fragment edge");
                let dir = dir / len;
                for w in 0..table.len() {
                    if w == v1 || w == v2 {
                        continue;
                    }
                    assert!(
                        point_on_edge(&table.get(w), &a, &dir, 0.0, len).is_none(),
                        "vertex {w} interior to edge {v1}-{v2}"
                    );
                }
            }
        }
    }
}
