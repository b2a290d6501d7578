//! T-junction repair scenarios driven through the parallel pass, on a
//! hand-built plate of coplanar faces.

mod support;

use brushbsp::faces::Face;
use brushbsp::float_types::{ANGLE_EPSILON, Real};
use brushbsp::geom::{Aabb, Plane, Winding};
use brushbsp::map::{Options, TjuncLevel};
use brushbsp::planes::PlaneRegistry;
use brushbsp::tjunc::{TjuncStats, tjunc, triangle_is_valid};
use brushbsp::tree::Tree;
use brushbsp::vertices::{VertexTable, emit_vertices};
use nalgebra::{Point3, Vector3};
use std::sync::atomic::Ordering::Relaxed;
use support::assert_no_tjunctions;

/// One interior node carrying coplanar faces on z=0, two leaf children.
fn compile_plate(
    face_points: &[&[[Real; 2]]],
    level: TjuncLevel,
    maxedges: usize,
) -> (Tree, PlaneRegistry, VertexTable, TjuncStats) {
    let mut planes = PlaneRegistry::new();
    let pn = planes.add_or_find(Plane::new(Vector3::z(), 0.0));

    let bounds = Aabb::new(
        Point3::new(-1024.0, -1024.0, -1024.0),
        Point3::new(1024.0, 1024.0, 1024.0),
    );
    let mut tree = Tree::new(bounds);
    let head = tree.headnode;
    let l0 = tree.alloc_node();
    let l1 = tree.alloc_node();
    tree.node_mut(head).planenum = Some(pn);
    tree.node_mut(head).children = Some([l0, l1]);
    tree.node_mut(l0).parent = Some(head);
    tree.node_mut(l1).parent = Some(head);
    tree.node_mut(head).bounds = bounds;

    for pts in face_points {
        let winding = Winding::new(
            pts.iter()
                .map(|[x, y]| Point3::new(*x, *y, 0.0))
                .collect(),
        );
        tree.node_mut(head).faces.push(Face {
            winding,
            planenum: pn,
            ..Default::default()
        });
    }

    let mut table = VertexTable::new();
    emit_vertices(&mut tree, &mut table);

    let options = Options {
        tjunc: level,
        maxedges,
        ..Options::default()
    };
    let stats = tjunc(&mut tree, &planes, &table, &options);
    (tree, planes, table, stats)
}

fn fragments_of(tree: &Tree, face: usize) -> Vec<Vec<usize>> {
    tree.node(tree.headnode).faces[face]
        .fragments
        .iter()
        .map(|f| f.output_vertices.clone())
        .collect()
}

/// Sum of fan-triangle areas over every fragment of a face.
fn covered_area(tree: &Tree, table: &VertexTable, face: usize) -> Real {
    let mut area = 0.0;
    for frag in fragments_of(tree, face) {
        for w in 0..frag.len() - 2 {
            let a = table.get(frag[0]);
            let b = table.get(frag[w + 1]);
            let c = table.get(frag[w + 2]);
            area += (b - a).cross(&(c - a)).norm() * 0.5;
        }
    }
    area
}

#[test]
fn corner_on_edge_is_split_and_rotated() {
    // a big quad and a small quad whose corner sits at the midpoint of the
    // big quad's bottom edge
    let big: &[[Real; 2]] = &[[0.0, 0.0], [0.0, 64.0], [64.0, 64.0], [64.0, 0.0]];
    let small: &[[Real; 2]] = &[[0.0, -64.0], [0.0, 0.0], [32.0, 0.0], [32.0, -64.0]];
    let (tree, _, table, stats) = compile_plate(&[big, small], TjuncLevel::Rotate, 64);

    assert_eq!(stats.tjunctions.load(Relaxed), 1);
    assert_eq!(stats.rotates.load(Relaxed), 1);
    assert_eq!(stats.norotates.load(Relaxed), 0);

    // the long edge is now two collinear edges through the inserted vertex
    let frags = fragments_of(&tree, 0);
    assert_eq!(frags.len(), 1);
    assert_eq!(frags[0].len(), 5);
    let mid = table.find_emitted(&Point3::new(32.0, 0.0, 0.0)).unwrap();
    assert!(frags[0].contains(&mid));

    // the chosen rotation fans without degenerate triangles
    let f = &frags[0];
    for w in 0..f.len() - 2 {
        assert!(triangle_is_valid(
            table.points(),
            f[0],
            f[w + 1],
            f[w + 2],
            ANGLE_EPSILON
        ));
    }

    assert!((covered_area(&tree, &table, 0) - 64.0 * 64.0).abs() < 1e-6);
    assert_no_tjunctions(&tree, &table);
}

#[test]
fn none_level_leaves_faces_untouched() {
    let big: &[[Real; 2]] = &[[0.0, 0.0], [0.0, 64.0], [64.0, 64.0], [64.0, 0.0]];
    let small: &[[Real; 2]] = &[[0.0, -64.0], [0.0, 0.0], [32.0, 0.0], [32.0, -64.0]];
    let (tree, _, _, stats) = compile_plate(&[big, small], TjuncLevel::None, 64);

    assert_eq!(stats.tjunctions.load(Relaxed), 0);
    let frags = fragments_of(&tree, 0);
    assert_eq!(frags.len(), 1);
    assert_eq!(frags[0].len(), 4);
}

#[test]
fn double_collinear_edges_force_retopology() {
    // both long edges of the target carry two junction vertices, so every
    // rotation base sits on a collinear run; the face must be fanned apart
    let target: &[[Real; 2]] = &[[0.0, 0.0], [0.0, 9.0], [12.0, 9.0], [12.0, 0.0]];
    let below_a: &[[Real; 2]] = &[[4.0, -8.0], [4.0, 0.0], [8.0, 0.0], [8.0, -8.0]];
    let above_a: &[[Real; 2]] = &[[8.0, 17.0], [8.0, 9.0], [4.0, 9.0], [4.0, 17.0]];
    let (tree, _, table, stats) = compile_plate(
        &[target, below_a, above_a],
        TjuncLevel::Retopologize,
        64,
    );

    assert_eq!(stats.tjunctions.load(Relaxed), 4);
    assert_eq!(stats.retopology.load(Relaxed), 1);
    assert!(stats.faceretopology.load(Relaxed) >= 1);
    assert_eq!(stats.norotates.load(Relaxed), 0);

    let frags = fragments_of(&tree, 0);
    assert!(frags.len() >= 2, "retopology should emit several fans");
    for f in &frags {
        assert!(f.len() >= 3);
        for w in 0..f.len() - 2 {
            assert!(triangle_is_valid(
                table.points(),
                f[0],
                f[w + 1],
                f[w + 2],
                ANGLE_EPSILON
            ));
        }
    }
    assert!((covered_area(&tree, &table, 0) - 12.0 * 9.0).abs() < 1e-6);
    assert_no_tjunctions(&tree, &table);
}

#[test]
fn mwt_triangulates_hexagon_with_collinear_run() {
    // convex hexagon; its bottom edge picks up three junction vertices from
    // the neighbouring quads
    let hexagon: &[[Real; 2]] = &[
        [0.0, 0.0],
        [-8.0, 8.0],
        [0.0, 16.0],
        [16.0, 16.0],
        [24.0, 8.0],
        [16.0, 0.0],
    ];
    let below_left: &[[Real; 2]] = &[[4.0, -8.0], [4.0, 0.0], [8.0, 0.0], [8.0, -8.0]];
    let below_right: &[[Real; 2]] = &[[8.0, -8.0], [8.0, 0.0], [12.0, 0.0], [12.0, -8.0]];
    let (tree, _, table, stats) = compile_plate(
        &[hexagon, below_left, below_right],
        TjuncLevel::Mwt,
        64,
    );

    assert_eq!(stats.tjunctions.load(Relaxed), 3);
    assert_eq!(stats.mwt.load(Relaxed), 1);
    // a 9-vertex superface triangulates into 7 triangles
    assert_eq!(stats.trimwt.load(Relaxed), 7);

    let frags = fragments_of(&tree, 0);
    assert!(!frags.is_empty());
    for f in &frags {
        assert!(f.len() >= 3);
        for w in 0..f.len() - 2 {
            assert!(triangle_is_valid(
                table.points(),
                f[0],
                f[w + 1],
                f[w + 2],
                ANGLE_EPSILON
            ));
        }
    }
    // the fans tile the hexagon exactly
    assert!((covered_area(&tree, &table, 0) - 384.0).abs() < 1e-6);
    assert_no_tjunctions(&tree, &table);
}

#[test]
fn oversized_face_splits_into_seamed_fragments() {
    // a convex 12-gon, no junctions, with an 8-edge ceiling
    let n = 12;
    let pts: Vec<[Real; 2]> = (0..n)
        .map(|k| {
            let a = -2.0 * std::f64::consts::PI as Real * k as Real / n as Real;
            [64.0 * a.cos(), 64.0 * a.sin()]
        })
        .collect();
    let (tree, _, table, stats) = compile_plate(&[&pts], TjuncLevel::Rotate, 8);

    assert_eq!(stats.tjunctions.load(Relaxed), 0);
    assert_eq!(stats.faceoverflows.load(Relaxed), 1);

    let frags = fragments_of(&tree, 0);
    assert_eq!(frags.len(), 2);
    assert_eq!(frags[0].len(), 8);
    assert_eq!(frags[1].len(), 6);

    // consecutive fragments share a two-vertex seam
    let shared: Vec<usize> = frags[0]
        .iter()
        .filter(|v| frags[1].contains(v))
        .copied()
        .collect();
    assert_eq!(shared.len(), 2);

    // together they still cover the polygon
    let poly_area: Real = {
        let w = &tree.node(tree.headnode).faces[0].winding;
        w.area()
    };
    assert!((covered_area(&tree, &table, 0) - poly_area).abs() < 1e-6);
}
