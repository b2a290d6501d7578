//! T-junction repair.
//!
//! A vertex of one face lying interior to an edge of another leaves a crack
//! when rasterized. Each face is rebuilt as a *superface* (its boundary plus
//! every global vertex found on it), then retopologized to taste: rotated to
//! a fan base with no degenerate triangles, split into several fans, or run
//! through a minimum-weight triangulation first.
//!
//! Faces are independent given the frozen tree and vertex table, so the
//! pass runs as a parallel map over faces with a serial write-back; the
//! counters are relaxed atomics, read only for the report at the end.

use crate::faces::{Face, FaceFragment};
use crate::float_types::{ANGLE_EPSILON, DEFAULT_ON_EPSILON, Real};
use crate::geom::Aabb;
use crate::map::{Options, TjuncLevel};
use crate::planes::PlaneRegistry;
use crate::tree::{NodeId, Tree};
use crate::vertices::VertexTable;
use nalgebra::{Point3, Vector2, Vector3};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Default)]
pub struct TjuncStats {
    /// Degenerate edges seen (two identical input vertices).
    pub degenerate: AtomicUsize,
    /// Edges added to close a T-junction.
    pub tjunctions: AtomicUsize,
    /// Fragments added by splitting over-large faces.
    pub faceoverflows: AtomicUsize,
    /// Faces that collapsed entirely.
    pub facecollapse: AtomicUsize,
    /// Faces fixed by rotating the start point.
    pub rotates: AtomicUsize,
    /// Faces that no rotation or retopology could fix.
    pub norotates: AtomicUsize,
    /// Faces successfully retopologized.
    pub retopology: AtomicUsize,
    /// Extra fragments produced by retopology.
    pub faceretopology: AtomicUsize,
    /// Faces handled by minimum-weight triangulation.
    pub mwt: AtomicUsize,
    /// Triangles computed by MWT.
    pub trimwt: AtomicUsize,
    /// Extra fragments produced by MWT.
    pub facemwt: AtomicUsize,
}

/// Parameter of `p`'s projection onto the edge when it lies strictly
/// between `start` and `end` and within `DEFAULT_ON_EPSILON` of the line.
pub fn point_on_edge(
    p: &Point3<Real>,
    edge_start: &Point3<Real>,
    edge_dir: &Vector3<Real>,
    start: Real,
    end: Real,
) -> Option<Real> {
    let delta = p - edge_start;
    let dist = delta.dot(edge_dir);

    // check if off an end
    if dist <= start || dist >= end {
        return None;
    }

    let exact = edge_start + edge_dir * dist;
    let error = (p - exact).norm();
    if error > DEFAULT_ON_EPSILON {
        return None;
    }
    Some(dist)
}

/// Interior angle at `a`, in degrees.
fn angle_of_triangle(a: &Point3<Real>, b: &Point3<Real>, c: &Point3<Real>) -> Real {
    let ab = b - a;
    let ac = c - a;
    let den = ab.norm() * ac.norm();
    if den <= 0.0 {
        return 0.0;
    }
    let cos = (ab.dot(&ac) / den).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// All three interior angles at least `angle_epsilon` degrees.
pub fn triangle_is_valid(
    verts: &[Point3<Real>],
    v0: usize,
    v1: usize,
    v2: usize,
    angle_epsilon: Real,
) -> bool {
    angle_of_triangle(&verts[v0], &verts[v1], &verts[v2]) >= angle_epsilon
        && angle_of_triangle(&verts[v1], &verts[v2], &verts[v0]) >= angle_epsilon
        && angle_of_triangle(&verts[v2], &verts[v0], &verts[v1]) >= angle_epsilon
}

/// Split the edge `p1..p2` at the first candidate vertex found on it, then
/// recurse on both halves from the next candidate onward. Emits `p1` when
/// the edge is finally junction-free.
#[allow(clippy::too_many_arguments)]
fn test_edge(
    start: Real,
    end: Real,
    p1: usize,
    p2: usize,
    startvert: usize,
    edge_verts: &[usize],
    edge_start: &Point3<Real>,
    edge_dir: &Vector3<Real>,
    superface: &mut Vec<usize>,
    verts: &[Point3<Real>],
    stats: &TjuncStats,
) {
    if p1 == p2 {
        // degenerate edge
        stats.degenerate.fetch_add(1, Relaxed);
        return;
    }

    for k in startvert..edge_verts.len() {
        let j = edge_verts[k];
        if j == p1 || j == p2 {
            continue;
        }
        let Some(dist) = point_on_edge(&verts[j], edge_start, edge_dir, start, end) else {
            continue;
        };

        // break the edge
        stats.tjunctions.fetch_add(1, Relaxed);
        test_edge(
            start, dist, p1, j, k + 1, edge_verts, edge_start, edge_dir, superface, verts,
            stats,
        );
        test_edge(
            dist, end, j, p2, k + 1, edge_verts, edge_start, edge_dir, superface, verts,
            stats,
        );
        return;
    }

    // the edge p1 to p2 is now free of tjunctions
    superface.push(p1);
}

/// Candidate vertices near the edge, gathered by a bounded walk of the
/// tree: prune nodes whose bounds miss a loosely grown edge box, collect
/// from the faces of everything else.
fn find_edge_verts(
    tree: &Tree,
    verts: &[Point3<Real>],
    p1: &Point3<Real>,
    p2: &Point3<Real>,
    out: &mut Vec<usize>,
) {
    let aabb = Aabb::from_points(*p1, *p2).grow(1.0);
    find_edge_verts_r(tree, verts, tree.headnode, &aabb, out);
}

fn find_edge_verts_r(
    tree: &Tree,
    verts: &[Point3<Real>],
    node: NodeId,
    aabb: &Aabb,
    out: &mut Vec<usize>,
) {
    let n = tree.node(node);
    if n.is_leaf() || n.bounds.disjoint(aabb, 0.0) {
        return;
    }

    for face in &n.faces {
        for &v in &face.original_vertices {
            if aabb.contains_point(&verts[v]) {
                out.push(v);
            }
        }
    }

    let children = n.children.expect("interior node");
    find_edge_verts_r(tree, verts, children[0], aabb, out);
    find_edge_verts_r(tree, verts, children[1], aabb, out);
}

/// The face boundary with every collinear world vertex inserted.
fn create_superface(
    tree: &Tree,
    verts: &[Point3<Real>],
    f: &Face,
    stats: &TjuncStats,
) -> Vec<usize> {
    let n = f.original_vertices.len();
    let mut superface = Vec::with_capacity(n * 2);
    let mut edge_verts = Vec::with_capacity(8);

    for i in 0..n {
        let v1 = f.original_vertices[i];
        let v2 = f.original_vertices[(i + 1) % n];
        let edge_start = verts[v1];
        let e2 = verts[v2];

        edge_verts.clear();
        find_edge_verts(tree, verts, &edge_start, &e2, &mut edge_verts);

        let dir = e2 - edge_start;
        let len = dir.norm();
        if len <= 0.0 {
            stats.degenerate.fetch_add(1, Relaxed);
            continue;
        }
        let edge_dir = dir / len;

        test_edge(
            0.0, len, v1, v2, 0, &edge_verts, &edge_start, &edge_dir, &mut superface,
            verts, stats,
        );
    }

    superface
}

// ---------------------------------------------------------------------------
// minimum-weight triangulation

/// Weight assigned to triangles failing the validity test: large enough to
/// lose to any real triangulation, finite so the table still fills.
const INVALID_TRIANGLE_WEIGHT: Real = Real::MAX / 2.0;

/// Perimeter-minimal triangulation of a convex polygon, as position triples
/// into `indices` (each sorted ascending). `None` when no all-finite
/// triangulation exists.
fn minimum_weight_triangulation(
    indices: &[usize],
    pts: &[Vector2<Real>],
    verts: &[Point3<Real>],
) -> Option<Vec<[usize; 3]>> {
    let n = pts.len();

    // t[i + j*n] is the weight of the best triangulation below edge ij,
    // k_table the apex that achieves it
    let mut t = vec![0.0 as Real; n * n];
    let mut k_table: Vec<Option<usize>> = vec![None; n * n];

    for diagonal in 0..n {
        let (mut i, mut j) = (0usize, diagonal);
        while j < n {
            if j >= i + 2 {
                t[i + j * n] = Real::MAX;
                for k in i + 1..j {
                    let weight = if triangle_is_valid(
                        verts,
                        indices[i],
                        indices[j],
                        indices[k],
                        ANGLE_EPSILON,
                    ) {
                        (pts[i] - pts[j]).norm()
                            + (pts[j] - pts[k]).norm()
                            + (pts[k] - pts[i]).norm()
                            + t[i + k * n]
                            + t[k + j * n]
                    } else {
                        INVALID_TRIANGLE_WEIGHT
                    };
                    if weight < t[i + j * n] {
                        t[i + j * n] = weight;
                        k_table[i + j * n] = Some(k);
                    }
                }
            }
            i += 1;
            j += 1;
        }
    }

    let mut triangles = Vec::with_capacity(n.saturating_sub(2));
    let mut queue = VecDeque::from([(0usize, n - 1)]);
    while let Some((a, b)) = queue.pop_front() {
        if a == b {
            continue;
        }
        let Some(c) = k_table[a + b * n] else {
            continue;
        };
        let mut tri = [a, b, c];
        tri.sort_unstable();
        triangles.push(tri);
        queue.push_back((a, c));
        queue.push_back((c, b));
    }

    (triangles.len() == n - 2).then_some(triangles)
}

/// Position of a triangle matching `(a, b, c)` up to cyclic rotation.
fn triangle_exists(triangles: &[[usize; 3]], a: usize, b: usize, c: usize) -> Option<usize> {
    triangles.iter().position(|tri| {
        (0..3).any(|s| tri[s] == a && tri[(s + 1) % 3] == b && tri[(s + 2) % 3] == c)
    })
}

/// The longest chain of triangles windable as one fan.
fn find_best_fan(triangles: &[[usize; 3]], num_vertices: usize) -> Vec<usize> {
    let mut best: Vec<usize> = Vec::new();

    for tri in triangles {
        // try all three permutations
        for perm in 0..3 {
            let first = tri[perm];
            let mut mid = tri[(perm + 1) % 3];
            let mut last = tri[(perm + 2) % 3];
            let mut chain = Vec::new();

            while last != first {
                if let Some(ft) = triangle_exists(triangles, first, mid, last) {
                    chain.push(ft);
                    mid = last;
                }
                last = (last + 1) % num_vertices;
            }

            if chain.len() > best.len() {
                best = chain;
            }
        }
    }

    best
}

/// Vertex shared by every triangle of the fan.
fn find_seed_vertex(triangles: &[[usize; 3]], fan: &[usize]) -> usize {
    let mut shared: Vec<usize> = triangles[fan[0]].to_vec();
    for &ti in &fan[1..] {
        let tri = &triangles[ti];
        shared.retain(|v| tri.contains(v));
        if shared.len() == 1 {
            return shared[0];
        }
    }
    shared[0]
}

/// Pack triangles into fan polygons; leftovers come out as triangles.
/// `vertices` maps polygon positions back to global vertex ids.
fn compress_triangles_into_fans(
    mut triangles: Vec<[usize; 3]>,
    vertices: &[usize],
) -> Vec<Vec<usize>> {
    let mut out = Vec::new();

    while !triangles.is_empty() {
        let mut fan = find_best_fan(&triangles, vertices.len());

        // once only single-triangle fans remain, take the rest directly
        if fan.len() <= 1 {
            for tri in &triangles {
                out.push(vec![vertices[tri[0]], vertices[tri[1]], vertices[tri[2]]]);
            }
            triangles.clear();
            break;
        }

        let seed = find_seed_vertex(&triangles, &fan);

        // order the fan's vertices to match the superface winding, seed first
        let mut fan_verts: Vec<usize> = Vec::new();
        for &ti in &fan {
            for &v in &triangles[ti] {
                if !fan_verts.contains(&v) {
                    fan_verts.push(v);
                }
            }
        }
        let nv = vertices.len();
        fan_verts.sort_unstable_by_key(|&v| if v < seed { nv + v } else { v });
        out.push(fan_verts.into_iter().map(|v| vertices[v]).collect());

        fan.sort_unstable_by(|a, b| b.cmp(a));
        for ti in fan {
            triangles.remove(ti);
        }
    }

    out
}

/// Unit tangent and bitangent spanning the plane of `normal`.
fn tangent_and_bitangent(normal: &Vector3<Real>) -> (Vector3<Real>, Vector3<Real>) {
    let mut axis = Vector3::zeros();
    let (x, y, z) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
    if x <= y && x <= z {
        axis.x = 1.0;
    } else if y <= z {
        axis.y = 1.0;
    } else {
        axis.z = 1.0;
    }
    let u = normal.cross(&axis).normalize();
    let v = normal.cross(&u).normalize();
    (u, v)
}

/// MWT repair: triangulate the superface in 2D, then pack fans.
fn mwt_face(
    f: &Face,
    planes: &PlaneRegistry,
    verts: &[Point3<Real>],
    superface: &[usize],
    stats: &TjuncStats,
) -> Vec<Vec<usize>> {
    let mut plane = *planes.get(f.planenum);
    if f.planeside {
        plane = -plane;
    }
    let (u, v) = tangent_and_bitangent(&plane.normal);

    let pts: Vec<Vector2<Real>> = superface
        .iter()
        .map(|&vi| Vector2::new(verts[vi].coords.dot(&u), verts[vi].coords.dot(&v)))
        .collect();

    let Some(tris) = minimum_weight_triangulation(superface, &pts, verts) else {
        return Vec::new();
    };
    stats.trimwt.fetch_add(tris.len(), Relaxed);

    compress_triangles_into_fans(tris, superface)
}

// ---------------------------------------------------------------------------
// retopology

/// The vertex after `end` lies on the fan's closing edge `end -> seed`.
fn next_point_on_closing_edge(
    verts: &[Point3<Real>],
    input: &[usize],
    seed: usize,
    end: usize,
) -> bool {
    let n = input.len();
    let after = verts[input[(end + 1) % n]];
    let v0 = verts[input[seed]];
    let v2 = verts[input[end]];
    let dir = v0 - v2;
    let len = dir.norm();
    if len <= 0.0 {
        return true;
    }
    point_on_edge(&after, &v2, &(dir / len), 0.0, len).is_some()
}

/// Split a rotation-resistant superface into several triangle fans: grow a
/// fan from a valid seed triangle while each extension stays valid and its
/// closing edge is clear of the next boundary vertex, emit it, and continue
/// on the remainder. `None` when no valid seed exists at some step.
fn retopologize_face(verts: &[Point3<Real>], superface: &[usize]) -> Option<Vec<Vec<usize>>> {
    let mut result: Vec<Vec<usize>> = Vec::new();
    let mut input: Vec<usize> = superface.to_vec();

    while !input.is_empty() {
        if input.len() < 3 {
            // degenerated remainder; failure
            return None;
        }
        let n = input.len();

        // seed triangle: valid, with the next point off its closing edge
        let mut found = None;
        for seed in 0..n {
            let end = (seed + 2) % n;
            if !triangle_is_valid(
                verts,
                input[seed],
                input[(seed + 1) % n],
                input[end],
                ANGLE_EPSILON,
            ) {
                continue;
            }
            if next_point_on_closing_edge(verts, &input, seed, end) {
                continue;
            }
            found = Some((seed, end));
            break;
        }
        let (seed, mut end) = found?;

        // wind forward while the fan triangle stays valid and clear
        loop {
            let next = (end + 1) % n;
            if next == seed {
                break; // full wrap
            }
            if !triangle_is_valid(verts, input[seed], input[end], input[next], ANGLE_EPSILON)
                || next_point_on_closing_edge(verts, &input, seed, next)
            {
                break;
            }
            end = next;
        }

        if (end + 1) % n == seed {
            // the fan covers everything; rotate so the seed leads
            let mut whole = Vec::with_capacity(n);
            whole.extend_from_slice(&input[seed..]);
            whole.extend_from_slice(&input[..seed]);
            result.push(whole);
            input.clear();
            continue;
        }

        // emit the fan seed..=end
        let mut fragment = Vec::new();
        let mut x = seed;
        loop {
            fragment.push(input[x]);
            if x == end {
                break;
            }
            x = (x + 1) % n;
        }

        // the remainder closes along the new seed-end edge
        let mut remainder = Vec::with_capacity(n - fragment.len() + 2);
        let mut x = end;
        loop {
            remainder.push(input[x]);
            if x == seed {
                break;
            }
            x = (x + 1) % n;
        }

        result.push(fragment);
        input = remainder;
    }

    Some(result)
}

// ---------------------------------------------------------------------------

/// Cut a polygon down to fragments of at most `maxedges` vertices.
/// Consecutive fragments share the two-vertex seam the split leaves behind.
fn split_face_into_fragments(
    face: Vec<usize>,
    maxedges: usize,
    stats: &TjuncStats,
) -> Vec<Vec<usize>> {
    let mut rest = face;
    let mut out = Vec::new();

    while rest.len() > maxedges {
        stats.faceoverflows.fetch_add(1, Relaxed);

        out.push(rest[..maxedges].to_vec());

        // keep the first vertex and everything from the seam on
        let mut next = Vec::with_capacity(rest.len() - maxedges + 2);
        next.push(rest[0]);
        next.extend_from_slice(&rest[maxedges - 1..]);
        rest = next;
    }

    out.push(rest);
    out
}

/// Repair one face: pure in the tree and vertex table, returns the fragment
/// list to install.
pub fn fix_face_edges(
    tree: &Tree,
    planes: &PlaneRegistry,
    verts: &[Point3<Real>],
    options: &Options,
    f: &Face,
    stats: &TjuncStats,
) -> Vec<FaceFragment> {
    if options.tjunc == TjuncLevel::None {
        return vec![FaceFragment {
            output_vertices: f.original_vertices.clone(),
        }];
    }

    let superface = create_superface(tree, verts, f, stats);

    if superface.len() < 3 {
        // entire face collapsed
        stats.facecollapse.fetch_add(1, Relaxed);
        return Vec::new();
    }
    if superface.len() == 3 {
        // a triangle cannot hide a junction
        return vec![FaceFragment {
            output_vertices: f.original_vertices.clone(),
        }];
    }

    let mut faces: Vec<Vec<usize>> = Vec::new();

    // MWT first; it gives the best topology when it applies
    if options.tjunc >= TjuncLevel::Mwt {
        faces = mwt_face(f, planes, verts, &superface, stats);
        if !faces.is_empty() {
            stats.mwt.fetch_add(1, Relaxed);
            stats.facemwt.fetch_add(faces.len() - 1, Relaxed);
        }
    }

    // brute-force rotation of the start point
    if faces.is_empty() && options.tjunc >= TjuncLevel::Rotate {
        let n = superface.len();
        let mut rotation = None;
        for i in 0..n {
            let valid = (0..n - 2).all(|x| {
                triangle_is_valid(
                    verts,
                    superface[i],
                    superface[(i + x + 1) % n],
                    superface[(i + x + 2) % n],
                    ANGLE_EPSILON,
                )
            });
            if valid {
                rotation = Some(i);
                break;
            }
        }

        match rotation {
            None => {
                // rotation can't kill the degenerate triangles; re-topologize
                if options.tjunc >= TjuncLevel::Retopologize {
                    if let Some(r) = retopologize_face(verts, &superface) {
                        if r.len() > 1 {
                            stats.retopology.fetch_add(1, Relaxed);
                            stats.faceretopology.fetch_add(r.len() - 1, Relaxed);
                            faces = r;
                        }
                    }
                }
                if faces.is_empty() {
                    // stuck with the zero-area fill triangles
                    stats.norotates.fetch_add(1, Relaxed);
                }
            }
            Some(0) => {}
            Some(i) => {
                stats.rotates.fetch_add(1, Relaxed);
                let mut rotated = Vec::with_capacity(n);
                rotated.extend_from_slice(&superface[i..]);
                rotated.extend_from_slice(&superface[..i]);
                faces.push(rotated);
            }
        }
    }

    // everything failed or was skipped: the superface itself
    if faces.is_empty() {
        faces.push(superface);
    }

    if options.maxedges > 0 {
        faces = faces
            .into_iter()
            .flat_map(|f| split_face_into_fragments(f, options.maxedges, stats))
            .collect();
    }

    debug_assert!(faces.iter().all(|f| f.len() >= 3));
    faces
        .into_iter()
        .map(|f| FaceFragment { output_vertices: f })
        .collect()
}

/// Faces eligible for repair: attached to an interior node, with emitted
/// vertices.
fn collect_faces(tree: &Tree) -> Vec<(NodeId, usize)> {
    let mut sites = Vec::new();
    for id in tree.preorder() {
        if tree.node(id).is_leaf() {
            continue;
        }
        for (i, f) in tree.node(id).faces.iter().enumerate() {
            if !f.original_vertices.is_empty() {
                sites.push((id, i));
            }
        }
    }
    sites
}

/// Fix every face in the tree and report the counters.
pub fn tjunc(
    tree: &mut Tree,
    planes: &PlaneRegistry,
    table: &VertexTable,
    options: &Options,
) -> TjuncStats {
    let stats = TjuncStats::default();
    let sites = collect_faces(tree);
    let verts = table.points();

    let tree_ref: &Tree = tree;
    #[cfg(feature = "parallel")]
    let results: Vec<Vec<FaceFragment>> = sites
        .par_iter()
        .map(|&(n, i)| {
            fix_face_edges(
                tree_ref,
                planes,
                verts,
                options,
                &tree_ref.node(n).faces[i],
                &stats,
            )
        })
        .collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<Vec<FaceFragment>> = sites
        .iter()
        .map(|&(n, i)| {
            fix_face_edges(
                tree_ref,
                planes,
                verts,
                options,
                &tree_ref.node(n).faces[i],
                &stats,
            )
        })
        .collect();

    for ((n, i), frags) in sites.into_iter().zip(results) {
        tree.node_mut(n).faces[i].fragments = frags;
    }

    report(&stats);
    stats
}

fn report(stats: &TjuncStats) {
    let get = |c: &AtomicUsize| c.load(Relaxed);
    if get(&stats.degenerate) > 0 {
        log::info!("{:5} edges degenerated", get(&stats.degenerate));
    }
    if get(&stats.facecollapse) > 0 {
        log::info!("{:5} faces degenerated", get(&stats.facecollapse));
    }
    if get(&stats.tjunctions) > 0 {
        log::info!("{:5} edges added by tjunctions", get(&stats.tjunctions));
    }
    if get(&stats.mwt) > 0 {
        log::info!(
            "{:5} faces ran through MWT ({} new faces from {} triangles)",
            get(&stats.mwt),
            get(&stats.facemwt),
            get(&stats.trimwt)
        );
    }
    if get(&stats.retopology) > 0 {
        log::info!(
            "{:5} faces re-topologized ({} new faces)",
            get(&stats.retopology),
            get(&stats.faceretopology)
        );
    }
    if get(&stats.rotates) > 0 {
        log::info!("{:5} faces rotated", get(&stats.rotates));
    }
    if get(&stats.norotates) > 0 {
        log::info!(
            "{:5} faces unable to be rotated or re-topologized",
            get(&stats.norotates)
        );
    }
    if get(&stats.faceoverflows) > 0 {
        log::info!(
            "{:5} faces added by splitting large faces",
            get(&stats.faceoverflows)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(pts: &[[Real; 2]]) -> Vec<Point3<Real>> {
        pts.iter().map(|[x, y]| Point3::new(*x, *y, 0.0)).collect()
    }

    #[test]
    fn point_on_edge_accepts_interior_only() {
        let start = Point3::new(0.0, 0.0, 0.0);
        let dir = Vector3::x();
        // interior
        assert!(point_on_edge(&Point3::new(4.0, 0.0, 0.0), &start, &dir, 0.0, 8.0).is_some());
        // endpoints are not junctions
        assert!(point_on_edge(&Point3::new(0.0, 0.0, 0.0), &start, &dir, 0.0, 8.0).is_none());
        assert!(point_on_edge(&Point3::new(8.0, 0.0, 0.0), &start, &dir, 0.0, 8.0).is_none());
        // too far off the line
        assert!(point_on_edge(&Point3::new(4.0, 0.5, 0.0), &start, &dir, 0.0, 8.0).is_none());
        // within the on-epsilon
        let d = point_on_edge(&Point3::new(4.0, 0.05, 0.0), &start, &dir, 0.0, 8.0);
        assert!((d.unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn triangle_validity_rejects_collinear() {
        let verts = flat(&[[0.0, 0.0], [4.0, 0.0], [8.0, 0.0], [4.0, 4.0]]);
        assert!(!triangle_is_valid(&verts, 0, 1, 2, ANGLE_EPSILON));
        assert!(triangle_is_valid(&verts, 0, 1, 3, ANGLE_EPSILON));
    }

    #[test]
    fn test_edge_inserts_midpoint() {
        let verts = flat(&[[0.0, 0.0], [8.0, 0.0], [4.0, 0.0]]);
        let stats = TjuncStats::default();
        let mut superface = Vec::new();
        let edge_verts = vec![0, 1, 2];
        test_edge(
            0.0,
            8.0,
            0,
            1,
            0,
            &edge_verts,
            &verts[0],
            &Vector3::x(),
            &mut superface,
            &verts,
            &stats,
        );
        assert_eq!(superface, vec![0, 2]);
        assert_eq!(stats.tjunctions.load(Relaxed), 1);
    }

    #[test]
    fn test_edge_inserts_two_points_in_order() {
        let verts = flat(&[[0.0, 0.0], [9.0, 0.0], [6.0, 0.0], [3.0, 0.0]]);
        let stats = TjuncStats::default();
        let mut superface = Vec::new();
        let edge_verts = vec![0, 1, 2, 3];
        test_edge(
            0.0,
            9.0,
            0,
            1,
            0,
            &edge_verts,
            &verts[0],
            &Vector3::x(),
            &mut superface,
            &verts,
            &stats,
        );
        assert_eq!(superface, vec![0, 3, 2]);
        assert_eq!(stats.tjunctions.load(Relaxed), 2);
    }

    #[test]
    fn degenerate_edge_is_counted() {
        let verts = flat(&[[0.0, 0.0]]);
        let stats = TjuncStats::default();
        let mut superface = Vec::new();
        test_edge(
            0.0,
            1.0,
            0,
            0,
            0,
            &[],
            &verts[0],
            &Vector3::x(),
            &mut superface,
            &verts,
            &stats,
        );
        assert!(superface.is_empty());
        assert_eq!(stats.degenerate.load(Relaxed), 1);
    }

    #[test]
    fn mwt_of_square_is_two_triangles() {
        let verts = flat(&[[0.0, 0.0], [0.0, 8.0], [8.0, 8.0], [8.0, 0.0]]);
        let pts: Vec<Vector2<Real>> = verts.iter().map(|p| Vector2::new(p.x, p.y)).collect();
        let tris = minimum_weight_triangulation(&[0, 1, 2, 3], &pts, &verts).unwrap();
        assert_eq!(tris.len(), 2);
        for tri in &tris {
            assert!(triangle_is_valid(&verts, tri[0], tri[1], tri[2], ANGLE_EPSILON));
        }
    }

    #[test]
    fn fan_packing_covers_all_triangles() {
        // a fan triangulation of a convex pentagon packs into one polygon
        let triangles = vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]];
        let vertices = vec![10, 11, 12, 13, 14];
        let fans = compress_triangles_into_fans(triangles, &vertices);
        assert_eq!(fans, vec![vec![10, 11, 12, 13, 14]]);
    }

    #[test]
    fn retopologize_handles_double_collinear_edges() {
        // quad with two extra vertices on the bottom and top edges:
        // every rotation base sits on one of the collinear runs
        let verts = flat(&[
            [0.0, 0.0],   // 0 corner
            [4.0, 0.0],   // 1 on bottom edge
            [8.0, 0.0],   // 2 on bottom edge
            [12.0, 0.0],  // 3 corner
            [12.0, 9.0],  // 4 corner
            [8.0, 9.0],   // 5 on top edge
            [4.0, 9.0],   // 6 on top edge
            [0.0, 9.0],   // 7 corner
        ]);
        let superface: Vec<usize> = (0..8).collect();

        // no rotation admits an all-valid fan
        let n = superface.len();
        for i in 0..n {
            let ok = (0..n - 2).all(|x| {
                triangle_is_valid(
                    &verts,
                    superface[i],
                    superface[(i + x + 1) % n],
                    superface[(i + x + 2) % n],
                    ANGLE_EPSILON,
                )
            });
            assert!(!ok, "rotation {i} unexpectedly valid");
        }

        let fans = retopologize_face(&verts, &superface).expect("retopology");
        assert!(fans.len() >= 2);
        let mut covered = 0.0;
        for fan in &fans {
            assert!(fan.len() >= 3);
            for w in 0..fan.len() - 2 {
                assert!(triangle_is_valid(&verts, fan[0], fan[w + 1], fan[w + 2], ANGLE_EPSILON));
                let a = verts[fan[0]];
                let b = verts[fan[w + 1]];
                let c = verts[fan[w + 2]];
                covered += (b - a).cross(&(c - a)).norm() * 0.5;
            }
        }
        assert!((covered - 12.0 * 9.0).abs() < 1e-6);
    }

    #[test]
    fn fragment_split_shares_two_vertex_seam() {
        let stats = TjuncStats::default();
        let poly: Vec<usize> = (0..12).collect();
        let frags = split_face_into_fragments(poly, 8, &stats);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0], vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(frags[1], vec![0, 7, 8, 9, 10, 11]);
        assert_eq!(stats.faceoverflows.load(Relaxed), 1);
    }

    #[test]
    fn fragment_split_leaves_small_faces_alone() {
        let stats = TjuncStats::default();
        let poly: Vec<usize> = (0..6).collect();
        let frags = split_face_into_fragments(poly.clone(), 8, &stats);
        assert_eq!(frags, vec![poly]);
        assert_eq!(stats.faceoverflows.load(Relaxed), 0);
    }
}
