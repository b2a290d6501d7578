//! Coplanar face merging: faces on the same plane that share an edge are
//! coalesced when the result stays convex and under the edge ceiling.

use crate::faces::Face;
use crate::float_types::{CONTINUOUS_EPSILON, EQUAL_EPSILON, MAXEDGES, Real};
use crate::geom::Winding;
use crate::planes::PlaneRegistry;
use crate::tree::Tree;
use nalgebra::Point3;

fn points_equal(a: &Point3<Real>, b: &Point3<Real>) -> bool {
    (0..3).all(|k| (a[k] - b[k]).abs() <= EQUAL_EPSILON)
}

/// Merge `f1` and `f2` if they share an edge and the joined polygon stays
/// convex at both former endpoints. Inputs are untouched.
pub fn try_merge(planes: &PlaneRegistry, f1: &Face, f2: &Face) -> Option<Face> {
    if f1.winding.is_empty()
        || f2.winding.is_empty()
        || f1.planenum != f2.planenum
        || f1.planeside != f2.planeside
        || f1.texinfo != f2.texinfo
        || f1.contents != f2.contents
        || f1.lmshift != f2.lmshift
    {
        return None;
    }

    let w1 = &f1.winding.points;
    let w2 = &f2.winding.points;
    let n1 = w1.len();
    let n2 = w2.len();

    // find a common edge, traversed in opposite directions
    let mut found: Option<(usize, usize)> = None;
    'outer: for i in 0..n1 {
        let p1 = &w1[i];
        let p2 = &w1[(i + 1) % n1];
        for j in 0..n2 {
            let p3 = &w2[j];
            let p4 = &w2[(j + 1) % n2];
            if points_equal(p1, p4) && points_equal(p2, p3) {
                found = Some((i, j));
                break 'outer;
            }
        }
    }
    let (i, j) = found?;
    let p1 = w1[i];
    let p2 = w1[(i + 1) % n1];

    // check slope of connected lines; if the slopes are colinear, the point
    // can be removed
    let mut planenormal = planes.get(f1.planenum).normal;
    if f1.planeside {
        planenormal = -planenormal;
    }

    let back = w1[(i + n1 - 1) % n1];
    let delta = p1 - back;
    let normal = planenormal.cross(&delta).normalize();

    let back = w2[(j + 2) % n2];
    let delta = back - p1;
    let dot = delta.dot(&normal);
    if dot > CONTINUOUS_EPSILON {
        return None; // not a convex polygon
    }
    let keep1 = dot < -CONTINUOUS_EPSILON;

    let back = w1[(i + 2) % n1];
    let delta = back - p2;
    let normal = planenormal.cross(&delta).normalize();

    let back = w2[(j + n2 - 1) % n2];
    let delta = back - p2;
    let dot = delta.dot(&normal);
    if dot > CONTINUOUS_EPSILON {
        return None; // not a convex polygon
    }
    let keep2 = dot < -CONTINUOUS_EPSILON;

    if n1 + n2 > MAXEDGES {
        log::warn!("too many edges to merge");
        return None;
    }

    // build the new polygon
    let mut points = Vec::with_capacity(n1 + n2);
    let mut k = if keep2 { (i + 1) % n1 } else { (i + 2) % n1 };
    while k != i {
        points.push(w1[k]);
        k = (k + 1) % n1;
    }
    let mut l = if keep1 { (j + 1) % n2 } else { (j + 2) % n2 };
    while l != j {
        points.push(w2[l]);
        l = (l + 1) % n2;
    }

    let mut merged = f1.clone();
    merged.winding = Winding::new(points);
    merged.original_vertices.clear();
    merged.fragments.clear();
    Some(merged)
}

/// Fold `face` into `list`: keep merging against entries (restarting after
/// every success) and prepend whatever is left. Merged-out entries are
/// emptied in place for a later sweep.
pub fn merge_face_to_list(planes: &PlaneRegistry, face: Face, list: &mut Vec<Face>) {
    let mut face = face;
    let mut i = 0;
    while i < list.len() {
        if let Some(newf) = try_merge(planes, &face, &list[i]) {
            list[i].winding.points.clear(); // merged out, removed later
            face = newf;
            i = 0;
        } else {
            i += 1;
        }
    }
    list.insert(0, face);
}

/// Merge one node's faces against each other; `try_merge` only joins faces
/// agreeing on plane, side, texinfo, contents and lmshift.
fn merge_node_faces(tree: &mut Tree, planes: &PlaneRegistry, node: crate::tree::NodeId) -> usize {
    let faces = std::mem::take(&mut tree.node_mut(node).faces);
    if faces.is_empty() {
        return 0;
    }

    let mut merged: Vec<Face> = Vec::with_capacity(faces.len());
    for face in faces {
        merge_face_to_list(planes, face, &mut merged);
    }
    merged.retain(|f| !f.winding.is_empty());

    let count = merged.len();
    tree.node_mut(node).faces = merged;
    count
}

/// Merge faces across the whole tree. Idempotent.
pub fn merge_all(tree: &mut Tree, planes: &PlaneRegistry) -> usize {
    let mut mergefaces = 0;
    for id in tree.preorder() {
        mergefaces += merge_node_faces(tree, planes, id);
    }
    log::info!("{mergefaces:8} mergefaces");
    mergefaces
}
