//! Recursive brush BSP construction.
//!
//! Split planes are drawn from the sides of the brushes in the current
//! region, scored by balance and penalised per straddling brush; structural
//! sides are exhausted before detail sides, and the node where that
//! transition happens is marked as a detail separator.

use crate::brush::{Brush, brush_side_of_plane, split_brush};
use crate::contents::{ContentFlags, GameDef};
use crate::errors::CompileError;
use crate::float_types::Real;
use crate::geom::Aabb;
use crate::map::Options;
use crate::planes::PlaneRegistry;
use crate::tree::{NodeId, Tree};

/// Straddle penalty; balance weighs in at 1 per brush of imbalance.
const SPLIT_PENALTY: Real = 8.0;
/// Candidates that leave one side empty rank below any two-sided split.
const ONE_SIDED_PENALTY: Real = 1000.0;

const SIDE_EPSILON: Real = 0.1;

#[derive(Debug, Default)]
pub struct BuildStats {
    pub nodes: usize,
    pub leaves: usize,
    pub brush_splits: usize,
}

/// Build the tree for one entity's brush list. Brushes must already carry
/// windings and bounds.
pub fn brush_bsp(
    planes: &PlaneRegistry,
    game: &dyn GameDef,
    options: &Options,
    brushes: Vec<Brush>,
    stats: &mut BuildStats,
) -> Result<Tree, CompileError> {
    let mut bounds = Aabb::default();
    for brush in &brushes {
        bounds = bounds.union(&brush.bounds);
    }
    if !bounds.is_valid() {
        // an entity with no brushes still gets a one-leaf tree
        bounds = Aabb::new(
            nalgebra::Point3::new(-1.0, -1.0, -1.0),
            nalgebra::Point3::new(1.0, 1.0, 1.0),
        );
    }

    let mut tree = Tree::new(bounds);
    let head = tree.headnode;
    build_tree_r(&mut tree, planes, game, options, head, brushes, stats)?;
    log::info!(
        "{:5} nodes, {:5} leaves, {:5} brush splits",
        stats.nodes,
        stats.leaves,
        stats.brush_splits
    );
    Ok(tree)
}

fn build_tree_r(
    tree: &mut Tree,
    planes: &PlaneRegistry,
    game: &dyn GameDef,
    options: &Options,
    node: NodeId,
    mut brushes: Vec<Brush>,
    stats: &mut BuildStats,
) -> Result<(), CompileError> {
    let (split, is_detail) = match select_split_plane(planes, &brushes) {
        Some(found) => found,
        None => {
            make_leaf(tree, game, node, brushes);
            stats.leaves += 1;
            return Ok(());
        }
    };
    stats.nodes += 1;

    {
        let n = tree.node_mut(node);
        n.planenum = Some(split);
        if is_detail {
            n.detail_separator = true;
        }
    }

    // this plane is spent for the whole subtree
    for brush in &mut brushes {
        for side in &mut brush.sides {
            if side.planenum >> 1 == split >> 1 {
                side.onnode = true;
            }
        }
    }

    let mut front = Vec::with_capacity(brushes.len());
    let mut back = Vec::with_capacity(brushes.len());
    for brush in brushes {
        match brush_side_of_plane(&brush, planes, split, SIDE_EPSILON) {
            (true, true) => {
                stats.brush_splits += 1;
                let (f, b) = split_brush(&brush, planes, split, options.worldextent);
                if let Some(f) = f {
                    front.push(f);
                }
                if let Some(b) = b {
                    back.push(b);
                }
            }
            (true, false) => front.push(brush),
            _ => back.push(brush),
        }
    }

    let children = [tree.alloc_node(), tree.alloc_node()];
    for child in children {
        tree.node_mut(child).parent = Some(node);
    }
    tree.node_mut(node).children = Some(children);

    build_tree_r(tree, planes, game, options, children[0], front, stats)?;
    build_tree_r(tree, planes, game, options, children[1], back, stats)
}

fn make_leaf(tree: &mut Tree, game: &dyn GameDef, node: NodeId, brushes: Vec<Brush>) {
    let mut contents = ContentFlags::empty();
    let mut originals: Vec<usize> = Vec::with_capacity(brushes.len());
    for brush in &brushes {
        contents = game.cluster_contents(contents, brush.contents);
        if !originals.contains(&brush.original) {
            originals.push(brush.original);
        }
    }
    let n = tree.node_mut(node);
    n.planenum = None;
    n.contents = contents;
    n.original_brushes = originals;
}

/// Pick the best unused side plane. Returns the positive plane id and
/// whether only detail candidates were left.
fn select_split_plane(planes: &PlaneRegistry, brushes: &[Brush]) -> Option<(usize, bool)> {
    for detail_pass in [false, true] {
        let mut candidates: Vec<usize> = Vec::new();
        for brush in brushes {
            if brush.contents.contains(ContentFlags::DETAIL) != detail_pass {
                continue;
            }
            for side in &brush.sides {
                if side.bevel || side.onnode || side.winding.is_none() {
                    continue;
                }
                candidates.push(side.planenum & !1);
            }
        }
        candidates.sort_unstable();
        candidates.dedup();

        let mut best: Option<(usize, Real)> = None;
        for pn in candidates {
            let mut front = 0i32;
            let mut back = 0i32;
            let mut splits = 0i32;
            for brush in brushes {
                match brush_side_of_plane(brush, planes, pn, SIDE_EPSILON) {
                    (true, true) => splits += 1,
                    (true, false) => front += 1,
                    (false, true) => back += 1,
                    (false, false) => {}
                }
            }
            if front + back + splits == 0 {
                continue;
            }

            let mut score =
                -SPLIT_PENALTY * splits as Real - ((front - back).abs() as Real);
            if front + splits == 0 || back + splits == 0 {
                score -= ONE_SIDED_PENALTY;
            }
            // strict comparison: ties go to the lowest plane id
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((pn, score));
            }
        }

        if let Some((pn, _)) = best {
            return Some((pn, detail_pass));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::brush_from_bounds;
    use crate::contents::Quake2Game;
    use nalgebra::Point3;

    fn build(brush_boxes: &[(Point3<Real>, Point3<Real>)]) -> (Tree, PlaneRegistry) {
        let mut planes = PlaneRegistry::new();
        let brushes: Vec<Brush> = brush_boxes
            .iter()
            .enumerate()
            .map(|(i, (mins, maxs))| {
                let mut b = brush_from_bounds(
                    &mut planes,
                    &Aabb::new(*mins, *maxs),
                    ContentFlags::SOLID,
                    65536.0,
                )
                .unwrap();
                b.original = i;
                b
            })
            .collect();
        let tree = brush_bsp(
            &planes,
            &Quake2Game,
            &Options::default(),
            brushes,
            &mut BuildStats::default(),
        )
        .unwrap();
        (tree, planes)
    }

    #[test]
    fn single_brush_yields_solid_and_air_leaves() {
        let (tree, planes) = build(&[(
            Point3::new(-16.0, -16.0, -16.0),
            Point3::new(16.0, 16.0, 16.0),
        )]);

        let inside = tree.leaf_for_point(&planes, &Point3::new(0.0, 0.0, 0.0));
        assert!(tree.node(inside).contents.contains(ContentFlags::SOLID));
        assert_eq!(tree.node(inside).original_brushes, vec![0]);

        let outside = tree.leaf_for_point(&planes, &Point3::new(100.0, 0.0, 0.0));
        assert!(tree.node(outside).contents.is_empty());
    }

    #[test]
    fn leaves_are_homogeneous() {
        let (tree, planes) = build(&[
            (Point3::new(-64.0, -16.0, -16.0), Point3::new(-32.0, 16.0, 16.0)),
            (Point3::new(32.0, -16.0, -16.0), Point3::new(64.0, 16.0, 16.0)),
        ]);
        // between the two brushes is air
        let between = tree.leaf_for_point(&planes, &Point3::new(0.0, 0.0, 0.0));
        assert!(tree.node(between).contents.is_empty());
        let a = tree.leaf_for_point(&planes, &Point3::new(-48.0, 0.0, 0.0));
        let b = tree.leaf_for_point(&planes, &Point3::new(48.0, 0.0, 0.0));
        assert!(tree.node(a).contents.contains(ContentFlags::SOLID));
        assert!(tree.node(b).contents.contains(ContentFlags::SOLID));
        assert_ne!(a, b);
    }

    #[test]
    fn parent_links_are_consistent() {
        let (tree, _) = build(&[(
            Point3::new(-8.0, -8.0, -8.0),
            Point3::new(8.0, 8.0, 8.0),
        )]);
        for id in tree.preorder() {
            if let Some(children) = tree.node(id).children {
                for c in children {
                    assert_eq!(tree.node(c).parent, Some(id));
                }
            }
        }
    }
}
