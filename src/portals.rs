//! Portal generation: the head-node box, then a pre-order pass that gives
//! every interior node a portal on its plane and splits the inherited
//! portals down to its children.

use crate::contents::GameDef;
use crate::errors::CompileError;
use crate::float_types::{BASE_WINDING_EPSILON, SIDESPACE, SPLIT_WINDING_EPSILON};
use crate::geom::{Aabb, Plane, Winding};
use crate::map::Options;
use crate::planes::PlaneRegistry;
use crate::tree::{NodeId, Portal, Tree};

#[derive(Debug, Default)]
pub struct PortalStats {
    pub tiny_portals: usize,
    pub nodes_without_volume: usize,
    pub unbounded_nodes: usize,
}

/// Contents of a leaf cluster: the leaf's own contents, or the game-merged
/// contents of every leaf under a detail separator.
pub fn cluster_contents(
    tree: &Tree,
    game: &dyn GameDef,
    node: NodeId,
) -> crate::contents::ContentFlags {
    match tree.node(node).children {
        None => tree.node(node).contents,
        Some(children) => game.cluster_contents(
            cluster_contents(tree, game, children[0]),
            cluster_contents(tree, game, children[1]),
        ),
    }
}

/// Visibility may flow through the portal: it is internal and neither of
/// its clusters blocks sight per the game rules.
pub fn portal_can_see_through(
    tree: &Tree,
    game: &dyn GameDef,
    options: &Options,
    portal: &Portal,
) -> bool {
    if portal.onnode.is_none() {
        return false; // to the global outside
    }
    let c0 = cluster_contents(tree, game, portal.nodes[0].expect("portal endpoint"));
    let c1 = cluster_contents(tree, game, portal.nodes[1].expect("portal endpoint"));
    game.portal_can_see_through(c0, c1, options.transwater, options.transsky)
}

/// The entity flood crosses every portal not bounded by solid. Both ends
/// must be leaves.
pub fn portal_entity_flood(
    tree: &Tree,
    game: &dyn GameDef,
    portal: &Portal,
) -> Result<bool, CompileError> {
    let n0 = portal.nodes[0].expect("portal endpoint");
    let n1 = portal.nodes[1].expect("portal endpoint");
    if !tree.node(n0).is_leaf() || !tree.node(n1).is_leaf() {
        return Err(CompileError::FloodNotLeaf);
    }
    Ok(!game.is_any_solid(tree.node(n0).contents)
        && !game.is_any_solid(tree.node(n1).contents))
}

/// Six portals forming a box around the grown tree bounds, the outside
/// sentinel leaf on their far side.
fn make_headnode_portals(
    tree: &mut Tree,
    planes: &mut PlaneRegistry,
    game: &dyn GameDef,
    options: &Options,
) -> Result<(), CompileError> {
    // pad with some space so there will never be null volume leafs
    let bounds = tree.bounds.grow(SIDESPACE);

    let outside = tree.outside_node;
    {
        let n = tree.node_mut(outside);
        n.planenum = None;
        n.contents = game.create_solid_contents();
        n.portals = None;
    }

    let mut box_planes = [Plane::new(nalgebra::Vector3::x(), 0.0); 6];
    let mut box_portals = [None; 6];

    for i in 0..3 {
        for j in 0..2 {
            let n = j * 3 + i;
            let mut normal = nalgebra::Vector3::zeros();
            let pl = if j == 1 {
                normal[i] = -1.0;
                Plane::new(normal, -bounds.corner(j)[i])
            } else {
                normal[i] = 1.0;
                Plane::new(normal, bounds.corner(j)[i])
            };
            box_planes[n] = pl;

            let pn = planes.add_or_find(pl);
            let portal = Portal::new(
                pn & !1,
                Winding::base_for_plane(&pl, options.worldextent),
                None,
            );
            let pid = tree.alloc_portal(portal);
            box_portals[n] = Some(pid);
            if pn & 1 == 1 {
                tree.add_portal_to_nodes(pid, outside, tree.headnode)?;
            } else {
                tree.add_portal_to_nodes(pid, tree.headnode, outside)?;
            }
        }
    }

    // clip the base windings by all the other box planes
    for i in 0..6 {
        let pid = box_portals[i].expect("box portal");
        for (j, pl) in box_planes.iter().enumerate() {
            if j == i {
                continue;
            }
            let clipped = tree
                .portal(pid)
                .winding
                .clip(pl, options.epsilon, true)
                .0
                .expect("box portal clipped away");
            tree.portal_mut(pid).winding = clipped;
        }
    }
    Ok(())
}

/// Winding on the node's plane clipped by every ancestor, keeping the half
/// the node's subtree lies in.
fn base_winding_for_node(
    tree: &Tree,
    planes: &PlaneRegistry,
    options: &Options,
    node: NodeId,
) -> Option<Winding> {
    let plane = planes.get(tree.node(node).planenum.expect("interior node"));
    let mut w = Winding::base_for_plane(plane, options.worldextent);

    // clip by all the parents
    let mut cur = node;
    let mut up = tree.node(node).parent;
    while let Some(np) = up {
        let plane = planes.get(tree.node(np).planenum.expect("interior node"));
        let children = tree.node(np).children.expect("interior node");
        let (front, back) = w.clip(plane, BASE_WINDING_EPSILON, false);
        w = match if children[0] == cur { front } else { back } {
            Some(w) => w,
            None => return None,
        };
        cur = np;
        up = tree.node(np).parent;
    }
    Some(w)
}

/// Create the node's own portal: the base winding cut by every portal
/// already on the node, attached between the two children.
fn make_node_portal(
    tree: &mut Tree,
    planes: &PlaneRegistry,
    options: &Options,
    node: NodeId,
    stats: &mut PortalStats,
) -> Result<(), CompileError> {
    let mut w = base_winding_for_node(tree, planes, options, node);

    for (pid, s) in tree.portals_of(node) {
        let Some(winding) = w else { return Ok(()) };
        let p = tree.portal(pid);
        debug_assert_eq!(p.side_of(node), Some(s), "mislinked portal");
        let plane = if s == 0 {
            *planes.get(p.planenum)
        } else {
            -*planes.get(p.planenum)
        };
        w = winding.clip(&plane, 0.1, false).0;
    }

    let Some(w) = w else { return Ok(()) };
    if w.is_tiny() {
        stats.tiny_portals += 1;
        return Ok(());
    }

    let planenum = tree.node(node).planenum.expect("interior node");
    let children = tree.node(node).children.expect("interior node");
    let pid = tree.alloc_portal(Portal::new(planenum & !1, w, Some(node)));
    tree.add_portal_to_nodes(pid, children[0], children[1])
}

/// Move or split the portals bounding `node` down onto its children.
fn split_node_portals(
    tree: &mut Tree,
    planes: &PlaneRegistry,
    node: NodeId,
    stats: &mut PortalStats,
) -> Result<(), CompileError> {
    let plane = *planes.get(tree.node(node).planenum.expect("interior node"));
    let [f, b] = tree.node(node).children.expect("interior node");

    for (pid, side) in tree.portals_of(node) {
        let other = tree.portal(pid).nodes[1 - side].ok_or(CompileError::MislinkedPortal {
            node: node.index(),
        })?;
        let n0 = tree.portal(pid).nodes[0].expect("portal endpoint");
        let n1 = tree.portal(pid).nodes[1].expect("portal endpoint");
        tree.remove_portal_from_node(pid, n0)?;
        tree.remove_portal_from_node(pid, n1)?;

        // cut the portal into two portals, one on each side of the cut plane
        let (mut frontwinding, mut backwinding) =
            tree.portal(pid).winding.clip(&plane, SPLIT_WINDING_EPSILON, true);
        if frontwinding.as_ref().is_some_and(Winding::is_tiny) {
            frontwinding = None;
            stats.tiny_portals += 1;
        }
        if backwinding.as_ref().is_some_and(Winding::is_tiny) {
            backwinding = None;
            stats.tiny_portals += 1;
        }

        match (frontwinding, backwinding) {
            (None, None) => {
                // tiny windings on both sides
            }
            (Some(_), None) => {
                if side == 0 {
                    tree.add_portal_to_nodes(pid, f, other)?;
                } else {
                    tree.add_portal_to_nodes(pid, other, f)?;
                }
            }
            (None, Some(_)) => {
                if side == 0 {
                    tree.add_portal_to_nodes(pid, b, other)?;
                } else {
                    tree.add_portal_to_nodes(pid, other, b)?;
                }
            }
            (Some(fw), Some(bw)) => {
                // the winding is split
                let new_portal = Portal::new(
                    tree.portal(pid).planenum,
                    bw,
                    tree.portal(pid).onnode,
                );
                let new_pid = tree.alloc_portal(new_portal);
                tree.portal_mut(new_pid).side = tree.portal(pid).side;
                tree.portal_mut(new_pid).sidefound = tree.portal(pid).sidefound;
                tree.portal_mut(pid).winding = fw;

                if side == 0 {
                    tree.add_portal_to_nodes(pid, f, other)?;
                    tree.add_portal_to_nodes(new_pid, b, other)?;
                } else {
                    tree.add_portal_to_nodes(pid, other, f)?;
                    tree.add_portal_to_nodes(new_pid, other, b)?;
                }
            }
        }
    }

    tree.node_mut(node).portals = None;
    Ok(())
}

/// Node bounds from the union of its portal winding points. An inverted
/// result is diagnosed and patched from the parent so later passes see
/// finite bounds.
fn calc_node_bounds(tree: &mut Tree, node: NodeId) {
    let mut bounds = Aabb::default();
    for (pid, _) in tree.portals_of(node) {
        for p in &tree.portal(pid).winding.points {
            bounds.add_point(*p);
        }
    }
    tree.node_mut(node).bounds = bounds;
}

fn make_tree_portals_r(
    tree: &mut Tree,
    planes: &PlaneRegistry,
    options: &Options,
    node: NodeId,
    stats: &mut PortalStats,
) -> Result<(), CompileError> {
    calc_node_bounds(tree, node);
    if tree.node(node).bounds.mins[0] >= tree.node(node).bounds.maxs[0] {
        log::warn!("node {} without a volume", node.index());
        stats.nodes_without_volume += 1;
        if let Some(parent) = tree.node(node).parent {
            let mins = tree.node(parent).bounds.mins;
            tree.node_mut(node).bounds = Aabb::new(mins, mins);
        }
    }

    for i in 0..3 {
        if tree.node(node).bounds.mins[i].abs() > options.worldextent {
            log::warn!("node {} with unbounded volume", node.index());
            stats.unbounded_nodes += 1;
            break;
        }
    }

    if tree.node(node).is_leaf() {
        return Ok(());
    }

    make_node_portal(tree, planes, options, node, stats)?;
    split_node_portals(tree, planes, node, stats)?;

    let children = tree.node(node).children.expect("interior node");
    make_tree_portals_r(tree, planes, options, children[0], stats)?;
    make_tree_portals_r(tree, planes, options, children[1], stats)
}

/// Portalize the whole tree. Any portals from a previous pass are released
/// first.
pub fn make_tree_portals(
    tree: &mut Tree,
    planes: &mut PlaneRegistry,
    game: &dyn GameDef,
    options: &Options,
) -> Result<PortalStats, CompileError> {
    tree.free_tree_portals(tree.headnode)?;
    debug_assert!(tree.assert_no_portals(tree.headnode));

    let mut stats = PortalStats::default();
    make_headnode_portals(tree, planes, game, options)?;
    make_tree_portals_r(tree, planes, options, tree.headnode, &mut stats)?;
    if stats.tiny_portals > 0 {
        log::info!("{:5} tiny portals", stats.tiny_portals);
    }
    Ok(stats)
}
