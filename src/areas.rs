//! Area flood: partition the non-solid leaves into areas separated by
//! area-portal contents, and record on each area-portal entity the two
//! areas it joins. Also the visible-side marking that face emission reads.

use crate::contents::{ContentFlags, GameDef};
use crate::errors::CompileError;
use crate::map::MapData;
use crate::portals::{cluster_contents, portal_entity_flood};
use crate::tree::{NodeId, Tree};

/// Mark the leaf under each entity origin as occupied. Entities sitting in
/// solid are reported and skipped; a leaking map is diagnosed elsewhere.
pub fn place_occupants(tree: &mut Tree, map: &MapData, game: &dyn GameDef) -> usize {
    let mut placed = 0;
    for (i, entity) in map.entities.iter().enumerate() {
        if !entity.brushes.is_empty() || entity.epairs.is_empty() {
            continue;
        }
        let leaf = tree.leaf_for_point(&map.planes, &entity.origin);
        if game.is_any_solid(tree.node(leaf).contents) {
            log::warn!("entity {i} ({}) is inside solid", entity.classname());
            continue;
        }
        tree.node_mut(leaf).occupied = true;
        placed += 1;
    }
    placed
}

/// Leaf clusters containing an occupant: occupied leaves, or detail
/// separators with an occupied leaf below them.
fn find_occupied_clusters(tree: &Tree, node: NodeId, out: &mut Vec<NodeId>) {
    if tree.node(node).is_leaf() || tree.node(node).detail_separator {
        if subtree_occupied(tree, node) {
            out.push(node);
        }
        return;
    }
    let children = tree.node(node).children.expect("interior node");
    find_occupied_clusters(tree, children[0], out);
    find_occupied_clusters(tree, children[1], out);
}

fn subtree_occupied(tree: &Tree, node: NodeId) -> bool {
    if tree.node(node).occupied {
        return true;
    }
    match tree.node(node).children {
        Some(children) => {
            subtree_occupied(tree, children[0]) || subtree_occupied(tree, children[1])
        }
        None => false,
    }
}

/// The `func_areaportal` entity owning this cluster, found by scanning its
/// leaves' original brushes.
fn areanode_entity_for_leaf(tree: &Tree, map: &MapData, entity: usize, node: NodeId) -> Option<usize> {
    if let Some(children) = tree.node(node).children {
        return areanode_entity_for_leaf(tree, map, entity, children[0])
            .or_else(|| areanode_entity_for_leaf(tree, map, entity, children[1]));
    }
    for &bi in &tree.node(node).original_brushes {
        if let Some(owner) = map.entities[entity].brushes[bi].func_areaportal {
            return Some(owner);
        }
    }
    None
}

fn apply_area_r(tree: &mut Tree, node: NodeId, area: u32) {
    tree.node_mut(node).area = area;
    if let Some(children) = tree.node(node).children {
        apply_area_r(tree, children[0], area);
        apply_area_r(tree, children[1], area);
    }
}

fn flood_areas_r(
    tree: &mut Tree,
    map: &mut MapData,
    game: &dyn GameDef,
    entity: usize,
    node: NodeId,
) -> Result<(), CompileError> {
    let is_cluster = tree.node(node).is_leaf() || tree.node(node).detail_separator;
    if is_cluster
        && cluster_contents(tree, game, node).contains(ContentFlags::AREAPORTAL)
    {
        // this cluster is an area portal: record the touching area on its
        // entity instead of flooding through
        let Some(owner) = areanode_entity_for_leaf(tree, map, entity, node) else {
            log::warn!(
                "areaportal contents in node, but no entity found {:?} -> {:?}",
                tree.node(node).bounds.mins,
                tree.node(node).bounds.maxs
            );
            return Ok(());
        };

        // if the current area has already touched this portal, we are done
        let areas = map.entities[owner].portalareas;
        if areas[0] == map.c_areas || areas[1] == map.c_areas {
            return Ok(());
        }

        if areas[1] != 0 {
            log::warn!(
                "areaportal entity {owner} touches > 2 areas; bounds {:?} -> {:?}",
                map.entities[owner].bounds.mins,
                map.entities[owner].bounds.maxs
            );
            return Ok(());
        }

        let slot = if areas[0] != 0 { 1 } else { 0 };
        map.entities[owner].portalareas[slot] = map.c_areas;
        return Ok(());
    }

    if tree.node(node).area != 0 {
        return Ok(()); // already got it
    }

    apply_area_r(tree, node, map.c_areas);

    for (pid, s) in tree.portals_of(node) {
        let crossable = {
            let p = tree.portal(pid);
            portal_entity_flood(tree, game, p)?
        };
        if !crossable {
            continue;
        }
        let other = tree.portal(pid).nodes[1 - s].expect("portal endpoint");
        flood_areas_r(tree, map, game, entity, other)?;
    }
    Ok(())
}

fn find_areas(
    tree: &mut Tree,
    map: &mut MapData,
    game: &dyn GameDef,
    entity: usize,
) -> Result<(), CompileError> {
    let mut clusters = Vec::new();
    find_occupied_clusters(tree, tree.headnode, &mut clusters);

    for cluster in clusters {
        if tree.node(cluster).area != 0 {
            continue;
        }
        // area portals are always flooded into, never out of
        if cluster_contents(tree, game, cluster).contains(ContentFlags::AREAPORTAL) {
            continue;
        }
        map.c_areas += 1;
        flood_areas_r(tree, map, game, entity, cluster)?;
    }
    Ok(())
}

/// Assign each still-unset area-portal leaf the first area of its entity.
fn set_areaportal_areas_r(tree: &mut Tree, map: &MapData, entity: usize, node: NodeId) {
    if let Some(children) = tree.node(node).children {
        set_areaportal_areas_r(tree, map, entity, children[0]);
        set_areaportal_areas_r(tree, map, entity, children[1]);
        return;
    }

    if !tree.node(node).contents.contains(ContentFlags::AREAPORTAL) {
        return;
    }
    if tree.node(node).area != 0 {
        return; // already set
    }

    let Some(owner) = areanode_entity_for_leaf(tree, map, entity, node) else {
        log::warn!(
            "areaportal missing for node: {:?} -> {:?}",
            tree.node(node).bounds.mins,
            tree.node(node).bounds.maxs
        );
        return;
    };

    tree.node_mut(node).area = map.entities[owner].portalareas[0];
    if map.entities[owner].portalareas[1] == 0 {
        log::warn!(
            "areaportal entity {owner} doesn't touch two areas; bounds {:?} -> {:?}",
            map.entities[owner].bounds.mins,
            map.entities[owner].bounds.maxs
        );
    }
}

/// Mark each non-solid leaf with an area, bounded by area-portal contents.
pub fn flood_areas(
    tree: &mut Tree,
    map: &mut MapData,
    game: &dyn GameDef,
    entity: usize,
) -> Result<(), CompileError> {
    find_areas(tree, map, game, entity)?;
    set_areaportal_areas_r(tree, map, entity, tree.headnode);
    log::info!("{:5} areas", map.c_areas);
    Ok(())
}

/// Pick the brush side that textures a portal: prefer an exact plane match,
/// otherwise the closest normal, scanning later brushes first.
fn find_portal_side(
    tree: &mut Tree,
    map: &MapData,
    game: &dyn GameDef,
    entity: usize,
    pid: crate::tree::PortalId,
) {
    let planes = &map.planes;
    let (onnode, n0, n1) = {
        let p = tree.portal(pid);
        (
            p.onnode.expect("internal portal"),
            p.nodes[0].expect("portal endpoint"),
            p.nodes[1].expect("portal endpoint"),
        )
    };

    // decide which content change is strongest
    let viscontents =
        game.visible_contents(tree.node(n0).contents, tree.node(n1).contents);
    let p = tree.portal_mut(pid);
    p.sidefound = true;
    if game.is_empty(viscontents) {
        return;
    }

    let planenum = tree.node(onnode).planenum.expect("interior node");
    let p1 = planes.get(planenum);
    let mut bestside: Option<(usize, usize)> = None;
    let mut bestdot = 0.0;

    'nodes: for n in [n0, n1] {
        // later brushes in map order take priority
        for &bi in tree.node(n).original_brushes.iter().rev() {
            let brush = &map.entities[entity].brushes[bi];
            if !game.contents_contains(brush.contents, viscontents) {
                continue;
            }
            for (si, side) in brush.sides.iter().enumerate() {
                if side.bevel || side.texinfo == crate::brush::TEXINFO_NODE {
                    continue;
                }
                if side.planenum >> 1 == planenum >> 1 {
                    // exact match
                    bestside = Some((bi, si));
                    break 'nodes;
                }
                let p2 = planes.get(side.planenum);
                let dot = p1.normal.dot(&p2.normal);
                if dot > bestdot {
                    bestdot = dot;
                    bestside = Some((bi, si));
                }
            }
        }
    }

    if bestside.is_none() {
        log::warn!("side not found for portal");
    }
    tree.portal_mut(pid).side = bestside;
}

/// Set the `visible` flag on every brush side a portal borrows for
/// texturing. Cleared first, so the pass is idempotent.
pub fn mark_visible_sides(tree: &mut Tree, map: &mut MapData, game: &dyn GameDef, entity: usize) {
    for brush in &mut map.entities[entity].brushes {
        for side in &mut brush.sides {
            side.visible = false;
        }
    }

    for id in tree.preorder() {
        if !tree.node(id).is_leaf() {
            continue;
        }
        // empty leafs are never boundary leafs
        if game.is_empty(tree.node(id).contents) {
            continue;
        }
        for (pid, _) in tree.portals_of(id) {
            if tree.portal(pid).onnode.is_none() {
                continue; // edge of world
            }
            if !tree.portal(pid).sidefound {
                find_portal_side(tree, map, game, entity, pid);
            }
            if let Some((bi, si)) = tree.portal(pid).side {
                map.entities[entity].brushes[bi].sides[si].visible = true;
            }
        }
    }
}
