//! Faces: visible polygons hung off the interior nodes that generated them.

use crate::contents::{ContentFlags, GameDef};
use crate::geom::Winding;
use crate::map::MapData;
use crate::tree::Tree;

/// Post-repair output polygon: indices into the global vertex table,
/// at most `Options::maxedges` of them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceFragment {
    pub output_vertices: Vec<usize>,
}

/// A visible polygon derived from a brush side through a portal. Lives on
/// the interior node whose split produced the portal.
#[derive(Clone, Debug, Default)]
pub struct Face {
    pub winding: Winding,
    pub texinfo: i32,
    pub contents: ContentFlags,
    pub lmshift: u8,
    /// Positive plane id of the node the face sits on.
    pub planenum: usize,
    /// Face looks along the negative plane normal.
    pub planeside: bool,
    /// Indices into the vertex table, filled by vertex emission.
    pub original_vertices: Vec<usize>,
    /// Filled by T-junction repair.
    pub fragments: Vec<FaceFragment>,
}

/// Emit faces from portals: every portal whose texturing side was marked
/// visible contributes a polygon to its `onnode`, oriented to face into
/// each non-solid leaf that sees it.
pub fn make_faces(
    tree: &mut Tree,
    map: &MapData,
    game: &dyn GameDef,
    entity: usize,
) -> usize {
    let mut count = 0;
    for leaf in tree.preorder() {
        if !tree.node(leaf).is_leaf() {
            continue;
        }
        // faces are seen from inside non-solid leaves
        if game.is_any_solid(tree.node(leaf).contents) {
            continue;
        }
        for (pid, s) in tree.portals_of(leaf) {
            let p = tree.portal(pid);
            let Some(onnode) = p.onnode else {
                continue; // edge of world
            };
            let Some((bi, si)) = p.side else {
                continue;
            };
            let side = &map.entities[entity].brushes[bi].sides[si];
            if !side.visible {
                continue;
            }
            let other = p.nodes[1 - s].expect("portal endpoint");
            if game
                .visible_contents(tree.node(leaf).contents, tree.node(other).contents)
                .is_empty()
            {
                continue;
            }

            // orient the polygon so its normal points into the leaf:
            // portal windings face their front node
            let face = Face {
                winding: if s == 0 {
                    p.winding.clone()
                } else {
                    p.winding.reversed()
                },
                texinfo: side.texinfo,
                contents: tree.node(other).contents,
                lmshift: side.lmshift,
                planenum: p.planenum & !1,
                planeside: s == 1,
                original_vertices: Vec::new(),
                fragments: Vec::new(),
            };
            tree.node_mut(onnode).faces.push(face);
            count += 1;
        }
    }
    log::info!("{count:5} faces emitted");
    count
}
