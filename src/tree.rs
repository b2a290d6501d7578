//! The compiled spatial tree: a node arena and a portal arena.
//!
//! Portals are shared by the two subtrees they connect, so they cannot be
//! owned by either node; both live in arenas keyed by typed ids and nodes
//! hold list heads into the portal arena. A portal sits in each incident
//! node's singly linked list exactly once, threaded through `next[side]`
//! where `side` is the index of that node in `portal.nodes`.

use crate::contents::ContentFlags;
use crate::errors::CompileError;
use crate::faces::Face;
use crate::geom::{Aabb, Winding};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortalId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl PortalId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
pub struct Node {
    /// Splitting plane id; `None` for leaves.
    pub planenum: Option<usize>,
    pub children: Option<[NodeId; 2]>,
    pub parent: Option<NodeId>,
    pub bounds: Aabb,
    /// Leaf contents, merged from the brushes occupying the leaf.
    pub contents: ContentFlags,
    /// Original map-brush indices occupying this leaf.
    pub original_brushes: Vec<usize>,
    /// Head of this node's portal list.
    pub portals: Option<PortalId>,
    /// Area id assigned by the flood; 0 means unassigned.
    pub area: u32,
    /// An entity origin sits in this leaf.
    pub occupied: bool,
    /// Interior node whose subtree is all detail; treated as one cluster.
    pub detail_separator: bool,
    /// Faces generated from portals on this (interior) node.
    pub faces: Vec<Face>,
}

impl Node {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

#[derive(Debug)]
pub struct Portal {
    /// Always the positive orientation; `nodes[0]` is on its front side.
    pub planenum: usize,
    pub winding: Winding,
    /// Node whose split created this portal; `None` for the head-node box.
    pub onnode: Option<NodeId>,
    pub nodes: [Option<NodeId>; 2],
    pub next: [Option<PortalId>; 2],
    /// Brush side chosen to texture this portal: (brush, side) in the
    /// owning entity.
    pub side: Option<(usize, usize)>,
    pub sidefound: bool,
}

impl Portal {
    pub fn new(planenum: usize, winding: Winding, onnode: Option<NodeId>) -> Self {
        Self {
            planenum,
            winding,
            onnode,
            nodes: [None, None],
            next: [None, None],
            side: None,
            sidefound: false,
        }
    }

    /// Which of `nodes` is `n`, or `None` when the portal does not touch it.
    #[inline]
    pub fn side_of(&self, n: NodeId) -> Option<usize> {
        if self.nodes[0] == Some(n) {
            Some(0)
        } else if self.nodes[1] == Some(n) {
            Some(1)
        } else {
            None
        }
    }

    /// Linked into at least one node list.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.nodes[0].is_some() || self.nodes[1].is_some()
    }
}

#[derive(Debug)]
pub struct Tree {
    pub nodes: Vec<Node>,
    pub portals: Vec<Portal>,
    pub headnode: NodeId,
    /// Sentinel solid leaf on the far side of the head-node box portals.
    pub outside_node: NodeId,
    pub bounds: Aabb,
}

impl Tree {
    /// Tree with a head node and the outside sentinel; both start as leaves.
    pub fn new(bounds: Aabb) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            portals: Vec::new(),
            headnode: NodeId(0),
            outside_node: NodeId(0),
            bounds,
        };
        tree.headnode = tree.alloc_node();
        tree.outside_node = tree.alloc_node();
        tree
    }

    pub fn alloc_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::default());
        id
    }

    pub fn alloc_portal(&mut self, portal: Portal) -> PortalId {
        let id = PortalId(self.portals.len() as u32);
        self.portals.push(portal);
        id
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    #[inline]
    pub fn portal(&self, id: PortalId) -> &Portal {
        &self.portals[id.index()]
    }

    #[inline]
    pub fn portal_mut(&mut self, id: PortalId) -> &mut Portal {
        &mut self.portals[id.index()]
    }

    /// Ids of the portals on `node`, with the side index `node` occupies in
    /// each. Collected up front so callers may mutate while walking.
    pub fn portals_of(&self, node: NodeId) -> Vec<(PortalId, usize)> {
        let mut out = Vec::new();
        let mut cursor = self.node(node).portals;
        while let Some(pid) = cursor {
            let p = self.portal(pid);
            // a portal in this list must reference the node
            let s = p.side_of(node).expect("portal list corrupt");
            out.push((pid, s));
            cursor = p.next[s];
        }
        out
    }

    /// Link `portal` with `front` on its front side and `back` on its back
    /// side, prepending it to both nodes' lists.
    pub fn add_portal_to_nodes(
        &mut self,
        portal: PortalId,
        front: NodeId,
        back: NodeId,
    ) -> Result<(), CompileError> {
        if self.portal(portal).is_linked() {
            return Err(CompileError::PortalAlreadyLinked);
        }

        let front_head = self.node(front).portals;
        let back_head = self.node(back).portals;
        {
            let p = self.portal_mut(portal);
            p.nodes[0] = Some(front);
            p.next[0] = front_head;
            p.nodes[1] = Some(back);
            p.next[1] = back_head;
        }
        self.node_mut(front).portals = Some(portal);
        self.node_mut(back).portals = Some(portal);
        Ok(())
    }

    /// Unlink `portal` from node `l`'s list.
    pub fn remove_portal_from_node(
        &mut self,
        portal: PortalId,
        l: NodeId,
    ) -> Result<(), CompileError> {
        // find the link that points at the portal
        let mut prev: Option<(PortalId, usize)> = None;
        let mut cursor = self.node(l).portals;
        loop {
            let t = cursor.ok_or(CompileError::PortalNotInLeaf)?;
            if t == portal {
                break;
            }
            let p = self.portal(t);
            let s = p.side_of(l).ok_or(CompileError::PortalNotBoundingLeaf)?;
            prev = Some((t, s));
            cursor = p.next[s];
        }

        let s = self
            .portal(portal)
            .side_of(l)
            .ok_or(CompileError::PortalNotBoundingLeaf)?;
        let next = self.portal(portal).next[s];
        match prev {
            None => self.node_mut(l).portals = next,
            Some((pid, ps)) => self.portal_mut(pid).next[ps] = next,
        }
        let p = self.portal_mut(portal);
        p.nodes[s] = None;
        p.next[s] = None;
        Ok(())
    }

    /// Drop every portal under `node`, detaching each from both endpoints
    /// exactly once.
    pub fn free_tree_portals(&mut self, node: NodeId) -> Result<(), CompileError> {
        if let Some(children) = self.node(node).children {
            self.free_tree_portals(children[0])?;
            self.free_tree_portals(children[1])?;
        }
        while let Some(pid) = self.node(node).portals {
            let other = {
                let p = self.portal(pid);
                let s = p.side_of(node).ok_or(CompileError::PortalNotBoundingLeaf)?;
                p.nodes[1 - s]
            };
            self.remove_portal_from_node(pid, node)?;
            if let Some(other) = other {
                self.remove_portal_from_node(pid, other)?;
            }
        }
        Ok(())
    }

    /// Every node in the subtree is portal-free.
    pub fn assert_no_portals(&self, node: NodeId) -> bool {
        if self.node(node).portals.is_some() {
            return false;
        }
        match self.node(node).children {
            Some(children) => {
                self.assert_no_portals(children[0]) && self.assert_no_portals(children[1])
            }
            None => true,
        }
    }

    /// Leaf containing `point`, descending front on non-negative distance.
    pub fn leaf_for_point(
        &self,
        planes: &crate::planes::PlaneRegistry,
        point: &nalgebra::Point3<crate::float_types::Real>,
    ) -> NodeId {
        let mut node = self.headnode;
        while let Some(children) = self.node(node).children {
            let plane = planes.get(self.node(node).planenum.expect("interior node"));
            let side = if plane.distance_to(point) >= 0.0 { 0 } else { 1 };
            node = children[side];
        }
        node
    }

    /// Pre-order ids of every node under the head.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.headnode];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(children) = self.node(id).children {
                stack.push(children[1]);
                stack.push(children[0]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Winding {
        Winding::new(vec![
            nalgebra::Point3::new(0.0, 0.0, 0.0),
            nalgebra::Point3::new(0.0, 1.0, 0.0),
            nalgebra::Point3::new(1.0, 1.0, 0.0),
            nalgebra::Point3::new(1.0, 0.0, 0.0),
        ])
    }

    #[test]
    fn portal_linkage_is_exactly_once_per_side() {
        let mut tree = Tree::new(Aabb::default());
        let a = tree.alloc_node();
        let b = tree.alloc_node();
        let p1 = tree.alloc_portal(Portal::new(0, quad(), None));
        let p2 = tree.alloc_portal(Portal::new(2, quad(), None));
        tree.add_portal_to_nodes(p1, a, b).unwrap();
        tree.add_portal_to_nodes(p2, a, b).unwrap();

        let on_a = tree.portals_of(a);
        let on_b = tree.portals_of(b);
        assert_eq!(on_a.len(), 2);
        assert_eq!(on_b.len(), 2);
        // newest first, with consistent sides
        assert_eq!(on_a[0], (p2, 0));
        assert_eq!(on_a[1], (p1, 0));
        assert_eq!(on_b[0], (p2, 1));
        assert_eq!(on_b[1], (p1, 1));
    }

    #[test]
    fn relinking_a_linked_portal_fails() {
        let mut tree = Tree::new(Aabb::default());
        let a = tree.alloc_node();
        let b = tree.alloc_node();
        let p = tree.alloc_portal(Portal::new(0, quad(), None));
        tree.add_portal_to_nodes(p, a, b).unwrap();
        assert_eq!(
            tree.add_portal_to_nodes(p, a, b),
            Err(CompileError::PortalAlreadyLinked)
        );
    }

    #[test]
    fn remove_relink_cycle() {
        let mut tree = Tree::new(Aabb::default());
        let a = tree.alloc_node();
        let b = tree.alloc_node();
        let c = tree.alloc_node();
        let p = tree.alloc_portal(Portal::new(0, quad(), None));
        tree.add_portal_to_nodes(p, a, b).unwrap();

        tree.remove_portal_from_node(p, a).unwrap();
        tree.remove_portal_from_node(p, b).unwrap();
        assert!(tree.portals_of(a).is_empty());
        assert!(tree.portals_of(b).is_empty());

        tree.add_portal_to_nodes(p, c, b).unwrap();
        assert_eq!(tree.portals_of(c), vec![(p, 0)]);
        assert_eq!(tree.portals_of(b), vec![(p, 1)]);
    }

    #[test]
    fn free_tree_portals_clears_everything() {
        let mut tree = Tree::new(Aabb::default());
        let head = tree.headnode;
        let l0 = tree.alloc_node();
        let l1 = tree.alloc_node();
        tree.node_mut(head).planenum = Some(0);
        tree.node_mut(head).children = Some([l0, l1]);
        let p = tree.alloc_portal(Portal::new(0, quad(), Some(head)));
        tree.add_portal_to_nodes(p, l0, l1).unwrap();

        tree.free_tree_portals(head).unwrap();
        assert!(tree.assert_no_portals(head));
        assert!(!tree.portal(p).is_linked());
    }
}
