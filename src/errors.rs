/// Fatal, structural compile failures. Numeric degeneracies (tiny windings,
/// zero-area triangles) are not errors; they are dropped locally and counted
/// by the phase that saw them.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
pub enum CompileError {
    /// A portal was linked into a node list while already linked.
    #[error("portal already included in a node portal list")]
    PortalAlreadyLinked,
    /// A portal was not found in the list of a node it claims to bound.
    #[error("portal not in leaf")]
    PortalNotInLeaf,
    /// A portal in a node's list does not reference that node on either side.
    #[error("portal not bounding leaf")]
    PortalNotBoundingLeaf,
    /// A portal on a node references neither of the node's sides.
    #[error("mislinked portal while cutting node {node}")]
    MislinkedPortal { node: usize },
    /// The entity flood touched a portal whose endpoints are not leaves.
    #[error("entity flood crossed a portal bounded by a non-leaf node")]
    FloodNotLeaf,
    /// Brush geometry that cannot form a bounded convex volume.
    #[error("malformed brush {brush} in entity {entity}: {reason}")]
    MalformedBrush {
        entity: usize,
        brush: usize,
        reason: String,
    },
}
