//! Content flags and the game descriptor trait that interprets them.
//!
//! The compile phases never hard-code what "solid" or "see-through" means;
//! they ask the [`GameDef`] the caller hands in. [`Quake2Game`] is the
//! shipped interpretation.

use bitflags::bitflags;

bitflags! {
    /// What a brush volume is made of. `empty()` is air.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ContentFlags: u32 {
        const SOLID = 1 << 0;
        const WINDOW = 1 << 1;
        const AUX = 1 << 2;
        const LAVA = 1 << 3;
        const SLIME = 1 << 4;
        const WATER = 1 << 5;
        const MIST = 1 << 6;
        const AREAPORTAL = 1 << 7;
        const SKY = 1 << 8;
        const DETAIL = 1 << 9;
        const TRANSLUCENT = 1 << 10;
    }
}

/// Game-specific contents semantics. One instance is shared, read-only,
/// across every compile phase.
pub trait GameDef: Send + Sync {
    /// Merge rule applied when a cluster (or leaf) combines the contents of
    /// the volumes inside it.
    fn cluster_contents(&self, a: ContentFlags, b: ContentFlags) -> ContentFlags;

    /// May visibility flow through a portal bounded by these two contents?
    fn portal_can_see_through(
        &self,
        c0: ContentFlags,
        c1: ContentFlags,
        transwater: bool,
        transsky: bool,
    ) -> bool;

    /// The strongest content bit visible where `a` meets `b`, or empty when
    /// the boundary has no visible change.
    fn visible_contents(&self, a: ContentFlags, b: ContentFlags) -> ContentFlags;

    /// Does a brush of contents `brush` supply faces for `vis`?
    fn contents_contains(&self, brush: ContentFlags, vis: ContentFlags) -> bool;

    fn create_solid_contents(&self) -> ContentFlags;

    fn is_empty(&self, c: ContentFlags) -> bool;

    fn is_any_solid(&self, c: ContentFlags) -> bool;
}

/// Quake II rules: contents are ored together, visibility is decided by a
/// strict priority ladder, and water/sky transparency is optional.
#[derive(Clone, Copy, Debug, Default)]
pub struct Quake2Game;

/// Priority ladder for `visible_contents`; strongest first.
const VISIBILITY_ORDER: [ContentFlags; 8] = [
    ContentFlags::SOLID,
    ContentFlags::WINDOW,
    ContentFlags::SKY,
    ContentFlags::LAVA,
    ContentFlags::SLIME,
    ContentFlags::WATER,
    ContentFlags::MIST,
    ContentFlags::AREAPORTAL,
];

impl GameDef for Quake2Game {
    fn cluster_contents(&self, a: ContentFlags, b: ContentFlags) -> ContentFlags {
        // a cluster is only detail if every volume inside it is
        let mut merged = a | b;
        if !(a.contains(ContentFlags::DETAIL) && b.contains(ContentFlags::DETAIL)) {
            merged.remove(ContentFlags::DETAIL);
        }
        merged
    }

    fn portal_can_see_through(
        &self,
        c0: ContentFlags,
        c1: ContentFlags,
        transwater: bool,
        transsky: bool,
    ) -> bool {
        let mut blocking = ContentFlags::SOLID
            | ContentFlags::WINDOW
            | ContentFlags::LAVA
            | ContentFlags::AREAPORTAL;
        if !transwater {
            blocking |= ContentFlags::WATER | ContentFlags::SLIME;
        }
        if !transsky {
            blocking |= ContentFlags::SKY;
        }
        !(c0 | c1).intersects(blocking)
    }

    fn visible_contents(&self, a: ContentFlags, b: ContentFlags) -> ContentFlags {
        let diff = a ^ b;
        for bit in VISIBILITY_ORDER {
            if diff.intersects(bit) {
                return bit;
            }
        }
        ContentFlags::empty()
    }

    fn contents_contains(&self, brush: ContentFlags, vis: ContentFlags) -> bool {
        brush.intersects(vis)
    }

    fn create_solid_contents(&self) -> ContentFlags {
        ContentFlags::SOLID
    }

    fn is_empty(&self, c: ContentFlags) -> bool {
        c.is_empty()
    }

    fn is_any_solid(&self, c: ContentFlags) -> bool {
        c.intersects(ContentFlags::SOLID | ContentFlags::WINDOW)
    }
}
