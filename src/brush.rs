//! Convex brushes: intersections of half-spaces with per-side windings.

use crate::contents::ContentFlags;
use crate::errors::CompileError;
use crate::float_types::Real;
use crate::geom::{Aabb, Plane, Winding};
use crate::planes::PlaneRegistry;

/// Texture slot meaning "no texture; created by a node split".
pub const TEXINFO_NODE: i32 = -1;

/// One bounding half-space of a brush. The plane points out of the brush,
/// so the brush interior is the intersection of the sides' back half-spaces.
#[derive(Clone, Debug)]
pub struct Side {
    pub planenum: usize,
    pub texinfo: i32,
    pub contents: ContentFlags,
    pub lmshift: u8,
    pub winding: Option<Winding>,
    /// Set by mark_visible_sides when a portal borrows this side.
    pub visible: bool,
    /// Scratch flag for split selection.
    pub tested: bool,
    /// This side's plane has been used as a node splitter above here.
    pub onnode: bool,
    /// Bevel sides exist for collision only; they never split or texture.
    pub bevel: bool,
}

impl Side {
    pub fn new(planenum: usize, texinfo: i32, contents: ContentFlags) -> Self {
        Self {
            planenum,
            texinfo,
            contents,
            lmshift: 4,
            winding: None,
            visible: false,
            tested: false,
            onnode: false,
            bevel: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Brush {
    pub sides: Vec<Side>,
    pub bounds: Aabb,
    pub contents: ContentFlags,
    /// Index of the original map brush this working brush derives from.
    pub original: usize,
    /// Entity index of the `func_areaportal` this brush belongs to, if any.
    pub func_areaportal: Option<usize>,
}

impl Brush {
    pub fn new(sides: Vec<Side>, contents: ContentFlags) -> Self {
        Self {
            sides,
            bounds: Aabb::default(),
            contents,
            original: 0,
            func_areaportal: None,
        }
    }

    /// Winding for side `i`: the side plane cut down by every other side.
    fn winding_for_side(&self, planes: &PlaneRegistry, i: usize, extent: Real) -> Option<Winding> {
        let plane = *planes.get(self.sides[i].planenum);
        let mut w = Some(Winding::base_for_plane(&plane, extent));
        for (j, side) in self.sides.iter().enumerate() {
            if j == i || side.bevel {
                continue;
            }
            // the brush interior is behind every side
            let clip = -*planes.get(side.planenum);
            w = match w {
                Some(w) => w.clip(&clip, 0.0, false).0,
                None => break,
            };
        }
        w
    }

    /// Build the side windings and bounds. Fails when the half-space
    /// intersection is empty, unbounded, or leaves a non-bevel side without
    /// a usable winding.
    pub fn create_windings(
        &mut self,
        planes: &PlaneRegistry,
        extent: Real,
        entity: usize,
    ) -> Result<(), CompileError> {
        let mut bounds = Aabb::default();
        for i in 0..self.sides.len() {
            if self.sides[i].bevel {
                self.sides[i].winding = None;
                continue;
            }
            let w = match self.winding_for_side(planes, i, extent) {
                Some(w) if !w.is_tiny() => w,
                _ => {
                    return Err(CompileError::MalformedBrush {
                        entity,
                        brush: self.original,
                        reason: format!("side {i} has no usable winding"),
                    });
                }
            };
            for p in &w.points {
                bounds.add_point(*p);
            }
            self.sides[i].winding = Some(w);
        }
        if !bounds.is_valid() {
            return Err(CompileError::MalformedBrush {
                entity,
                brush: self.original,
                reason: "empty volume".into(),
            });
        }
        for i in 0..3 {
            if bounds.mins[i] <= -extent || bounds.maxs[i] >= extent {
                return Err(CompileError::MalformedBrush {
                    entity,
                    brush: self.original,
                    reason: "unbounded volume".into(),
                });
            }
        }
        self.bounds = bounds;
        Ok(())
    }

    /// Volume as a sum of pyramids from one corner to every side.
    /// Zero for degenerate brushes.
    pub fn volume(&self, planes: &PlaneRegistry) -> Real {
        let Some(corner) = self
            .sides
            .iter()
            .find_map(|s| s.winding.as_ref().map(|w| w.points[0]))
        else {
            return 0.0;
        };
        let mut volume = 0.0;
        for side in &self.sides {
            let Some(w) = side.winding.as_ref() else { continue };
            let plane = planes.get(side.planenum);
            let d = -plane.distance_to(&corner);
            volume += d * w.area() / 3.0;
        }
        volume
    }
}

/// Axial solid brush exactly filling `bounds`.
pub fn brush_from_bounds(
    planes: &mut PlaneRegistry,
    bounds: &Aabb,
    contents: ContentFlags,
    extent: Real,
) -> Result<Brush, CompileError> {
    let mut sides = Vec::with_capacity(6);
    for axis in 0..3 {
        let mut normal = nalgebra::Vector3::zeros();
        normal[axis] = 1.0;
        sides.push(Side::new(
            planes.add_or_find(Plane::new(normal, bounds.maxs[axis])),
            TEXINFO_NODE,
            contents,
        ));
        sides.push(Side::new(
            planes.add_or_find(Plane::new(-normal, -bounds.mins[axis])),
            TEXINFO_NODE,
            contents,
        ));
    }
    let mut brush = Brush::new(sides, contents);
    brush.create_windings(planes, extent, 0)?;
    Ok(brush)
}

/// Which side(s) of the plane the brush has geometry on.
pub fn brush_side_of_plane(
    brush: &Brush,
    planes: &PlaneRegistry,
    planenum: usize,
    eps: Real,
) -> (bool, bool) {
    // a brush with a face on this plane sits entirely on one side of it
    for side in &brush.sides {
        if side.planenum >> 1 == planenum >> 1 {
            return if side.planenum & 1 == planenum & 1 {
                // side normal matches: the brush is behind the plane
                (false, true)
            } else {
                (true, false)
            };
        }
    }
    let plane = planes.get(planenum);
    let mut front = false;
    let mut back = false;
    for side in &brush.sides {
        let Some(w) = side.winding.as_ref() else { continue };
        for p in &w.points {
            let d = plane.distance_to(p);
            if d > eps {
                front = true;
            } else if d < -eps {
                back = true;
            }
            if front && back {
                return (true, true);
            }
        }
    }
    (front, back)
}

/// Split `brush` by the plane `planenum`, returning the front and back
/// halves. A half is `None` when the brush does not reach that side. Each
/// produced half gains a `TEXINFO_NODE` side on the split plane so it stays
/// a closed volume.
pub fn split_brush(
    brush: &Brush,
    planes: &PlaneRegistry,
    planenum: usize,
    extent: Real,
) -> (Option<Brush>, Option<Brush>) {
    let plane = *planes.get(planenum);

    // the part of the split plane inside the brush
    let mut mid = Some(Winding::base_for_plane(&plane, extent));
    for side in &brush.sides {
        if side.bevel {
            continue;
        }
        let clip = -*planes.get(side.planenum);
        mid = match mid {
            Some(w) => w.clip(&clip, 0.0, false).0,
            None => break,
        };
    }

    let mid = match mid {
        Some(w) if !w.is_tiny() => w,
        _ => {
            // not really split; the whole brush is on one side
            let (front, back) = brush_side_of_plane(brush, planes, planenum, 0.1);
            return if front && !back {
                (Some(brush.clone()), None)
            } else if back && !front {
                (None, Some(brush.clone()))
            } else {
                // straddles only within epsilon; put it behind
                (None, Some(brush.clone()))
            };
        }
    };

    let mut halves: [Brush; 2] = [
        Brush {
            sides: Vec::with_capacity(brush.sides.len() + 1),
            bounds: Aabb::default(),
            contents: brush.contents,
            original: brush.original,
            func_areaportal: brush.func_areaportal,
        },
        Brush {
            sides: Vec::with_capacity(brush.sides.len() + 1),
            bounds: Aabb::default(),
            contents: brush.contents,
            original: brush.original,
            func_areaportal: brush.func_areaportal,
        },
    ];

    for side in &brush.sides {
        let Some(w) = side.winding.as_ref() else {
            // carry bevels to both halves untouched
            halves[0].sides.push(side.clone());
            halves[1].sides.push(side.clone());
            continue;
        };
        let (front, back) = w.clip(&plane, 0.0, false);
        for (half, piece) in halves.iter_mut().zip([front, back]) {
            if let Some(piece) = piece {
                if !piece.is_tiny() {
                    let mut s = side.clone();
                    for p in &piece.points {
                        half.bounds.add_point(*p);
                    }
                    s.winding = Some(piece);
                    half.sides.push(s);
                }
            }
        }
    }

    // close each half with a cap on the split plane, facing outward:
    // the front half's interior is in front, so its cap is the negated plane
    let mut front_cap = Side::new(planenum ^ 1, TEXINFO_NODE, brush.contents);
    front_cap.onnode = true;
    front_cap.winding = Some(mid.reversed());
    let mut back_cap = Side::new(planenum, TEXINFO_NODE, brush.contents);
    back_cap.onnode = true;
    back_cap.winding = Some(mid.clone());

    for p in &mid.points {
        halves[0].bounds.add_point(*p);
        halves[1].bounds.add_point(*p);
    }
    halves[0].sides.push(front_cap);
    halves[1].sides.push(back_cap);

    let [front_half, back_half] = halves;
    let keep = |half: Brush| -> Option<Brush> {
        // a real volume needs at least four bounding sides
        (half.sides.iter().filter(|s| s.winding.is_some()).count() >= 4).then_some(half)
    };
    (keep(front_half), keep(back_half))
}
