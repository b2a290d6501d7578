use crate::float_types::Real;
use nalgebra::{Point3, Vector3};

/// Axis-aligned bounding box. A default box is *empty*: mins above maxs,
/// so that accumulating any point produces a valid box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub mins: Point3<Real>,
    pub maxs: Point3<Real>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            mins: Point3::new(Real::MAX, Real::MAX, Real::MAX),
            maxs: Point3::new(-Real::MAX, -Real::MAX, -Real::MAX),
        }
    }
}

impl Aabb {
    #[inline]
    pub const fn new(mins: Point3<Real>, maxs: Point3<Real>) -> Self {
        Self { mins, maxs }
    }

    /// Smallest box containing both points, in either order.
    pub fn from_points(a: Point3<Real>, b: Point3<Real>) -> Self {
        let mut bb = Self::default();
        bb.add_point(a);
        bb.add_point(b);
        bb
    }

    /// True when mins does not exceed maxs on any axis.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.mins[i] <= self.maxs[i])
    }

    #[inline]
    pub fn add_point(&mut self, p: Point3<Real>) {
        for i in 0..3 {
            if p[i] < self.mins[i] {
                self.mins[i] = p[i];
            }
            if p[i] > self.maxs[i] {
                self.maxs[i] = p[i];
            }
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut bb = *self;
        bb.add_point(other.mins);
        bb.add_point(other.maxs);
        bb
    }

    /// Box expanded by `d` on every axis in both directions.
    #[inline]
    pub fn grow(&self, d: Real) -> Self {
        self.grow_by(Vector3::new(d, d, d))
    }

    #[inline]
    pub fn grow_by(&self, d: Vector3<Real>) -> Self {
        Self {
            mins: self.mins - d,
            maxs: self.maxs + d,
        }
    }

    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.maxs.x >= other.mins.x
            && self.mins.x <= other.maxs.x
            && self.maxs.y >= other.mins.y
            && self.mins.y <= other.maxs.y
            && self.maxs.z >= other.mins.z
            && self.mins.z <= other.maxs.z
    }

    #[inline]
    pub fn disjoint(&self, other: &Self, eps: Real) -> bool {
        (0..3).any(|i| {
            self.maxs[i] < other.mins[i] - eps || self.mins[i] > other.maxs[i] + eps
        })
    }

    #[inline]
    pub fn contains_point(&self, p: &Point3<Real>) -> bool {
        (0..3).all(|i| p[i] >= self.mins[i] && p[i] <= self.maxs[i])
    }

    #[inline]
    pub fn center(&self) -> Point3<Real> {
        Point3::new(
            (self.mins.x + self.maxs.x) / 2.0,
            (self.mins.y + self.maxs.y) / 2.0,
            (self.mins.z + self.maxs.z) / 2.0,
        )
    }

    /// Corner accessor in the `[mins, maxs]` order the box-portal loop uses.
    #[inline]
    pub fn corner(&self, j: usize) -> Point3<Real> {
        if j == 0 {
            self.mins
        } else {
            self.maxs
        }
    }
}
