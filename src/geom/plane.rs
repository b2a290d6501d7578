use crate::float_types::{DIST_EPSILON, NORMAL_EPSILON, Real};
use nalgebra::{Point3, Vector3};
use std::ops::Neg;

/// Oriented half-space boundary: unit `normal` and signed `dist`, so a point
/// `p` is on the plane when `normal · p == dist`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vector3<Real>,
    pub dist: Real,
}

impl Plane {
    pub const fn new(normal: Vector3<Real>, dist: Real) -> Self {
        Self { normal, dist }
    }

    /// Plane through three points, wound so the normal follows the
    /// clockwise-from-front convention of the windings built on it.
    pub fn from_points(
        a: Point3<Real>,
        b: Point3<Real>,
        c: Point3<Real>,
    ) -> Option<Self> {
        let normal = (c - a).cross(&(b - a));
        let len = normal.norm();
        if len < 1e-10 {
            return None;
        }
        let normal = normal / len;
        Some(Self {
            dist: normal.dot(&a.coords),
            normal,
        })
    }

    /// Signed distance from `p` to the plane; positive in front.
    #[inline]
    pub fn distance_to(&self, p: &Point3<Real>) -> Real {
        self.normal.dot(&p.coords) - self.dist
    }

    /// Axis index of the normal's largest-magnitude component.
    pub fn dominant_axis(&self) -> usize {
        let mut axis = 0;
        let mut best = self.normal[0].abs();
        for i in 1..3 {
            if self.normal[i].abs() > best {
                best = self.normal[i].abs();
                axis = i;
            }
        }
        axis
    }

    /// The canonical form stored at even registry ids: the dominant-axis
    /// component of the normal is non-negative.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.normal[self.dominant_axis()] >= 0.0
    }

    pub fn epsilon_equal(&self, other: &Self) -> bool {
        (self.normal - other.normal).abs().max() <= NORMAL_EPSILON
            && (self.dist - other.dist).abs() <= DIST_EPSILON
    }
}

impl Neg for Plane {
    type Output = Plane;

    fn neg(self) -> Plane {
        Plane {
            normal: -self.normal,
            dist: -self.dist,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_sign_follows_normal() {
        let p = Plane::new(Vector3::z(), 4.0);
        assert!(p.distance_to(&Point3::new(0.0, 0.0, 10.0)) > 0.0);
        assert!(p.distance_to(&Point3::new(0.0, 0.0, -10.0)) < 0.0);
        assert_eq!(p.distance_to(&Point3::new(7.0, -3.0, 4.0)), 0.0);
    }

    #[test]
    fn negation_flips_both_fields() {
        let p = Plane::new(Vector3::new(0.0, 1.0, 0.0), 16.0);
        let n = -p;
        assert_eq!(n.normal, -p.normal);
        assert_eq!(n.dist, -p.dist);
        assert!(p.is_positive());
        assert!(!n.is_positive());
    }

    #[test]
    fn from_points_winds_clockwise_from_front() {
        // clockwise when viewed from +z
        let p = Plane::from_points(
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(0.0, 1.0, 5.0),
            Point3::new(1.0, 0.0, 5.0),
        )
        .unwrap();
        assert!((p.normal - Vector3::z()).norm() < 1e-9);
        assert!((p.dist - 5.0).abs() < 1e-9);
    }

    #[test]
    fn epsilon_equal_tolerates_noise() {
        let a = Plane::new(Vector3::x(), 8.0);
        let b = Plane::new(Vector3::new(1.0, 1e-6, 0.0), 8.0 + 1e-6);
        assert!(a.epsilon_equal(&b));
        assert!(!a.epsilon_equal(&-b));
    }
}
