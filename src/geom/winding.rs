use crate::float_types::{Real, TINY_EDGE_LENGTH};
use crate::geom::{Aabb, Plane};
use nalgebra::{Point3, Vector3};

const SIDE_FRONT: usize = 0;
const SIDE_BACK: usize = 1;
const SIDE_ON: usize = 2;

/// Convex polygon lying on one plane, wound clockwise when viewed from the
/// plane's front side.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Winding {
    pub points: Vec<Point3<Real>>,
}

impl Winding {
    pub fn new(points: Vec<Point3<Real>>) -> Self {
        Self { points }
    }

    /// Large quad covering `plane` out to `extent` on each tangent axis.
    /// Every winding in the compiler starts life as one of these, cut down
    /// by successive clips.
    pub fn base_for_plane(plane: &Plane, extent: Real) -> Self {
        let axis = plane.dominant_axis();

        let mut vup: Vector3<Real> = if axis == 2 {
            Vector3::x()
        } else {
            Vector3::z()
        };
        let v = vup.dot(&plane.normal);
        vup -= plane.normal * v;
        vup.normalize_mut();

        let org = Point3::from(plane.normal * plane.dist);
        let vright = vup.cross(&plane.normal);

        let vup = vup * extent;
        let vright = vright * extent;

        Self {
            points: vec![
                org - vright + vup,
                org + vright + vup,
                org + vright - vup,
                org - vright - vup,
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Split against `plane`, returning `(front, back)`. Points within `eps`
    /// of the plane go to both halves. A winding entirely on the plane goes
    /// to the front when `keep_on` is set and vanishes otherwise.
    pub fn clip(
        &self,
        plane: &Plane,
        eps: Real,
        keep_on: bool,
    ) -> (Option<Winding>, Option<Winding>) {
        let n = self.points.len();
        let mut dists = Vec::with_capacity(n + 1);
        let mut sides = Vec::with_capacity(n + 1);
        let mut counts = [0usize; 3];

        for p in &self.points {
            let d = plane.distance_to(p);
            let side = if d > eps {
                SIDE_FRONT
            } else if d < -eps {
                SIDE_BACK
            } else {
                SIDE_ON
            };
            counts[side] += 1;
            dists.push(d);
            sides.push(side);
        }
        dists.push(dists[0]);
        sides.push(sides[0]);

        if counts[SIDE_FRONT] == 0 && counts[SIDE_BACK] == 0 {
            return if keep_on {
                (Some(self.clone()), None)
            } else {
                (None, None)
            };
        }
        if counts[SIDE_BACK] == 0 {
            return (Some(self.clone()), None);
        }
        if counts[SIDE_FRONT] == 0 {
            return (None, Some(self.clone()));
        }

        let mut front = Vec::with_capacity(n + 4);
        let mut back = Vec::with_capacity(n + 4);

        for i in 0..n {
            let p1 = self.points[i];

            match sides[i] {
                SIDE_ON => {
                    front.push(p1);
                    back.push(p1);
                    continue;
                }
                SIDE_FRONT => front.push(p1),
                _ => back.push(p1),
            }

            if sides[i + 1] == SIDE_ON || sides[i + 1] == sides[i] {
                continue;
            }

            // generate a split point
            let p2 = self.points[(i + 1) % n];
            let dot = dists[i] / (dists[i] - dists[i + 1]);
            let mut mid = Point3::origin();
            for j in 0..3 {
                // axial planes are exact
                if plane.normal[j] == 1.0 {
                    mid[j] = plane.dist;
                } else if plane.normal[j] == -1.0 {
                    mid[j] = -plane.dist;
                } else {
                    mid[j] = p1[j] + dot * (p2[j] - p1[j]);
                }
            }
            front.push(mid);
            back.push(mid);
        }

        let front = (front.len() >= 3).then(|| Winding::new(front));
        let back = (back.len() >= 3).then(|| Winding::new(back));
        (front, back)
    }

    /// Fewer than three edges of usable length. Tiny windings are dropped
    /// wherever clipping produces them.
    pub fn is_tiny(&self) -> bool {
        let n = self.points.len();
        let mut edges = 0;
        for i in 0..n {
            let len = (self.points[(i + 1) % n] - self.points[i]).norm();
            if len > TINY_EDGE_LENGTH {
                edges += 1;
                if edges == 3 {
                    return false;
                }
            }
        }
        true
    }

    pub fn area(&self) -> Real {
        let mut total = 0.0;
        for i in 2..self.points.len() {
            let d1 = self.points[i - 1] - self.points[0];
            let d2 = self.points[i] - self.points[0];
            total += d1.cross(&d2).norm() * 0.5;
        }
        total
    }

    pub fn center(&self) -> Point3<Real> {
        let mut sum = Vector3::zeros();
        for p in &self.points {
            sum += p.coords;
        }
        Point3::from(sum / self.points.len() as Real)
    }

    pub fn bounds(&self) -> Aabb {
        let mut bb = Aabb::default();
        for p in &self.points {
            bb.add_point(*p);
        }
        bb
    }

    /// Plane the winding lies on, per the winding's orientation convention.
    pub fn plane(&self) -> Option<Plane> {
        if self.points.len() < 3 {
            return None;
        }
        Plane::from_points(self.points[0], self.points[1], self.points[2])
    }

    /// Same polygon facing the other way.
    pub fn reversed(&self) -> Self {
        Self {
            points: self.points.iter().rev().copied().collect(),
        }
    }

    /// Greatest distance of any point from `plane`.
    pub fn max_distance_from(&self, plane: &Plane) -> Real {
        self.points
            .iter()
            .map(|p| plane.distance_to(p).abs())
            .fold(0.0, Real::max)
    }
}
