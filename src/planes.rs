//! Deduplicated plane registry.
//!
//! Planes are stored in positive/negative pairs: the canonical positive
//! orientation (dominant-axis component of the normal non-negative) at an
//! even id, its negation at the next odd id. Flipping a plane is `id ^ 1`
//! and `id >> 1` identifies the unoriented plane, so portal and face code
//! can carry compact `(planenum, planeside)` pairs whose references stay
//! stable across the whole pipeline.

use crate::geom::Plane;

#[derive(Debug, Default)]
pub struct PlaneRegistry {
    planes: Vec<Plane>,
}

impl PlaneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    #[inline]
    pub fn get(&self, id: usize) -> &Plane {
        &self.planes[id]
    }

    /// Append both orientations of `plane`; returns the id whose stored
    /// plane matches the input orientation.
    pub fn add(&mut self, plane: Plane) -> usize {
        if plane.is_positive() {
            self.planes.push(plane);
            self.planes.push(-plane);
            self.planes.len() - 2
        } else {
            self.planes.push(-plane);
            self.planes.push(plane);
            self.planes.len() - 1
        }
    }

    /// Id of a stored plane epsilon-equal to `plane`, in its orientation.
    pub fn find(&self, plane: &Plane) -> Option<usize> {
        self.planes.iter().position(|p| p.epsilon_equal(plane))
    }

    pub fn add_or_find(&mut self, plane: Plane) -> usize {
        match self.find(&plane) {
            Some(id) => id,
            None => self.add(plane),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::float_types::Real;
    use nalgebra::Vector3;

    #[test]
    fn pairs_are_negations() {
        let mut reg = PlaneRegistry::new();
        reg.add(Plane::new(Vector3::x(), 16.0));
        reg.add(Plane::new(-Vector3::y(), 8.0));
        for id in (0..reg.len()).step_by(2) {
            let p = reg.get(id);
            let n = reg.get(id ^ 1);
            assert_eq!(p.normal, -n.normal);
            assert_eq!(p.dist, -n.dist);
            assert!(p.is_positive());
        }
    }

    #[test]
    fn add_returns_input_orientation() {
        let mut reg = PlaneRegistry::new();
        let pos = Plane::new(Vector3::z(), 32.0);
        let id = reg.add(pos);
        assert_eq!(id % 2, 0);
        assert_eq!(reg.get(id).normal, pos.normal);

        let negative = Plane::new(-Vector3::z(), 4.0);
        let id = reg.add(negative);
        assert_eq!(id % 2, 1);
        assert_eq!(reg.get(id).normal, negative.normal);
        assert_eq!(reg.get(id ^ 1).normal, -negative.normal);
    }

    #[test]
    fn find_matches_within_epsilon() {
        let mut reg = PlaneRegistry::new();
        let id = reg.add(Plane::new(Vector3::x(), 64.0));
        let noisy = Plane::new(Vector3::new(1.0, 5e-5, 0.0), 64.0 + 5e-5);
        assert_eq!(reg.find(&noisy), Some(id));
        assert_eq!(reg.find(&-noisy), Some(id ^ 1));
        assert_eq!(reg.add_or_find(noisy), id);

        let other = Plane::new(Vector3::x(), 65.0 as Real);
        assert_eq!(reg.find(&other), None);
    }
}
