use crate::math::vec2::Vec2;

/// Stores information about a collision between two bodies.
///
/// Only lives for the duration of one pairwise test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Manifold {
    /// The collision normal, pointing from body A towards body B.
    pub normal: Vec2,
    /// The amount of penetration between the shapes.
    pub penetration: f64,
}

impl Manifold {
    pub fn new(normal: Vec2, penetration: f64) -> Self {
        Self {
            normal,
            penetration,
        }
    }

    /// Minimum translation vector separating the shapes.
    pub fn mtv(&self) -> Vec2 {
        self.normal * self.penetration
    }

    /// The same contact seen from body B.
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            penetration: self.penetration,
        }
    }
}
