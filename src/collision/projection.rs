//! One-dimensional intervals for the separating axis test.

use crate::math::vec2::Vec2;

/// A shape projected onto an axis, reduced to its `[min, max]` extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Minimum projected value.
    pub min: f64,
    /// Maximum projected value.
    pub max: f64,
}

impl Projection {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Project a set of points on an axis.
    ///
    /// Returns `None` for an empty point set.
    pub fn of_points(points: &[Vec2], axis: Vec2) -> Option<Self> {
        let (first, rest) = points.split_first()?;

        // Start with the first so we don't have to deal with infinities
        let mut min = axis.dot(*first);
        let mut max = min;
        for point in rest {
            let proj = axis.dot(*point);
            min = min.min(proj);
            max = max.max(proj);
        }

        Some(Self { min, max })
    }

    /// Check if this overlaps another interval. Touching intervals overlap.
    pub fn overlaps(&self, other: Self) -> bool {
        !(other.max < self.min || self.max < other.min)
    }

    /// Length of the shared part of both intervals, zero when separated.
    pub fn overlap(&self, other: Self) -> f64 {
        (self.max.min(other.max) - self.min.max(other.min)).max(0.0)
    }
}
