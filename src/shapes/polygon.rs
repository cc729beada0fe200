use crate::math::vec2::Vec2;

/// Represents a convex polygon shape defined by its vertices in local space.
/// Vertices should be ordered counter-clockwise (or clockwise, consistently).
///
/// The local vertex list is only ever changed as a whole (uniform scale or
/// translation), so the bounding radius and edge normals are kept precomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vec2>,
    normals: Vec<Vec2>,
    bounding_radius: f64,
}

impl Polygon {
    /// Creates a new polygon from a vector of vertices.
    ///
    /// Returns `None` for an empty list or a list holding non-finite points.
    pub fn new(vertices: Vec<Vec2>) -> Option<Self> {
        if vertices.is_empty() || !vertices.iter().all(|v| v.is_finite()) {
            return None;
        }
        let mut polygon = Polygon {
            vertices,
            normals: Vec::new(),
            bounding_radius: 0.0,
        };
        polygon.recompute();
        Some(polygon)
    }

    /// Axis-aligned rectangle of the given size centered on the local origin.
    pub fn rectangle(width: f64, height: f64) -> Option<Self> {
        let hw = width / 2.0;
        let hh = height / 2.0;
        Self::new(vec![
            Vec2::new(-hw, -hh),
            Vec2::new(hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
        ])
    }

    /// Vertices in local space.
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Unit normal of every edge in local space, one per vertex.
    pub fn edge_normals(&self) -> &[Vec2] {
        &self.normals
    }

    /// Largest distance from the local origin to any vertex.
    pub fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    /// Uniformly scales about the local origin. A non-positive factor is ignored.
    pub fn scale(&mut self, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        for v in &mut self.vertices {
            *v = *v * factor;
        }
        self.recompute();
    }

    pub fn translate(&mut self, offset: Vec2) {
        for v in &mut self.vertices {
            *v += offset;
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        self.bounding_radius = self
            .vertices
            .iter()
            .map(|v| v.magnitude())
            .fold(0.0, f64::max);

        let n = self.vertices.len();
        self.normals.clear();
        for i in 0..n {
            let v1 = self.vertices[i];
            let v2 = self.vertices[(i + 1) % n];
            let edge = v1 - v2;
            self.normals.push(edge.perpendicular().normalize());
        }
    }
}
