pub mod circle;
pub mod polygon;

// Re-export the specific shape types
pub use circle::Circle;
pub use polygon::Polygon;

use crate::collision::aabb::AABB;
use crate::collision::projection::Projection;
use crate::math::{Transform, Vec2};

/// The geometric kind of a collision shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Geometry {
    /// Neither radius nor vertices. Never takes part in detection.
    #[default]
    Invalid,
    Circle(Circle),
    Polygon(Polygon),
}

/// World-space vertices and axes of a polygon, valid for one transform.
#[derive(Debug, Clone, Default)]
struct WorldCache {
    key: Option<Transform>,
    vertices: Vec<Vec2>,
    axes: Vec<Vec2>,
}

/// Collision geometry of a body placed in the world.
///
/// Polygon world vertices are computed lazily and kept until the transform
/// changes, so repeated queries within a frame cost nothing.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    geometry: Geometry,
    transform: Transform,
    cache: WorldCache,
}

impl Shape {
    /// A circle of the given radius. A non-positive radius yields an invalid shape.
    pub fn circle(radius: f64) -> Self {
        Circle::new(radius)
            .map(Geometry::Circle)
            .map(Self::from_geometry)
            .unwrap_or_default()
    }

    /// A convex polygon from local vertices. An empty list yields an invalid shape.
    pub fn polygon(vertices: Vec<Vec2>) -> Self {
        Polygon::new(vertices)
            .map(Geometry::Polygon)
            .map(Self::from_geometry)
            .unwrap_or_default()
    }

    /// Axis-aligned rectangle centered on the body origin.
    pub fn rectangle(width: f64, height: f64) -> Self {
        Polygon::rectangle(width, height)
            .map(Geometry::Polygon)
            .map(Self::from_geometry)
            .unwrap_or_default()
    }

    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn from_geometry(geometry: Geometry) -> Self {
        Self {
            geometry,
            transform: Transform::identity(),
            cache: WorldCache::default(),
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn is_circle(&self) -> bool {
        matches!(self.geometry, Geometry::Circle(_))
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.geometry, Geometry::Invalid)
    }

    /// Circle radius, or the circumscribing radius of a polygon. Zero when invalid.
    pub fn radius(&self) -> f64 {
        match &self.geometry {
            Geometry::Invalid => 0.0,
            Geometry::Circle(c) => c.radius,
            Geometry::Polygon(p) => p.bounding_radius(),
        }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    pub fn rotation(&self) -> f64 {
        self.transform.rotation
    }

    pub fn set_transform(&mut self, position: Vec2, rotation: f64) {
        self.transform = Transform::new(position, rotation);
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.transform.position = position;
    }

    pub fn set_rotation(&mut self, rotation: f64) {
        self.transform.rotation = rotation;
    }

    /// Uniformly scales the local geometry about the body origin.
    pub fn scale(&mut self, factor: f64) {
        match &mut self.geometry {
            Geometry::Invalid => {}
            Geometry::Circle(c) => c.scale(factor),
            Geometry::Polygon(p) => {
                p.scale(factor);
                self.cache.key = None;
            }
        }
    }

    /// Shifts every local vertex of a polygon. Circles are unaffected.
    pub fn translate(&mut self, offset: Vec2) {
        if let Geometry::Polygon(p) = &mut self.geometry {
            p.translate(offset);
            self.cache.key = None;
        }
    }

    fn refresh_cache(&mut self) {
        let Geometry::Polygon(polygon) = &self.geometry else {
            return;
        };
        if self.cache.key == Some(self.transform) {
            return;
        }

        let transform = self.transform;
        self.cache.vertices.clear();
        self.cache
            .vertices
            .extend(polygon.vertices().iter().map(|v| transform.apply(*v)));
        self.cache.axes.clear();
        self.cache.axes.extend(
            polygon
                .edge_normals()
                .iter()
                .map(|n| n.rotate(transform.rotation)),
        );
        self.cache.key = Some(transform);
    }

    /// World-space vertices. Empty for circles and invalid shapes.
    pub fn vertices(&mut self) -> &[Vec2] {
        self.refresh_cache();
        match self.geometry {
            Geometry::Polygon(_) => self.cache.vertices.as_slice(),
            _ => &[],
        }
    }

    /// Unit world-space edge normals used as separating axes. Empty unless a polygon.
    pub fn axes(&mut self) -> &[Vec2] {
        self.refresh_cache();
        match self.geometry {
            Geometry::Polygon(_) => self.cache.axes.as_slice(),
            _ => &[],
        }
    }

    /// Smallest axis-aligned rectangle covering the shape in world space.
    pub fn bounding_rect(&mut self) -> Option<AABB> {
        match self.geometry {
            Geometry::Invalid => None,
            Geometry::Circle(c) => Some(AABB::around_circle(self.transform.position, c.radius)),
            Geometry::Polygon(_) => AABB::from_points(self.vertices()),
        }
    }

    /// Farthest point of the shape along `direction`.
    pub fn support_point(&mut self, direction: Vec2) -> Option<Vec2> {
        match self.geometry {
            Geometry::Invalid => None,
            Geometry::Circle(c) => {
                Some(self.transform.position + direction.normalize() * c.radius)
            }
            Geometry::Polygon(_) => self.vertices().iter().copied().max_by(|a, b| {
                a.dot(direction).total_cmp(&b.dot(direction))
            }),
        }
    }

    /// Interval covered by the shape on a unit axis.
    pub fn project(&mut self, axis: Vec2) -> Option<Projection> {
        match self.geometry {
            Geometry::Invalid => None,
            Geometry::Circle(c) => {
                let center = axis.dot(self.transform.position);
                Some(Projection::new(center - c.radius, center + c.radius))
            }
            Geometry::Polygon(_) => Projection::of_points(self.vertices(), axis),
        }
    }
}
