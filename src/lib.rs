pub mod collision;
pub mod common;
pub mod config;
pub mod integration;
pub mod math;
pub mod objects;
pub mod shapes;
pub mod world;

// Re-export key types for easier use
pub use collision::{CollisionDetector, Manifold, Projection, QuadTree, AABB};
pub use common::Material;
pub use config::{BroadPhase, CollisionConfig, ConfigError, OffsetRounding};
pub use math::{Transform, Vec2};
pub use objects::{BodyKey, Collidable, CollidableBuilder, CollisionEvent};
pub use shapes::{Circle, Geometry, Polygon, Shape};
pub use world::{CollisionPool, FrameStats};
