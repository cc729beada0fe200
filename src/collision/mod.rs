pub mod aabb;
pub mod detection;
pub mod manifold;
pub mod projection;
pub mod quad_tree;

// Re-export key types
pub use aabb::AABB;
pub use detection::{resolve_impulse, CollisionDetector};
pub use manifold::Manifold;
pub use projection::Projection;
pub use quad_tree::QuadTree;
