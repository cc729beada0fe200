pub mod collidable;

pub use collidable::{BodyKey, Collidable, CollidableBuilder, CollisionCallback, CollisionEvent};
