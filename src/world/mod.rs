pub mod collision_pool;

pub use collision_pool::{CollisionPool, FrameStats};
