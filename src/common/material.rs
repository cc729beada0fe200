//! Defines physical material properties.

use log::warn;

/// Represents the physical properties of a body affecting collisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Coefficient of restitution (bounciness). Range [0, 1].
    /// 0 = perfectly inelastic (no bounce), 1 = perfectly elastic.
    pub restitution: f64,
    /// Fraction of velocity lost every frame. Range [0, 1].
    pub friction: f64,
}

impl Material {
    /// Creates a new material with the given restitution and friction.
    pub fn new(restitution: f64, friction: f64) -> Self {
        Material {
            restitution: clamp_unit("restitution", restitution),
            friction: clamp_unit("friction", friction),
        }
    }
}

impl Default for Material {
    /// Half-elastic bounce, no damping.
    fn default() -> Self {
        Material {
            restitution: 0.5,
            friction: 0.0,
        }
    }
}

fn clamp_unit(name: &str, value: f64) -> f64 {
    if value.is_nan() {
        warn!("{name} is NaN, using 0");
        return 0.0;
    }
    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        warn!("{name} {value} clamped to {clamped}");
    }
    clamped
}
