use std::fmt;

use log::warn;
use slotmap::new_key_type;

use crate::collision::aabb::AABB;
use crate::common::Material;
use crate::math::vec2::Vec2;
use crate::shapes::Shape;

new_key_type! {
    /// Handle of a body registered in a collision pool.
    pub struct BodyKey;
}

/// Passed to a body's collision callback after a contact has been resolved.
#[derive(Debug, Clone, Copy)]
pub struct CollisionEvent<'a> {
    pub other_key: BodyKey,
    /// The other body, already moved apart.
    pub other: &'a Collidable,
    /// Unit normal pointing from the notified body towards the other one.
    pub normal: Vec2,
    pub penetration: f64,
}

pub type CollisionCallback = Box<dyn FnMut(&CollisionEvent<'_>)>;

/// A body taking part in collision detection.
///
/// Position and rotation are private so the shape transform always matches them.
pub struct Collidable {
    shape: Shape,
    position: Vec2,
    rotation: f64,
    pub material: Material,

    pub linear_velocity: Vec2,
    pub angular_velocity: f64, // Radians per frame

    // Accumulators for forces/torques applied during a frame
    pub force: Vec2,
    pub torque: f64,

    mass: f64,
    inv_mass: f64, // 0.0 for immovable
    inertia: f64,
    inv_inertia: f64,

    /// Speed limit applied by the integrator.
    pub max_speed: Option<f64>,
    pub collision_enabled: bool,
    pub(crate) collision_checked: bool,
    on_collision: Option<CollisionCallback>,
}

impl fmt::Debug for Collidable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collidable")
            .field("shape", &self.shape)
            .field("position", &self.position)
            .field("rotation", &self.rotation)
            .field("material", &self.material)
            .field("linear_velocity", &self.linear_velocity)
            .field("angular_velocity", &self.angular_velocity)
            .field("mass", &self.mass)
            .field("inertia", &self.inertia)
            .field("max_speed", &self.max_speed)
            .field("collision_enabled", &self.collision_enabled)
            .field("has_callback", &self.on_collision.is_some())
            .finish_non_exhaustive()
    }
}

impl Collidable {
    /// A body at the origin with unit mass and inertia.
    pub fn new(shape: Shape) -> Self {
        CollidableBuilder::new(shape).build()
    }

    pub fn builder(shape: Shape) -> CollidableBuilder {
        CollidableBuilder::new(shape)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Mutable access for cached geometry queries.
    pub(crate) fn shape_mut(&mut self) -> &mut Shape {
        &mut self.shape
    }

    /// Replaces the shape, placing it at the body's current transform.
    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
        self.sync_shape();
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.sync_shape();
    }

    /// Moves the body by `delta`.
    pub fn offset(&mut self, delta: Vec2) {
        self.set_position(self.position + delta);
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: f64) {
        self.rotation = rotation;
        self.sync_shape();
    }

    fn sync_shape(&mut self) {
        self.shape.set_transform(self.position, self.rotation);
    }

    pub fn bounding_rect(&mut self) -> Option<AABB> {
        self.shape.bounding_rect()
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn inv_mass(&self) -> f64 {
        self.inv_mass
    }

    /// A non-positive mass makes the body immovable.
    pub fn set_mass(&mut self, mass: f64) {
        (self.mass, self.inv_mass) = invert(mass);
    }

    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn inv_inertia(&self) -> f64 {
        self.inv_inertia
    }

    /// A non-positive inertia stops the body from rotating.
    pub fn set_inertia(&mut self, inertia: f64) {
        (self.inertia, self.inv_inertia) = invert(inertia);
    }

    pub fn is_movable(&self) -> bool {
        self.inv_mass > 0.0
    }

    pub fn speed(&self) -> f64 {
        self.linear_velocity.magnitude()
    }

    /// Whether the body already served as a reference in the current pass.
    pub fn is_collision_checked(&self) -> bool {
        self.collision_checked
    }

    pub fn set_on_collision<F>(&mut self, callback: F)
    where
        F: FnMut(&CollisionEvent<'_>) + 'static,
    {
        self.on_collision = Some(Box::new(callback));
    }

    pub fn clear_on_collision(&mut self) {
        self.on_collision = None;
    }

    pub(crate) fn notify(&mut self, event: &CollisionEvent<'_>) {
        if let Some(callback) = self.on_collision.as_mut() {
            callback(event);
        }
    }

    /// Applies a force at the center of mass.
    pub fn apply_force(&mut self, force: Vec2) {
        self.force += force;
    }

    /// Applies a force at `offset` from the body position.
    /// This generates both linear force and torque.
    pub fn apply_force_at_point(&mut self, force: Vec2, offset: Vec2) {
        self.force += force;
        self.torque += offset.cross(force);
    }

    pub fn apply_torque(&mut self, torque: f64) {
        self.torque += torque;
    }

    /// Should typically be called after integration in each frame.
    pub fn clear_accumulators(&mut self) {
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }
}

fn invert(value: f64) -> (f64, f64) {
    if value.is_finite() && value > 0.0 {
        (value, 1.0 / value)
    } else {
        (0.0, 0.0)
    }
}

/// Named, defaulted construction of a [`Collidable`].
#[derive(Debug, Clone)]
pub struct CollidableBuilder {
    shape: Shape,
    position: Vec2,
    rotation: f64,
    linear_velocity: Vec2,
    angular_velocity: f64,
    mass: f64,
    inertia: f64,
    restitution: f64,
    friction: f64,
    max_speed: Option<f64>,
    collision_enabled: bool,
}

impl CollidableBuilder {
    pub fn new(shape: Shape) -> Self {
        let material = Material::default();
        Self {
            shape,
            position: Vec2::ZERO,
            rotation: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            mass: 1.0,
            inertia: 1.0,
            restitution: material.restitution,
            friction: material.friction,
            max_speed: None,
            collision_enabled: true,
        }
    }

    pub fn position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn velocity(mut self, velocity: Vec2) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn angular_velocity(mut self, angular_velocity: f64) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Zero makes the body immovable.
    pub fn mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn inertia(mut self, inertia: f64) -> Self {
        self.inertia = inertia;
        self
    }

    pub fn restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    pub fn max_speed(mut self, max_speed: f64) -> Self {
        self.max_speed = Some(max_speed);
        self
    }

    pub fn collision_enabled(mut self, enabled: bool) -> Self {
        self.collision_enabled = enabled;
        self
    }

    pub fn build(self) -> Collidable {
        if self.mass < 0.0 {
            warn!("negative mass {} treated as immovable", self.mass);
        }
        let (mass, inv_mass) = invert(self.mass);
        let (inertia, inv_inertia) = invert(self.inertia);
        let mut body = Collidable {
            shape: self.shape,
            position: self.position,
            rotation: self.rotation,
            material: Material::new(self.restitution, self.friction),
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
            force: Vec2::ZERO,
            torque: 0.0,
            mass,
            inv_mass,
            inertia,
            inv_inertia,
            max_speed: self.max_speed,
            collision_enabled: self.collision_enabled,
            collision_checked: false,
            on_collision: None,
        };
        body.sync_shape();
        body
    }
}
