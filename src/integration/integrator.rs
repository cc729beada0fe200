use crate::objects::Collidable;

/// Integrates a body's state forward by `dt` frames using Semi-Implicit Euler.
///
/// Velocities are damped by the material friction before forces are applied,
/// so a force accumulated as an impulse changes velocity by `force * inv_mass`
/// when `dt` is one frame.
pub fn integrate(body: &mut Collidable, dt: f64) {
    if !body.is_movable() {
        // Immovable object, only drop what was accumulated
        body.clear_accumulators();
        return;
    }

    let damping = 1.0 - body.material.friction;

    // --- Linear Motion --- //
    let linear_acceleration = body.force * body.inv_mass();
    body.linear_velocity = body.linear_velocity * damping + linear_acceleration * dt;
    if let Some(max_speed) = body.max_speed {
        if body.speed() > max_speed {
            body.linear_velocity = body.linear_velocity.normalize() * max_speed;
        }
    }

    // --- Angular Motion --- //
    let angular_acceleration = body.torque * body.inv_inertia();
    body.angular_velocity = body.angular_velocity * damping + angular_acceleration * dt;

    // Setters keep the shape transform in sync
    body.offset(body.linear_velocity * dt);
    body.set_rotation(wrap_angle(body.rotation() + body.angular_velocity * dt));

    // Clear force/torque accumulators for the next step
    body.clear_accumulators();
}

/// Wraps an angle in radians to the range [-PI, PI].
fn wrap_angle(angle: f64) -> f64 {
    angle.sin().atan2(angle.cos())
}
