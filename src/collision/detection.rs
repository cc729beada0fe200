//! Narrow phase: exact overlap tests, position correction and impulse response.

use log::trace;

use super::manifold::Manifold;
use crate::config::{CollisionConfig, OffsetRounding};
use crate::math::vec2::Vec2;
use crate::objects::{BodyKey, Collidable, CollisionEvent};
use crate::shapes::Shape;

/// Tests pairs of bodies and resolves the ones that overlap.
///
/// Holds no per-pair state, so a single detector can serve any number of pools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionDetector {
    offset_rounding: OffsetRounding,
}

impl CollisionDetector {
    pub fn new(offset_rounding: OffsetRounding) -> Self {
        Self { offset_rounding }
    }

    pub fn from_config(config: &CollisionConfig) -> Self {
        Self::new(config.offset_rounding)
    }

    pub fn offset_rounding(&self) -> OffsetRounding {
        self.offset_rounding
    }

    /// Detects an overlap without touching either body's state.
    ///
    /// The returned normal points from `a` towards `b`.
    pub fn check(&self, a: &mut Collidable, b: &mut Collidable) -> Option<Manifold> {
        let shape_a = a.shape_mut();
        let shape_b = b.shape_mut();

        if !shape_a.is_valid() || !shape_b.is_valid() {
            trace!("skipping pair with an invalid shape");
            return None;
        }

        // Broader check on the circumscribing circles
        let manifold = test_circle(shape_a, shape_b)?;

        match (shape_a.is_circle(), shape_b.is_circle()) {
            (true, true) => Some(manifold),
            (true, false) => test_circle_polygon(shape_a.position(), shape_a.radius(), shape_b),
            (false, true) => test_circle_polygon(shape_b.position(), shape_b.radius(), shape_a)
                .map(Manifold::flipped),
            (false, false) => test_polygon(shape_a, shape_b),
        }
    }

    /// Detects an overlap and, if there is one, pushes the bodies apart,
    /// accumulates the resolving impulse and notifies both bodies.
    pub fn check_and_respond(
        &self,
        a: &mut Collidable,
        key_a: BodyKey,
        b: &mut Collidable,
        key_b: BodyKey,
    ) -> bool {
        let Some(manifold) = self.check(a, b) else {
            return false;
        };

        self.correct_position(a, b, &manifold);
        resolve_impulse(a, b, &manifold);
        trace!(
            "resolved {key_a:?} / {key_b:?}: normal {:?}, penetration {}",
            manifold.normal,
            manifold.penetration
        );

        a.notify(&CollisionEvent {
            other_key: key_b,
            other: b,
            normal: manifold.normal,
            penetration: manifold.penetration,
        });
        let flipped = manifold.flipped();
        b.notify(&CollisionEvent {
            other_key: key_a,
            other: a,
            normal: flipped.normal,
            penetration: flipped.penetration,
        });

        true
    }

    /// Splits the minimum translation vector between both bodies and moves them apart.
    ///
    /// The body moving faster along its push direction takes the larger share.
    /// Immovable bodies are never displaced.
    pub fn correct_position(&self, a: &mut Collidable, b: &mut Collidable, manifold: &Manifold) {
        let mtv = manifold.mtv();
        let pa = a.position();
        let pb = b.position();

        // Push each body away from the other on both axes
        let mtv_a = Vec2::new(
            if pa.x > pb.x { mtv.x.abs() } else { -mtv.x.abs() },
            if pa.y > pb.y { mtv.y.abs() } else { -mtv.y.abs() },
        );
        let mtv_b = -mtv_a;

        let (share_a, share_b) = match (a.is_movable(), b.is_movable()) {
            (false, false) => return,
            (true, false) => (1.0, 0.0),
            (false, true) => (0.0, 1.0),
            (true, true) => {
                let along_a = mtv_a.normalize().dot(a.linear_velocity).abs();
                let along_b = mtv_b.normalize().dot(b.linear_velocity).abs();
                split(along_a, along_b).unwrap_or_else(|| {
                    split(a.speed(), b.speed()).unwrap_or((0.5, 0.5))
                })
            }
        };

        a.offset(self.offset_rounding.apply(mtv_a * share_a));
        b.offset(self.offset_rounding.apply(mtv_b * share_b));
    }
}

/// Proportional shares of `x` and `y`, or `None` when both are zero.
fn split(x: f64, y: f64) -> Option<(f64, f64)> {
    let sum = x + y;
    (sum > 0.0).then(|| (x / sum, y / sum))
}

/// Accumulates the impulse that removes the approaching relative velocity.
///
/// The impulse is stored as force; the integrator scales it by inverse mass.
pub fn resolve_impulse(a: &mut Collidable, b: &mut Collidable, manifold: &Manifold) {
    let normal = manifold.normal;

    let relative_velocity = b.linear_velocity - a.linear_velocity;
    let velocity_along_normal = relative_velocity.dot(normal);

    // Do not resolve if velocities are separating
    if velocity_along_normal > 0.0 {
        return;
    }

    let inv_mass_sum = a.inv_mass() + b.inv_mass();
    if inv_mass_sum == 0.0 {
        return;
    }

    let e = a.material.restitution.min(b.material.restitution);
    let j = -(1.0 + e) * velocity_along_normal / inv_mass_sum;
    let impulse = normal * j;

    if a.shape().is_circle() && b.shape().is_circle() {
        let contact_a = (b.position() - a.position()).normalize() * a.shape().radius();
        let contact_b = (a.position() - b.position()).normalize() * b.shape().radius();
        a.apply_force_at_point(-impulse, contact_a);
        b.apply_force_at_point(impulse, contact_b);
    } else {
        a.apply_force(-impulse);
        b.apply_force(impulse);
    }
}

/// Treats both shapes as circles of their bounding radius.
fn test_circle(a: &Shape, b: &Shape) -> Option<Manifold> {
    let center_a = a.position();
    let center_b = b.position();
    let radius_sum = a.radius() + b.radius();

    let distance_sq = center_a.distance_squared(center_b);
    if distance_sq > radius_sum * radius_sum {
        return None;
    }

    if distance_sq != 0.0 {
        let distance = distance_sq.sqrt();
        Some(Manifold::new(
            (center_b - center_a).normalize(),
            radius_sum - distance,
        ))
    } else {
        // Concentric, any direction will do
        Some(Manifold::new(Vec2::UNIT_X, a.radius()))
    }
}

/// Tests a circle against the nearest vertex of a polygon.
///
/// Only vertices are considered, so a circle touching the middle of a long
/// edge is not detected.
fn test_circle_polygon(center: Vec2, radius: f64, polygon: &mut Shape) -> Option<Manifold> {
    let nearest = polygon
        .vertices()
        .iter()
        .copied()
        .min_by(|p, q| {
            p.distance_squared(center)
                .total_cmp(&q.distance_squared(center))
        })?;

    let distance = nearest.distance(center);
    if distance > radius {
        return None;
    }

    let normal = if distance > 0.0 {
        (nearest - center).normalize()
    } else {
        // Centered on the vertex, push along the line of centers instead
        let toward = (polygon.position() - center).normalize();
        if toward == Vec2::ZERO {
            Vec2::UNIT_X
        } else {
            toward
        }
    };
    Some(Manifold::new(normal, radius - distance))
}

/// Separating axis test over the edge normals of both polygons.
fn test_polygon(a: &mut Shape, b: &mut Shape) -> Option<Manifold> {
    let mut best: Option<(Vec2, f64)> = None;
    if !least_overlap(a, b, &mut best) || !least_overlap(b, a, &mut best) {
        return None;
    }

    let (axis, overlap) = best?;
    // Orient the normal from A towards B
    let normal = if (b.position() - a.position()).dot(axis) < 0.0 {
        -axis
    } else {
        axis
    };
    Some(Manifold::new(normal, overlap))
}

/// Projects both shapes on every axis of `owner`, tracking the smallest overlap.
///
/// Returns `false` as soon as a separating axis is found.
fn least_overlap(owner: &mut Shape, other: &mut Shape, best: &mut Option<(Vec2, f64)>) -> bool {
    let count = owner.axes().len();
    for i in 0..count {
        let axis = owner.axes()[i];
        // Degenerate edge
        if axis == Vec2::ZERO {
            continue;
        }
        let (Some(p), Some(q)) = (owner.project(axis), other.project(axis)) else {
            return false;
        };
        if !p.overlaps(q) {
            return false;
        }
        let overlap = p.overlap(q);
        if best.map_or(true, |(_, least)| overlap < least) {
            *best = Some((axis, overlap));
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const EPSILON: f64 = 1e-9;

    fn circle_at(radius: f64, x: f64, y: f64) -> Collidable {
        Collidable::builder(Shape::circle(radius))
            .position(Vec2::new(x, y))
            .build()
    }

    fn square_at(size: f64, x: f64, y: f64) -> Collidable {
        Collidable::builder(Shape::rectangle(size, size))
            .position(Vec2::new(x, y))
            .build()
    }

    fn keys() -> (BodyKey, BodyKey) {
        let mut map = slotmap::SlotMap::<BodyKey, ()>::with_key();
        (map.insert(()), map.insert(()))
    }

    #[test]
    fn test_invalid_shapes_never_collide() {
        let detector = CollisionDetector::default();
        let mut a = Collidable::new(Shape::invalid());
        let mut b = circle_at(5.0, 0.0, 0.0);
        assert!(detector.check(&mut a, &mut b).is_none());
        assert!(detector.check(&mut b, &mut a).is_none());
    }

    #[test]
    fn test_circle_circle_manifold() {
        let detector = CollisionDetector::default();
        let mut a = circle_at(10.0, 0.0, 0.0);
        let mut b = circle_at(10.0, 15.0, 0.0);
        let m = detector.check(&mut a, &mut b).unwrap();
        assert!((m.normal.x - 1.0).abs() < EPSILON);
        assert!(m.normal.y.abs() < EPSILON);
        assert!((m.penetration - 5.0).abs() < EPSILON);

        let mut far = circle_at(10.0, 20.5, 0.0);
        assert!(detector.check(&mut a, &mut far).is_none());
    }

    #[test]
    fn test_concentric_circles_use_fallback_normal() {
        let detector = CollisionDetector::default();
        let mut a = circle_at(3.0, 4.0, 4.0);
        let mut b = circle_at(2.0, 4.0, 4.0);
        let m = detector.check(&mut a, &mut b).unwrap();
        assert_eq!(m.normal, Vec2::UNIT_X);
        assert_eq!(m.penetration, 3.0);
    }

    #[test]
    fn test_circle_polygon_uses_nearest_vertex() {
        let detector = CollisionDetector::default();
        // Square corner at (5, 5), circle centered just beyond it
        let mut square = square_at(10.0, 0.0, 0.0);
        let mut circle = circle_at(2.0, 6.0, 6.0);
        let m = detector.check(&mut circle, &mut square).unwrap();
        let expected = Vec2::new(-1.0, -1.0).normalize();
        assert!((m.normal.x - expected.x).abs() < EPSILON);
        assert!((m.normal.y - expected.y).abs() < EPSILON);
        assert!((m.penetration - (2.0 - 2.0f64.sqrt())).abs() < EPSILON);

        // Swapped order flips the normal
        let m = detector.check(&mut square, &mut circle).unwrap();
        assert!((m.normal.x + expected.x).abs() < EPSILON);
        assert!((m.normal.y + expected.y).abs() < EPSILON);
    }

    #[test]
    fn test_circle_centered_on_corner_is_pushed_out() {
        let detector = CollisionDetector::default();
        let (kc, ks) = keys();
        let mut square = square_at(10.0, 100.0, 100.0);
        let mut circle = Collidable::builder(Shape::circle(5.0))
            .position(Vec2::new(105.0, 105.0))
            .velocity(Vec2::new(-1.0, -1.0))
            .build();

        let m = detector.check(&mut circle, &mut square).unwrap();
        let expected = Vec2::new(-1.0, -1.0).normalize();
        assert!((m.normal.magnitude() - 1.0).abs() < EPSILON);
        assert!((m.normal.x - expected.x).abs() < EPSILON);
        assert!((m.normal.y - expected.y).abs() < EPSILON);
        assert_eq!(m.penetration, 5.0);

        let m = detector.check(&mut square, &mut circle).unwrap();
        assert!((m.normal.x + expected.x).abs() < EPSILON);
        assert!((m.normal.y + expected.y).abs() < EPSILON);

        // Only the circle moves along the mtv, so it takes all of it
        assert!(detector.check_and_respond(&mut circle, kc, &mut square, ks));
        assert_eq!(circle.position(), Vec2::new(109.0, 109.0));
        assert_eq!(square.position(), Vec2::new(100.0, 100.0));
        assert!((circle.force.x - 0.75).abs() < EPSILON);
        assert!((circle.force.y - 0.75).abs() < EPSILON);
        assert!((square.force.x + 0.75).abs() < EPSILON);
        assert!((square.force.y + 0.75).abs() < EPSILON);
    }

    #[test]
    fn test_circle_against_edge_middle_is_under_detected() {
        let detector = CollisionDetector::default();
        let mut square = square_at(10.0, 0.0, 0.0);

        // Overlaps the right edge by 1, but the nearest corner is sqrt(41) away
        let mut overlapping = circle_at(5.0, 9.0, 0.0);
        assert!(detector.check(&mut overlapping, &mut square).is_none());

        let mut approaching = Collidable::builder(Shape::circle(5.0))
            .position(Vec2::new(12.0, 0.0))
            .velocity(Vec2::new(-1.0, 0.0))
            .build();
        assert!(detector.check(&mut approaching, &mut square).is_none());

        // Only reaching a vertex counts
        let mut at_corner = circle_at(5.0, 8.0, 5.0);
        assert!(detector.check(&mut at_corner, &mut square).is_some());
    }

    #[test]
    fn test_polygon_polygon_least_overlap_axis() {
        let detector = CollisionDetector::default();
        let mut a = square_at(10.0, 0.0, 0.0);
        let mut b = square_at(10.0, 8.0, 1.0);
        let m = detector.check(&mut a, &mut b).unwrap();
        assert!((m.normal.x - 1.0).abs() < EPSILON);
        assert!(m.normal.y.abs() < EPSILON);
        assert!((m.penetration - 2.0).abs() < EPSILON);

        let m = detector.check(&mut b, &mut a).unwrap();
        assert!((m.normal.x + 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_polygon_polygon_separated_by_diagonal_axis() {
        let detector = CollisionDetector::default();
        // Diamond whose bounding circle overlaps the square, but a face normal separates them
        let mut square = square_at(10.0, 0.0, 0.0);
        let mut diamond = Collidable::builder(Shape::rectangle(10.0, 10.0))
            .position(Vec2::new(9.5, 9.5))
            .rotation(std::f64::consts::FRAC_PI_4)
            .build();
        assert!(detector.check(&mut square, &mut diamond).is_none());
    }

    #[test]
    fn test_stationary_circles_split_correction_evenly() {
        let (ka, kb) = keys();
        let detector = CollisionDetector::new(OffsetRounding::TowardZero);
        let mut a = circle_at(10.0, 0.0, 0.0);
        let mut b = circle_at(10.0, 15.0, 0.0);

        assert!(detector.check_and_respond(&mut a, ka, &mut b, kb));
        assert_eq!(a.position(), Vec2::new(-2.0, 0.0));
        assert_eq!(b.position(), Vec2::new(17.0, 0.0));
        // Zero relative velocity along the normal, no impulse
        assert_eq!(a.force, Vec2::ZERO);
        assert_eq!(b.force, Vec2::ZERO);
    }

    #[test]
    fn test_outward_rounding_rounds_shares_away_from_zero() {
        let (ka, kb) = keys();
        let detector = CollisionDetector::default();
        let mut a = circle_at(10.0, 0.0, 0.0);
        let mut b = circle_at(10.0, 15.0, 0.0);

        assert!(detector.check_and_respond(&mut a, ka, &mut b, kb));
        assert_eq!(a.position(), Vec2::new(-3.0, 0.0));
        assert_eq!(b.position(), Vec2::new(18.0, 0.0));
        assert!(detector.check(&mut a, &mut b).is_none());
    }

    #[test]
    fn test_faster_body_takes_the_correction() {
        let detector = CollisionDetector::new(OffsetRounding::Exact);
        let mut a = Collidable::builder(Shape::circle(10.0))
            .velocity(Vec2::new(3.0, 0.0))
            .build();
        let mut b = circle_at(10.0, 16.0, 0.0);
        let m = detector.check(&mut a, &mut b).unwrap();
        detector.correct_position(&mut a, &mut b, &m);
        assert!((a.position().x - -4.0).abs() < EPSILON);
        assert_eq!(b.position(), Vec2::new(16.0, 0.0));
    }

    #[test]
    fn test_speed_decides_when_no_velocity_along_mtv() {
        let detector = CollisionDetector::new(OffsetRounding::Exact);
        let mut a = Collidable::builder(Shape::circle(10.0))
            .velocity(Vec2::new(0.0, 3.0))
            .build();
        let mut b = Collidable::builder(Shape::circle(10.0))
            .position(Vec2::new(16.0, 0.0))
            .velocity(Vec2::new(0.0, -1.0))
            .build();
        let m = detector.check(&mut a, &mut b).unwrap();
        detector.correct_position(&mut a, &mut b, &m);
        assert!((a.position().x - -3.0).abs() < EPSILON);
        assert!((b.position().x - 17.0).abs() < EPSILON);
    }

    #[test]
    fn test_immovable_body_is_not_displaced() {
        let detector = CollisionDetector::new(OffsetRounding::Exact);
        let mut wall = Collidable::builder(Shape::circle(10.0)).mass(0.0).build();
        let mut ball = circle_at(10.0, 16.0, 0.0);
        let m = detector.check(&mut wall, &mut ball).unwrap();
        detector.correct_position(&mut wall, &mut ball, &m);
        assert_eq!(wall.position(), Vec2::ZERO);
        assert!((ball.position().x - 20.0).abs() < EPSILON);
    }

    #[test]
    fn test_approaching_bodies_receive_opposite_impulses() {
        let mut a = Collidable::builder(Shape::rectangle(4.0, 4.0))
            .velocity(Vec2::new(2.0, 0.0))
            .restitution(1.0)
            .build();
        let mut b = Collidable::builder(Shape::rectangle(4.0, 4.0))
            .position(Vec2::new(3.0, 0.0))
            .velocity(Vec2::new(-2.0, 0.0))
            .restitution(0.5)
            .build();
        let m = Manifold::new(Vec2::UNIT_X, 1.0);
        resolve_impulse(&mut a, &mut b, &m);
        // rv.n = -4, e = 0.5, j = 1.5 * 4 / 2 = 3
        assert!((a.force.x - -3.0).abs() < EPSILON);
        assert!((b.force.x - 3.0).abs() < EPSILON);
        assert_eq!(a.torque, 0.0);
    }

    #[test]
    fn test_separating_bodies_receive_no_impulse() {
        let mut a = Collidable::builder(Shape::circle(2.0))
            .velocity(Vec2::new(-1.0, 0.0))
            .build();
        let mut b = circle_at(2.0, 3.0, 0.0);
        resolve_impulse(&mut a, &mut b, &Manifold::new(Vec2::UNIT_X, 1.0));
        assert_eq!(a.force, Vec2::ZERO);
        assert_eq!(b.force, Vec2::ZERO);
    }

    #[test]
    fn test_two_immovable_bodies_receive_no_impulse() {
        let mut a = Collidable::builder(Shape::circle(2.0))
            .mass(0.0)
            .velocity(Vec2::new(1.0, 0.0))
            .build();
        let mut b = Collidable::builder(Shape::circle(2.0))
            .mass(0.0)
            .position(Vec2::new(3.0, 0.0))
            .build();
        resolve_impulse(&mut a, &mut b, &Manifold::new(Vec2::UNIT_X, 1.0));
        assert_eq!(a.force, Vec2::ZERO);
        assert_eq!(b.force, Vec2::ZERO);
    }

    #[test]
    fn test_callbacks_see_corrected_state() {
        let (ka, kb) = keys();
        let detector = CollisionDetector::new(OffsetRounding::TowardZero);
        let seen: Rc<RefCell<Vec<(&str, BodyKey, Vec2, Vec2)>>> = Rc::default();

        let mut a = circle_at(10.0, 0.0, 0.0);
        let log_a = seen.clone();
        a.set_on_collision(move |event| {
            log_a.borrow_mut().push(("a", event.other_key, event.other.position(), event.normal));
        });
        let mut b = circle_at(10.0, 15.0, 0.0);
        let log_b = seen.clone();
        b.set_on_collision(move |event| {
            log_b.borrow_mut().push(("b", event.other_key, event.other.position(), event.normal));
        });

        assert!(detector.check_and_respond(&mut a, ka, &mut b, kb));
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "a");
        assert_eq!(seen[0].1, kb);
        assert_eq!(seen[0].2, Vec2::new(17.0, 0.0));
        assert!((seen[0].3.x - 1.0).abs() < EPSILON);
        assert_eq!(seen[1].0, "b");
        assert_eq!(seen[1].1, ka);
        assert_eq!(seen[1].2, Vec2::new(-2.0, 0.0));
        assert!((seen[1].3.x + 1.0).abs() < EPSILON);
    }

    proptest! {
        #[test]
        fn test_circle_pairs_collide_iff_closer_than_radius_sum(
            ra in 0.1f64..50.0,
            rb in 0.1f64..50.0,
            x in -100.0f64..100.0,
            y in -100.0f64..100.0,
        ) {
            let detector = CollisionDetector::default();
            let mut a = circle_at(ra, 0.0, 0.0);
            let mut b = circle_at(rb, x, y);
            let distance = Vec2::new(x, y).magnitude();
            prop_assume!((distance - (ra + rb)).abs() > 1e-6);

            match detector.check(&mut a, &mut b) {
                Some(m) => {
                    prop_assert!(distance < ra + rb);
                    if distance > 0.0 {
                        prop_assert!((m.penetration - (ra + rb - distance)).abs() < 1e-9);
                    }
                }
                None => prop_assert!(distance > ra + rb),
            }
        }

        #[test]
        fn test_separated_boxes_never_collide(
            wa in 1.0f64..20.0,
            ha in 1.0f64..20.0,
            wb in 1.0f64..20.0,
            hb in 1.0f64..20.0,
            gap in 0.01f64..10.0,
            dy in -40.0f64..40.0,
            rotation in -3.0f64..3.0,
        ) {
            // B sits beyond A's right face, rotated about its own center while
            // staying clear of the separating line x = wa / 2 + gap
            let reach = (wb * wb + hb * hb).sqrt() / 2.0;
            let detector = CollisionDetector::default();
            let mut a = Collidable::new(Shape::rectangle(wa, ha));
            let mut b = Collidable::builder(Shape::rectangle(wb, hb))
                .position(Vec2::new(wa / 2.0 + gap + reach, dy))
                .rotation(rotation)
                .build();
            // A's right face normal is a separating axis
            prop_assert!(detector.check(&mut a, &mut b).is_none());
        }
    }
}
