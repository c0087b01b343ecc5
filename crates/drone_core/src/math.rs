//! Vector and angle helpers for steering.
//!
//! The simulation works in `f32` world units through [`glam::Vec2`]. Runs are
//! reproducible because every source of randomness is seeded and every
//! collection is iterated in a fixed order, not because the arithmetic is
//! fixed-point.

use std::f32::consts::{PI, TAU};

pub use glam::Vec2;

/// Distances at or below this are treated as coincident points.
pub const COINCIDENT_EPSILON: f32 = 1e-6;

/// Split an offset into a unit direction and its length.
///
/// When the offset is (nearly) zero the direction is `fallback`, so callers
/// never divide by zero. `fallback` should already be unit length.
#[must_use]
pub fn direction_and_distance(offset: Vec2, fallback: Vec2) -> (Vec2, f32) {
    let distance = offset.length();
    if distance <= COINCIDENT_EPSILON {
        (fallback, 0.0)
    } else {
        (offset / distance, distance)
    }
}

/// Deterministic push-apart axis for two coincident bodies.
///
/// The body with the lower ordering key is pushed toward -X and the other
/// toward +X, so the pair always separates in opposite directions.
#[must_use]
pub fn tie_break_axis<K: Ord>(own: K, other: K) -> Vec2 {
    if own < other {
        Vec2::NEG_X
    } else {
        Vec2::X
    }
}

/// Limit a vector's length to `max`, preserving direction.
#[must_use]
pub fn clamp_magnitude(v: Vec2, max: f32) -> Vec2 {
    let len_sq = v.length_squared();
    if len_sq > max * max && len_sq > 0.0 {
        v * (max / len_sq.sqrt())
    } else {
        v
    }
}

/// Wrap an angle in radians into `(-PI, PI]`.
#[must_use]
pub fn wrap_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

/// Angle of a direction vector in radians, measured from +X.
#[must_use]
pub fn heading_angle(direction: Vec2) -> f32 {
    direction.y.atan2(direction.x)
}

/// Turn `current` toward `target` by at most `max_delta` radians along the
/// shorter arc.
#[must_use]
pub fn rotate_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let diff = wrap_angle(target - current);
    if diff.abs() <= max_delta {
        wrap_angle(target)
    } else {
        wrap_angle(current + max_delta.copysign(diff))
    }
}
