//! Locomotion math.
//!
//! Pure functions for the per-tick pipeline: input direction, camera-relative
//! transform, soft-capped force, facing and friction selection. Everything
//! here is in controller space (X right, Y up, Z forward) and free of engine
//! state, so the headless controller and the Bevy systems share it.

use bevy::prelude::*;

use crate::config::LocomotionConfig;
use crate::state::FrictionProfile;

/// Squared length below which a direction counts as zero.
const DEGENERATE_EPSILON: f32 = 1e-12;

/// Non-zero and finite.
#[inline]
fn is_usable(direction: Vec3) -> bool {
    direction.is_finite() && direction.length_squared() > 0.0
}

/// Map a 2D axis pair onto the horizontal plane: horizontal → X, vertical → Z.
#[inline]
pub fn input_direction(input: Vec2) -> Vec3 {
    Vec3::new(input.x, 0.0, input.y)
}

/// Drop the vertical component of a direction and normalize it.
///
/// Returns `None` for directions that are (nearly) vertical or zero, which
/// have no horizontal heading.
pub fn flatten(direction: Vec3) -> Option<Vec3> {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    if !flat.is_finite() || flat.length_squared() <= DEGENERATE_EPSILON {
        return None;
    }
    Some(flat.normalize())
}

/// Yaw-only rotation that turns controller-space `+Z` onto `direction`'s
/// horizontal heading.
///
/// Pitch and roll are discarded, so movement is relative to where the view
/// points regardless of how far it is tilted.
pub fn look_rotation(direction: Vec3) -> Option<Quat> {
    flatten(direction).map(|heading| Quat::from_rotation_y(heading.x.atan2(heading.z)))
}

/// Rotate raw input into the camera's frame.
///
/// Returns `None` when the camera forward is degenerate (looking straight up
/// or down); dependent updates are skipped for that tick.
pub fn camera_relative_direction(input: Vec2, camera_forward: Vec3) -> Option<Vec3> {
    look_rotation(camera_forward).map(|yaw| yaw * input_direction(input))
}

/// Acceleration to apply this tick, or `None`.
///
/// The speed cap is soft: force is only suppressed while `|velocity|` is at
/// or above `max_speed`, and an over-cap body is never slowed down here.
pub fn locomotion_force(direction: Vec3, velocity: Vec3, config: &LocomotionConfig) -> Option<Vec3> {
    if !is_usable(direction) {
        return None;
    }
    if velocity.length() < config.max_speed {
        Some(direction * config.acceleration_force)
    } else {
        None
    }
}

/// Move `current` toward `target` by `turn_speed` of the remaining rotation.
///
/// This is an exponential approach: the angular step shrinks with the
/// remaining error and never overshoots for `turn_speed` in `[0, 1]`.
pub fn approach_rotation(current: Quat, target: Quat, turn_speed: f32) -> Quat {
    current.lerp(target, turn_speed.clamp(0.0, 1.0))
}

/// New facing for a movement direction, or `None` if the direction is zero.
pub fn facing_rotation(current: Quat, direction: Vec3, turn_speed: f32) -> Option<Quat> {
    if !is_usable(direction) {
        return None;
    }
    look_rotation(direction).map(|target| approach_rotation(current, target, turn_speed))
}

/// Everything one tick proposes for a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocomotionStep {
    /// Camera-relative direction, `None` if the camera was degenerate.
    pub direction: Option<Vec3>,
    /// Acceleration to add, if any.
    pub acceleration: Option<Vec3>,
    /// New orientation, if the body should turn.
    pub facing: Option<Quat>,
    /// Friction profile for the collision surface.
    pub friction: FrictionProfile,
}

impl LocomotionStep {
    /// Evaluate the whole pipeline for one tick.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bevy::prelude::*;
    /// use msg_locomotion::prelude::*;
    ///
    /// let step = LocomotionStep::evaluate(
    ///     &LocomotionConfig::default(),
    ///     Vec2::X,
    ///     Vec3::Z,
    ///     Vec3::ZERO,
    ///     Quat::IDENTITY,
    /// );
    /// assert_eq!(step.acceleration, Some(Vec3::new(10.0, 0.0, 0.0)));
    /// assert_eq!(step.friction, FrictionProfile::Moving);
    /// ```
    pub fn evaluate(
        config: &LocomotionConfig,
        input: Vec2,
        camera_forward: Vec3,
        velocity: Vec3,
        rotation: Quat,
    ) -> Self {
        let direction = camera_relative_direction(input, camera_forward);
        let acceleration = direction.and_then(|d| locomotion_force(d, velocity, config));
        let facing = direction.and_then(|d| facing_rotation(rotation, d, config.turn_speed));

        Self {
            direction,
            acceleration,
            facing,
            friction: FrictionProfile::from_input(input),
        }
    }
}
