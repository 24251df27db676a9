//! State components.
//!
//! These components hold the per-tick results of the locomotion systems and
//! the data they hand to the friction and animation collaborators.

use bevy::prelude::*;

use crate::interfaces::{AnimationSink, FrictionSurface};

/// Name of the animation parameter fed with the input magnitude.
pub const MOVEMENT_INPUT_PARAMETER: &str = "movementInput";

/// Friction profile of the body's collision surface.
///
/// Exactly one profile is active at a time. It is a pure function of the
/// current input magnitude, see [`FrictionProfile::from_input`].
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[reflect(Component)]
pub enum FrictionProfile {
    /// Low friction while the player is steering.
    Moving,
    /// High friction so the body does not slide once input is released.
    #[default]
    Stopping,
}

impl FrictionProfile {
    /// Select the profile for a raw input vector.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bevy::prelude::*;
    /// use msg_locomotion::prelude::*;
    ///
    /// assert_eq!(FrictionProfile::from_input(Vec2::X), FrictionProfile::Moving);
    /// assert_eq!(FrictionProfile::from_input(Vec2::ZERO), FrictionProfile::Stopping);
    /// ```
    pub fn from_input(input: Vec2) -> Self {
        if input.length() > 0.0 {
            Self::Moving
        } else {
            Self::Stopping
        }
    }

    pub fn is_moving(&self) -> bool {
        matches!(self, Self::Moving)
    }
}

impl FrictionSurface for FrictionProfile {
    fn set_friction_profile(&mut self, profile: FrictionProfile) {
        *self = profile;
    }
}

/// Marker for the camera that movement input is relative to.
///
/// Exactly one entity should carry this component. Its `GlobalTransform`
/// forward axis is flattened and used as the yaw basis every tick.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct LocomotionCamera;

/// Marker added once a controller passed validation.
///
/// The locomotion systems only tick entities carrying this marker.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct LocomotionReady;

/// Results of the most recent locomotion tick.
///
/// Written by the locomotion systems, read by gameplay code and tests.
/// Directions are stored both in controller space and in Bevy world space.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct LocomotionState {
    /// Camera-relative movement direction in controller space.
    /// `None` when the camera forward was degenerate this tick.
    pub camera_relative_direction: Option<Vec3>,
    /// The same direction converted to Bevy world space.
    pub world_direction: Option<Vec3>,
    /// Acceleration requested this tick (world space), if any.
    pub applied_acceleration: Option<Vec3>,
    /// Whether the facing rotation was updated this tick.
    pub facing_updated: bool,
    /// Number of fixed ticks this controller has processed.
    pub ticks: u64,

    // === Force accumulation (used by backends that keep persistent forces) ===
    /// Forces accumulated during the current tick.
    pub(crate) accumulated_force: Vec3,
    /// Forces written to the physics engine last tick.
    pub(crate) applied_force: Vec3,
}

impl LocomotionState {
    /// Accumulate a force for this tick.
    pub fn add_force(&mut self, force: Vec3) {
        self.accumulated_force += force;
    }

    /// Forces accumulated so far this tick.
    pub fn accumulated_force(&self) -> Vec3 {
        self.accumulated_force
    }

    /// Start a new tick: returns what was applied last tick and clears it.
    pub(crate) fn prepare_new_frame(&mut self) -> Vec3 {
        let previous = self.applied_force;
        self.applied_force = Vec3::ZERO;
        self.accumulated_force = Vec3::ZERO;
        previous
    }

    /// Finish a tick: returns the accumulated force and remembers it.
    pub(crate) fn finalize_frame(&mut self) -> Vec3 {
        let force = self.accumulated_force;
        self.applied_force = force;
        force
    }

    /// Clear the per-tick results before the systems run.
    pub(crate) fn begin_tick(&mut self) {
        self.camera_relative_direction = None;
        self.world_direction = None;
        self.applied_acceleration = None;
        self.facing_updated = false;
        self.ticks += 1;
    }
}

/// A single named animation blend parameter.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct AnimationParameter {
    pub name: String,
    pub value: f32,
}

/// Named float parameters for an animation graph.
///
/// This is the ECS animation collaborator. Animation code reads the values
/// (for example [`MOVEMENT_INPUT_PARAMETER`]) and maps them to blend weights.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct AnimationParameters {
    parameters: Vec<AnimationParameter>,
}

impl AnimationParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a parameter value by name.
    pub fn get(&self, name: &str) -> Option<f32> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value)
    }

    /// Set a parameter, inserting it if absent.
    pub fn set(&mut self, name: &str, value: f32) {
        match self.parameters.iter_mut().find(|p| p.name == name) {
            Some(parameter) => parameter.value = value,
            None => self.parameters.push(AnimationParameter {
                name: name.to_owned(),
                value,
            }),
        }
    }

    /// Current value of [`MOVEMENT_INPUT_PARAMETER`], zero if never set.
    pub fn movement_input(&self) -> f32 {
        self.get(MOVEMENT_INPUT_PARAMETER).unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimationParameter> {
        self.parameters.iter()
    }
}

impl AnimationSink for AnimationParameters {
    fn set_parameter(&mut self, name: &str, value: f32) {
        self.set(name, value);
    }
}
