//! Controller configuration.
//!
//! [`LocomotionConfig`] tunes the force model, facing and friction of one
//! controlled body. [`MessageConfig`] tunes the contextual message timer.
//! Both can be built in code with the `with_*` builders or loaded from a RON
//! file.

use std::path::Path;

use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::intent::MoveInput;
use crate::state::{AnimationParameters, FrictionProfile, LocomotionState};

/// Configuration parameters for the locomotion controller.
///
/// Adding this component to an entity turns it into a controlled body; the
/// input, state, friction and animation components are inserted alongside.
///
/// # Example
///
/// ```rust
/// use msg_locomotion::prelude::*;
///
/// let config = LocomotionConfig::player()
///     .with_max_speed(4.0)
///     .with_turn_speed(0.25);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[reflect(Component)]
#[require(MoveInput, LocomotionState, FrictionProfile, AnimationParameters)]
#[serde(default)]
pub struct LocomotionConfig {
    // === Force Settings ===
    /// Acceleration applied along the camera-relative input direction
    /// (units/second^2 at full input).
    pub acceleration_force: f32,

    /// Speed at or above which no further acceleration is applied.
    ///
    /// This is a soft cap: a body that is already faster is never slowed
    /// down by the controller, it only stops receiving force.
    pub max_speed: f32,

    // === Facing Settings ===
    /// Fraction of the remaining rotation covered each tick.
    /// 0 = never turns, 1 = snaps instantly.
    pub turn_speed: f32,

    // === Friction Settings ===
    /// Surface friction coefficient while input is held.
    pub moving_friction: f32,

    /// Surface friction coefficient once input is released.
    pub stopping_friction: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            acceleration_force: 10.0,
            max_speed: 2.0,
            turn_speed: 0.1,
            moving_friction: 0.0,
            stopping_friction: 1.0,
        }
    }
}

impl LocomotionConfig {
    /// Preset for a responsive player character.
    pub fn player() -> Self {
        Self {
            acceleration_force: 20.0,
            max_speed: 5.0,
            turn_speed: 0.2,
            ..default()
        }
    }

    /// Builder: set the acceleration force.
    pub fn with_acceleration_force(mut self, force: f32) -> Self {
        self.acceleration_force = force;
        self
    }

    /// Builder: set the soft speed cap.
    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Builder: set the turn fraction, clamped to `[0, 1]`.
    pub fn with_turn_speed(mut self, turn_speed: f32) -> Self {
        self.turn_speed = turn_speed.clamp(0.0, 1.0);
        self
    }

    /// Builder: set both friction coefficients.
    pub fn with_friction(mut self, moving: f32, stopping: f32) -> Self {
        self.moving_friction = moving;
        self.stopping_friction = stopping;
        self
    }

    /// Friction coefficient for a profile.
    pub fn friction_coefficient(&self, profile: FrictionProfile) -> f32 {
        match profile {
            FrictionProfile::Moving => self.moving_friction,
            FrictionProfile::Stopping => self.stopping_friction,
        }
    }

    /// Check every parameter is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("acceleration_force", self.acceleration_force)?;
        non_negative("max_speed", self.max_speed)?;
        non_negative("moving_friction", self.moving_friction)?;
        non_negative("stopping_friction", self.stopping_friction)?;
        if !(0.0..=1.0).contains(&self.turn_speed) {
            return Err(ConfigError::InvalidParameter {
                name: "turn_speed",
                value: self.turn_speed,
                expected: "a value in [0, 1]",
            });
        }
        Ok(())
    }

    /// Parse from a RON string. Missing fields take their defaults.
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = load_ron(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a RON file, falling back to defaults on any error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded locomotion config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to load {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }
}

/// Configuration for the contextual message timer.
#[derive(Resource, Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[reflect(Resource)]
#[serde(default)]
pub struct MessageConfig {
    /// Seconds the alpha takes to fall from 1 to 0 after the hold ends.
    pub fade_out_duration: f32,
    /// Hold duration used when a trigger does not carry one.
    pub default_duration: f32,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            fade_out_duration: 1.0,
            default_duration: 2.0,
        }
    }
}

impl MessageConfig {
    pub fn with_fade_out_duration(mut self, seconds: f32) -> Self {
        self.fade_out_duration = seconds;
        self
    }

    pub fn with_default_duration(mut self, seconds: f32) -> Self {
        self.default_duration = seconds;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("fade_out_duration", self.fade_out_duration)?;
        non_negative("default_duration", self.default_duration)
    }

    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = load_ron(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Read and deserialize a RON file.
pub fn load_ron<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(ron::from_str(&contents)?)
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            value,
            expected: "a finite, non-negative value",
        })
    }
}
