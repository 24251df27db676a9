//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to drive the locomotion systems. This allows easy swapping between
//! physics engines (Rapier3D, Avian, custom, etc.).
//!
//! All vectors and rotations passed through this trait are in Bevy world
//! space; the systems convert to controller space themselves.

use bevy::prelude::*;

use crate::config::LocomotionConfig;
use crate::error::ConfigError;
use crate::interfaces::ForceMode;
use crate::state::FrictionProfile;

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the locomotion
/// controller. The backend owns velocity, pose and surface friction; the
/// controller only reads them and proposes changes.
///
/// For an example implementation, see the `rapier` module's
/// `Rapier3dBackend`.
pub trait LocomotionBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Check that an entity carries everything this backend needs.
    ///
    /// Called once for every new controller before its first tick. An error
    /// here is fatal.
    fn validate_body(world: &World, entity: Entity) -> Result<(), ConfigError>;

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Add a force for the current physics step.
    fn add_force(world: &mut World, entity: Entity, force: Vec3, mode: ForceMode);

    /// Get the current orientation of an entity.
    fn get_rotation(world: &World, entity: Entity) -> Quat;

    /// Set the orientation of an entity.
    fn set_rotation(world: &mut World, entity: Entity, rotation: Quat);

    /// Switch the friction of an entity's collision surface.
    ///
    /// Backends look up the coefficient for `profile` in `config`.
    fn set_friction_profile(
        world: &mut World,
        entity: Entity,
        profile: FrictionProfile,
        config: &LocomotionConfig,
    );

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}
