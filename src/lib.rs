//! # `msg_locomotion`
//!
//! A camera-relative 3D rigidbody locomotion controller with physics backend
//! abstraction, plus a transient on-screen message timer.
//!
//! The locomotion controller:
//! - Maps a 2D move input onto the ground plane relative to the camera's yaw
//! - Accelerates a dynamic rigidbody up to a soft speed cap
//! - Turns the body toward the movement direction with a fractional slerp
//! - Switches surface friction between a moving and a stopping profile
//! - Feeds the input magnitude to the animation graph
//! - Abstracts the physics backend for easy swapping (Rapier3D included)
//!
//! ## Architecture
//!
//! All locomotion math lives in [`locomotion`] and works in controller space
//! (X right, Y up, Z forward). It is used two ways:
//! 1. [`controller::LocomotionController`], a headless controller that talks to
//!    its collaborators through the traits in [`interfaces`]
//! 2. [`LocomotionPlugin`], which runs the same math as ECS systems against a
//!    [`backend::LocomotionBackend`]
//!
//! The message timer follows the same split: [`message::MessageTimer`] is the
//! state machine and [`ContextualMessagePlugin`] drives it from
//! [`message::MessageTriggered`] events.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use msg_locomotion::prelude::*;
//!
//! let config = LocomotionConfig::player();
//! let step = LocomotionStep::evaluate(
//!     &config,
//!     Vec2::new(0.0, 1.0),
//!     Vec3::new(1.0, 0.0, 0.0),
//!     Vec3::ZERO,
//!     Quat::IDENTITY,
//! );
//!
//! // Forward input with the camera looking along +X moves the body along +X.
//! let direction = step.direction.unwrap();
//! assert!((direction - Vec3::X).length() < 1e-5);
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod intent;
pub mod interfaces;
pub mod locomotion;
pub mod message;
pub mod space;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::LocomotionBackend;
    pub use crate::config::{LocomotionConfig, MessageConfig};
    pub use crate::controller::{LocomotionController, LocomotionControllerBuilder};
    pub use crate::error::ConfigError;
    pub use crate::intent::{KeyboardMoveBindings, MoveInput};
    pub use crate::interfaces::{
        AnimationSink, CameraView, ForceMode, FrictionSurface, MessageDisplay, PhysicsBody,
    };
    pub use crate::locomotion::LocomotionStep;
    pub use crate::message::{
        ContextualMessage, ContextualMessageController, MessageBus, MessagePhase, MessageTimer,
        MessageTrigger, MessageTriggerZone, MessageTriggered,
    };
    pub use crate::state::{
        AnimationParameters, FrictionProfile, LocomotionCamera, LocomotionReady, LocomotionState,
        MOVEMENT_INPUT_PARAMETER,
    };
    pub use crate::{ContextualMessagePlugin, LocomotionPlugin, LocomotionSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dCharacterBundle};
}

/// System sets for the locomotion tick, run in order in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocomotionSet {
    /// Validate new controllers and reset per-tick backend state.
    Preparation,
    /// Read the camera and compute the camera-relative direction.
    Sensors,
    /// Apply force, facing and friction.
    Movement,
    /// Hand accumulated forces to the physics engine.
    FinalApplication,
}

/// Main plugin for the locomotion controller.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (velocity, force application, friction, etc.).
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use msg_locomotion::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(LocomotionPlugin::<Rapier3dBackend>::default())
///     .add_plugins(ContextualMessagePlugin::default())
///     .run();
/// ```
pub struct LocomotionPlugin<B: backend::LocomotionBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::LocomotionBackend> Default for LocomotionPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::LocomotionBackend> Plugin for LocomotionPlugin<B> {
    fn build(&self, app: &mut App) {
        app.register_type::<config::LocomotionConfig>();
        app.register_type::<intent::MoveInput>();
        app.register_type::<intent::KeyboardMoveBindings>();
        app.register_type::<interfaces::ForceMode>();
        app.register_type::<state::FrictionProfile>();
        app.register_type::<state::LocomotionCamera>();
        app.register_type::<state::LocomotionReady>();
        app.register_type::<state::LocomotionState>();
        app.register_type::<state::AnimationParameters>();

        app.configure_sets(
            FixedUpdate,
            (
                LocomotionSet::Preparation,
                LocomotionSet::Sensors,
                LocomotionSet::Movement,
                LocomotionSet::FinalApplication,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            systems::validate_new_controllers::<B>.in_set(LocomotionSet::Preparation),
        );
        app.add_systems(
            FixedUpdate,
            systems::update_camera_relative_direction.in_set(LocomotionSet::Sensors),
        );
        app.add_systems(
            FixedUpdate,
            (
                systems::apply_locomotion_force::<B>,
                systems::apply_facing_rotation::<B>,
                systems::apply_friction_profile::<B>,
            )
                .chain()
                .in_set(LocomotionSet::Movement),
        );

        // Input and animation follow the frame rate, not the fixed tick.
        app.add_systems(
            Update,
            (
                systems::sample_keyboard_input
                    .run_if(resource_exists::<ButtonInput<KeyCode>>),
                systems::push_animation_parameters,
            )
                .chain(),
        );
    }
}

/// Plugin for the contextual message timer.
///
/// Spawn an entity with [`message::ContextualMessage`] and send
/// [`message::MessageTriggered`] events to show text on it.
#[derive(Default)]
pub struct ContextualMessagePlugin {
    /// Timing used when no [`config::MessageConfig`] resource exists yet.
    pub config: config::MessageConfig,
}

impl ContextualMessagePlugin {
    pub fn new(config: config::MessageConfig) -> Self {
        Self { config }
    }
}

impl Plugin for ContextualMessagePlugin {
    fn build(&self, app: &mut App) {
        if let Err(err) = self.config.validate() {
            error!("Invalid message config: {err}");
            panic!("invalid message config: {err}");
        }

        app.register_type::<config::MessageConfig>();
        app.register_type::<message::ContextualMessage>();
        app.register_type::<message::MessageTriggerZone>();

        app.add_event::<message::MessageTriggered>();
        if !app.world().contains_resource::<config::MessageConfig>() {
            app.insert_resource(self.config);
        }

        // Advance before receiving so a message triggered this frame starts
        // with its full hold.
        app.add_systems(
            Update,
            (
                systems::apply_message_config,
                systems::advance_contextual_messages,
                systems::receive_message_triggers,
            )
                .chain(),
        );
    }
}
