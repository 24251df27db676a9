//! Collaborator interfaces for the headless controller.
//!
//! [`LocomotionController`](crate::controller::LocomotionController) and
//! [`ContextualMessageController`](crate::message::ContextualMessageController)
//! never reach into an engine. Everything they read or write goes through
//! these traits, which the host injects at construction time. All vectors
//! and rotations are in controller space (X right, Y up, Z forward).

use bevy::prelude::*;

use crate::state::FrictionProfile;

/// How a force passed to [`PhysicsBody::add_force`] is interpreted.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForceMode {
    /// A force in newtons, scaled by the body's inverse mass.
    #[default]
    Force,
    /// An acceleration, applied independently of the body's mass.
    Acceleration,
}

/// The rigid body driven by the controller.
///
/// The physics integrator owns pose and velocity. The controller only reads
/// them and proposes changes through this API.
pub trait PhysicsBody {
    /// Current linear velocity.
    fn velocity(&self) -> Vec3;

    /// Add a force for the current physics step.
    fn add_force(&mut self, force: Vec3, mode: ForceMode);

    /// Current orientation.
    fn rotation(&self) -> Quat;

    /// Propose a new orientation.
    fn set_rotation(&mut self, rotation: Quat);
}

/// The view the movement input is relative to.
pub trait CameraView {
    /// The camera's forward direction. Need not be normalized.
    fn forward(&self) -> Vec3;
}

/// The collision surface whose friction follows the input state.
pub trait FrictionSurface {
    fn set_friction_profile(&mut self, profile: FrictionProfile);
}

/// Receiver of named animation blend parameters.
pub trait AnimationSink {
    fn set_parameter(&mut self, name: &str, value: f32);
}

/// Renderer of the transient contextual message.
pub trait MessageDisplay {
    /// Opacity in `[0, 1]`.
    fn set_alpha(&mut self, alpha: f32);

    fn set_text(&mut self, text: &str);
}
