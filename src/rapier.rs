//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::backend::LocomotionBackend;
use crate::config::LocomotionConfig;
use crate::error::ConfigError;
use crate::interfaces::ForceMode;
use crate::message::{MessageTriggerZone, MessageTriggered};
use crate::state::{FrictionProfile, LocomotionState};

/// Rapier3D physics backend for the locomotion controller.
///
/// Forces are accumulated in [`LocomotionState`] during the tick and written
/// to `ExternalForce` once in [`LocomotionSet::FinalApplication`]. The force
/// written last tick is subtracted again in [`LocomotionSet::Preparation`], so
/// forces added by user code to the same `ExternalForce` are preserved.
///
/// [`LocomotionSet::FinalApplication`]: crate::LocomotionSet::FinalApplication
/// [`LocomotionSet::Preparation`]: crate::LocomotionSet::Preparation
pub struct Rapier3dBackend;

impl LocomotionBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn validate_body(world: &World, entity: Entity) -> Result<(), ConfigError> {
        let missing =
            |component: &'static str| ConfigError::MissingPhysicsComponent { entity, component };

        if world.get::<RigidBody>(entity).is_none() {
            return Err(missing("RigidBody"));
        }
        if world.get::<Velocity>(entity).is_none() {
            return Err(missing("Velocity"));
        }
        if world.get::<ExternalForce>(entity).is_none() {
            return Err(missing("ExternalForce"));
        }
        if world.get::<Friction>(entity).is_none() {
            return Err(missing("Friction"));
        }
        if world.get::<ReadMassProperties>(entity).is_none() {
            return Err(missing("ReadMassProperties"));
        }
        if world.get::<Transform>(entity).is_none() {
            return Err(missing("Transform"));
        }
        Ok(())
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn add_force(world: &mut World, entity: Entity, force: Vec3, mode: ForceMode) {
        let force = match mode {
            ForceMode::Force => force,
            ForceMode::Acceleration => {
                let mass = world
                    .get::<ReadMassProperties>(entity)
                    .map(|props| props.get().mass)
                    .unwrap_or(0.0);

                if mass > 0.0 && mass.is_finite() {
                    force * mass
                } else {
                    // Mass is not known before the first physics step; apply
                    // the acceleration directly as a velocity change instead.
                    let dt = Self::get_fixed_timestep(world);
                    if let Some(mut velocity) = world.get_mut::<Velocity>(entity) {
                        velocity.linvel += force * dt;
                    }
                    return;
                }
            }
        };

        // Accumulate into LocomotionState instead of directly modifying ExternalForce.
        // apply_controller_forces writes the total at the end of the tick.
        if let Some(mut state) = world.get_mut::<LocomotionState>(entity) {
            state.add_force(force);
        }
    }

    fn get_rotation(world: &World, entity: Entity) -> Quat {
        world
            .get::<Transform>(entity)
            .map(|t| t.rotation)
            .or_else(|| {
                world.get::<GlobalTransform>(entity).map(|t| {
                    let (_, rotation, _) = t.to_scale_rotation_translation();
                    rotation
                })
            })
            .unwrap_or(Quat::IDENTITY)
    }

    fn set_rotation(world: &mut World, entity: Entity, rotation: Quat) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.rotation = rotation;
        }
    }

    fn set_friction_profile(
        world: &mut World,
        entity: Entity,
        profile: FrictionProfile,
        config: &LocomotionConfig,
    ) {
        let coefficient = config.friction_coefficient(profile);
        if let Some(mut friction) = world.get_mut::<Friction>(entity) {
            if friction.coefficient != coefficient {
                friction.coefficient = coefficient;
            }
        }
    }
}

/// Plugin that sets up Rapier3D-specific systems for the locomotion controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        use crate::LocomotionSet;

        // trigger_message_zones writes this even without ContextualMessagePlugin.
        app.add_event::<MessageTriggered>();

        app.add_systems(
            FixedUpdate,
            clear_controller_forces.in_set(LocomotionSet::Preparation),
        );

        app.add_systems(
            FixedUpdate,
            apply_controller_forces.in_set(LocomotionSet::FinalApplication),
        );

        app.add_systems(Update, trigger_message_zones);
    }
}

/// Clear controller forces at the start of each tick.
///
/// Subtracts the force written last tick from `ExternalForce` and resets the
/// accumulator.
pub fn clear_controller_forces(mut q: Query<(&mut ExternalForce, &mut LocomotionState)>) {
    for (mut ext_force, mut state) in &mut q {
        let force_to_subtract = state.prepare_new_frame();
        if force_to_subtract != Vec3::ZERO {
            ext_force.force -= force_to_subtract;
        }
    }
}

/// Apply controller forces at the end of each tick.
pub fn apply_controller_forces(mut q: Query<(&mut ExternalForce, &mut LocomotionState)>) {
    for (mut ext_force, mut state) in &mut q {
        let force_to_apply = state.finalize_frame();
        if force_to_apply != Vec3::ZERO {
            ext_force.force += force_to_apply;
        }
    }
}

/// Fire [`MessageTriggered`] when a controlled body enters a trigger zone.
///
/// Zones need a sensor collider with collision events enabled; see
/// [`message_zone`].
pub fn trigger_message_zones(
    mut collisions: EventReader<CollisionEvent>,
    mut q_zones: Query<&mut MessageTriggerZone>,
    q_bodies: Query<(), With<LocomotionConfig>>,
    mut triggered: EventWriter<MessageTriggered>,
) {
    for collision in collisions.read() {
        let CollisionEvent::Started(a, b, _) = *collision else {
            continue;
        };

        let (zone_entity, body) = if q_zones.contains(a) && q_bodies.contains(b) {
            (a, b)
        } else if q_zones.contains(b) && q_bodies.contains(a) {
            (b, a)
        } else {
            continue;
        };

        let Ok(mut zone) = q_zones.get_mut(zone_entity) else {
            continue;
        };
        if let Some(event) = zone.enter() {
            debug!("Body {body} entered message zone {zone_entity}");
            triggered.write(event);
        }
    }
}

/// Components for a sensor that shows a message when a controlled body
/// enters it.
///
/// # Example
///
/// ```ignore
/// commands.spawn((
///     Transform::from_xyz(0.0, 0.0, -10.0),
///     message_zone(
///         MessageTriggerZone::new("The door is locked").once(),
///         Collider::cuboid(2.0, 2.0, 2.0),
///     ),
/// ));
/// ```
pub fn message_zone(zone: MessageTriggerZone, collider: Collider) -> impl Bundle {
    (zone, collider, Sensor, ActiveEvents::COLLISION_EVENTS)
}

/// Bundle for creating a locomotion body with Rapier3D physics.
///
/// Provides the rigid body, velocity tracking, the external force the
/// controller writes to, surface friction and mass properties.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use msg_locomotion::prelude::*;
/// use msg_locomotion::rapier::Rapier3dCharacterBundle;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 1.0, 0.0),
///         LocomotionConfig::player(),
///         Rapier3dCharacterBundle::rotation_locked(),
///         Collider::capsule_y(0.5, 0.3),
///     ));
/// }
/// ```
///
/// # Rotation
///
/// The controller sets the body's orientation directly, so collisions should
/// not spin it. [`Rapier3dCharacterBundle::rotation_locked()`] locks all
/// rotation axes for that reason and is what most games want.
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `damping`: Linear 0.0, Angular 1.0
/// - `friction`: 1.0, the stopping coefficient of [`LocomotionConfig::default()`]
#[derive(Bundle, Default)]
pub struct Rapier3dCharacterBundle {
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity. Updated by Rapier each physics step.
    pub velocity: Velocity,
    /// Controller forces are written here once per tick.
    pub external_force: ExternalForce,
    pub locked_axes: LockedAxes,
    pub damping: Damping,
    /// Surface friction, switched between the moving and stopping profiles.
    pub friction: Friction,
    /// Computed mass properties. Rapier updates this based on the entity's collider.
    pub mass_properties: ReadMassProperties,
}

impl Rapier3dCharacterBundle {
    /// Create a new character bundle with rotation enabled.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            external_force: ExternalForce::default(),
            locked_axes: LockedAxes::empty(),
            damping: Damping {
                linear_damping: 0.0,
                angular_damping: 1.0,
            },
            friction: Friction::coefficient(LocomotionConfig::default().stopping_friction),
            // Rapier will update this based on collider after first physics step
            mass_properties: ReadMassProperties::default(),
        }
    }

    /// Create a character bundle with rotation locked.
    pub fn rotation_locked() -> Self {
        Self {
            locked_axes: LockedAxes::ROTATION_LOCKED,
            ..Self::new()
        }
    }

    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set the damping coefficients for velocity reduction.
    ///
    /// With zero linear damping the stopping friction is what brings the body
    /// to rest after input is released.
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.damping = Damping {
            linear_damping: linear,
            angular_damping: angular,
        };
        self
    }

    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }
}
