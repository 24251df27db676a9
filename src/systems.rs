//! Core controller systems.
//!
//! These systems implement the locomotion pipeline and the contextual
//! message timer on top of the ECS. The physics-facing systems are generic
//! over the backend to allow different physics engines to be used.

use bevy::prelude::*;

use crate::backend::LocomotionBackend;
use crate::config::{LocomotionConfig, MessageConfig};
use crate::error::ConfigError;
use crate::intent::{KeyboardMoveBindings, MoveInput};
use crate::interfaces::{AnimationSink, ForceMode};
use crate::locomotion::{camera_relative_direction, facing_rotation, locomotion_force};
use crate::message::{ContextualMessage, MessageTrigger, MessageTriggered, TextDisplay};
use crate::space;
use crate::state::{
    AnimationParameters, FrictionProfile, LocomotionCamera, LocomotionReady, LocomotionState,
    MOVEMENT_INPUT_PARAMETER,
};

/// Validate controllers that have not ticked yet.
///
/// A controller with an out-of-range config, missing physics components or
/// no camera in the world cannot operate. This is a configuration error, so
/// it fails fast instead of silently skipping every tick.
pub fn validate_new_controllers<B: LocomotionBackend>(world: &mut World) {
    let pending: Vec<(Entity, LocomotionConfig)> = world
        .query_filtered::<(Entity, &LocomotionConfig), Without<LocomotionReady>>()
        .iter(world)
        .map(|(e, config)| (e, *config))
        .collect();

    if pending.is_empty() {
        return;
    }

    let has_camera = world
        .query_filtered::<Entity, With<LocomotionCamera>>()
        .iter(world)
        .next()
        .is_some();

    for (entity, config) in pending {
        let result = config
            .validate()
            .and_then(|()| B::validate_body(world, entity))
            .and_then(|()| {
                if has_camera {
                    Ok(())
                } else {
                    Err(ConfigError::MissingCamera)
                }
            });

        if let Err(err) = result {
            error!("Locomotion controller {entity} cannot operate: {err}");
            panic!("invalid locomotion controller {entity}: {err}");
        }

        world.entity_mut(entity).insert(LocomotionReady);
        info!("Locomotion controller {entity} ready");
    }
}

/// Sample input and rotate it into the camera's frame.
///
/// Runs first each tick and resets the per-tick results in
/// [`LocomotionState`]. When the camera forward is degenerate the direction
/// stays `None` and the force and facing systems skip the body.
pub fn update_camera_relative_direction(
    q_camera: Query<&GlobalTransform, With<LocomotionCamera>>,
    mut q_bodies: Query<(&MoveInput, &mut LocomotionState), With<LocomotionReady>>,
) {
    let camera_forward = q_camera
        .iter()
        .next()
        .map(|transform| space::vec_from_world(transform.forward().as_vec3()));

    for (input, mut state) in &mut q_bodies {
        state.begin_tick();

        let Some(forward) = camera_forward else {
            warn_once!("No LocomotionCamera found, locomotion is paused");
            continue;
        };

        let direction = camera_relative_direction(input.raw(), forward);
        if direction.is_none() {
            debug!("Camera forward has no horizontal heading, skipping force and facing");
        }
        state.camera_relative_direction = direction;
        state.world_direction = direction.map(space::vec_to_world);
    }
}

/// Apply acceleration along the camera-relative direction.
///
/// Force is only added while the body is below `max_speed`; above it the
/// body coasts and is never decelerated by the controller.
pub fn apply_locomotion_force<B: LocomotionBackend>(world: &mut World) {
    let entities: Vec<(Entity, LocomotionConfig, Option<Vec3>)> = world
        .query_filtered::<(Entity, &LocomotionConfig, &LocomotionState), With<LocomotionReady>>()
        .iter(world)
        .map(|(e, config, state)| (e, *config, state.camera_relative_direction))
        .collect();

    for (entity, config, direction) in entities {
        let Some(direction) = direction else {
            continue;
        };

        let velocity = space::vec_from_world(B::get_velocity(world, entity));
        let Some(acceleration) = locomotion_force(direction, velocity, &config) else {
            continue;
        };

        let acceleration = space::vec_to_world(acceleration);
        B::add_force(world, entity, acceleration, ForceMode::Acceleration);

        if let Some(mut state) = world.get_mut::<LocomotionState>(entity) {
            state.applied_acceleration = Some(acceleration);
        }
    }
}

/// Turn the body toward the camera-relative direction.
///
/// Each tick covers `turn_speed` of the remaining rotation. Bodies without
/// a direction (no input, or a degenerate camera) keep their orientation.
pub fn apply_facing_rotation<B: LocomotionBackend>(world: &mut World) {
    let entities: Vec<(Entity, LocomotionConfig, Option<Vec3>)> = world
        .query_filtered::<(Entity, &LocomotionConfig, &LocomotionState), With<LocomotionReady>>()
        .iter(world)
        .map(|(e, config, state)| (e, *config, state.camera_relative_direction))
        .collect();

    for (entity, config, direction) in entities {
        let Some(direction) = direction else {
            continue;
        };

        let current = space::rot_from_world(B::get_rotation(world, entity));
        let Some(facing) = facing_rotation(current, direction, config.turn_speed) else {
            continue;
        };

        B::set_rotation(world, entity, space::rot_to_world(facing));

        if let Some(mut state) = world.get_mut::<LocomotionState>(entity) {
            state.facing_updated = true;
        }
    }
}

/// Select the surface friction from the raw input magnitude.
pub fn apply_friction_profile<B: LocomotionBackend>(world: &mut World) {
    let entities: Vec<(Entity, LocomotionConfig, MoveInput)> = world
        .query_filtered::<(Entity, &LocomotionConfig, &MoveInput), With<LocomotionReady>>()
        .iter(world)
        .map(|(e, config, input)| (e, *config, *input))
        .collect();

    for (entity, config, input) in entities {
        let profile = FrictionProfile::from_input(input.raw());

        if let Some(mut current) = world.get_mut::<FrictionProfile>(entity) {
            current.set_if_neq(profile);
        }
        B::set_friction_profile(world, entity, profile, &config);
    }
}

/// Feed the input magnitude to the animation parameters.
///
/// Event-driven: only bodies whose [`MoveInput`] changed since the last run
/// are updated, independent of the fixed tick.
pub fn push_animation_parameters(
    mut q: Query<(&MoveInput, &mut AnimationParameters), Changed<MoveInput>>,
) {
    for (input, mut parameters) in &mut q {
        parameters.set_parameter(MOVEMENT_INPUT_PARAMETER, input.magnitude());
    }
}

/// Drive [`MoveInput`] from keyboard bindings.
pub fn sample_keyboard_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut q: Query<(&KeyboardMoveBindings, &mut MoveInput)>,
) {
    for (bindings, mut input) in &mut q {
        let raw = bindings.sample(&keyboard);
        // Only touch the component on change so change detection stays meaningful.
        if input.raw() != raw {
            input.on_move(raw);
        }
    }
}

/// Push [`MessageConfig`] into message timers when either is new.
///
/// New labels start hidden.
pub fn apply_message_config(
    config: Res<MessageConfig>,
    mut q: Query<(&mut ContextualMessage, &mut Text, &mut TextColor)>,
) {
    for (mut message, text, color) in &mut q {
        if message.is_added() {
            message.timer.set_config(&config);
            message.timer.clear(&mut TextDisplay { text, color });
        } else if config.is_changed() {
            message.timer.set_config(&config);
        }
    }
}

/// Start messages for incoming trigger events.
///
/// Events are handled in order, so when several arrive in one frame the
/// newest one is what stays on screen.
pub fn receive_message_triggers(
    mut events: EventReader<MessageTriggered>,
    mut q: Query<(&mut ContextualMessage, &mut Text, &mut TextColor)>,
) {
    for event in events.read() {
        let trigger = MessageTrigger::from(event);
        for (mut message, text, color) in &mut q {
            let mut display = TextDisplay { text, color };
            message.timer.trigger(&trigger, &mut display);
        }
    }
}

/// Advance hold and fade timers by the frame time.
pub fn advance_contextual_messages(
    time: Res<Time>,
    mut q: Query<(&mut ContextualMessage, &mut Text, &mut TextColor)>,
) {
    let dt = time.delta_secs();
    for (mut message, text, color) in &mut q {
        if message.timer.is_idle() {
            continue;
        }
        let mut display = TextDisplay { text, color };
        message.timer.advance(dt, &mut display);
    }
}
