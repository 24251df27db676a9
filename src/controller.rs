//! Headless locomotion controller.
//!
//! [`LocomotionController`] runs the same pipeline as the Bevy systems but is
//! driven by a host loop: call [`init`](LocomotionController::init) once,
//! [`on_move`](LocomotionController::on_move) on every input event and
//! [`on_physics_tick`](LocomotionController::on_physics_tick) once per fixed
//! physics step. Collaborators are injected through
//! [`LocomotionControllerBuilder`] and validated before the first tick.

use bevy::prelude::*;

use crate::config::LocomotionConfig;
use crate::error::ConfigError;
use crate::interfaces::{AnimationSink, CameraView, ForceMode, FrictionSurface, PhysicsBody};
use crate::locomotion::LocomotionStep;
use crate::state::{FrictionProfile, MOVEMENT_INPUT_PARAMETER};

/// Camera-relative locomotion for one rigid body.
pub struct LocomotionController {
    config: LocomotionConfig,
    input: Vec2,
    body: Box<dyn PhysicsBody>,
    camera: Box<dyn CameraView>,
    surface: Box<dyn FrictionSurface>,
    animation: Box<dyn AnimationSink>,
}

impl LocomotionController {
    /// Start building a controller with the given tuning.
    pub fn builder(config: LocomotionConfig) -> LocomotionControllerBuilder {
        LocomotionControllerBuilder {
            config,
            body: None,
            camera: None,
            surface: None,
            animation: None,
        }
    }

    /// Put the collaborators into their resting state.
    ///
    /// Clears the input, selects the stopping friction profile and zeroes the
    /// animation parameter.
    pub fn init(&mut self) {
        self.input = Vec2::ZERO;
        self.surface.set_friction_profile(FrictionProfile::Stopping);
        self.animation.set_parameter(MOVEMENT_INPUT_PARAMETER, 0.0);
        info!(
            "Locomotion controller initialized (accel={}, max_speed={}, turn_speed={})",
            self.config.acceleration_force, self.config.max_speed, self.config.turn_speed
        );
    }

    /// Input callback: store the raw axis pair and feed the animation system.
    ///
    /// The animation feed is event-driven and does not wait for the next
    /// physics tick.
    pub fn on_move(&mut self, input: Vec2) {
        self.input = input;
        self.animation
            .set_parameter(MOVEMENT_INPUT_PARAMETER, input.length());
    }

    /// Run one fixed physics step.
    ///
    /// Samples the latest input, transforms it by the camera yaw, then
    /// proposes force, facing and friction to the collaborators.
    pub fn on_physics_tick(&mut self, dt: f32) -> LocomotionStep {
        let step = LocomotionStep::evaluate(
            &self.config,
            self.input,
            self.camera.forward(),
            self.body.velocity(),
            self.body.rotation(),
        );

        match step.direction {
            Some(direction) => trace!(dt, ?direction, "locomotion tick"),
            None => debug!("Camera forward has no horizontal heading, skipping force and facing"),
        }

        if let Some(acceleration) = step.acceleration {
            self.body.add_force(acceleration, ForceMode::Acceleration);
        }
        if let Some(facing) = step.facing {
            self.body.set_rotation(facing);
        }
        self.surface.set_friction_profile(step.friction);

        step
    }

    /// The latest input sample.
    pub fn input(&self) -> Vec2 {
        self.input
    }

    /// The current tuning.
    pub fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    /// Replace the tuning. Rejected if out of range.
    pub fn set_config(&mut self, config: LocomotionConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }
}

/// Builder that injects the collaborators of a [`LocomotionController`].
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_locomotion::prelude::*;
///
/// struct Body { velocity: Vec3, rotation: Quat }
/// impl PhysicsBody for Body {
///     fn velocity(&self) -> Vec3 { self.velocity }
///     fn add_force(&mut self, force: Vec3, _mode: ForceMode) { self.velocity += force / 60.0; }
///     fn rotation(&self) -> Quat { self.rotation }
///     fn set_rotation(&mut self, rotation: Quat) { self.rotation = rotation; }
/// }
///
/// struct FixedCamera;
/// impl CameraView for FixedCamera {
///     fn forward(&self) -> Vec3 { Vec3::Z }
/// }
///
/// let mut controller = LocomotionController::builder(LocomotionConfig::default())
///     .body(Body { velocity: Vec3::ZERO, rotation: Quat::IDENTITY })
///     .camera(FixedCamera)
///     .surface(FrictionProfile::default())
///     .animation(AnimationParameters::default())
///     .build()
///     .unwrap();
///
/// controller.init();
/// controller.on_move(Vec2::X);
/// let step = controller.on_physics_tick(1.0 / 60.0);
/// assert!(step.acceleration.is_some());
/// ```
pub struct LocomotionControllerBuilder {
    config: LocomotionConfig,
    body: Option<Box<dyn PhysicsBody>>,
    camera: Option<Box<dyn CameraView>>,
    surface: Option<Box<dyn FrictionSurface>>,
    animation: Option<Box<dyn AnimationSink>>,
}

impl LocomotionControllerBuilder {
    /// The rigid body to drive.
    pub fn body(mut self, body: impl PhysicsBody + 'static) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    /// The view movement input is relative to.
    pub fn camera(mut self, camera: impl CameraView + 'static) -> Self {
        self.camera = Some(Box::new(camera));
        self
    }

    /// The collision surface whose friction follows the input.
    pub fn surface(mut self, surface: impl FrictionSurface + 'static) -> Self {
        self.surface = Some(Box::new(surface));
        self
    }

    /// The receiver of the `movementInput` parameter.
    pub fn animation(mut self, animation: impl AnimationSink + 'static) -> Self {
        self.animation = Some(Box::new(animation));
        self
    }

    /// Validate the config and collaborators and build the controller.
    pub fn build(self) -> Result<LocomotionController, ConfigError> {
        self.config.validate()?;
        let body = self.body.ok_or(ConfigError::MissingCollaborator("physics body"))?;
        let camera = self.camera.ok_or(ConfigError::MissingCollaborator("camera"))?;
        let surface = self
            .surface
            .ok_or(ConfigError::MissingCollaborator("friction surface"))?;
        let animation = self
            .animation
            .ok_or(ConfigError::MissingCollaborator("animation sink"))?;

        Ok(LocomotionController {
            config: self.config,
            input: Vec2::ZERO,
            body,
            camera,
            surface,
            animation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct BodyLog {
        velocity: Vec3,
        rotation: Quat,
        forces: Vec<(Vec3, ForceMode)>,
    }

    #[derive(Clone, Default)]
    struct SharedBody(Rc<RefCell<BodyLog>>);

    impl PhysicsBody for SharedBody {
        fn velocity(&self) -> Vec3 {
            self.0.borrow().velocity
        }
        fn add_force(&mut self, force: Vec3, mode: ForceMode) {
            self.0.borrow_mut().forces.push((force, mode));
        }
        fn rotation(&self) -> Quat {
            self.0.borrow().rotation
        }
        fn set_rotation(&mut self, rotation: Quat) {
            self.0.borrow_mut().rotation = rotation;
        }
    }

    #[derive(Clone)]
    struct SharedCamera(Rc<RefCell<Vec3>>);

    impl CameraView for SharedCamera {
        fn forward(&self) -> Vec3 {
            *self.0.borrow()
        }
    }

    #[derive(Clone, Default)]
    struct SharedSurface(Rc<RefCell<Vec<FrictionProfile>>>);

    impl FrictionSurface for SharedSurface {
        fn set_friction_profile(&mut self, profile: FrictionProfile) {
            self.0.borrow_mut().push(profile);
        }
    }

    #[derive(Clone, Default)]
    struct SharedAnimation(Rc<RefCell<Vec<(String, f32)>>>);

    impl AnimationSink for SharedAnimation {
        fn set_parameter(&mut self, name: &str, value: f32) {
            self.0.borrow_mut().push((name.to_owned(), value));
        }
    }

    struct Harness {
        controller: LocomotionController,
        body: SharedBody,
        camera: SharedCamera,
        surface: SharedSurface,
        animation: SharedAnimation,
    }

    fn harness(config: LocomotionConfig) -> Harness {
        let body = SharedBody::default();
        body.0.borrow_mut().rotation = Quat::IDENTITY;
        let camera = SharedCamera(Rc::new(RefCell::new(Vec3::Z)));
        let surface = SharedSurface::default();
        let animation = SharedAnimation::default();

        let mut controller = LocomotionController::builder(config)
            .body(body.clone())
            .camera(camera.clone())
            .surface(surface.clone())
            .animation(animation.clone())
            .build()
            .unwrap();
        controller.init();

        Harness {
            controller,
            body,
            camera,
            surface,
            animation,
        }
    }

    #[test]
    fn build_fails_without_body() {
        let result = LocomotionController::builder(LocomotionConfig::default())
            .camera(SharedCamera(Rc::new(RefCell::new(Vec3::Z))))
            .surface(SharedSurface::default())
            .animation(SharedAnimation::default())
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::MissingCollaborator("physics body"))
        ));
    }

    #[test]
    fn build_fails_without_camera() {
        let result = LocomotionController::builder(LocomotionConfig::default())
            .body(SharedBody::default())
            .surface(SharedSurface::default())
            .animation(SharedAnimation::default())
            .build();
        assert!(matches!(result, Err(ConfigError::MissingCollaborator("camera"))));
    }

    #[test]
    fn build_fails_with_invalid_config() {
        let config = LocomotionConfig {
            max_speed: -1.0,
            ..default()
        };
        let result = LocomotionController::builder(config)
            .body(SharedBody::default())
            .camera(SharedCamera(Rc::new(RefCell::new(Vec3::Z))))
            .surface(SharedSurface::default())
            .animation(SharedAnimation::default())
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { name: "max_speed", .. })
        ));
    }

    #[test]
    fn init_rests_collaborators() {
        let h = harness(LocomotionConfig::default());
        assert_eq!(*h.surface.0.borrow(), vec![FrictionProfile::Stopping]);
        assert_eq!(
            *h.animation.0.borrow(),
            vec![(MOVEMENT_INPUT_PARAMETER.to_owned(), 0.0)]
        );
    }

    #[test]
    fn end_to_end_single_tick() {
        let config = LocomotionConfig::default()
            .with_acceleration_force(10.0)
            .with_max_speed(2.0);
        let mut h = harness(config);

        h.controller.on_move(Vec2::new(1.0, 0.0));
        h.controller.on_physics_tick(1.0 / 50.0);

        let forces = h.body.0.borrow().forces.clone();
        assert_eq!(forces.len(), 1);
        let (force, mode) = forces[0];
        assert_eq!(mode, ForceMode::Acceleration);
        assert!((force - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-5);

        assert_eq!(h.surface.0.borrow().last(), Some(&FrictionProfile::Moving));
        assert_eq!(
            h.animation.0.borrow().last(),
            Some(&(MOVEMENT_INPUT_PARAMETER.to_owned(), 1.0))
        );
    }

    #[test]
    fn idle_ticks_apply_nothing() {
        let mut h = harness(LocomotionConfig::default());
        let start = Quat::from_rotation_y(0.8);
        h.body.0.borrow_mut().rotation = start;

        h.controller.on_move(Vec2::ZERO);
        for _ in 0..5 {
            h.controller.on_physics_tick(1.0 / 50.0);
        }

        assert!(h.body.0.borrow().forces.is_empty());
        assert_eq!(h.body.0.borrow().rotation, start);
        // init + 5 ticks, all stopping
        let profiles = h.surface.0.borrow();
        assert_eq!(profiles.len(), 6);
        assert!(profiles.iter().all(|p| *p == FrictionProfile::Stopping));
    }

    #[test]
    fn input_persists_between_events() {
        let mut h = harness(LocomotionConfig::default());
        h.controller.on_move(Vec2::Y);
        for _ in 0..3 {
            h.controller.on_physics_tick(1.0 / 50.0);
        }
        assert_eq!(h.body.0.borrow().forces.len(), 3);
        // Only the one input event reached the animation sink after init.
        assert_eq!(h.animation.0.borrow().len(), 2);
    }

    #[test]
    fn no_force_at_speed_cap() {
        let mut h = harness(LocomotionConfig::default());
        h.body.0.borrow_mut().velocity = Vec3::new(0.0, 0.0, 2.5);
        h.controller.on_move(Vec2::Y);
        let step = h.controller.on_physics_tick(1.0 / 50.0);

        assert!(step.acceleration.is_none());
        assert!(h.body.0.borrow().forces.is_empty());
        // Still turns and uses moving friction while over the cap.
        assert!(step.facing.is_some());
        assert_eq!(h.surface.0.borrow().last(), Some(&FrictionProfile::Moving));
    }

    #[test]
    fn body_turns_toward_camera_relative_direction() {
        let mut h = harness(LocomotionConfig::default().with_turn_speed(0.5));
        *h.camera.0.borrow_mut() = Vec3::X;
        h.controller.on_move(Vec2::Y);

        let target = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let mut error = h.body.0.borrow().rotation.angle_between(target);
        for _ in 0..6 {
            h.controller.on_physics_tick(1.0 / 50.0);
            let next = h.body.0.borrow().rotation.angle_between(target);
            assert!(next < error);
            error = next;
        }
        assert!(error < 0.05);
    }

    #[test]
    fn degenerate_camera_skips_force_and_facing() {
        let mut h = harness(LocomotionConfig::default());
        *h.camera.0.borrow_mut() = Vec3::NEG_Y;
        h.controller.on_move(Vec2::X);
        let step = h.controller.on_physics_tick(1.0 / 50.0);

        assert!(step.direction.is_none());
        assert!(h.body.0.borrow().forces.is_empty());
        assert_eq!(h.body.0.borrow().rotation, Quat::IDENTITY);
        assert_eq!(h.surface.0.borrow().last(), Some(&FrictionProfile::Moving));
    }

    #[test]
    fn diagonal_input_feeds_unnormalized_magnitude() {
        let mut h = harness(LocomotionConfig::default());
        h.controller.on_move(Vec2::new(1.0, 1.0));
        let (_, value) = h.animation.0.borrow().last().cloned().unwrap();
        assert!((value - std::f32::consts::SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn set_config_rejects_invalid_values() {
        let mut h = harness(LocomotionConfig::default());
        let bad = LocomotionConfig {
            turn_speed: 2.0,
            ..default()
        };
        assert!(h.controller.set_config(bad).is_err());
        assert_eq!(h.controller.config().turn_speed, 0.1);
    }
}
