//! Movement input components.
//!
//! [`MoveInput`] holds the latest raw 2D axis vector delivered by the input
//! layer. The fixed-tick systems sample whatever value is current; if no new
//! input arrived since the previous tick the last value persists.

use bevy::prelude::*;

/// Latest raw movement input for a controlled body.
///
/// The vector is not normalized: a diagonal key press yields a magnitude of
/// about 1.41. Range limiting is the input layer's responsibility.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_locomotion::prelude::*;
///
/// let mut input = MoveInput::default();
/// assert!(input.on_move(Vec2::new(1.0, 1.0)));
/// assert!(!input.on_move(Vec2::new(1.0, 1.0)));
/// assert!((input.magnitude() - 2f32.sqrt()).abs() < 1e-6);
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[reflect(Component)]
pub struct MoveInput {
    raw: Vec2,
}

impl MoveInput {
    pub fn new(raw: Vec2) -> Self {
        Self { raw }
    }

    /// Input callback. Returns `true` if the value changed.
    pub fn on_move(&mut self, raw: Vec2) -> bool {
        if self.raw == raw {
            return false;
        }
        self.raw = raw;
        true
    }

    /// The raw axis pair.
    #[inline]
    pub fn raw(&self) -> Vec2 {
        self.raw
    }

    /// Magnitude of the raw input, fed to the animation system.
    #[inline]
    pub fn magnitude(&self) -> f32 {
        self.raw.length()
    }

    /// Check if there is any input at all.
    pub fn is_active(&self) -> bool {
        self.magnitude() > 0.0
    }

    pub fn clear(&mut self) {
        self.raw = Vec2::ZERO;
    }
}

/// Keyboard bindings that drive a body's [`MoveInput`].
///
/// Each axis is sampled raw: -1, 0 or 1, with opposite keys cancelling out.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct KeyboardMoveBindings {
    pub left: Vec<KeyCode>,
    pub right: Vec<KeyCode>,
    pub down: Vec<KeyCode>,
    pub up: Vec<KeyCode>,
}

impl Default for KeyboardMoveBindings {
    fn default() -> Self {
        Self {
            left: vec![KeyCode::KeyA, KeyCode::ArrowLeft],
            right: vec![KeyCode::KeyD, KeyCode::ArrowRight],
            down: vec![KeyCode::KeyS, KeyCode::ArrowDown],
            up: vec![KeyCode::KeyW, KeyCode::ArrowUp],
        }
    }
}

impl KeyboardMoveBindings {
    /// Sample the raw axis pair (horizontal, vertical) from the keyboard.
    pub fn sample(&self, keyboard: &ButtonInput<KeyCode>) -> Vec2 {
        Vec2::new(
            axis(keyboard, &self.left, &self.right),
            axis(keyboard, &self.down, &self.up),
        )
    }
}

fn axis(keyboard: &ButtonInput<KeyCode>, negative: &[KeyCode], positive: &[KeyCode]) -> f32 {
    let mut value = 0.0;
    if keyboard.any_pressed(positive.iter().copied()) {
        value += 1.0;
    }
    if keyboard.any_pressed(negative.iter().copied()) {
        value -= 1.0;
    }
    value
}
