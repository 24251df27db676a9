//! Contextual message timer.
//!
//! A transient on-screen message that appears at full opacity when a trigger
//! fires, holds for a while, then fades out linearly:
//!
//! ```text
//! Idle ──trigger──▶ Showing ──hold elapsed──▶ FadingOut ──fade done──▶ Idle
//!   ▲                  ▲                          │
//!   └──────────────────┴────── trigger ───────────┘   (preempts, alpha = 1)
//! ```
//!
//! [`MessageTimer`] is the state machine, advanced by an external clock.
//! [`ContextualMessageController`] pairs it with a display and a
//! [`MessageBus`] subscription for hosts without Bevy. In Bevy the
//! [`ContextualMessage`] component plays the same role and
//! [`MessageTriggered`] events are the bus.

use std::collections::{HashMap, VecDeque};

use bevy::color::Alpha;
use bevy::prelude::*;

use crate::config::MessageConfig;
use crate::interfaces::MessageDisplay;

/// A request to show a message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageTrigger {
    pub message: String,
    /// Hold duration in seconds; `None` uses [`MessageConfig::default_duration`].
    pub duration: Option<f32>,
}

impl MessageTrigger {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration = Some(seconds);
        self
    }
}

/// Phase of the message timer.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Default)]
pub enum MessagePhase {
    /// Nothing shown, alpha 0.
    #[default]
    Idle,
    /// Fully visible, counting down the hold time.
    Showing { remaining: f32 },
    /// Fading from 1 to 0.
    FadingOut { elapsed: f32 },
}

/// Hold-then-fade state machine for one message slot.
///
/// At most one message is active; a new trigger always cancels whatever is
/// in flight and restarts from full opacity.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct MessageTimer {
    phase: MessagePhase,
    alpha: f32,
    text: String,
    fade_out_duration: f32,
    default_duration: f32,
}

impl Default for MessageTimer {
    fn default() -> Self {
        Self::new(&MessageConfig::default())
    }
}

impl MessageTimer {
    pub fn new(config: &MessageConfig) -> Self {
        Self {
            phase: MessagePhase::Idle,
            alpha: 0.0,
            text: String::new(),
            fade_out_duration: config.fade_out_duration.max(0.0),
            default_duration: config.default_duration.max(0.0),
        }
    }

    /// Apply new timing. Takes effect from the next trigger or fade.
    pub fn set_config(&mut self, config: &MessageConfig) {
        self.fade_out_duration = config.fade_out_duration.max(0.0);
        self.default_duration = config.default_duration.max(0.0);
    }

    pub fn phase(&self) -> MessagePhase {
        self.phase
    }

    /// Current opacity, always in `[0, 1]`.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, MessagePhase::Idle)
    }

    /// Show a message, preempting any message in flight.
    pub fn trigger(&mut self, trigger: &MessageTrigger, display: &mut impl MessageDisplay) {
        let hold = trigger.duration.unwrap_or(self.default_duration);
        let hold = if hold.is_finite() { hold.max(0.0) } else { 0.0 };

        if !self.is_idle() {
            debug!("Message \"{}\" preempted by \"{}\"", self.text, trigger.message);
        }

        self.phase = MessagePhase::Showing { remaining: hold };
        self.alpha = 1.0;
        self.text.clone_from(&trigger.message);
        display.set_text(&self.text);
        display.set_alpha(self.alpha);
    }

    /// Advance the clock by `dt` seconds and push the result to `display`.
    pub fn advance(&mut self, dt: f32, display: &mut impl MessageDisplay) {
        let dt = dt.max(0.0);
        match self.phase {
            MessagePhase::Idle => return,
            MessagePhase::Showing { remaining } => {
                if dt < remaining {
                    self.phase = MessagePhase::Showing {
                        remaining: remaining - dt,
                    };
                    return;
                }
                // Carry the overshoot into the fade.
                self.phase = MessagePhase::FadingOut {
                    elapsed: dt - remaining,
                };
                debug!("Message \"{}\" fading out", self.text);
            }
            MessagePhase::FadingOut { elapsed } => {
                self.phase = MessagePhase::FadingOut {
                    elapsed: elapsed + dt,
                };
            }
        }

        if let MessagePhase::FadingOut { elapsed } = self.phase {
            if elapsed >= self.fade_out_duration {
                self.clear(display);
            } else {
                self.alpha = (1.0 - elapsed / self.fade_out_duration).clamp(0.0, 1.0);
                display.set_alpha(self.alpha);
            }
        }
    }

    /// Cancel any message and return to idle.
    pub fn clear(&mut self, display: &mut impl MessageDisplay) {
        self.phase = MessagePhase::Idle;
        self.alpha = 0.0;
        self.text.clear();
        display.set_alpha(0.0);
        display.set_text("");
    }
}

/// Handle returned by [`MessageBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Explicit publish/subscribe channel for message triggers.
///
/// Each subscriber gets its own queue; publishing while nobody is subscribed
/// drops the trigger.
#[derive(Debug, Default)]
pub struct MessageBus {
    next_id: u64,
    queues: HashMap<SubscriptionId, VecDeque<MessageTrigger>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.queues.insert(id, VecDeque::new());
        id
    }

    /// Remove a subscriber and drop anything still queued for it.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.queues.remove(&id);
    }

    pub fn publish(&mut self, trigger: MessageTrigger) {
        for queue in self.queues.values_mut() {
            queue.push_back(trigger.clone());
        }
    }

    /// Take everything queued for a subscriber, oldest first.
    pub fn drain(&mut self, id: SubscriptionId) -> Vec<MessageTrigger> {
        self.queues
            .get_mut(&id)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.queues.len()
    }
}

/// Headless message controller: a timer, its display and a bus subscription.
///
/// Subscribes on [`enable`](Self::enable) and unsubscribes on
/// [`disable`](Self::disable); while disabled, triggers are not received.
pub struct ContextualMessageController<D: MessageDisplay> {
    timer: MessageTimer,
    display: D,
    subscription: Option<SubscriptionId>,
}

impl<D: MessageDisplay> ContextualMessageController<D> {
    /// Create a controller and hide the display.
    pub fn new(config: &MessageConfig, mut display: D) -> Self {
        let mut timer = MessageTimer::new(config);
        timer.clear(&mut display);
        Self {
            timer,
            display,
            subscription: None,
        }
    }

    /// Subscribe to `bus`. Does nothing if already enabled.
    pub fn enable(&mut self, bus: &mut MessageBus) {
        if self.subscription.is_none() {
            self.subscription = Some(bus.subscribe());
        }
    }

    /// Unsubscribe; triggers published afterwards are not received.
    pub fn disable(&mut self, bus: &mut MessageBus) {
        if let Some(id) = self.subscription.take() {
            bus.unsubscribe(id);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.subscription.is_some()
    }

    /// Advance the timer by `dt`, then receive pending triggers.
    ///
    /// A message received here starts with its full hold. Triggers are
    /// handled in order, so the newest one wins.
    pub fn update(&mut self, dt: f32, bus: &mut MessageBus) {
        self.timer.advance(dt, &mut self.display);
        if let Some(id) = self.subscription {
            for trigger in bus.drain(id) {
                self.timer.trigger(&trigger, &mut self.display);
            }
        }
    }

    /// Show a message directly, bypassing the bus.
    pub fn show(&mut self, trigger: &MessageTrigger) {
        self.timer.trigger(trigger, &mut self.display);
    }

    pub fn timer(&self) -> &MessageTimer {
        &self.timer
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}

/// Event that shows a contextual message.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct MessageTriggered {
    pub message: String,
    pub duration: Option<f32>,
}

impl MessageTriggered {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration = Some(seconds);
        self
    }
}

impl From<&MessageTriggered> for MessageTrigger {
    fn from(event: &MessageTriggered) -> Self {
        Self {
            message: event.message.clone(),
            duration: event.duration,
        }
    }
}

/// A text entity that shows contextual messages.
///
/// The timer drives the entity's [`Text`] and the alpha of its [`TextColor`].
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
#[require(Text, TextColor)]
pub struct ContextualMessage {
    pub timer: MessageTimer,
}

impl ContextualMessage {
    pub fn new(config: &MessageConfig) -> Self {
        Self {
            timer: MessageTimer::new(config),
        }
    }
}

/// A region that shows a message when a controlled body enters it.
///
/// Requires a sensor collider from the physics backend; see
/// `rapier::trigger_message_zones`.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct MessageTriggerZone {
    pub message: String,
    pub duration: Option<f32>,
    /// Fire only the first time a body enters.
    pub once: bool,
    pub(crate) fired: bool,
}

impl MessageTriggerZone {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration: None,
            once: false,
            fired: false,
        }
    }

    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Produce the event for a body entering, or `None` if spent.
    pub fn enter(&mut self) -> Option<MessageTriggered> {
        if self.once && self.fired {
            return None;
        }
        self.fired = true;
        Some(MessageTriggered {
            message: self.message.clone(),
            duration: self.duration,
        })
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

/// [`MessageDisplay`] over a Bevy text entity's components.
pub struct TextDisplay<'a> {
    pub text: Mut<'a, Text>,
    pub color: Mut<'a, TextColor>,
}

impl MessageDisplay for TextDisplay<'_> {
    fn set_alpha(&mut self, alpha: f32) {
        self.color.0.set_alpha(alpha);
    }

    fn set_text(&mut self, text: &str) {
        if self.text.0 != text {
            self.text.0 = text.to_owned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct RecordingDisplay {
        alpha: f32,
        text: String,
        alphas: Vec<f32>,
    }

    impl MessageDisplay for RecordingDisplay {
        fn set_alpha(&mut self, alpha: f32) {
            self.alpha = alpha;
            self.alphas.push(alpha);
        }

        fn set_text(&mut self, text: &str) {
            self.text = text.to_owned();
        }
    }

    fn config() -> MessageConfig {
        MessageConfig::default()
            .with_fade_out_duration(1.0)
            .with_default_duration(2.0)
    }

    #[test]
    fn starts_idle_and_invisible() {
        let timer = MessageTimer::new(&config());
        assert!(timer.is_idle());
        assert_eq!(timer.alpha(), 0.0);
        assert_eq!(timer.text(), "");
    }

    #[test]
    fn trigger_shows_at_full_alpha() {
        let mut timer = MessageTimer::new(&config());
        let mut display = RecordingDisplay::default();
        timer.trigger(&MessageTrigger::new("Hello").with_duration(2.0), &mut display);

        assert_eq!(timer.phase(), MessagePhase::Showing { remaining: 2.0 });
        assert_eq!(display.alpha, 1.0);
        assert_eq!(display.text, "Hello");
    }

    #[test]
    fn missing_duration_uses_default() {
        let mut timer = MessageTimer::new(&config());
        let mut display = RecordingDisplay::default();
        timer.trigger(&MessageTrigger::new("Hi"), &mut display);
        assert_eq!(timer.phase(), MessagePhase::Showing { remaining: 2.0 });
    }

    #[test]
    fn holds_then_fades_linearly_then_idles() {
        let mut timer = MessageTimer::new(&config());
        let mut display = RecordingDisplay::default();
        timer.trigger(&MessageTrigger::new("Hello").with_duration(1.0), &mut display);

        timer.advance(0.5, &mut display);
        assert_eq!(display.alpha, 1.0);
        assert!(matches!(timer.phase(), MessagePhase::Showing { .. }));

        // Hold ends with 0.25 s of overshoot carried into the fade.
        timer.advance(0.75, &mut display);
        assert!(matches!(timer.phase(), MessagePhase::FadingOut { .. }));
        assert!((display.alpha - 0.75).abs() < 1e-5);

        timer.advance(0.5, &mut display);
        assert!((display.alpha - 0.25).abs() < 1e-5);

        timer.advance(0.5, &mut display);
        assert!(timer.is_idle());
        assert_eq!(display.alpha, 0.0);
        assert_eq!(display.text, "");
    }

    #[test]
    fn alpha_stays_in_unit_range() {
        let mut timer = MessageTimer::new(&config());
        let mut display = RecordingDisplay::default();
        timer.trigger(&MessageTrigger::new("Hello").with_duration(0.1), &mut display);
        for _ in 0..200 {
            timer.advance(1.0 / 60.0, &mut display);
        }
        assert!(display.alphas.iter().all(|a| (0.0..=1.0).contains(a)));
        assert!(timer.is_idle());
    }

    #[test]
    fn alpha_is_monotonic_during_fade() {
        let mut timer = MessageTimer::new(&config());
        let mut display = RecordingDisplay::default();
        timer.trigger(&MessageTrigger::new("Hello").with_duration(0.0), &mut display);
        for _ in 0..100 {
            timer.advance(1.0 / 60.0, &mut display);
        }
        assert!(display.alphas.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn retrigger_before_fade_keeps_only_latest() {
        let mut timer = MessageTimer::new(&config());
        let mut display = RecordingDisplay::default();
        timer.trigger(&MessageTrigger::new("Hello").with_duration(2.0), &mut display);
        timer.trigger(&MessageTrigger::new("World").with_duration(1.0), &mut display);

        assert_eq!(display.text, "World");
        assert_eq!(timer.phase(), MessagePhase::Showing { remaining: 1.0 });

        // Past the second hold but before the first would have ended: fading.
        timer.advance(1.5, &mut display);
        assert!(matches!(timer.phase(), MessagePhase::FadingOut { .. }));
        timer.advance(1.0, &mut display);
        assert!(timer.is_idle());

        // Nothing from the first trigger resurfaces afterwards.
        let count = display.alphas.len();
        timer.advance(5.0, &mut display);
        assert_eq!(display.alphas.len(), count);
    }

    #[test]
    fn retrigger_mid_fade_restores_full_alpha() {
        let mut timer = MessageTimer::new(&config());
        let mut display = RecordingDisplay::default();
        timer.trigger(&MessageTrigger::new("Hello").with_duration(0.0), &mut display);
        timer.advance(0.5, &mut display);
        assert!(display.alpha < 1.0);

        timer.trigger(&MessageTrigger::new("Again").with_duration(1.0), &mut display);
        assert_eq!(display.alpha, 1.0);
        assert_eq!(timer.phase(), MessagePhase::Showing { remaining: 1.0 });
    }

    #[test]
    fn zero_fade_duration_goes_straight_to_idle() {
        let mut timer = MessageTimer::new(&config().with_fade_out_duration(0.0));
        let mut display = RecordingDisplay::default();
        timer.trigger(&MessageTrigger::new("Blink").with_duration(0.1), &mut display);
        timer.advance(0.2, &mut display);
        assert!(timer.is_idle());
        assert_eq!(display.alpha, 0.0);
    }

    #[test]
    fn negative_duration_is_treated_as_zero() {
        let mut timer = MessageTimer::new(&config());
        let mut display = RecordingDisplay::default();
        timer.trigger(&MessageTrigger::new("Oops").with_duration(-3.0), &mut display);
        assert_eq!(timer.phase(), MessagePhase::Showing { remaining: 0.0 });
    }

    #[test]
    fn bus_delivers_only_to_subscribers() {
        let mut bus = MessageBus::new();
        bus.publish(MessageTrigger::new("lost"));

        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.publish(MessageTrigger::new("one"));
        bus.unsubscribe(b);
        bus.publish(MessageTrigger::new("two"));

        let received: Vec<_> = bus.drain(a).into_iter().map(|t| t.message).collect();
        assert_eq!(received, vec!["one", "two"]);
        assert!(bus.drain(b).is_empty());
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn controller_reacts_only_while_enabled() {
        let mut bus = MessageBus::new();
        let mut controller = ContextualMessageController::new(&config(), RecordingDisplay::default());

        bus.publish(MessageTrigger::new("ignored"));
        controller.update(0.0, &mut bus);
        assert!(controller.timer().is_idle());

        controller.enable(&mut bus);
        bus.publish(MessageTrigger::new("Hello").with_duration(2.0));
        bus.publish(MessageTrigger::new("World").with_duration(1.0));
        controller.update(0.0, &mut bus);
        assert_eq!(controller.display().text, "World");
        assert_eq!(controller.timer().alpha(), 1.0);

        controller.disable(&mut bus);
        assert!(!controller.is_enabled());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn received_message_keeps_full_hold() {
        let mut bus = MessageBus::new();
        let mut controller = ContextualMessageController::new(&config(), RecordingDisplay::default());
        controller.enable(&mut bus);

        bus.publish(MessageTrigger::new("Hi").with_duration(0.5));
        controller.update(0.4, &mut bus);
        assert_eq!(
            controller.timer().phase(),
            MessagePhase::Showing { remaining: 0.5 }
        );
        assert_eq!(controller.timer().alpha(), 1.0);

        // A hold shorter than the frame is still shown before it fades.
        bus.publish(MessageTrigger::new("Flash").with_duration(0.1));
        controller.update(1.5, &mut bus);
        assert_eq!(controller.display().text, "Flash");
        assert_eq!(controller.timer().alpha(), 1.0);
        assert!(matches!(
            controller.timer().phase(),
            MessagePhase::Showing { .. }
        ));
    }

    #[test]
    fn trigger_zone_once() {
        let mut zone = MessageTriggerZone::new("Door locked").with_duration(1.5).once();
        let event = zone.enter().unwrap();
        assert_eq!(event.message, "Door locked");
        assert_eq!(event.duration, Some(1.5));
        assert!(zone.enter().is_none());
    }

    #[test]
    fn trigger_zone_repeating() {
        let mut zone = MessageTriggerZone::new("Welcome");
        assert!(zone.enter().is_some());
        assert!(zone.enter().is_some());
        assert!(zone.has_fired());
    }
}
