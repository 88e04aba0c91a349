use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::action::Action;

/// Which hand controller the runtime reports as active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveController {
    #[default]
    None,
    RightTracked,
    LeftTracked,
}

/// Device levels sampled once per frame, before any edge detection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInput {
    pub hmd_present: bool,
    pub controller: ActiveController,
    /// Keyboard select (space).
    pub key_select: bool,
    /// Keyboard back (return).
    pub key_back: bool,
    /// Arrow keys: `x` horizontal, `y` vertical, each in `[-1, 1]`.
    pub arrows: Vec2,
    pub index_trigger: bool,
    /// Touchpad click ("button one").
    pub touchpad_click: bool,
    pub touchpad: Vec2,
    pub back_button: bool,
}

/// Level plus edges for one logical button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    pub pressed: bool,
    pub just_pressed: bool,
    pub just_released: bool,
}

impl ButtonState {
    pub fn from_levels(was: bool, is: bool) -> Self {
        Self {
            pressed: is,
            just_pressed: is && !was,
            just_released: was && !is,
        }
    }
}

/// Everything a behavior may know about input for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputSnapshot {
    pub hmd_present: bool,
    pub controller: ActiveController,
    pub actions: Vec<Action>,
}

impl InputSnapshot {
    /// Keyboard-and-screen embodiment, no actions.
    pub fn desktop() -> Self {
        Self::default()
    }

    /// Headset embodiment with the given active controller, no actions.
    pub fn vr(controller: ActiveController) -> Self {
        Self {
            hmd_present: true,
            controller,
            actions: Vec::new(),
        }
    }

    pub fn with(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn has(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    /// Vertical touch position when the touchpad is clicked.
    pub fn step(&self) -> Option<f32> {
        self.actions.iter().find_map(|a| match a {
            Action::Step(y) => Some(*y),
            _ => None,
        })
    }

    /// Desktop turn/walk axes when any arrow is held.
    pub fn steer(&self) -> Option<Vec2> {
        self.actions.iter().find_map(|a| match a {
            Action::Steer(v) => Some(*v),
            _ => None,
        })
    }
}

/// Turns per-frame device levels into snapshots with edges.
///
/// Keyboard and controller buttons that mean the same thing are merged
/// before edge detection, so holding both never produces a double edge.
#[derive(Debug, Clone, Default)]
pub struct InputTracker {
    previous: RawInput,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, raw: RawInput) -> InputSnapshot {
        let prev = std::mem::replace(&mut self.previous, raw);

        let select = ButtonState::from_levels(
            prev.key_select || prev.index_trigger,
            raw.key_select || raw.index_trigger,
        );
        let back = ButtonState::from_levels(
            prev.key_back || prev.back_button,
            raw.key_back || raw.back_button,
        );

        let mut actions = Vec::new();
        if select.just_pressed {
            actions.push(Action::Grab);
        }
        if select.just_released {
            actions.push(Action::Release);
        }
        if select.pressed {
            actions.push(Action::Start);
        }
        if back.just_pressed {
            actions.push(Action::Reset);
        }
        let touch = finite_or_zero(raw.touchpad.y);
        if raw.touchpad_click {
            actions.push(Action::Step(touch.clamp(-1.0, 1.0)));
        }
        let arrows = Vec2::new(finite_or_zero(raw.arrows.x), finite_or_zero(raw.arrows.y));
        if arrows != Vec2::ZERO {
            actions.push(Action::Steer(arrows.clamp(Vec2::NEG_ONE, Vec2::ONE)));
        }

        tracing::trace!(?actions, "input sampled");
        InputSnapshot {
            hmd_present: raw.hmd_present,
            controller: raw.controller,
            actions,
        }
    }
}

/// Axis levels that are NaN or infinite read as centred.
fn finite_or_zero(level: f32) -> f32 {
    if level.is_finite() { level } else { 0.0 }
}
