//! Canned input sequences for running the session without devices.

use glam::Vec2;
use keyroom_input::{ActiveController, RawInput};

/// Frame on which the desktop script presses select over the key.
const GRAB_FRAME: u64 = 5;
/// First frame of walking forward.
const WALK_FROM: u64 = 6;
/// Frame on which select is let go, throwing the key.
const THROW_FRAME: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Script {
    /// Start, then do nothing.
    #[default]
    Idle,
    /// Desktop: start, pick up the key, walk, throw it at the door, walk on
    /// through to the goal.
    WalkThrow,
    /// Headset: start with the trigger, then hold the touchpad forward.
    VrStroll,
}

impl Script {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WalkThrow => "walk-throw",
            Self::VrStroll => "vr-stroll",
        }
    }

    /// Enough frames at 50 Hz for the script to play out.
    pub fn default_frames(&self) -> u64 {
        match self {
            Self::Idle => 50,
            Self::WalkThrow => 220,
            Self::VrStroll => 150,
        }
    }

    /// Device levels for frame `n`.
    pub fn raw_input(&self, n: u64) -> RawInput {
        // Frames 0 and 1 hold select to leave the title screen.
        let starting = n < 2;
        match self {
            Self::Idle => RawInput {
                key_select: starting,
                ..RawInput::default()
            },
            Self::WalkThrow => RawInput {
                key_select: starting || (GRAB_FRAME..THROW_FRAME).contains(&n),
                arrows: if n >= WALK_FROM {
                    Vec2::new(0.0, 1.0)
                } else {
                    Vec2::ZERO
                },
                ..RawInput::default()
            },
            Self::VrStroll => RawInput {
                hmd_present: true,
                controller: ActiveController::RightTracked,
                index_trigger: starting,
                touchpad_click: n >= 2,
                touchpad: Vec2::new(0.0, 1.0),
                ..RawInput::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_only_starts() {
        let s = Script::Idle;
        assert!(s.raw_input(1).key_select);
        assert_eq!(s.raw_input(40), RawInput::default());
    }

    #[test]
    fn walk_throw_holds_select_across_the_carry() {
        let s = Script::WalkThrow;
        assert!(s.raw_input(0).key_select);
        assert!(!s.raw_input(2).key_select);
        assert!(s.raw_input(GRAB_FRAME).key_select);
        assert!(s.raw_input(THROW_FRAME - 1).key_select);
        assert!(!s.raw_input(THROW_FRAME).key_select);
        assert_eq!(s.raw_input(WALK_FROM - 1).arrows, Vec2::ZERO);
        assert_eq!(s.raw_input(WALK_FROM).arrows, Vec2::Y);
    }
}
