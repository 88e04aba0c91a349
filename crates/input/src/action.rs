use glam::Vec2;

/// A high-level action that any embodiment mode (desktop, VR) can produce.
///
/// Behaviors consume actions, never raw device levels. This keeps the
/// keyboard fallback and the headset on the same interaction rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Select button went down this frame: pick up what the pointer is on.
    Grab,
    /// Select button came up this frame: let go of (throw) the held body.
    Release,
    /// Select button is down. Starts the game from the title screen.
    Start,
    /// Back button went down this frame: reload the scene.
    Reset,
    /// Touchpad clicked; carries the vertical touch position in `[-1, 1]`.
    Step(f32),
    /// Desktop arrow axes: `x` turns, `y` walks.
    Steer(Vec2),
}
