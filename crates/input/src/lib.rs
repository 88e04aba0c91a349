//! Embodiment modes: desktop keyboard and VR controller input mapped to shared actions.
//!
//! # Invariants
//! - Same action graph for desktop and VR.
//! - Edges are computed once per frame, after merging equivalent buttons.

pub mod action;
mod snapshot;

pub use action::Action;
pub use snapshot::{ActiveController, ButtonState, InputSnapshot, InputTracker, RawInput};

pub fn crate_info() -> &'static str {
    "keyroom-input v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("input"));
    }
}
