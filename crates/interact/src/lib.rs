//! Pointer interaction: aim a laser from the active hand, pick up what it
//! touches with a breakable fixed link, and throw on release.
//!
//! # Invariants
//! - Held state changes only on select edges.
//! - A body is held by at most one interactor (the scene refuses a second link).
//! - Throw velocity is the held body's displacement over the last frame.

mod pointer;

pub use pointer::{
    FixedConstraint, LaserSegment, PointerAnchors, PointerConfig, PointerEvent, PointerInteractor,
    throw_velocity,
};

pub fn crate_info() -> &'static str {
    "keyroom-interact v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("interact"));
    }
}
