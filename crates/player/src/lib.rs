//! Player: title gating, locomotion and goal completion.
//!
//! # Invariants
//! - Movement is disabled until the start input; the start is one-way.
//! - The goal fires once; it is despawned on first crossing.
//! - Only a scene reload returns the player to the title phase.

mod goal;
mod locomotion;

pub use goal::completion_pose;
pub use locomotion::{LocomotionConfig, Phase, Player, PlayerRig, PlayerSignal};

pub fn crate_info() -> &'static str {
    "keyroom-player v0.1.0"
}
