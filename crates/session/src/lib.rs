//! Session: configuration, level layout and the frame loop.
//!
//! # Invariants
//! - Physics runs in fixed steps; a frame never runs more than `max_substeps`.
//! - Contacts from a step are handled before the next step begins.
//! - A reload rebuilds the scene exactly as first loaded and returns to the title.
//! - Input edge state is kept across reloads.

mod config;
mod error;
mod level;
mod script;
mod session;
mod timing;

pub use config::{PhysicsConfig, SessionConfig};
pub use error::{ConfigError, LevelError};
pub use level::{DoorSpec, EntitySpec, LevelHandles, LevelLayout};
pub use script::Script;
pub use session::{FrameReport, Session, SessionStats, TrackedPoses};
pub use timing::FrameTimer;

pub fn crate_info() -> &'static str {
    "keyroom-session v0.1.0"
}
