//! Scene kernel: the reference host the interaction behaviors run against.
//!
//! # Invariants
//! - A body is held by at most one holder at a time.
//! - Despawned entities cannot be found, hit, or contacted again.
//! - All structural mutations flow through explicit operations and are logged.
//! - Iteration order is deterministic (BTreeMap).

pub mod components;
mod query;
pub mod scene;

pub use components::{Attachment, Collider, Link, RigidBody, Shape};
pub use scene::{Contact, DEFAULT_GRAVITY, EntityData, HostCommand, RayHit, Scene, SceneEvent};

pub fn crate_info() -> &'static str {
    "keyroom-kernel v0.1.0"
}
