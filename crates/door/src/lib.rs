//! Doors that open when struck by their key.
//!
//! # Invariants
//! - Only the designated key opens a door; any other contact is ignored.
//! - Opening despawns the key, so the open signal fires at most once.
//! - There is no close transition.

use keyroom_common::EntityId;
use keyroom_kernel::Scene;

/// Animation trigger set on the door's parent when it opens.
pub const OPEN_TRIGGER: &str = "open";

/// A door entity paired with the one key that opens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Door {
    door: EntityId,
    key: EntityId,
}

impl Door {
    pub fn new(door: EntityId, key: EntityId) -> Self {
        Self { door, key }
    }

    pub fn entity(&self) -> EntityId {
        self.door
    }

    pub fn key(&self) -> EntityId {
        self.key
    }

    /// Open once the key is gone from the scene.
    pub fn is_open(&self, scene: &Scene) -> bool {
        !scene.contains(self.key)
    }

    /// Handle a collision between the door and `other`. On the key: play the
    /// door's sound, fire the open trigger on its parent (or itself when it
    /// has none) and remove the key. Returns whether the door opened.
    pub fn on_collision(&self, scene: &mut Scene, other: EntityId) -> bool {
        if other != self.key || !scene.contains(other) || !scene.contains(self.door) {
            return false;
        }

        scene.play_sound(self.door);
        let animated = scene.parent(self.door).unwrap_or(self.door);
        scene.set_animation_trigger(animated, OPEN_TRIGGER);
        scene.despawn(other);
        tracing::debug!(door = %self.door.short(), "door opened");
        true
    }
}

pub fn crate_info() -> &'static str {
    "keyroom-door v0.1.0"
}
