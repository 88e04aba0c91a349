//! Shared types: entity ids, transforms, rays and the injected camera pose.

mod types;

pub use types::{CameraPose, EntityId, FORWARD, Ray, Transform, horizontal, look_rotation};
