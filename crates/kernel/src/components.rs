use glam::{Quat, Vec3};
use keyroom_common::EntityId;
use serde::{Deserialize, Serialize};

/// Rigid body state carried by an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigidBody {
    pub mass: f32,
    /// Kinematic bodies ignore gravity and impulses; they move only through
    /// `Scene::move_position`.
    pub is_kinematic: bool,
    pub use_gravity: bool,
    /// Fraction of velocity lost per second.
    pub linear_damping: f32,
    #[serde(skip)]
    pub velocity: Vec3,
    #[serde(skip)]
    pub attachment: Attachment,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            mass: 1.0,
            is_kinematic: false,
            use_gravity: true,
            linear_damping: 0.5,
            velocity: Vec3::ZERO,
            attachment: Attachment::Free,
        }
    }
}

impl RigidBody {
    pub fn kinematic() -> Self {
        Self {
            is_kinematic: true,
            use_gravity: false,
            ..Self::default()
        }
    }

    pub fn with_mass(mass: f32) -> Self {
        Self {
            mass,
            ..Self::default()
        }
    }
}

/// Collision shape. Extents are in world units; entity scale is not applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Box { half_extents: [f32; 3] },
    Sphere { radius: f32 },
}

impl Default for Shape {
    fn default() -> Self {
        Self::Box {
            half_extents: [0.5, 0.5, 0.5],
        }
    }
}

impl Shape {
    /// Distance from the center to the lowest point of the shape.
    pub fn half_height(&self) -> f32 {
        match *self {
            Shape::Box { half_extents } => half_extents[1],
            Shape::Sphere { radius } => radius,
        }
    }
}

/// Collider component. Triggers report overlaps but are invisible to rays.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Collider {
    pub shape: Shape,
    #[serde(default)]
    pub is_trigger: bool,
}

impl Collider {
    pub fn solid(shape: Shape) -> Self {
        Self {
            shape,
            is_trigger: false,
        }
    }

    pub fn trigger(shape: Shape) -> Self {
        Self {
            shape,
            is_trigger: true,
        }
    }
}

/// Whether a body is free or rigidly carried by a holder.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Attachment {
    #[default]
    Free,
    Held(Link),
}

/// A fixed link from a holder entity to a body. Breaks when holding the body
/// in place would need more than `break_force` or `break_torque`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub holder: EntityId,
    /// Body position relative to the holder, in holder-local space.
    pub local_offset: Vec3,
    pub local_rotation: Quat,
    pub break_force: f32,
    pub break_torque: f32,
}
