use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local-space facing direction. Right-handed, Y up, looking down -Z.
pub const FORWARD: Vec3 = Vec3::NEG_Z;

/// Unique identifier for an entity in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// World-space facing direction.
    pub fn forward(&self) -> Vec3 {
        self.rotation * FORWARD
    }

    /// Turn about the world up axis. Positive degrees turn right
    /// (clockwise seen from above).
    pub fn yaw_right(&mut self, degrees: f32) {
        self.rotation = (Quat::from_rotation_y(-degrees.to_radians()) * self.rotation).normalize();
    }
}

/// A directed half-line used for pointer queries. `direction` is unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Build a ray, normalizing `direction`. Returns `None` for a zero direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        Some(Self { origin, direction })
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Pose of the viewing camera, injected into every update that needs facing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl CameraPose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * FORWARD
    }

    /// Camera facing flattened onto the ground plane, unit length.
    /// Zero when the camera looks straight up or down.
    pub fn horizontal_forward(&self) -> Vec3 {
        horizontal(self.forward())
    }
}

/// Project `v` onto the horizontal (XZ) plane and normalize it.
pub fn horizontal(v: Vec3) -> Vec3 {
    let flat = Vec3::new(v.x, 0.0, v.z);
    if flat.length_squared() < 1e-10 {
        return Vec3::ZERO;
    }
    flat.normalize()
}

/// Rotation whose forward axis points along `forward` with Y kept up.
pub fn look_rotation(forward: Vec3) -> Quat {
    let Some(fwd) = forward.try_normalize() else {
        return Quat::IDENTITY;
    };
    let back = -fwd;
    let right = Vec3::Y.cross(back);
    if right.length_squared() < 1e-8 {
        // Looking straight up or down: any roll will do.
        return Quat::from_rotation_arc(FORWARD, fwd);
    }
    let right = right.normalize();
    let up = back.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, back)).normalize()
}
