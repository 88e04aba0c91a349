//! Level layouts: the authored room as data.
//!
//! A layout names every entity the behaviors need. Building it spawns them
//! into a fresh scene and resolves the names into typed handles.

use glam::{Quat, Vec3};
use keyroom_common::{EntityId, Transform};
use keyroom_door::Door;
use keyroom_interact::PointerAnchors;
use keyroom_kernel::{Collider, RigidBody, Scene, Shape};
use keyroom_player::PlayerRig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::LevelError;

pub const PLAYER: &str = "Player";
pub const RIGHT_HAND: &str = "RightHandAnchor";
pub const LEFT_HAND: &str = "LeftHandAnchor";
pub const CENTER_EYE: &str = "CenterEyeAnchor";
pub const TITLE_PANEL: &str = "Title";
pub const CLEAR_PANEL: &str = "Clear";

/// One authored entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    /// Heading in degrees; positive turns right.
    #[serde(default)]
    pub yaw_degrees: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default = "active_by_default")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RigidBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collider: Option<Collider>,
}

fn active_by_default() -> bool {
    true
}

impl EntitySpec {
    pub fn new(name: &str, position: Vec3) -> Self {
        Self {
            name: name.to_string(),
            position,
            yaw_degrees: 0.0,
            parent: None,
            active: true,
            body: None,
            collider: None,
        }
    }

    fn with_body(mut self, body: RigidBody) -> Self {
        self.body = Some(body);
        self
    }

    fn with_collider(mut self, collider: Collider) -> Self {
        self.collider = Some(collider);
        self
    }

    fn transform(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: Quat::from_rotation_y(-self.yaw_degrees.to_radians()),
            ..Transform::default()
        }
    }
}

/// A door and the name of the one key that opens it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorSpec {
    pub door: String,
    pub key: String,
}

/// The whole authored room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    pub entities: Vec<EntitySpec>,
    #[serde(default)]
    pub doors: Vec<DoorSpec>,
}

/// Resolved entity handles for the behaviors.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelHandles {
    pub player: PlayerRig,
    pub anchors: PointerAnchors,
    pub doors: Vec<Door>,
}

impl LevelLayout {
    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let text = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let layout = Self::from_yaml_str(&text)?;
        tracing::info!(path = %path.display(), entities = layout.entities.len(), "loaded level");
        Ok(layout)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, LevelError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String, LevelError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// The demo room: a key on the floor ahead of the player, a door beyond
    /// it, and the goal past the door.
    pub fn default_room() -> Self {
        let cube = |x: f32, y: f32, z: f32| {
            Collider::solid(Shape::Box {
                half_extents: [x, y, z],
            })
        };
        let mut door =
            EntitySpec::new("Door", Vec3::new(0.0, 1.0, -4.0)).with_collider(cube(0.6, 1.0, 0.05));
        door.parent = Some("DoorFrame".into());
        let mut clear = EntitySpec::new(CLEAR_PANEL, Vec3::new(0.0, 1.6, -2.0));
        clear.active = false;

        Self {
            entities: vec![
                EntitySpec::new(PLAYER, Vec3::new(0.0, 1.0, 0.0))
                    .with_body(RigidBody::kinematic())
                    .with_collider(cube(0.3, 0.9, 0.3)),
                EntitySpec::new(CENTER_EYE, Vec3::new(0.0, 1.6, 0.0)),
                EntitySpec::new(RIGHT_HAND, Vec3::new(0.25, 1.1, -0.4)),
                EntitySpec::new(LEFT_HAND, Vec3::new(-0.25, 1.1, -0.4)),
                EntitySpec::new(TITLE_PANEL, Vec3::new(0.0, 1.6, -2.0)),
                clear,
                EntitySpec::new("Key", Vec3::new(0.0, 0.1, -1.2))
                    .with_body(RigidBody::default())
                    .with_collider(Collider::solid(Shape::Sphere { radius: 0.1 })),
                EntitySpec::new("Crate", Vec3::new(1.0, 0.25, -1.5))
                    .with_body(RigidBody::with_mass(5.0))
                    .with_collider(cube(0.25, 0.25, 0.25)),
                EntitySpec::new("DoorFrame", Vec3::new(0.0, 0.0, -4.0)),
                door,
                EntitySpec::new("Goal", Vec3::new(0.0, 1.0, -7.0))
                    .with_collider(Collider::trigger(cube(1.0, 1.0, 0.5).shape)),
            ],
            doors: vec![DoorSpec {
                door: "Door".into(),
                key: "Key".into(),
            }],
        }
    }

    /// Spawn every entity into a fresh scene and resolve the handles.
    pub fn build(&self, gravity: Vec3) -> Result<(Scene, LevelHandles), LevelError> {
        let mut scene = Scene::with_gravity(gravity);
        let mut ids: BTreeMap<&str, EntityId> = BTreeMap::new();

        for spec in &self.entities {
            if ids.contains_key(spec.name.as_str()) {
                return Err(LevelError::DuplicateName(spec.name.clone()));
            }
            if let Some(body) = spec.body {
                if !(body.mass.is_finite() && body.mass > 0.0) {
                    return Err(LevelError::InvalidMass {
                        entity: spec.name.clone(),
                        mass: body.mass,
                    });
                }
            }
            let id = scene.spawn(spec.name.as_str(), spec.transform());
            scene.set_active(id, spec.active);
            if let Some(body) = spec.body {
                scene.set_body(id, body);
            }
            if let Some(collider) = spec.collider {
                scene.set_collider(id, collider);
            }
            ids.insert(spec.name.as_str(), id);
        }

        for spec in &self.entities {
            let Some(parent) = spec.parent.as_deref() else {
                continue;
            };
            let parent_id = ids.get(parent).copied().ok_or_else(|| LevelError::UnknownParent {
                entity: spec.name.clone(),
                parent: parent.to_string(),
            })?;
            scene.set_parent(ids[spec.name.as_str()], Some(parent_id));
        }

        let lookup = |name: &str| {
            ids.get(name)
                .copied()
                .ok_or_else(|| LevelError::MissingEntity(name.to_string()))
        };

        let handles = LevelHandles {
            player: PlayerRig {
                agent: lookup(PLAYER)?,
                title_panel: lookup(TITLE_PANEL)?,
                clear_panel: lookup(CLEAR_PANEL)?,
            },
            anchors: PointerAnchors {
                right_hand: lookup(RIGHT_HAND)?,
                left_hand: lookup(LEFT_HAND)?,
                center_eye: lookup(CENTER_EYE)?,
            },
            doors: self
                .doors
                .iter()
                .map(|d| -> Result<Door, LevelError> {
                    Ok(Door::new(lookup(d.door.as_str())?, lookup(d.key.as_str())?))
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        // Drain spawn records so a fresh session starts with an empty log.
        scene.drain_events();
        tracing::debug!(
            entities = scene.entity_count(),
            doors = handles.doors.len(),
            "level built"
        );
        Ok((scene, handles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyroom_kernel::DEFAULT_GRAVITY;
    use std::io::Write;

    #[test]
    fn default_room_builds() {
        let (scene, handles) = LevelLayout::default_room().build(DEFAULT_GRAVITY).unwrap();
        assert_eq!(scene.entity_count(), 11);
        assert_eq!(scene.name(handles.player.agent), Some(PLAYER));
        assert!(!scene.is_active(handles.player.clear_panel));
        assert!(scene.is_active(handles.player.title_panel));
        assert_eq!(handles.doors.len(), 1);

        let door = handles.doors[0];
        assert_eq!(scene.name(door.key()), Some("Key"));
        let frame = scene.parent(door.entity()).unwrap();
        assert_eq!(scene.name(frame), Some("DoorFrame"));
        assert!(scene.events().is_empty());
    }

    #[test]
    fn missing_required_entity_is_reported() {
        let mut layout = LevelLayout::default_room();
        layout.entities.retain(|e| e.name != CENTER_EYE);
        let err = layout.build(DEFAULT_GRAVITY).unwrap_err();
        assert!(matches!(err, LevelError::MissingEntity(ref n) if n == CENTER_EYE));
    }

    #[test]
    fn door_key_must_exist() {
        let mut layout = LevelLayout::default_room();
        layout.doors[0].key = "GoldKey".into();
        assert!(matches!(
            layout.build(DEFAULT_GRAVITY).unwrap_err(),
            LevelError::MissingEntity(ref n) if n == "GoldKey"
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut layout = LevelLayout::default_room();
        layout.entities.push(EntitySpec::new("Key", Vec3::ZERO));
        assert!(matches!(
            layout.build(DEFAULT_GRAVITY).unwrap_err(),
            LevelError::DuplicateName(ref n) if n == "Key"
        ));
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut layout = LevelLayout::default_room();
        layout.entities.retain(|e| e.name != "DoorFrame");
        assert!(matches!(
            layout.build(DEFAULT_GRAVITY).unwrap_err(),
            LevelError::UnknownParent { ref parent, .. } if parent == "DoorFrame"
        ));
    }

    #[test]
    fn massless_or_negative_bodies_are_rejected() {
        for mass in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let mut layout = LevelLayout::default_room();
            for spec in &mut layout.entities {
                if spec.name == "Key" {
                    spec.body = Some(RigidBody::with_mass(mass));
                }
            }
            assert!(matches!(
                layout.build(DEFAULT_GRAVITY).unwrap_err(),
                LevelError::InvalidMass { ref entity, .. } if entity == "Key"
            ));
        }

        let yaml = "entities:\n  - name: Rock\n    body: { mass: 0.0 }\n";
        let layout = LevelLayout::from_yaml_str(yaml).unwrap();
        assert!(matches!(
            layout.build(DEFAULT_GRAVITY).unwrap_err(),
            LevelError::InvalidMass { .. }
        ));
    }

    #[test]
    fn yaw_turns_right() {
        let mut spec = EntitySpec::new("Player", Vec3::ZERO);
        spec.yaw_degrees = 90.0;
        assert!((spec.transform().forward() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn layout_survives_a_yaml_file() {
        let layout = LevelLayout::default_room();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(layout.to_yaml().unwrap().as_bytes()).unwrap();
        let loaded = LevelLayout::load(file.path()).unwrap();
        assert_eq!(loaded, layout);
    }

    #[test]
    fn hand_written_yaml_uses_defaults() {
        let yaml = r#"
entities:
  - name: Goal
    position: [0.0, 1.0, -3.0]
    collider:
      shape: { kind: box, half_extents: [1.0, 1.0, 0.5] }
      is_trigger: true
  - name: Ball
    body: { mass: 2.0 }
    collider:
      shape: { kind: sphere, radius: 0.2 }
"#;
        let layout = LevelLayout::from_yaml_str(yaml).unwrap();
        assert!(layout.doors.is_empty());
        assert!(layout.entities[0].active);
        assert!(layout.entities[0].collider.unwrap().is_trigger);
        let ball = layout.entities[1].body.unwrap();
        assert_eq!(ball.mass, 2.0);
        assert!(ball.use_gravity);
        // No player rig in this layout.
        assert!(matches!(
            layout.build(DEFAULT_GRAVITY).unwrap_err(),
            LevelError::MissingEntity(_)
        ));
    }
}
