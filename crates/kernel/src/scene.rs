use glam::{Quat, Vec3};
use keyroom_common::{EntityId, Ray, Transform};
use std::collections::{BTreeMap, BTreeSet};

use crate::components::{Attachment, Collider, Link, RigidBody};
use crate::query::{self, Placed};

/// Standard gravity, metres per second squared.
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// A first-contact report produced by [`Scene::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    /// Two solid colliders started touching. `a < b`.
    Collision { a: EntityId, b: EntityId },
    /// `other` entered the trigger volume `trigger`.
    Trigger { trigger: EntityId, other: EntityId },
}

impl Contact {
    /// The entity on the far side of the contact from `me`, if `me` takes part.
    pub fn other_than(&self, me: EntityId) -> Option<EntityId> {
        let (x, y) = match *self {
            Contact::Collision { a, b } => (a, b),
            Contact::Trigger { trigger, other } => (trigger, other),
        };
        if x == me {
            Some(y)
        } else if y == me {
            Some(x)
        } else {
            None
        }
    }
}

/// A record of every structural change and physical event in the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    Spawned { id: EntityId, name: String },
    Despawned { id: EntityId, name: String },
    Attached { holder: EntityId, body: EntityId },
    Detached { holder: EntityId, body: EntityId },
    /// The link exceeded its break force or torque during a step.
    LinkBroken { holder: EntityId, body: EntityId },
    ImpulseApplied { id: EntityId, impulse: Vec3 },
    Contact(Contact),
    Stepped { tick: u64 },
}

/// Side effects the embedding host performs: audio, animation, UI.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    PlaySound { source: EntityId },
    SetAnimationTrigger { target: EntityId, trigger: String },
    ShowPanel { panel: EntityId, transform: Transform },
    HidePanel { panel: EntityId },
}

/// Nearest solid surface hit by [`Scene::raycast`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity: EntityId,
    pub point: Vec3,
    pub distance: f32,
    /// The hit entity when it carries a rigid body.
    pub body: Option<EntityId>,
}

/// Per-entity data stored in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityData {
    pub name: String,
    pub transform: Transform,
    pub parent: Option<EntityId>,
    pub active: bool,
    pub body: Option<RigidBody>,
    pub collider: Option<Collider>,
}

impl EntityData {
    fn placed(&self) -> Option<(Placed, bool)> {
        let collider = self.collider?;
        Some((
            Placed {
                center: self.transform.position,
                rotation: self.transform.rotation,
                shape: collider.shape,
            },
            collider.is_trigger,
        ))
    }
}

/// In-memory scene host.
///
/// Owns every entity, answers ray queries, carries linked bodies, integrates
/// free bodies under gravity against a floor at `y = 0`, and reports first
/// contacts. Behaviors never get a back door: every mutation goes through an
/// explicit operation and lands in the event log.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Clone)]
pub struct Scene {
    entities: BTreeMap<EntityId, EntityData>,
    tick: u64,
    gravity: Vec3,
    /// Pairs in contact after the last step, `(min, max)`.
    contacts: BTreeSet<(EntityId, EntityId)>,
    events: Vec<SceneEvent>,
    commands: Vec<HostCommand>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::with_gravity(DEFAULT_GRAVITY)
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            entities: BTreeMap::new(),
            tick: 0,
            gravity,
            contacts: BTreeSet::new(),
            events: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Number of completed physics steps.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &BTreeMap<EntityId, EntityData> {
        &self.entities
    }

    pub fn events(&self) -> &[SceneEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    /// Host commands issued since the last drain.
    pub fn commands(&self) -> &[HostCommand] {
        &self.commands
    }

    pub fn drain_commands(&mut self) -> Vec<HostCommand> {
        std::mem::take(&mut self.commands)
    }

    // --- Scene graph ---

    /// Spawn a named, active entity with no components.
    pub fn spawn(&mut self, name: impl Into<String>, transform: Transform) -> EntityId {
        let id = EntityId::new();
        let name = name.into();
        self.entities.insert(
            id,
            EntityData {
                name: name.clone(),
                transform,
                parent: None,
                active: true,
                body: None,
                collider: None,
            },
        );
        self.events.push(SceneEvent::Spawned { id, name });
        id
    }

    /// Remove an entity and, recursively, its children. Bodies it was holding
    /// are set free. Returns the entity's data if it existed.
    pub fn despawn(&mut self, id: EntityId) -> Option<EntityData> {
        let data = self.entities.remove(&id)?;

        let children: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, d)| d.parent == Some(id))
            .map(|(child, _)| *child)
            .collect();
        for child in children {
            self.despawn(child);
        }

        let mut released = Vec::new();
        for (body_id, entity) in self.entities.iter_mut() {
            if let Some(body) = entity.body.as_mut() {
                if matches!(body.attachment, Attachment::Held(link) if link.holder == id) {
                    body.attachment = Attachment::Free;
                    released.push(*body_id);
                }
            }
        }
        for body in released {
            self.events.push(SceneEvent::Detached { holder: id, body });
        }

        self.contacts.retain(|(a, b)| *a != id && *b != id);
        tracing::debug!(entity = %id.short(), name = %data.name, "despawned");
        self.events.push(SceneEvent::Despawned {
            id,
            name: data.name.clone(),
        });
        Some(data)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityData> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityData> {
        self.entities.get_mut(&id)
    }

    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.entities.get(&id).map(|d| d.name.as_str())
    }

    /// First entity with the given name, in id order.
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|(_, d)| d.name == name)
            .map(|(id, _)| *id)
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.entities.get(&id).and_then(|d| d.parent)
    }

    pub fn set_parent(&mut self, id: EntityId, parent: Option<EntityId>) -> bool {
        if parent.is_some_and(|p| p == id || !self.entities.contains_key(&p)) {
            return false;
        }
        match self.entities.get_mut(&id) {
            Some(data) => {
                data.parent = parent;
                true
            }
            None => false,
        }
    }

    pub fn set_body(&mut self, id: EntityId, body: RigidBody) -> bool {
        match self.entities.get_mut(&id) {
            Some(data) => {
                data.body = Some(body);
                true
            }
            None => false,
        }
    }

    pub fn set_collider(&mut self, id: EntityId, collider: Collider) -> bool {
        match self.entities.get_mut(&id) {
            Some(data) => {
                data.collider = Some(collider);
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, id: EntityId) -> bool {
        self.entities.get(&id).is_some_and(|d| d.active)
    }

    pub fn set_active(&mut self, id: EntityId, active: bool) -> bool {
        match self.entities.get_mut(&id) {
            Some(data) => {
                data.active = active;
                true
            }
            None => false,
        }
    }

    // --- Motion ---

    pub fn transform(&self, id: EntityId) -> Option<Transform> {
        self.entities.get(&id).map(|d| d.transform)
    }

    pub fn position(&self, id: EntityId) -> Option<Vec3> {
        self.entities.get(&id).map(|d| d.transform.position)
    }

    pub fn velocity(&self, id: EntityId) -> Option<Vec3> {
        self.entities
            .get(&id)
            .and_then(|d| d.body.as_ref())
            .map(|b| b.velocity)
    }

    pub fn set_transform(&mut self, id: EntityId, transform: Transform) -> bool {
        match self.entities.get_mut(&id) {
            Some(data) => {
                data.transform = transform;
                true
            }
            None => false,
        }
    }

    pub fn set_rotation(&mut self, id: EntityId, rotation: Quat) -> bool {
        match self.entities.get_mut(&id) {
            Some(data) => {
                data.transform.rotation = rotation;
                true
            }
            None => false,
        }
    }

    /// Teleport a body to `position`. Intended for kinematic bodies.
    pub fn move_position(&mut self, id: EntityId, position: Vec3) -> bool {
        match self.entities.get_mut(&id) {
            Some(data) if data.body.is_some() => {
                data.transform.position = position;
                true
            }
            _ => false,
        }
    }

    /// Add `impulse / mass` to a dynamic body's velocity.
    pub fn apply_impulse(&mut self, id: EntityId, impulse: Vec3) -> bool {
        let Some(body) = self
            .entities
            .get_mut(&id)
            .and_then(|d| d.body.as_mut())
            .filter(|b| !b.is_kinematic)
        else {
            return false;
        };
        body.velocity += impulse / body.mass.max(f32::EPSILON);
        self.events.push(SceneEvent::ImpulseApplied { id, impulse });
        true
    }

    // --- Links ---

    /// Rigidly link `body` to `holder` at their current relative pose.
    ///
    /// Refused when either entity is missing, `body` has no dynamic rigid
    /// body, or `body` is already held by anyone.
    pub fn attach(
        &mut self,
        holder: EntityId,
        body: EntityId,
        break_force: f32,
        break_torque: f32,
    ) -> bool {
        if holder == body {
            return false;
        }
        let Some(anchor) = self.transform(holder) else {
            return false;
        };
        let Some(data) = self.entities.get_mut(&body) else {
            return false;
        };
        let Some(rb) = data.body.as_mut() else {
            return false;
        };
        if rb.is_kinematic || rb.attachment != Attachment::Free {
            return false;
        }

        let inv = anchor.rotation.inverse();
        rb.attachment = Attachment::Held(Link {
            holder,
            local_offset: inv * (data.transform.position - anchor.position),
            local_rotation: inv * data.transform.rotation,
            break_force,
            break_torque,
        });
        tracing::debug!(holder = %holder.short(), body = %body.short(), "attached");
        self.events.push(SceneEvent::Attached { holder, body });
        true
    }

    /// Remove the link from `holder` to `body`. Returns false when no such
    /// link exists (never made, already detached, or broken).
    pub fn detach(&mut self, holder: EntityId, body: EntityId) -> bool {
        let Some(rb) = self.entities.get_mut(&body).and_then(|d| d.body.as_mut()) else {
            return false;
        };
        match rb.attachment {
            Attachment::Held(link) if link.holder == holder => {
                rb.attachment = Attachment::Free;
                tracing::debug!(holder = %holder.short(), body = %body.short(), "detached");
                self.events.push(SceneEvent::Detached { holder, body });
                true
            }
            _ => false,
        }
    }

    /// The entity currently holding `body`, if any.
    pub fn holder_of(&self, body: EntityId) -> Option<EntityId> {
        match self.entities.get(&body)?.body?.attachment {
            Attachment::Held(link) => Some(link.holder),
            Attachment::Free => None,
        }
    }

    // --- Queries ---

    /// Nearest active, solid collider along `ray` within `max_distance`.
    /// Triggers are ignored, as are shapes containing the ray origin.
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<RayHit> {
        self.entities
            .iter()
            .filter(|(_, d)| d.active)
            .filter_map(|(id, d)| {
                let (placed, is_trigger) = d.placed()?;
                if is_trigger {
                    return None;
                }
                let distance = query::ray_distance(ray, max_distance, &placed)?;
                Some(RayHit {
                    entity: *id,
                    point: ray.at(distance),
                    distance,
                    body: d.body.map(|_| *id),
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    // --- Host commands ---

    pub fn play_sound(&mut self, source: EntityId) -> bool {
        if !self.contains(source) {
            return false;
        }
        self.commands.push(HostCommand::PlaySound { source });
        true
    }

    pub fn set_animation_trigger(&mut self, target: EntityId, trigger: &str) -> bool {
        if !self.contains(target) {
            return false;
        }
        self.commands.push(HostCommand::SetAnimationTrigger {
            target,
            trigger: trigger.to_string(),
        });
        true
    }

    /// Place and activate a UI panel.
    pub fn show_panel(&mut self, panel: EntityId, transform: Transform) -> bool {
        let Some(data) = self.entities.get_mut(&panel) else {
            return false;
        };
        data.transform = transform;
        data.active = true;
        self.commands.push(HostCommand::ShowPanel { panel, transform });
        true
    }

    pub fn hide_panel(&mut self, panel: EntityId) -> bool {
        if !self.set_active(panel, false) {
            return false;
        }
        self.commands.push(HostCommand::HidePanel { panel });
        true
    }

    // --- Simulation ---

    /// Advance the scene by `dt` seconds: carry linked bodies, integrate free
    /// ones, then report contacts that began during this step.
    pub fn step(&mut self, dt: f32) -> Vec<Contact> {
        if dt <= 0.0 {
            return Vec::new();
        }
        self.tick += 1;
        self.carry_linked(dt);
        self.integrate(dt);
        let began = self.detect_contacts();
        for contact in &began {
            self.events.push(SceneEvent::Contact(*contact));
        }
        self.events.push(SceneEvent::Stepped { tick: self.tick });
        tracing::trace!(tick = self.tick, contacts = began.len(), "scene stepped");
        began
    }

    fn carry_linked(&mut self, dt: f32) {
        let linked: Vec<(EntityId, Link)> = self
            .entities
            .iter()
            .filter_map(|(id, d)| match d.body?.attachment {
                Attachment::Held(link) => Some((*id, link)),
                Attachment::Free => None,
            })
            .collect();

        for (id, link) in linked {
            let anchor = self.transform(link.holder);
            let Some(data) = self.entities.get_mut(&id) else {
                continue;
            };
            let Some(body) = data.body.as_mut() else {
                continue;
            };
            let Some(anchor) = anchor else {
                body.attachment = Attachment::Free;
                continue;
            };

            let offset = anchor.rotation * link.local_offset;
            let target = anchor.position + offset;
            let velocity = (target - data.transform.position) / dt;
            let force = (velocity - body.velocity) * body.mass / dt;
            let torque = offset.cross(force).length();

            if force.length() > link.break_force || torque > link.break_torque {
                body.attachment = Attachment::Free;
                tracing::debug!(
                    holder = %link.holder.short(),
                    body = %id.short(),
                    force = force.length(),
                    torque,
                    "link broken"
                );
                self.events.push(SceneEvent::LinkBroken {
                    holder: link.holder,
                    body: id,
                });
                continue;
            }

            body.velocity = velocity;
            data.transform.position = target;
            data.transform.rotation = (anchor.rotation * link.local_rotation).normalize();
        }
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.gravity;
        for data in self.entities.values_mut() {
            let half_height = data.collider.map_or(0.0, |c| c.shape.half_height());
            let Some(body) = data.body.as_mut() else {
                continue;
            };
            if body.is_kinematic || body.attachment != Attachment::Free {
                continue;
            }
            if body.use_gravity {
                body.velocity += gravity * dt;
            }
            body.velocity *= (1.0 - body.linear_damping * dt).max(0.0);
            data.transform.position += body.velocity * dt;

            if data.transform.position.y < half_height {
                data.transform.position.y = half_height;
                body.velocity.y = body.velocity.y.max(0.0);
            }
        }
    }

    fn detect_contacts(&mut self) -> Vec<Contact> {
        let shapes: Vec<(EntityId, Placed, bool, bool)> = self
            .entities
            .iter()
            .filter(|(_, d)| d.active)
            .filter_map(|(id, d)| {
                let (placed, is_trigger) = d.placed()?;
                Some((*id, placed, is_trigger, d.body.is_some()))
            })
            .collect();

        let mut current = BTreeSet::new();
        let mut began = Vec::new();
        for (i, (a, pa, trigger_a, body_a)) in shapes.iter().enumerate() {
            for (b, pb, trigger_b, body_b) in &shapes[i + 1..] {
                // Contacts need at least one body; two triggers never interact.
                if !(*body_a || *body_b) || (*trigger_a && *trigger_b) {
                    continue;
                }
                if !query::overlaps(pa, pb) {
                    continue;
                }
                let key = (*a.min(b), *a.max(b));
                current.insert(key);
                if self.contacts.contains(&key) {
                    continue;
                }
                began.push(match (*trigger_a, *trigger_b) {
                    (true, _) => Contact::Trigger {
                        trigger: *a,
                        other: *b,
                    },
                    (_, true) => Contact::Trigger {
                        trigger: *b,
                        other: *a,
                    },
                    _ => Contact::Collision { a: key.0, b: key.1 },
                });
            }
        }
        self.contacts = current;
        began
    }
}
