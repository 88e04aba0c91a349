use glam::Vec3;
use keyroom_common::{EntityId, Ray};
use keyroom_input::{Action, ActiveController, InputSnapshot};
use keyroom_kernel::Scene;
use serde::{Deserialize, Serialize};

/// Tunables for the laser pointer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    /// Laser reach in metres.
    pub max_distance: f32,
    pub break_force: f32,
    pub break_torque: f32,
    /// Added to the eye position when no headset is present.
    pub desktop_origin_offset: Vec3,
    /// Added to the eye facing when no headset is present.
    pub desktop_direction_offset: Vec3,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            max_distance: 2.5,
            break_force: 20000.0,
            break_torque: 20000.0,
            desktop_origin_offset: Vec3::new(0.0, -1.4, 0.0),
            desktop_direction_offset: Vec3::new(0.0, -0.15, 0.0),
        }
    }
}

/// Scene entities the laser can be fired from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerAnchors {
    pub right_hand: EntityId,
    pub left_hand: EntityId,
    pub center_eye: EntityId,
}

impl PointerAnchors {
    /// The hand matching the active controller, or the eye when no hand is tracked.
    pub fn select(&self, controller: ActiveController) -> EntityId {
        match controller {
            ActiveController::RightTracked => self.right_hand,
            ActiveController::LeftTracked => self.left_hand,
            ActiveController::None => self.center_eye,
        }
    }
}

/// The grab link as the interactor remembers it. The scene holds the
/// physical link; this is the interactor's record of having asked for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedConstraint {
    pub anchor: EntityId,
    pub body: EntityId,
    pub break_force: f32,
    pub break_torque: f32,
}

/// Visible laser beam for this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaserSegment {
    pub start: Vec3,
    pub end: Vec3,
}

/// What an update did, if anything worth reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Grabbed { body: EntityId },
    Thrown { body: EntityId, velocity: Vec3 },
    /// Released after the link had already gone (broken or cleared).
    Dropped { body: EntityId },
}

/// Throw velocity from two successive positions of the held body.
pub fn throw_velocity(current: Vec3, previous: Vec3, dt: f32) -> Vec3 {
    if dt <= 0.0 {
        return Vec3::ZERO;
    }
    (current - previous) / dt
}

/// Laser pointer that picks up rigid bodies and throws them on release.
///
/// Re-derives its ray every frame from the active device. Held state only
/// changes on select edges. A link broken by the scene is not noticed until
/// the next release, which then applies no impulse.
#[derive(Debug, Clone)]
pub struct PointerInteractor {
    config: PointerConfig,
    anchors: PointerAnchors,
    enabled: bool,
    ray: Option<Ray>,
    laser: Option<LaserSegment>,
    hit: Option<EntityId>,
    held: Option<EntityId>,
    last_held_position: Vec3,
    constraint: Option<FixedConstraint>,
}

impl PointerInteractor {
    /// A disabled interactor; enable it when play starts.
    pub fn new(config: PointerConfig, anchors: PointerAnchors) -> Self {
        Self {
            config,
            anchors,
            enabled: false,
            ray: None,
            laser: None,
            hit: None,
            held: None,
            last_held_position: Vec3::ZERO,
            constraint: None,
        }
    }

    pub fn config(&self) -> &PointerConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn ray(&self) -> Option<Ray> {
        self.ray
    }

    pub fn laser(&self) -> Option<LaserSegment> {
        self.laser
    }

    /// Rigid body under the laser this frame.
    pub fn hit(&self) -> Option<EntityId> {
        self.hit
    }

    pub fn held(&self) -> Option<EntityId> {
        self.held
    }

    pub fn constraint(&self) -> Option<&FixedConstraint> {
        self.constraint.as_ref()
    }

    /// Run one frame: aim, then release, then grab, then remember where the
    /// held body is for the next throw.
    pub fn update(
        &mut self,
        scene: &mut Scene,
        input: &InputSnapshot,
        dt: f32,
    ) -> Option<PointerEvent> {
        if !self.enabled {
            return None;
        }

        // A held body removed from the scene counts as let go. Its link
        // record stays behind until the next grab clears it.
        if self.held.is_some_and(|body| !scene.contains(body)) {
            tracing::debug!("held body left the scene");
            self.held = None;
        }

        let anchor = self.anchors.select(input.controller);
        self.aim(scene, anchor, input.hmd_present);

        let mut event = None;
        if self.held.is_some() && input.has(Action::Release) {
            event = self.throw(scene, dt);
        }
        if self.held.is_none() && input.has(Action::Grab) {
            if let Some(body) = self.hit {
                event = self.grab(scene, anchor, body).or(event);
            }
        }

        if let Some(position) = self.held.and_then(|body| scene.position(body)) {
            self.last_held_position = position;
        }
        event
    }

    fn aim(&mut self, scene: &Scene, anchor: EntityId, hmd_present: bool) {
        let ray = scene.transform(anchor).and_then(|t| {
            if hmd_present {
                Ray::new(t.position, t.forward())
            } else {
                Ray::new(
                    t.position + self.config.desktop_origin_offset,
                    t.forward() + self.config.desktop_direction_offset,
                )
            }
        });
        self.ray = ray;

        let Some(ray) = ray else {
            self.laser = None;
            self.hit = None;
            return;
        };

        match scene.raycast(&ray, self.config.max_distance) {
            Some(hit) => {
                self.laser = Some(LaserSegment {
                    start: ray.origin,
                    end: hit.point,
                });
                self.hit = hit.body;
            }
            None => {
                self.laser = Some(LaserSegment {
                    start: ray.origin,
                    end: ray.at(self.config.max_distance),
                });
                self.hit = None;
            }
        }
    }

    fn grab(
        &mut self,
        scene: &mut Scene,
        anchor: EntityId,
        body: EntityId,
    ) -> Option<PointerEvent> {
        if let Some(stale) = self.constraint.take() {
            scene.detach(stale.anchor, stale.body);
            tracing::debug!(body = %stale.body.short(), "cleared stale constraint");
        }

        if !scene.attach(anchor, body, self.config.break_force, self.config.break_torque) {
            tracing::trace!(body = %body.short(), "grab refused");
            return None;
        }

        self.constraint = Some(FixedConstraint {
            anchor,
            body,
            break_force: self.config.break_force,
            break_torque: self.config.break_torque,
        });
        self.held = Some(body);
        tracing::debug!(body = %body.short(), anchor = %anchor.short(), "grabbed");
        Some(PointerEvent::Grabbed { body })
    }

    fn throw(&mut self, scene: &mut Scene, dt: f32) -> Option<PointerEvent> {
        let body = self.held.take()?;
        let linked = self
            .constraint
            .take()
            .is_some_and(|c| scene.detach(c.anchor, c.body));
        if !linked {
            tracing::debug!(body = %body.short(), "released without a link");
            return Some(PointerEvent::Dropped { body });
        }

        let Some(current) = scene.position(body) else {
            return Some(PointerEvent::Dropped { body });
        };
        let velocity = throw_velocity(current, self.last_held_position, dt);
        scene.apply_impulse(body, velocity);
        tracing::debug!(body = %body.short(), ?velocity, "thrown");
        Some(PointerEvent::Thrown { body, velocity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use keyroom_common::Transform;
    use keyroom_kernel::{Collider, RigidBody, SceneEvent, Shape};

    const DT: f32 = 0.02;

    struct Rig {
        scene: Scene,
        anchors: PointerAnchors,
        key: EntityId,
    }

    fn rig() -> Rig {
        let mut scene = Scene::with_gravity(Vec3::ZERO);
        let hand = |scene: &mut Scene, name: &str| {
            scene.spawn(name, Transform::from_position(Vec3::new(0.0, 1.0, 0.0)))
        };
        let right_hand = hand(&mut scene, "RightHandAnchor");
        let left_hand = hand(&mut scene, "LeftHandAnchor");
        let center_eye = scene.spawn(
            "CenterEyeAnchor",
            Transform::from_position(Vec3::new(0.0, 1.6, 0.0)),
        );
        let key = scene.spawn("Key", Transform::from_position(Vec3::new(0.0, 1.0, -1.0)));
        scene.set_body(key, RigidBody::default());
        scene.set_collider(key, Collider::solid(Shape::Sphere { radius: 0.1 }));
        Rig {
            scene,
            anchors: PointerAnchors {
                right_hand,
                left_hand,
                center_eye,
            },
            key,
        }
    }

    fn pointer(anchors: PointerAnchors) -> PointerInteractor {
        let mut p = PointerInteractor::new(PointerConfig::default(), anchors);
        p.set_enabled(true);
        p
    }

    fn right() -> InputSnapshot {
        InputSnapshot::vr(ActiveController::RightTracked)
    }

    fn nudge(scene: &mut Scene, id: EntityId, by: Vec3) {
        let mut t = scene.transform(id).unwrap();
        t.position += by;
        scene.set_transform(id, t);
    }

    fn impulses(scene: &Scene) -> Vec<Vec3> {
        scene
            .events()
            .iter()
            .filter_map(|e| match e {
                SceneEvent::ImpulseApplied { impulse, .. } => Some(*impulse),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn disabled_pointer_is_inert() {
        let mut r = rig();
        let mut p = PointerInteractor::new(PointerConfig::default(), r.anchors);
        assert!(!p.is_enabled());
        assert!(p.update(&mut r.scene, &right().with(Action::Grab), DT).is_none());
        assert!(p.hit().is_none());
        assert!(p.laser().is_none());
    }

    #[test]
    fn laser_stops_at_hit_or_runs_full_length() {
        let mut r = rig();
        let mut p = pointer(r.anchors);
        p.update(&mut r.scene, &right(), DT);
        assert_eq!(p.hit(), Some(r.key));
        let laser = p.laser().unwrap();
        assert!((laser.end - Vec3::new(0.0, 1.0, -0.9)).length() < 1e-4);

        let behind = Quat::from_rotation_y(std::f32::consts::PI);
        r.scene.set_rotation(r.anchors.right_hand, behind);
        p.update(&mut r.scene, &right(), DT);
        assert!(p.hit().is_none());
        let laser = p.laser().unwrap();
        assert!((laser.end - Vec3::new(0.0, 1.0, 2.5)).length() < 1e-4);
    }

    #[test]
    fn out_of_reach_body_is_not_hit() {
        let mut r = rig();
        r.scene.set_transform(r.key, Transform::from_position(Vec3::new(0.0, 1.0, -3.0)));
        let mut p = pointer(r.anchors);
        p.update(&mut r.scene, &right(), DT);
        assert!(p.hit().is_none());
    }

    #[test]
    fn grab_needs_hit_and_edge() {
        let mut r = rig();
        let mut p = pointer(r.anchors);

        assert!(p.update(&mut r.scene, &right(), DT).is_none());
        assert!(p.held().is_none());

        let event = p.update(&mut r.scene, &right().with(Action::Grab), DT);
        assert_eq!(event, Some(PointerEvent::Grabbed { body: r.key }));
        assert_eq!(p.held(), Some(r.key));
        assert_eq!(p.constraint().unwrap().body, r.key);
        assert_eq!(r.scene.holder_of(r.key), Some(r.anchors.right_hand));
    }

    #[test]
    fn grab_without_hit_is_noop() {
        let mut r = rig();
        r.scene.despawn(r.key);
        let mut p = pointer(r.anchors);
        assert!(p.update(&mut r.scene, &right().with(Action::Grab), DT).is_none());
        assert!(p.held().is_none());
        assert!(p.constraint().is_none());
    }

    #[test]
    fn grab_while_holding_is_noop() {
        let mut r = rig();
        let other = r.scene.spawn("Box", Transform::from_position(Vec3::new(0.0, 1.0, -0.5)));
        r.scene.set_body(other, RigidBody::default());
        r.scene.set_collider(other, Collider::solid(Shape::Sphere { radius: 0.1 }));

        let mut p = pointer(r.anchors);
        p.update(&mut r.scene, &right().with(Action::Grab), DT);
        let first = p.held().unwrap();

        p.update(&mut r.scene, &right().with(Action::Grab), DT);
        assert_eq!(p.held(), Some(first));
    }

    #[test]
    fn throw_uses_position_delta_over_frame_time() {
        let mut r = rig();
        let mut p = pointer(r.anchors);
        p.update(&mut r.scene, &right().with(Action::Grab), DT);

        nudge(&mut r.scene, r.anchors.right_hand, Vec3::new(0.1, 0.0, 0.0));
        r.scene.step(DT);
        p.update(&mut r.scene, &right(), DT);

        nudge(&mut r.scene, r.anchors.right_hand, Vec3::new(0.1, 0.0, 0.0));
        r.scene.step(DT);
        let event = p.update(&mut r.scene, &right().with(Action::Release), DT);

        let Some(PointerEvent::Thrown { body, velocity }) = event else {
            panic!("expected a throw, got {event:?}");
        };
        assert_eq!(body, r.key);
        assert!((velocity - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-3);
        assert_eq!(impulses(&r.scene), vec![velocity]);
        assert!(p.held().is_none());
        assert!(p.constraint().is_none());
        assert!(r.scene.holder_of(r.key).is_none());
    }

    #[test]
    fn release_without_motion_throws_with_zero_impulse() {
        let mut r = rig();
        let mut p = pointer(r.anchors);
        p.update(&mut r.scene, &right().with(Action::Grab), DT);
        r.scene.step(DT);
        let event = p.update(&mut r.scene, &right().with(Action::Release), DT);
        assert_eq!(
            event,
            Some(PointerEvent::Thrown {
                body: r.key,
                velocity: Vec3::ZERO
            })
        );
    }

    #[test]
    fn throw_velocity_guards_zero_dt() {
        assert_eq!(throw_velocity(Vec3::ONE, Vec3::ZERO, 0.0), Vec3::ZERO);
        assert_eq!(throw_velocity(Vec3::ONE, Vec3::ONE, 0.016), Vec3::ZERO);
        assert_eq!(
            throw_velocity(Vec3::new(0.0, 0.0, 1.0), Vec3::ZERO, 0.5),
            Vec3::new(0.0, 0.0, 2.0)
        );
    }

    #[test]
    fn release_without_holding_is_noop() {
        let mut r = rig();
        let mut p = pointer(r.anchors);
        assert!(p.update(&mut r.scene, &right().with(Action::Release), DT).is_none());
        assert!(impulses(&r.scene).is_empty());
    }

    #[test]
    fn body_held_elsewhere_cannot_be_grabbed() {
        let mut r = rig();
        let mut first = pointer(r.anchors);
        first.update(&mut r.scene, &right().with(Action::Grab), DT);

        let left = InputSnapshot::vr(ActiveController::LeftTracked);
        let mut second = pointer(r.anchors);
        assert!(second.update(&mut r.scene, &left.with(Action::Grab), DT).is_none());
        assert!(second.held().is_none());
        assert_eq!(r.scene.holder_of(r.key), Some(r.anchors.right_hand));
    }

    #[test]
    fn broken_link_is_not_reconciled_until_release() {
        let mut r = rig();
        let mut p = PointerInteractor::new(
            PointerConfig {
                break_force: 1.0,
                ..PointerConfig::default()
            },
            r.anchors,
        );
        p.set_enabled(true);
        p.update(&mut r.scene, &right().with(Action::Grab), DT);

        nudge(&mut r.scene, r.anchors.right_hand, Vec3::new(1.0, 0.0, 0.0));
        r.scene.step(DT);
        assert!(r.scene.holder_of(r.key).is_none());

        p.update(&mut r.scene, &right(), DT);
        assert_eq!(p.held(), Some(r.key));

        let event = p.update(&mut r.scene, &right().with(Action::Release), DT);
        assert_eq!(event, Some(PointerEvent::Dropped { body: r.key }));
        assert!(impulses(&r.scene).is_empty());
    }

    #[test]
    fn stale_constraint_is_cleared_before_next_grab() {
        let mut r = rig();
        let mut p = pointer(r.anchors);
        p.update(&mut r.scene, &right().with(Action::Grab), DT);
        r.scene.despawn(r.key);

        let spare = r.scene.spawn("Spare", Transform::from_position(Vec3::new(0.0, 1.0, -1.5)));
        r.scene.set_body(spare, RigidBody::default());
        r.scene.set_collider(spare, Collider::solid(Shape::Sphere { radius: 0.1 }));

        p.update(&mut r.scene, &right(), DT);
        assert!(p.held().is_none());
        assert_eq!(p.constraint().unwrap().body, r.key);

        p.update(&mut r.scene, &right().with(Action::Grab), DT);
        assert_eq!(p.held(), Some(spare));
        assert_eq!(p.constraint().unwrap().body, spare);
    }

    #[test]
    fn anchor_follows_active_controller() {
        let anchors = rig().anchors;
        assert_eq!(anchors.select(ActiveController::RightTracked), anchors.right_hand);
        assert_eq!(anchors.select(ActiveController::LeftTracked), anchors.left_hand);
        assert_eq!(anchors.select(ActiveController::None), anchors.center_eye);
    }

    #[test]
    fn desktop_ray_drops_below_the_eye() {
        let mut r = rig();
        let mut p = pointer(r.anchors);
        p.update(&mut r.scene, &InputSnapshot::desktop(), DT);
        let ray = p.ray().unwrap();
        assert!((ray.origin - Vec3::new(0.0, 0.2, 0.0)).length() < 1e-5);
        assert!(ray.direction.y < 0.0);
        assert!(ray.direction.z < 0.0);
        assert!((ray.direction.length() - 1.0).abs() < 1e-5);
    }
}
