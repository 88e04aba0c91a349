use glam::Vec3;
use keyroom_common::{CameraPose, EntityId, Transform, look_rotation};
use keyroom_kernel::Scene;

use crate::locomotion::Player;

/// Where the completion panel goes: `distance` ahead of `origin` along the
/// flattened camera facing, turned to face the same way.
pub fn completion_pose(origin: Vec3, camera: &CameraPose, distance: f32) -> Transform {
    let forward = camera.horizontal_forward();
    Transform {
        position: origin + forward * distance,
        rotation: look_rotation(forward),
        ..Transform::default()
    }
}

impl Player {
    /// React to the agent entering a trigger volume. Only a live entity
    /// carrying the goal name counts; it is removed so it cannot fire twice.
    pub fn on_trigger_enter(
        &mut self,
        scene: &mut Scene,
        other: EntityId,
        camera: &CameraPose,
    ) -> bool {
        if scene.name(other) != Some(self.config.goal_name.as_str()) {
            return false;
        }
        let Some(origin) = scene.position(self.rig.agent) else {
            return false;
        };

        let pose = completion_pose(origin, camera, self.config.panel_distance);
        scene.show_panel(self.rig.clear_panel, pose);
        scene.play_sound(self.rig.agent);
        scene.despawn(other);
        self.completed = true;
        tracing::debug!(goal = %other.short(), "goal reached");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locomotion::{LocomotionConfig, PlayerRig};
    use glam::Quat;
    use keyroom_common::FORWARD;
    use keyroom_kernel::{Collider, HostCommand, RigidBody, Shape};

    fn setup() -> (Scene, Player, EntityId) {
        let mut scene = Scene::with_gravity(Vec3::ZERO);
        let agent = scene.spawn("Player", Transform::from_position(Vec3::new(0.0, 1.0, 0.0)));
        scene.set_body(agent, RigidBody::kinematic());
        scene.set_collider(agent, Collider::solid(Shape::default()));
        let title_panel = scene.spawn("Title", Transform::default());
        let clear_panel = scene.spawn("Clear", Transform::default());
        scene.set_active(clear_panel, false);
        let goal = scene.spawn("Goal", Transform::from_position(Vec3::new(0.0, 1.0, -0.5)));
        scene.set_collider(goal, Collider::trigger(Shape::default()));
        let player = Player::new(
            LocomotionConfig::default(),
            PlayerRig {
                agent,
                title_panel,
                clear_panel,
            },
        );
        (scene, player, goal)
    }

    #[test]
    fn pose_is_two_units_ahead_facing_away() {
        let camera = CameraPose::new(Vec3::ZERO, Quat::from_rotation_x(0.4));
        let pose = completion_pose(Vec3::new(1.0, 1.0, 1.0), &camera, 2.0);
        assert!((pose.position - Vec3::new(1.0, 1.0, -1.0)).length() < 1e-5);
        assert!((pose.rotation * FORWARD - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn goal_shows_panel_plays_sound_and_vanishes() {
        let (mut scene, mut player, goal) = setup();
        let camera = CameraPose::default();
        assert!(player.on_trigger_enter(&mut scene, goal, &camera));
        assert!(player.is_completed());
        assert!(!scene.contains(goal));
        assert!(scene.is_active(player.rig.clear_panel));

        let commands = scene.drain_commands();
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0], HostCommand::ShowPanel { panel, transform }
            if panel == player.rig.clear_panel
                && (transform.position - Vec3::new(0.0, 1.0, -2.0)).length() < 1e-5));
        assert_eq!(
            commands[1],
            HostCommand::PlaySound {
                source: player.rig.agent
            }
        );
    }

    #[test]
    fn second_crossing_is_noop() {
        let (mut scene, mut player, goal) = setup();
        let camera = CameraPose::default();
        assert!(player.on_trigger_enter(&mut scene, goal, &camera));
        scene.drain_commands();
        assert!(!player.on_trigger_enter(&mut scene, goal, &camera));
        assert!(scene.commands().is_empty());
        // The volume is gone, so stepping in place produces no new contact.
        assert!(scene.step(0.02).is_empty());
    }

    #[test]
    fn other_triggers_are_ignored() {
        let (mut scene, mut player, _goal) = setup();
        let decoy = scene.spawn("Checkpoint", Transform::default());
        assert!(!player.on_trigger_enter(&mut scene, decoy, &CameraPose::default()));
        assert!(scene.contains(decoy));
        assert!(!player.is_completed());
    }

    #[test]
    fn goal_found_through_scene_contacts() {
        let (mut scene, mut player, goal) = setup();
        let contacts = scene.step(0.02);
        let agent = player.rig.agent;
        let touched: Vec<EntityId> = contacts.iter().filter_map(|c| c.other_than(agent)).collect();
        assert_eq!(touched, vec![goal]);
        assert!(player.on_trigger_enter(&mut scene, touched[0], &CameraPose::default()));
    }
}
