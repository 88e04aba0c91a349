use keyroom_common::{CameraPose, EntityId, horizontal};
use keyroom_input::{Action, InputSnapshot};
use keyroom_kernel::Scene;
use serde::{Deserialize, Serialize};

/// Tunables for walking, turning and the completion panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Walking speed in metres per second.
    pub speed: f32,
    /// Desktop turn per fixed step at full arrow deflection, in degrees.
    pub rotate_speed_degrees: f32,
    /// Touchpad clicks closer than this to the horizontal centre line do not move.
    pub touchpad_dead_zone: f32,
    /// How far in front of the player the completion panel appears.
    pub panel_distance: f32,
    /// Name of the trigger volume that ends the game.
    pub goal_name: String,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            speed: 2.0,
            rotate_speed_degrees: 2.0,
            touchpad_dead_zone: 0.2,
            panel_distance: 2.0,
            goal_name: "Goal".to_string(),
        }
    }
}

/// Scene entities the player drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerRig {
    /// Kinematic body that walks.
    pub agent: EntityId,
    pub title_panel: EntityId,
    pub clear_panel: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Title,
    Playing,
}

/// Requests the player makes of whoever owns the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerSignal {
    /// Play began: enable the pointer.
    Started,
    /// Rebuild the whole scene from scratch.
    ReloadRequested,
}

/// The locomotion agent. Movement stays locked until the start input.
#[derive(Debug, Clone)]
pub struct Player {
    pub(crate) config: LocomotionConfig,
    pub(crate) rig: PlayerRig,
    phase: Phase,
    pub(crate) completed: bool,
}

impl Player {
    pub fn new(config: LocomotionConfig, rig: PlayerRig) -> Self {
        Self {
            config,
            rig,
            phase: Phase::Title,
            completed: false,
        }
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    pub fn rig(&self) -> &PlayerRig {
        &self.rig
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_started(&self) -> bool {
        self.phase == Phase::Playing
    }

    /// Whether the goal has been reached.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Per-frame: leave the title screen, or ask for a reload while playing.
    pub fn update(&mut self, scene: &mut Scene, input: &InputSnapshot) -> Option<PlayerSignal> {
        match self.phase {
            Phase::Title if input.has(Action::Start) => {
                scene.hide_panel(self.rig.title_panel);
                self.phase = Phase::Playing;
                tracing::debug!("game started");
                Some(PlayerSignal::Started)
            }
            Phase::Playing if input.has(Action::Reset) => {
                tracing::debug!("reload requested");
                Some(PlayerSignal::ReloadRequested)
            }
            _ => None,
        }
    }

    /// Per fixed step: walk or turn. Returns whether the agent moved.
    pub fn fixed_update(
        &mut self,
        scene: &mut Scene,
        input: &InputSnapshot,
        camera: &CameraPose,
        dt: f32,
    ) -> bool {
        if self.phase != Phase::Playing {
            return false;
        }
        if input.hmd_present {
            self.step_along_camera(scene, input, camera, dt)
        } else {
            self.steer(scene, input, dt)
        }
    }

    /// Headset mode: a touchpad click above or below the dead zone walks
    /// forward or back along the flattened camera facing. Sideways clicks do nothing.
    fn step_along_camera(
        &self,
        scene: &mut Scene,
        input: &InputSnapshot,
        camera: &CameraPose,
        dt: f32,
    ) -> bool {
        let Some(touch) = input.step() else {
            return false;
        };
        if touch.abs() <= self.config.touchpad_dead_zone {
            return false;
        }
        let Some(position) = scene.position(self.rig.agent) else {
            return false;
        };
        let direction = camera.horizontal_forward() * touch.signum();
        let target = position + direction * self.config.speed * dt;
        tracing::trace!(?target, "step");
        scene.move_position(self.rig.agent, target)
    }

    /// Desktop mode: the horizontal arrow turns, the vertical arrow walks
    /// along the agent's own facing.
    fn steer(&self, scene: &mut Scene, input: &InputSnapshot, dt: f32) -> bool {
        let Some(axes) = input.steer() else {
            return false;
        };
        let Some(mut transform) = scene.transform(self.rig.agent) else {
            return false;
        };

        let mut moved = false;
        if axes.x != 0.0 {
            transform.yaw_right(axes.x * self.config.rotate_speed_degrees);
            moved |= scene.set_rotation(self.rig.agent, transform.rotation);
        }
        if axes.y != 0.0 {
            let direction = horizontal(transform.forward()) * axes.y.signum();
            let target = transform.position + direction * self.config.speed * dt;
            moved |= scene.move_position(self.rig.agent, target);
        }
        moved
    }
}
