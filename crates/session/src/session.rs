use keyroom_common::{CameraPose, EntityId, Transform};
use keyroom_door::Door;
use keyroom_input::{InputSnapshot, InputTracker, RawInput};
use keyroom_interact::{PointerEvent, PointerInteractor};
use keyroom_kernel::{Contact, HostCommand, Scene, SceneEvent};
use keyroom_player::{Player, PlayerSignal};
use serde::Serialize;
use std::time::Instant;

use crate::config::SessionConfig;
use crate::error::LevelError;
use crate::level::{LevelHandles, LevelLayout};
use crate::timing::FrameTimer;

/// Head and hand poses reported by a headset, relative to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackedPoses {
    pub center_eye: Transform,
    pub right_hand: Transform,
    pub left_hand: Transform,
}

/// What happened during one call to [`Session::frame`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub pointer: Option<PointerEvent>,
    pub signal: Option<PlayerSignal>,
    pub doors_opened: usize,
    pub goal_reached: bool,
    /// Fixed physics steps run this frame.
    pub steps: u32,
    /// Scene log records produced this frame, drained from the scene.
    pub events: Vec<SceneEvent>,
}

/// Running totals across the session, reloads included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub frames: u64,
    pub fixed_steps: u64,
    pub grabs: u32,
    pub throws: u32,
    pub drops: u32,
    pub doors_opened: u32,
    pub goals_reached: u32,
    pub reloads: u32,
}

/// Anchor poses in the agent's local space when nothing is tracked.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RigOffsets {
    center_eye: Transform,
    right_hand: Transform,
    left_hand: Transform,
}

impl RigOffsets {
    fn capture(scene: &Scene, handles: &LevelHandles) -> Self {
        let agent = scene.transform(handles.player.agent).unwrap_or_default();
        let local = |id: EntityId| {
            let world = scene.transform(id).unwrap_or_default();
            let inv = agent.rotation.inverse();
            Transform {
                position: inv * (world.position - agent.position),
                rotation: inv * world.rotation,
                ..world
            }
        };
        Self {
            center_eye: local(handles.anchors.center_eye),
            right_hand: local(handles.anchors.right_hand),
            left_hand: local(handles.anchors.left_hand),
        }
    }
}

/// The caller-owned loop: one call per rendered frame.
///
/// Per frame the session samples input, places the rig, runs as many fixed
/// physics steps as the elapsed time allows, routes contacts to the goal and
/// door handlers, then updates the pointer and the title/reload logic.
pub struct Session {
    config: SessionConfig,
    pristine: (Scene, LevelHandles),
    scene: Scene,
    handles: LevelHandles,
    tracker: InputTracker,
    player: Player,
    pointer: PointerInteractor,
    offsets: RigOffsets,
    tracking: Option<TrackedPoses>,
    camera: CameraPose,
    accumulator: f32,
    commands: Vec<HostCommand>,
    stats: SessionStats,
    timer: FrameTimer,
}

impl Session {
    pub fn new(config: SessionConfig, layout: &LevelLayout) -> Result<Self, LevelError> {
        let (scene, handles) = layout.build(config.physics.gravity)?;
        let offsets = RigOffsets::capture(&scene, &handles);
        let player = Player::new(config.locomotion.clone(), handles.player);
        let pointer = PointerInteractor::new(config.pointer, handles.anchors);
        let mut session = Self {
            pristine: (scene.clone(), handles.clone()),
            scene,
            handles,
            tracker: InputTracker::new(),
            player,
            pointer,
            offsets,
            tracking: None,
            camera: CameraPose::default(),
            accumulator: 0.0,
            commands: Vec::new(),
            stats: SessionStats::default(),
            timer: FrameTimer::new(120),
            config,
        };
        session.sync_rig();
        tracing::info!(
            entities = session.scene.entity_count(),
            doors = session.handles.doors.len(),
            "session ready"
        );
        Ok(session)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn pointer(&self) -> &PointerInteractor {
        &self.pointer
    }

    pub fn doors(&self) -> &[Door] {
        &self.handles.doors
    }

    pub fn handles(&self) -> &LevelHandles {
        &self.handles
    }

    pub fn camera(&self) -> CameraPose {
        self.camera
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Host commands emitted since the last drain, in order.
    pub fn drain_commands(&mut self) -> Vec<HostCommand> {
        self.commands.append(&mut self.scene.drain_commands());
        std::mem::take(&mut self.commands)
    }

    /// Advance the session by one rendered frame of `dt` seconds.
    pub fn frame(
        &mut self,
        raw: RawInput,
        tracking: Option<TrackedPoses>,
        dt: f32,
    ) -> FrameReport {
        let _span = tracing::info_span!("frame", n = self.stats.frames).entered();
        let frame_start = Instant::now();

        let input = self.tracker.sample(raw);
        self.tracking = tracking;
        self.sync_rig();

        let mut report = FrameReport::default();
        self.run_fixed_steps(&input, dt, &mut report);

        report.pointer = self.pointer.update(&mut self.scene, &input, dt);
        match report.pointer {
            Some(PointerEvent::Grabbed { .. }) => self.stats.grabs += 1,
            Some(PointerEvent::Thrown { .. }) => self.stats.throws += 1,
            Some(PointerEvent::Dropped { .. }) => self.stats.drops += 1,
            None => {}
        }

        report.signal = self.player.update(&mut self.scene, &input);
        match report.signal {
            Some(PlayerSignal::Started) => self.pointer.set_enabled(true),
            Some(PlayerSignal::ReloadRequested) => {
                report.events.append(&mut self.scene.drain_events());
                self.reload();
            }
            None => {}
        }

        self.commands.append(&mut self.scene.drain_commands());
        report.events.append(&mut self.scene.drain_events());
        self.stats.frames += 1;
        self.timer.record(frame_start.elapsed());
        tracing::trace!(steps = report.steps, pointer = ?report.pointer, "frame complete");
        report
    }

    /// Throw the scene away and rebuild it as it was first loaded. Input edge
    /// state survives so a held button does not re-fire.
    pub fn reload(&mut self) {
        let (scene, handles) = self.pristine.clone();
        self.commands.append(&mut self.scene.drain_commands());
        self.scene = scene;
        self.player = Player::new(self.config.locomotion.clone(), handles.player);
        self.pointer = PointerInteractor::new(self.config.pointer, handles.anchors);
        self.handles = handles;
        self.accumulator = 0.0;
        self.sync_rig();
        self.stats.reloads += 1;
        tracing::info!(reloads = self.stats.reloads, "scene reloaded");
    }

    fn run_fixed_steps(&mut self, input: &InputSnapshot, dt: f32, report: &mut FrameReport) {
        let step = self.config.physics.fixed_timestep;
        self.accumulator += dt.max(0.0);
        while self.accumulator >= step && report.steps < self.config.physics.max_substeps {
            self.accumulator -= step;
            report.steps += 1;

            let camera = self.camera;
            self.player.fixed_update(&mut self.scene, input, &camera, step);
            self.sync_rig();
            let contacts = self.scene.step(step);
            self.dispatch_contacts(&contacts, report);
        }
        // Time the cap would not let us simulate is dropped.
        if report.steps == self.config.physics.max_substeps {
            self.accumulator = self.accumulator.min(step);
        }
        self.stats.fixed_steps += u64::from(report.steps);
    }

    fn dispatch_contacts(&mut self, contacts: &[Contact], report: &mut FrameReport) {
        let agent = self.handles.player.agent;
        for contact in contacts {
            match *contact {
                Contact::Trigger { trigger, other } if other == agent => {
                    let camera = self.camera;
                    if self.player.on_trigger_enter(&mut self.scene, trigger, &camera) {
                        report.goal_reached = true;
                        self.stats.goals_reached += 1;
                    }
                }
                Contact::Collision { .. } => {
                    for door in &self.handles.doors {
                        let Some(other) = contact.other_than(door.entity()) else {
                            continue;
                        };
                        if door.on_collision(&mut self.scene, other) {
                            report.doors_opened += 1;
                            self.stats.doors_opened += 1;
                        }
                    }
                }
                Contact::Trigger { .. } => {}
            }
        }
    }

    /// Place the head and hands relative to the agent, then point the camera
    /// through the head.
    fn sync_rig(&mut self) {
        let Some(agent) = self.scene.transform(self.handles.player.agent) else {
            return;
        };
        let local = match self.tracking {
            Some(poses) => RigOffsets {
                center_eye: poses.center_eye,
                right_hand: poses.right_hand,
                left_hand: poses.left_hand,
            },
            None => self.offsets,
        };
        let anchors = self.handles.anchors;
        for (id, pose) in [
            (anchors.center_eye, local.center_eye),
            (anchors.right_hand, local.right_hand),
            (anchors.left_hand, local.left_hand),
        ] {
            let world = Transform {
                position: agent.position + agent.rotation * pose.position,
                rotation: (agent.rotation * pose.rotation).normalize(),
                ..pose
            };
            self.scene.set_transform(id, world);
        }
        if let Some(eye) = self.scene.transform(anchors.center_eye) {
            self.camera = CameraPose::new(eye.position, eye.rotation);
        }
    }
}
