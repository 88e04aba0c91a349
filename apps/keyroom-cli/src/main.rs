use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use keyroom_kernel::HostCommand;
use keyroom_session::{LevelLayout, Script, Session, SessionConfig, SessionStats};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keyroom-cli", about = "CLI tool for keyroom sessions")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Input scripts selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScriptArg {
    Idle,
    WalkThrow,
    VrStroll,
}

impl From<ScriptArg> for Script {
    fn from(arg: ScriptArg) -> Self {
        match arg {
            ScriptArg::Idle => Script::Idle,
            ScriptArg::WalkThrow => Script::WalkThrow,
            ScriptArg::VrStroll => Script::VrStroll,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Print the effective configuration as YAML
    Config {
        /// YAML file overriding the defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the built-in room as YAML
    Level,
    /// Drive a scripted input sequence through a session
    Run {
        /// Number of frames to run; defaults to the script's own length
        #[arg(short, long)]
        frames: Option<u64>,
        /// Input script to play
        #[arg(short, long, value_enum, default_value_t = ScriptArg::WalkThrow)]
        script: ScriptArg,
        /// Seconds per frame
        #[arg(long, default_value = "0.02")]
        dt: f32,
        /// YAML file overriding the default configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// YAML level layout to load instead of the built-in room
        #[arg(short, long)]
        level: Option<PathBuf>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Host commands seen during a run, by kind.
#[derive(Debug, Default, Serialize)]
struct CommandCounts {
    sounds: usize,
    animation_triggers: usize,
    panels_shown: usize,
    panels_hidden: usize,
}

impl CommandCounts {
    fn tally(&mut self, commands: &[HostCommand]) {
        for command in commands {
            match command {
                HostCommand::PlaySound { .. } => self.sounds += 1,
                HostCommand::SetAnimationTrigger { .. } => self.animation_triggers += 1,
                HostCommand::ShowPanel { .. } => self.panels_shown += 1,
                HostCommand::HidePanel { .. } => self.panels_hidden += 1,
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct RunSummary {
    script: &'static str,
    frames: u64,
    started: bool,
    doors_open: usize,
    goal_reached: bool,
    player_position: [f32; 3],
    stats: SessionStats,
    commands: CommandCounts,
    avg_frame_micros: u64,
    max_frame_micros: u64,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(SessionConfig::default()),
    }
}

fn load_level(path: Option<&Path>) -> anyhow::Result<LevelLayout> {
    match path {
        Some(path) => {
            LevelLayout::load(path).with_context(|| format!("loading level {}", path.display()))
        }
        None => Ok(LevelLayout::default_room()),
    }
}

fn run(
    script: Script,
    frames: u64,
    dt: f32,
    config: SessionConfig,
    layout: &LevelLayout,
) -> anyhow::Result<RunSummary> {
    let mut session = Session::new(config, layout).context("building the level")?;
    let mut commands = CommandCounts::default();

    for n in 0..frames {
        let report = session.frame(script.raw_input(n), None, dt);
        if report.doors_opened > 0 {
            tracing::info!(frame = n, "door opened");
        }
        if report.goal_reached {
            tracing::info!(frame = n, "goal reached");
        }
        commands.tally(&session.drain_commands());
    }

    let scene = session.scene();
    let player_position = scene
        .position(session.handles().player.agent)
        .map(|p| p.to_array())
        .unwrap_or_default();
    Ok(RunSummary {
        script: script.name(),
        frames,
        started: session.player().is_started(),
        doors_open: session.doors().iter().filter(|d| d.is_open(scene)).count(),
        goal_reached: session.player().is_completed(),
        player_position,
        stats: session.stats(),
        commands,
        avg_frame_micros: session.timer().average().as_micros() as u64,
        max_frame_micros: session.timer().max().as_micros() as u64,
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("keyroom-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: forward={:?}", keyroom_common::FORWARD);
            println!("kernel: {}", keyroom_kernel::crate_info());
            println!("input: {}", keyroom_input::crate_info());
            println!("interact: {}", keyroom_interact::crate_info());
            println!("player: {}", keyroom_player::crate_info());
            println!("door: {}", keyroom_door::crate_info());
            println!("session: {}", keyroom_session::crate_info());
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_yaml()?);
        }
        Commands::Level => {
            print!("{}", LevelLayout::default_room().to_yaml()?);
        }
        Commands::Run {
            frames,
            script,
            dt,
            config,
            level,
            json,
        } => {
            let script = Script::from(script);
            let config = load_config(config.as_deref())?;
            let layout = load_level(level.as_deref())?;
            let frames = frames.unwrap_or_else(|| script.default_frames());

            let summary = run(script, frames, dt, config, &layout)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Script {}: {} frames", summary.script, summary.frames);
                println!(
                    "Started: {}, doors open: {}, goal reached: {}",
                    summary.started, summary.doors_open, summary.goal_reached
                );
                println!(
                    "Pointer: grabs={}, throws={}, drops={}",
                    summary.stats.grabs, summary.stats.throws, summary.stats.drops
                );
                println!(
                    "Player at [{:.2}, {:.2}, {:.2}]",
                    summary.player_position[0],
                    summary.player_position[1],
                    summary.player_position[2]
                );
                println!(
                    "Host commands: sounds={}, animations={}, panels shown={}, hidden={}",
                    summary.commands.sounds,
                    summary.commands.animation_triggers,
                    summary.commands.panels_shown,
                    summary.commands.panels_hidden
                );
                println!(
                    "Frame time: avg={}us, max={}us",
                    summary.avg_frame_micros, summary.max_frame_micros
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_throw_summary() {
        let script = Script::WalkThrow;
        let summary = run(
            script,
            script.default_frames(),
            0.02,
            SessionConfig::default(),
            &LevelLayout::default_room(),
        )
        .unwrap();
        assert!(summary.started);
        assert_eq!(summary.doors_open, 1);
        assert!(summary.goal_reached);
        // Door sound, goal sound.
        assert_eq!(summary.commands.sounds, 2);
        assert_eq!(summary.commands.animation_triggers, 1);
        assert_eq!(summary.commands.panels_hidden, 1);
        assert_eq!(summary.commands.panels_shown, 1);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["stats"]["throws"], 1);
    }

    #[test]
    fn idle_never_moves() {
        let summary = run(
            Script::Idle,
            30,
            0.02,
            SessionConfig::default(),
            &LevelLayout::default_room(),
        )
        .unwrap();
        assert!(summary.started);
        assert_eq!(summary.player_position, [0.0, 1.0, 0.0]);
        assert_eq!(summary.doors_open, 0);
    }

    #[test]
    fn cli_parses_run() {
        let cli = Cli::try_parse_from(["keyroom-cli", "run", "--frames", "10", "--json"]).unwrap();
        match cli.command {
            Commands::Run {
                frames,
                script,
                json,
                ..
            } => {
                assert_eq!(frames, Some(10));
                assert_eq!(script, ScriptArg::WalkThrow);
                assert!(json);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn cli_validates_script_names() {
        let cli = Cli::try_parse_from(["keyroom-cli", "run", "--script", "vr-stroll"]).unwrap();
        let Commands::Run { script, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(Script::from(script), Script::VrStroll);
        assert!(Cli::try_parse_from(["keyroom-cli", "run", "--script", "dance"]).is_err());
    }
}
