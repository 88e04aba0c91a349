use glam::Vec3;
use keyroom_interact::PointerConfig;
use keyroom_kernel::DEFAULT_GRAVITY;
use keyroom_player::LocomotionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Fixed-step physics settings for the reference scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Seconds per physics step.
    pub fixed_timestep: f32,
    /// Upper bound on physics steps run inside one frame.
    pub max_substeps: u32,
    pub gravity: Vec3,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 0.02,
            max_substeps: 8,
            gravity: DEFAULT_GRAVITY,
        }
    }
}

/// Everything tunable about a session. Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub pointer: PointerConfig,
    pub locomotion: LocomotionConfig,
    pub physics: PhysicsConfig,
}

impl SessionConfig {
    /// Load and validate a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&text)?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("pointer.max_distance", self.pointer.max_distance)?;
        positive("pointer.break_force", self.pointer.break_force)?;
        positive("pointer.break_torque", self.pointer.break_torque)?;
        positive("locomotion.speed", self.locomotion.speed)?;
        non_negative("locomotion.rotate_speed_degrees", self.locomotion.rotate_speed_degrees)?;
        non_negative("locomotion.panel_distance", self.locomotion.panel_distance)?;
        if !(0.0..1.0).contains(&self.locomotion.touchpad_dead_zone) {
            return Err(ConfigError::Invalid {
                field: "locomotion.touchpad_dead_zone",
                reason: format!("{} is outside [0, 1)", self.locomotion.touchpad_dead_zone),
            });
        }
        if self.locomotion.goal_name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "locomotion.goal_name",
                reason: "must not be empty".into(),
            });
        }
        positive("physics.fixed_timestep", self.physics.fixed_timestep)?;
        if self.physics.max_substeps == 0 {
            return Err(ConfigError::Invalid {
                field: "physics.max_substeps",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is not a positive number"),
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is negative"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_authored_values() {
        let c = SessionConfig::default();
        assert_eq!(c.pointer.max_distance, 2.5);
        assert_eq!(c.pointer.break_force, 20000.0);
        assert_eq!(c.pointer.break_torque, 20000.0);
        assert_eq!(c.locomotion.speed, 2.0);
        assert_eq!(c.locomotion.rotate_speed_degrees, 2.0);
        assert_eq!(c.locomotion.goal_name, "Goal");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_yaml_overrides_only_named_keys() {
        let yaml = "pointer:\n  max_distance: 4.0\nphysics:\n  fixed_timestep: 0.01\n";
        let c = SessionConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(c.pointer.max_distance, 4.0);
        assert_eq!(c.pointer.break_force, 20000.0);
        assert_eq!(c.physics.fixed_timestep, 0.01);
        assert_eq!(c.physics.max_substeps, 8);
        assert_eq!(c.locomotion, LocomotionConfig::default());
    }

    #[test]
    fn yaml_round_trip() {
        let c = SessionConfig::default();
        let back = SessionConfig::from_yaml_str(&c.to_yaml().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn rejects_bad_values() {
        let field_of = |yaml: &str| match SessionConfig::from_yaml_str(yaml) {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        };
        assert_eq!(field_of("locomotion:\n  speed: 0.0\n"), Some("locomotion.speed"));
        assert_eq!(
            field_of("locomotion:\n  touchpad_dead_zone: 1.5\n"),
            Some("locomotion.touchpad_dead_zone")
        );
        assert_eq!(field_of("physics:\n  max_substeps: 0\n"), Some("physics.max_substeps"));
        assert_eq!(field_of("pointer:\n  max_distance: -1.0\n"), Some("pointer.max_distance"));

        assert!(matches!(
            SessionConfig::from_yaml_str("pointer: 12").unwrap_err(),
            ConfigError::Yaml(_)
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "locomotion:\n  goal_name: Exit").unwrap();
        let c = SessionConfig::load(file.path()).unwrap();
        assert_eq!(c.locomotion.goal_name, "Exit");
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let err = SessionConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("absent.yaml"));
    }
}
