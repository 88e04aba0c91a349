use std::path::PathBuf;

/// Errors from loading or validating a session configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors from loading a level layout or resolving its named entities.
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("level has no entity named {0:?}")]
    MissingEntity(String),
    #[error("entity name {0:?} is used more than once")]
    DuplicateName(String),
    #[error("entity {entity:?} names unknown parent {parent:?}")]
    UnknownParent { entity: String, parent: String },
    #[error("entity {entity:?} has mass {mass}; mass must be positive and finite")]
    InvalidMass { entity: String, mass: f32 },
}
