use thiserror::Error;

/// Errors raised while loading [`crate::AppConfig`] or a filter preset.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read preset {path}: {source}")]
    PresetIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid preset {path}: {source}")]
    PresetParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}
