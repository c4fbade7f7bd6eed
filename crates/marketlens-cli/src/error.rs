use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] marketlens_core::ValidationError),

    #[error(transparent)]
    Analytics(#[from] marketlens_core::SnapshotError),

    #[error(transparent)]
    Config(#[from] marketlens_core::ConfigError),

    #[error("strict mode failed: warnings={warning_count}, errors={error_count}")]
    StrictModeViolation {
        warning_count: usize,
        error_count: usize,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<marketlens_core::CoreError> for CliError {
    fn from(error: marketlens_core::CoreError) -> Self {
        use marketlens_core::CoreError;

        match error {
            CoreError::Validation(error) => Self::Validation(error),
            CoreError::Snapshot(error) => Self::Analytics(error),
            CoreError::Config(error) => Self::Config(error),
            CoreError::Serialization(error) => Self::Serialization(error),
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Analytics(_) => 3,
            Self::Serialization(_) => 4,
            Self::StrictModeViolation { .. } => 5,
            Self::Config(_) => 7,
            Self::Io(_) => 10,
        }
    }
}
