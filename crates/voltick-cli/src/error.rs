use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] voltick_core::ValidationError),

    #[error(transparent)]
    Pricing(#[from] voltick_pricing::PricingError),

    #[error("command error: {0}")]
    Command(String),

    #[error("deadline of {timeout_ms}ms exceeded")]
    Timeout { timeout_ms: u64 },

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

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Pricing(_) => 2,
            Self::Command(_) => 2,
            Self::Timeout { .. } => 7,
            Self::StrictModeViolation { .. } => 5,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
