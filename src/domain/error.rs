//! Domain error types.

/// Top-level error type for fairval.
#[derive(Debug, thiserror::Error)]
pub enum FairvalError {
    #[error("invalid input {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("missing required input: {field}")]
    MissingInput { field: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no discount rate available from {source_name}")]
    NoDiscountRate { source_name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FairvalError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        FairvalError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(field: &str) -> Self {
        FairvalError::MissingInput {
            field: field.to_string(),
        }
    }
}

impl From<&FairvalError> for std::process::ExitCode {
    fn from(err: &FairvalError) -> Self {
        let code: u8 = match err {
            FairvalError::Io(_) => 1,
            FairvalError::ConfigParse { .. }
            | FairvalError::ConfigMissing { .. }
            | FairvalError::ConfigInvalid { .. } => 2,
            FairvalError::DataSource { .. }
            | FairvalError::MissingInput { .. }
            | FairvalError::NoDiscountRate { .. } => 3,
            FairvalError::InvalidInput { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
