/// Result alias that carries the custom [`CutError`] type.
pub type Result<T> = std::result::Result<T, CutError>;

/// Common error type for the core crate.
///
/// Only configuration problems are surfaced as errors. Running short of source
/// material or losing the preview surface are handled where they happen and
/// only show up in the logs.
#[derive(Debug, thiserror::Error)]
pub enum CutError {
    /// A configuration value failed validation. `field` names the offending
    /// setting so callers can point the user at it.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidConfig { field: String, reason: String },
    /// The worker pool used for parallel round compilation could not be built.
    #[error("failed to start round workers: {0}")]
    WorkerPool(String),
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

impl CutError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Creates a configuration error for `field`.
    pub fn invalid<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the offending field for configuration errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidConfig { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<&str> for CutError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for CutError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_names_the_field() {
        let err = CutError::invalid("bpm", "must be positive");
        assert_eq!(err.field(), Some("bpm"));
        assert!(format!("{err}").contains("`bpm`"));
    }

    #[test]
    fn plain_messages_have_no_field() {
        let err: CutError = "boom".into();
        assert!(err.field().is_none());
        assert_eq!(format!("{err}"), "boom");
    }
}
