#![forbid(unsafe_code)]

use thiserror::Error;

use crate::task::model::MAX_TITLE_LEN;

#[derive(Debug, Error)]
pub enum TaskdeckError {
    /// Network failure or non-2xx response; carries the user-facing message
    /// (server-provided when available, a fixed fallback otherwise).
    #[error("{0}")]
    Transport(String),

    #[error("Title is required")]
    EmptyTitle,

    #[error("Title must be less than {MAX_TITLE_LEN} characters")]
    TitleTooLong,

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config key '{0}'")]
    InvalidConfigKey(String),

    #[error("{0}")]
    Other(String),
}

impl TaskdeckError {
    /// Validation errors are surfaced inline on the input field and never
    /// reach the store's error state.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyTitle | Self::TitleTooLong)
    }
}
