#![forbid(unsafe_code)]

use thiserror::Error;

use lumen_view::ViewError;

pub type Result<T> = std::result::Result<T, DemoError>;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error("invalid script step `{step}`: {reason}")]
    InvalidStep { step: String, reason: String },
}

impl DemoError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidStep { .. } => 2,
            Self::View(_) => 3,
            _ => 1,
        }
    }

    #[must_use]
    pub fn invalid_step(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidStep {
            step: step.into(),
            reason: reason.into(),
        }
    }
}
