//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.
//! [`PipelineError`] tags a failure with the pipeline stage that produced it.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure reported by the model service. Displays the message unchanged.
    #[error("{0}")]
    Hub(String),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Trigger token {0} was not issued or has already been dispatched")]
    DuplicateDispatch(u64),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A terminal failure of one pipeline stage.
///
/// Displays as the underlying error text so it can be shown verbatim in the
/// single status slot.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Detection(#[source] Error),

    #[error("{0}")]
    Translation(#[source] Error),

    #[error("{0}")]
    Generation(#[source] Error),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Detection(_) => "detection",
            PipelineError::Translation(_) => "translation",
            PipelineError::Generation(_) => "generation",
        }
    }

    pub fn into_inner(self) -> Error {
        match self {
            PipelineError::Detection(e)
            | PipelineError::Translation(e)
            | PipelineError::Generation(e) => e,
        }
    }
}
