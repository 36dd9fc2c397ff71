//! Gateway for a hosted text-to-image model
//!
//! Normalizes a user prompt into Chinese (detecting its language and
//! translating when needed), then dispatches it with an art style to the
//! image generation model and returns a bounded gallery.

pub mod advisory;
pub mod ai;
pub mod app;
pub mod dispatcher;
pub mod error;
pub mod gallery;
pub mod models;
pub mod normalizer;
pub mod server;
pub mod styles;
pub mod trigger;

pub use error::{Error, PipelineError, Result};
