//! Clients for the PaddleHub-style model-serving API.

pub mod client;
pub mod image;
pub mod language;
pub mod translate;
pub mod types;

pub use client::{HubHttpClient, RetryPolicy};
pub use image::HubImageClient;
pub use language::HubLanguageClient;
pub use translate::HubTranslateClient;
