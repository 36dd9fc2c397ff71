//! Model-serving integrations for language recognition, translation and
//! image generation
//!
//! Each capability sits behind its own trait so the pipeline can be driven
//! by the remote model service, the in-process detector, or mocks.

pub mod hub;
pub mod local;
pub mod mime;
pub mod mock;

pub use hub::{HubImageClient, HubLanguageClient, HubTranslateClient};
pub use local::LocalLanguageDetector;
pub use mock::{MockImageGenerator, MockLanguageRecognizer, MockTranslator};

use crate::models::{GeneratedImage, GenerationRequest, LanguageCode};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait LanguageRecognitionService: Send + Sync {
    async fn recognize(&self, text: &str) -> Result<LanguageCode>;
}

#[async_trait]
pub trait TranslationService: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Returns images in the order produced by the model, untruncated.
    async fn generate_images(&self, request: &GenerationRequest<'_>)
        -> Result<Vec<GeneratedImage>>;
}
