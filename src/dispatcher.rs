//! Generation dispatch: resolve the style, call the model, bound the gallery.

use crate::ai::ImageGenerationService;
use crate::error::PipelineError;
use crate::models::{GeneratedImage, GenerationRequest, NormalizedPrompt, RequestState, RequestTrace};
use crate::styles::StyleSelector;
use tracing::{error, info};

pub const DEFAULT_MAX_IMAGES: usize = 4;
pub const DEFAULT_TOPK: u32 = 4;

pub struct GenerationDispatcher {
    generator: Box<dyn ImageGenerationService>,
    max_images: usize,
    topk: Option<u32>,
}

impl GenerationDispatcher {
    pub fn new(generator: Box<dyn ImageGenerationService>) -> Self {
        Self {
            generator,
            max_images: DEFAULT_MAX_IMAGES,
            topk: Some(DEFAULT_TOPK),
        }
    }

    pub fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = max_images.max(1);
        self
    }

    pub fn with_topk(mut self, topk: Option<u32>) -> Self {
        self.topk = topk;
        self
    }

    pub fn max_images(&self) -> usize {
        self.max_images
    }

    pub async fn dispatch(
        &self,
        prompt: &NormalizedPrompt,
        style: StyleSelector<'_>,
        trace: &mut RequestTrace,
    ) -> Result<Vec<GeneratedImage>, PipelineError> {
        trace.advance(RequestState::Dispatching);

        let request = GenerationRequest {
            prompt: &prompt.prompt,
            style: style.name(),
            visualization: false,
            topk: self.topk,
        };

        match self.generator.generate_images(&request).await {
            Ok(mut images) => {
                let returned = images.len();
                images.truncate(self.max_images);
                info!(
                    "[{}] Generated {} image(s) in style {} ({} returned)",
                    prompt.token,
                    images.len(),
                    style.name(),
                    returned
                );
                trace.advance(RequestState::Succeeded);
                Ok(images)
            }
            Err(e) => {
                error!("[{}] Image generation failed: {}", prompt.token, e);
                trace.advance(RequestState::Failed);
                Err(PipelineError::Generation(e))
            }
        }
    }
}
