//! Language normalization: detect, translate when needed, attach an advisory.

use crate::advisory::AdvisoryTable;
use crate::ai::{LanguageRecognitionService, TranslationService};
use crate::error::PipelineError;
use crate::models::{
    Advisory, LanguageCode, Normalization, NormalizedPrompt, RequestState, RequestTrace,
    TriggerToken,
};
use tracing::{info, warn};

pub struct LanguageNormalizer {
    recognizer: Box<dyn LanguageRecognitionService>,
    translator: Box<dyn TranslationService>,
    advisories: AdvisoryTable,
    target: LanguageCode,
}

impl LanguageNormalizer {
    pub fn new(
        recognizer: Box<dyn LanguageRecognitionService>,
        translator: Box<dyn TranslationService>,
    ) -> Self {
        Self {
            recognizer,
            translator,
            advisories: AdvisoryTable::default(),
            target: LanguageCode::target(),
        }
    }

    pub fn with_advisories(mut self, advisories: AdvisoryTable) -> Self {
        self.advisories = advisories;
        self
    }

    /// Bring `prompt` into the target language.
    ///
    /// Detection always runs first; translation only runs when the detected
    /// code differs from the target. Either call failing ends the request.
    pub async fn normalize(
        &self,
        prompt: &str,
        token: TriggerToken,
        trace: &mut RequestTrace,
    ) -> Result<Normalization, PipelineError> {
        trace.advance(RequestState::Detecting);
        let language = match self.recognizer.recognize(prompt).await {
            Ok(code) => code,
            Err(e) => {
                warn!("[{}] Language detection failed: {}", token, e);
                trace.advance(RequestState::Failed);
                return Err(PipelineError::Detection(e));
            }
        };

        if language == self.target {
            info!("[{}] Prompt already in {}, no translation", token, language);
            trace.advance(RequestState::Skipped);
            return Ok(Normalization {
                normalized: NormalizedPrompt {
                    prompt: prompt.to_string(),
                    token,
                },
                language,
                advisory: Advisory::Hidden,
            });
        }

        trace.advance(RequestState::Translating);
        let translated = match self.translator.translate(prompt, &language, &self.target).await {
            Ok(text) => text,
            Err(e) => {
                warn!("[{}] Translation from {} failed: {}", token, language, e);
                trace.advance(RequestState::Failed);
                return Err(PipelineError::Translation(e));
            }
        };

        info!(
            "[{}] Translated prompt from {} ({} chars -> {} chars)",
            token,
            language,
            prompt.chars().count(),
            translated.chars().count()
        );

        Ok(Normalization {
            advisory: self.advisories.advisory_for(&language),
            normalized: NormalizedPrompt {
                prompt: translated,
                token,
            },
            language,
        })
    }
}
