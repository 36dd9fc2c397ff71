//! Application orchestration: normalize a prompt, then dispatch generation.

use crate::advisory::AdvisoryTable;
use crate::ai::hub::{HubHttpClient, RetryPolicy};
use crate::ai::{
    HubImageClient, HubLanguageClient, HubTranslateClient, ImageGenerationService,
    LanguageRecognitionService, LocalLanguageDetector, TranslationService,
};
use crate::dispatcher::{GenerationDispatcher, DEFAULT_MAX_IMAGES, DEFAULT_TOPK};
use crate::error::PipelineError;
use crate::models::{
    Advisory, Config, DetectorKind, LanguageCode, Normalization, NormalizedPrompt, Prompt,
    RequestOutcome, RequestTrace, TriggerToken,
};
use crate::normalizer::LanguageNormalizer;
use crate::styles::{StyleCatalog, StyleSelector};
use crate::trigger::{DispatchLedger, TriggerSequence};
use crate::Result;
use tracing::{info, warn};

/// Runs the two pipeline stages for every request this instance serves.
pub struct App {
    normalizer: LanguageNormalizer,
    dispatcher: GenerationDispatcher,
    styles: StyleCatalog,
    triggers: TriggerSequence,
    ledger: DispatchLedger,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub recognizer: Box<dyn LanguageRecognitionService>,
    pub translator: Box<dyn TranslationService>,
    pub generator: Box<dyn ImageGenerationService>,
}

/// Static pipeline configuration.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub styles: StyleCatalog,
    pub advisories: AdvisoryTable,
    pub max_images: usize,
    pub topk: Option<u32>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            styles: StyleCatalog::default(),
            advisories: AdvisoryTable::default(),
            max_images: DEFAULT_MAX_IMAGES,
            topk: Some(DEFAULT_TOPK),
        }
    }
}

/// Everything both stages reported for one submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub token: TriggerToken,
    pub language: Option<LanguageCode>,
    pub advisory: Advisory,
    pub normalized_prompt: Option<String>,
    pub outcome: RequestOutcome,
    pub trace: RequestTrace,
}

impl App {
    /// Build an app from concrete service dependencies.
    ///
    /// This is primarily useful for integration tests and local harnesses that
    /// need to inject mocks.
    pub fn with_services(services: AppServices, settings: AppSettings) -> Self {
        Self {
            normalizer: LanguageNormalizer::new(services.recognizer, services.translator)
                .with_advisories(settings.advisories),
            dispatcher: GenerationDispatcher::new(services.generator)
                .with_max_images(settings.max_images)
                .with_topk(settings.topk),
            styles: settings.styles,
            triggers: TriggerSequence::new(),
            ledger: DispatchLedger::default(),
        }
    }

    /// Construct an app talking to the model-serving API described by `config`.
    pub fn from_config(config: &Config) -> Self {
        // Reuse one HTTP connection pool across module clients.
        let http_client = reqwest::Client::new();
        let retry = RetryPolicy {
            retries: config.retries,
            interval: config.retry_interval,
        };
        let hub = |module: &str, timeout| {
            HubHttpClient::new_with_client(
                config.hub_base_url.clone(),
                module.to_string(),
                timeout,
                http_client.clone(),
            )
            .with_access_token(config.hub_access_token.clone())
            .with_retry(retry)
        };

        let recognizer: Box<dyn LanguageRecognitionService> = match config.detector {
            DetectorKind::Hub => {
                info!(
                    "Language recognition: {} at {}",
                    config.recognition_module, config.hub_base_url
                );
                Box::new(HubLanguageClient::new(hub(
                    &config.recognition_module,
                    config.timeout,
                )))
            }
            DetectorKind::Local => {
                info!("Language recognition: local detector");
                Box::new(LocalLanguageDetector::new())
            }
        };

        info!(
            "Translation: {}, generation: {} (max {} images, topk {:?})",
            config.translation_module, config.image_module, config.max_images, config.topk
        );

        Self::with_services(
            AppServices {
                recognizer,
                translator: Box::new(HubTranslateClient::new(hub(
                    &config.translation_module,
                    config.timeout,
                ))),
                generator: Box::new(HubImageClient::new(hub(
                    &config.image_module,
                    config.image_timeout,
                ))),
            },
            AppSettings {
                styles: config.styles.clone(),
                advisories: AdvisoryTable::default(),
                max_images: config.max_images,
                topk: config.topk,
            },
        )
    }

    /// Construct an app from environment configuration (`Config::from_env`).
    pub fn new() -> Result<Self> {
        Ok(Self::from_config(&Config::from_env()?))
    }

    pub fn styles(&self) -> &StyleCatalog {
        &self.styles
    }

    pub fn max_images(&self) -> usize {
        self.dispatcher.max_images()
    }

    /// Run both stages back to back.
    pub async fn submit(&self, prompt: &Prompt, style: StyleSelector<'_>) -> Submission {
        let token = self.triggers.next();
        let mut trace = RequestTrace::new();
        info!("[{}] New submission (style: {})", token, style.name());

        let Normalization {
            normalized,
            language,
            advisory,
        } = match self
            .normalizer
            .normalize(prompt.as_str(), token, &mut trace)
            .await
        {
            Ok(normalization) => normalization,
            Err(e) => {
                warn!("[{}] Stopped at {} stage", token, e.stage());
                return Submission {
                    token,
                    language: None,
                    advisory: Advisory::Hidden,
                    normalized_prompt: None,
                    outcome: RequestOutcome::Failure(e.to_string()),
                    trace,
                };
            }
        };

        let outcome = RequestOutcome::from(
            self.dispatcher
                .dispatch(&normalized, style, &mut trace)
                .await,
        );
        info!("[{}] Finished: {}", token, trace.current());

        Submission {
            token,
            language: Some(language),
            advisory,
            normalized_prompt: Some(normalized.prompt),
            outcome,
            trace,
        }
    }

    /// Normalization stage only. A success registers its token for exactly
    /// one later [`App::dispatch`].
    pub async fn normalize(
        &self,
        prompt: &Prompt,
    ) -> std::result::Result<Normalization, PipelineError> {
        let token = self.triggers.next();
        let mut trace = RequestTrace::new();

        let normalization = self
            .normalizer
            .normalize(prompt.as_str(), token, &mut trace)
            .await?;
        self.ledger.register(token, trace.current());
        Ok(normalization)
    }

    /// Generation stage for a prompt produced by [`App::normalize`].
    ///
    /// Fails with [`crate::Error::DuplicateDispatch`] when the token was not
    /// issued by this instance or was already dispatched.
    pub async fn dispatch(
        &self,
        normalized: NormalizedPrompt,
        style: StyleSelector<'_>,
    ) -> Result<RequestOutcome> {
        let resumed_from = self.ledger.claim(normalized.token)?;
        let mut trace = RequestTrace::resumed(resumed_from);

        let outcome = RequestOutcome::from(
            self.dispatcher
                .dispatch(&normalized, style, &mut trace)
                .await,
        );
        info!("[{}] Finished: {}", normalized.token, trace.current());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::{App, AppServices, AppSettings};
    use crate::ai::{MockImageGenerator, MockLanguageRecognizer, MockTranslator};
    use crate::models::{Advisory, Prompt, RequestState};
    use crate::Error;
    use pretty_assertions::assert_eq;

    struct Probes {
        recognizer: MockLanguageRecognizer,
        translator: MockTranslator,
        generator: MockImageGenerator,
    }

    fn build_test_app(
        recognizer: MockLanguageRecognizer,
        translator: MockTranslator,
        generator: MockImageGenerator,
        max_images: usize,
    ) -> (App, Probes) {
        let probes = Probes {
            recognizer: recognizer.clone(),
            translator: translator.clone(),
            generator: generator.clone(),
        };
        let app = App::with_services(
            AppServices {
                recognizer: Box::new(recognizer),
                translator: Box::new(translator),
                generator: Box::new(generator),
            },
            AppSettings {
                max_images,
                ..AppSettings::default()
            },
        );
        (app, probes)
    }

    #[tokio::test]
    async fn test_submit_target_language_prompt() {
        let (app, probes) = build_test_app(
            MockLanguageRecognizer::new().with_code("zh"),
            MockTranslator::new(),
            MockImageGenerator::new().with_image_count(8),
            4,
        );

        let prompt = Prompt::new("戴着眼镜的猫").unwrap();
        let style = app.styles().select(1).unwrap();
        let submission = app.submit(&prompt, style).await;

        assert_eq!(submission.outcome.status_text(), "Success");
        assert_eq!(submission.outcome.images().len(), 4);
        assert_eq!(submission.advisory, Advisory::Hidden);
        assert_eq!(submission.normalized_prompt.as_deref(), Some("戴着眼镜的猫"));
        assert_eq!(probes.translator.get_call_count(), 0);
        assert_eq!(probes.generator.get_calls()[0].style, "油画");
        assert_eq!(
            submission.trace.states(),
            &[
                RequestState::Idle,
                RequestState::Detecting,
                RequestState::Skipped,
                RequestState::Dispatching,
                RequestState::Succeeded
            ]
        );
    }

    #[tokio::test]
    async fn test_submit_english_prompt_is_translated_before_generation() {
        let (app, probes) = build_test_app(
            MockLanguageRecognizer::new().with_code("en"),
            MockTranslator::new().with_translation("戴着眼镜的猫"),
            MockImageGenerator::new().with_image_count(6),
            6,
        );

        let prompt = Prompt::new("A cat with glasses").unwrap();
        let submission = app.submit(&prompt, app.styles().select(1).unwrap()).await;

        assert!(submission.outcome.is_success());
        assert_eq!(submission.outcome.images().len(), 6);
        assert!(submission.advisory.is_visible());
        assert_eq!(submission.language.unwrap().as_str(), "en");
        assert_eq!(probes.generator.get_calls()[0].prompt, "戴着眼镜的猫");
    }

    #[tokio::test]
    async fn test_detection_failure_never_dispatches() {
        let (app, probes) = build_test_app(
            MockLanguageRecognizer::new().with_failure("connection refused"),
            MockTranslator::new(),
            MockImageGenerator::new(),
            4,
        );

        let prompt = Prompt::new("A cat with glasses").unwrap();
        let submission = app.submit(&prompt, app.styles().select(0).unwrap()).await;

        assert_eq!(
            submission.outcome.status_text(),
            "connection refused"
        );
        assert!(submission.outcome.images().is_empty());
        assert_eq!(submission.advisory, Advisory::Hidden);
        assert_eq!(probes.recognizer.get_call_count(), 1);
        assert_eq!(probes.generator.get_call_count(), 0);
        assert_eq!(submission.trace.current(), RequestState::Failed);
    }

    #[tokio::test]
    async fn test_generation_failure_clears_gallery() {
        let (app, _probes) = build_test_app(
            MockLanguageRecognizer::new(),
            MockTranslator::new(),
            MockImageGenerator::new().with_failure("ernie_vilg busy"),
            4,
        );

        let prompt = Prompt::new("戴着眼镜的猫").unwrap();
        let submission = app.submit(&prompt, app.styles().select(2).unwrap()).await;

        assert!(!submission.outcome.is_success());
        assert_eq!(
            submission.outcome.status_text(),
            "ernie_vilg busy"
        );
        assert!(submission.outcome.images().is_empty());
    }

    #[tokio::test]
    async fn test_tokens_increase_across_submissions() {
        let (app, _probes) = build_test_app(
            MockLanguageRecognizer::new(),
            MockTranslator::new(),
            MockImageGenerator::new(),
            4,
        );
        let prompt = Prompt::new("猫").unwrap();

        let mut previous = None;
        for _ in 0..5 {
            let submission = app.submit(&prompt, app.styles().select(0).unwrap()).await;
            if let Some(prev) = previous {
                assert!(submission.token > prev);
            }
            previous = Some(submission.token);
        }
    }

    #[tokio::test]
    async fn test_two_step_flow_dispatches_once_per_token() {
        let (app, probes) = build_test_app(
            MockLanguageRecognizer::new().with_code("kor"),
            MockTranslator::new().with_translation("戴着眼镜的猫"),
            MockImageGenerator::new().with_image_count(2),
            4,
        );

        let prompt = Prompt::new("안경 쓴 고양이").unwrap();
        let normalization = app.normalize(&prompt).await.unwrap();
        assert_eq!(
            normalization.advisory.text(),
            Some("힌트: 원본 텍스트는 한국어이며 중국어로 번역됩니다")
        );

        let style = app.styles().select(16).unwrap();
        let outcome = app
            .dispatch(normalization.normalized.clone(), style)
            .await
            .unwrap();
        assert_eq!(outcome.images().len(), 2);

        let replay = app.dispatch(normalization.normalized, style).await;
        assert!(matches!(replay, Err(Error::DuplicateDispatch(_))));
        assert_eq!(probes.generator.get_call_count(), 1);
        assert_eq!(probes.generator.get_calls()[0].style, "探索无限");
    }

    #[tokio::test]
    async fn test_failed_normalization_token_cannot_dispatch() {
        let (app, probes) = build_test_app(
            MockLanguageRecognizer::new().with_code("en"),
            MockTranslator::new().with_failure("translate offline"),
            MockImageGenerator::new(),
            4,
        );

        let prompt = Prompt::new("A cat").unwrap();
        assert!(app.normalize(&prompt).await.is_err());

        let forged = crate::models::NormalizedPrompt {
            prompt: "猫".to_string(),
            token: crate::models::TriggerToken::new(1),
        };
        let result = app.dispatch(forged, app.styles().select(0).unwrap()).await;
        assert!(matches!(result, Err(Error::DuplicateDispatch(1))));
        assert_eq!(probes.generator.get_call_count(), 0);
    }
}
