use super::LanguageRecognitionService;
use crate::models::LanguageCode;
use crate::{Error, Result};
use async_trait::async_trait;
use whatlang::Lang;

/// In-process language recognition backed by `whatlang`.
///
/// Codes follow the model-serving vocabulary (`zh`, `en`, `jp`, `kor`, ...)
/// so the advisory table and translation module accept them unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalLanguageDetector;

impl LocalLanguageDetector {
    pub fn new() -> Self {
        Self
    }

    fn service_code(lang: Lang) -> &'static str {
        match lang {
            Lang::Cmn => "zh",
            Lang::Eng => "en",
            Lang::Jpn => "jp",
            Lang::Kor => "kor",
            Lang::Fra => "fra",
            Lang::Spa => "spa",
            Lang::Deu => "de",
            Lang::Rus => "ru",
            Lang::Por => "pt",
            Lang::Ita => "it",
            Lang::Ara => "ara",
            Lang::Tha => "th",
            Lang::Vie => "vie",
            Lang::Nld => "nl",
            Lang::Pol => "pl",
            Lang::Ell => "el",
            Lang::Swe => "swe",
            Lang::Fin => "fin",
            Lang::Dan => "dan",
            Lang::Ces => "cs",
            Lang::Hun => "hu",
            Lang::Bul => "bul",
            Lang::Ron => "rom",
            Lang::Est => "est",
            Lang::Slv => "slo",
            other => other.code(),
        }
    }
}

#[async_trait]
impl LanguageRecognitionService for LocalLanguageDetector {
    async fn recognize(&self, text: &str) -> Result<LanguageCode> {
        let info = whatlang::detect(text).ok_or_else(|| {
            Error::InvalidInput("Unable to recognize the language of the prompt".to_string())
        })?;

        tracing::debug!(
            "Local detector: {} (confidence {:.2}, reliable: {})",
            info.lang().eng_name(),
            info.confidence(),
            info.is_reliable()
        );

        Ok(LanguageCode::new(Self::service_code(info.lang())))
    }
}
