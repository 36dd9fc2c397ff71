use super::{ImageGenerationService, LanguageRecognitionService, TranslationService};
use crate::models::{GeneratedImage, GenerationRequest, LanguageCode};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// A valid 1x1 PNG used as the default generated image.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 pixel
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44,
    0x41, // IDAT chunk
    0x54, 0x08, 0x99, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0xE2, 0x25,
    0x00, 0xBC, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, // IEND chunk
    0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Clone)]
pub struct MockLanguageRecognizer {
    codes: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockLanguageRecognizer {
    pub fn new() -> Self {
        Self {
            codes: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_code(self, code: &str) -> Self {
        self.codes.lock().unwrap().push(code.to_string());
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        *self.failure.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockLanguageRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageRecognitionService for MockLanguageRecognizer {
    async fn recognize(&self, _text: &str) -> Result<LanguageCode> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(Error::Hub(message));
        }

        let codes = self.codes.lock().unwrap();
        if codes.is_empty() {
            Ok(LanguageCode::target())
        } else {
            let index = (*count - 1) % codes.len();
            Ok(LanguageCode::new(codes[index].clone()))
        }
    }
}

/// Records `(text, source, target)` for every call.
#[derive(Clone)]
pub struct MockTranslator {
    translations: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self {
            translations: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_translation(self, text: &str) -> Self {
        self.translations.lock().unwrap().push(text.to_string());
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        *self.failure.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn get_calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslationService for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((
            text.to_string(),
            source.to_string(),
            target.to_string(),
        ));

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(Error::Hub(message));
        }

        let translations = self.translations.lock().unwrap();
        if translations.is_empty() {
            Ok(format!("[{}] {}", target, text))
        } else {
            let index = (calls.len() - 1) % translations.len();
            Ok(translations[index].clone())
        }
    }
}

/// A generation call as seen by [`MockImageGenerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedGeneration {
    pub prompt: String,
    pub style: String,
    pub visualization: bool,
    pub topk: Option<u32>,
}

#[derive(Clone)]
pub struct MockImageGenerator {
    image_count: usize,
    failure: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<Vec<RecordedGeneration>>>,
}

impl MockImageGenerator {
    pub fn new() -> Self {
        Self {
            image_count: 1,
            failure: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of images every call returns.
    pub fn with_image_count(mut self, image_count: usize) -> Self {
        self.image_count = image_count;
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        *self.failure.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn get_calls(&self) -> Vec<RecordedGeneration> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockImageGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerator {
    async fn generate_images(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<Vec<GeneratedImage>> {
        self.calls.lock().unwrap().push(RecordedGeneration {
            prompt: request.prompt.to_string(),
            style: request.style.to_string(),
            visualization: request.visualization,
            topk: request.topk,
        });

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(Error::Hub(message));
        }

        Ok((0..self.image_count)
            .map(|_| GeneratedImage::from_bytes(TINY_PNG.to_vec()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_recognizer_cycles_codes() {
        let recognizer = MockLanguageRecognizer::new().with_code("en").with_code("jp");

        assert_eq!(recognizer.recognize("a").await.unwrap().as_str(), "en");
        assert_eq!(recognizer.recognize("b").await.unwrap().as_str(), "jp");
        assert_eq!(recognizer.recognize("c").await.unwrap().as_str(), "en");
        assert_eq!(recognizer.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_recognizer_defaults_to_target() {
        let recognizer = MockLanguageRecognizer::new();
        assert!(recognizer.recognize("猫").await.unwrap().is_target());
    }

    #[tokio::test]
    async fn test_mock_translator_records_calls() {
        let translator = MockTranslator::new();
        let out = translator
            .translate("cat", &LanguageCode::new("en"), &LanguageCode::target())
            .await
            .unwrap();

        assert_eq!(out, "[zh] cat");
        assert_eq!(
            translator.get_calls(),
            vec![("cat".to_string(), "en".to_string(), "zh".to_string())]
        );
    }

    #[tokio::test]
    async fn test_mock_generator_failure_still_counts_call() {
        let generator = MockImageGenerator::new().with_failure("model offline");
        let request = GenerationRequest {
            prompt: "猫",
            style: "油画",
            visualization: false,
            topk: Some(4),
        };

        let err = generator.generate_images(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "model offline");
        assert_eq!(generator.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_generator_returns_configured_count() {
        let generator = MockImageGenerator::new().with_image_count(8);
        let request = GenerationRequest {
            prompt: "猫",
            style: "水彩",
            visualization: false,
            topk: None,
        };

        let images = generator.generate_images(&request).await.unwrap();
        assert_eq!(images.len(), 8);
        assert!(images.iter().all(|i| i.mime_type == "image/png"));
    }
}
