//! Data models and structures
//!
//! Defines the values that flow through the normalize/dispatch pipeline and
//! the service configuration.

use crate::ai::mime;
use crate::styles::StyleCatalog;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Language the image model expects prompts in.
pub const TARGET_LANGUAGE: &str = "zh";

/// Status text reported for a successful generation.
pub const SUCCESS_STATUS: &str = "Success";

/// User-supplied prompt text; never blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("prompt must not be empty".to_string()));
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Language identifier as returned by language recognition (`zh`, `en`, `jp`, `kor`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_string())
    }

    pub fn target() -> Self {
        Self(TARGET_LANGUAGE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_target(&self) -> bool {
        self.0 == TARGET_LANGUAGE
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-instance sequence number identifying one normalization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerToken(u64);

impl TriggerToken {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TriggerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// User-facing note shown only when the prompt was translated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Advisory {
    #[default]
    Hidden,
    Shown(String),
}

impl Advisory {
    pub fn is_visible(&self) -> bool {
        matches!(self, Advisory::Shown(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Advisory::Hidden => None,
            Advisory::Shown(text) => Some(text),
        }
    }
}

/// A prompt in the target language, ready for exactly one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPrompt {
    pub prompt: String,
    pub token: TriggerToken,
}

/// Successful output of the normalization stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalization {
    pub normalized: NormalizedPrompt,
    pub language: LanguageCode,
    pub advisory: Advisory,
}

impl Normalization {
    pub fn was_translated(&self) -> bool {
        !self.language.is_target()
    }
}

/// Parameters handed to the image generation capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    pub style: &'a str,
    pub visualization: bool,
    pub topk: Option<u32>,
}

/// One generated image with its sniffed MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
}

impl GeneratedImage {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let mime_type = mime::detect_image_mime(&data);
        Self { data, mime_type }
    }

    pub fn extension(&self) -> &'static str {
        mime::extension_for_mime(self.mime_type)
    }

    pub fn to_data_uri(&self) -> String {
        use base64::Engine as _;
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}

/// What the caller sees for one request: a status line plus an optional gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Success(Vec<GeneratedImage>),
    Failure(String),
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success(_))
    }

    pub fn status_text(&self) -> &str {
        match self {
            RequestOutcome::Success(_) => SUCCESS_STATUS,
            RequestOutcome::Failure(text) => text,
        }
    }

    pub fn images(&self) -> &[GeneratedImage] {
        match self {
            RequestOutcome::Success(images) => images,
            RequestOutcome::Failure(_) => &[],
        }
    }
}

impl<E: fmt::Display> From<std::result::Result<Vec<GeneratedImage>, E>> for RequestOutcome {
    fn from(result: std::result::Result<Vec<GeneratedImage>, E>) -> Self {
        match result {
            Ok(images) => RequestOutcome::Success(images),
            Err(e) => RequestOutcome::Failure(e.to_string()),
        }
    }
}

/// Per-request pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Idle,
    Detecting,
    Translating,
    Skipped,
    Dispatching,
    Succeeded,
    Failed,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Succeeded | RequestState::Failed)
    }

    pub fn can_advance_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Idle, Detecting)
                | (Detecting, Translating)
                | (Detecting, Skipped)
                | (Detecting, Failed)
                | (Translating, Dispatching)
                | (Translating, Failed)
                | (Skipped, Dispatching)
                | (Dispatching, Succeeded)
                | (Dispatching, Failed)
        )
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Idle => "idle",
            RequestState::Detecting => "detecting",
            RequestState::Translating => "translating",
            RequestState::Skipped => "skipped",
            RequestState::Dispatching => "dispatching",
            RequestState::Succeeded => "succeeded",
            RequestState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Ordered record of the states one request passed through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequestTrace {
    states: Vec<RequestState>,
}

impl Default for RequestTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestTrace {
    pub fn new() -> Self {
        Self {
            states: vec![RequestState::Idle],
        }
    }

    /// Trace for a dispatch whose normalization happened in an earlier request.
    pub fn resumed(from: RequestState) -> Self {
        Self { states: vec![from] }
    }

    pub fn current(&self) -> RequestState {
        self.states.last().copied().unwrap_or(RequestState::Idle)
    }

    pub fn advance(&mut self, next: RequestState) {
        debug_assert!(
            self.current().can_advance_to(next),
            "illegal transition {} -> {}",
            self.current(),
            next
        );
        tracing::debug!("Request state {} -> {}", self.current(), next);
        self.states.push(next);
    }

    pub fn states(&self) -> &[RequestState] {
        &self.states
    }
}

/// Which backend answers language recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorKind {
    Hub,
    Local,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub hub_base_url: String,
    pub hub_access_token: Option<String>,
    pub recognition_module: String,
    pub translation_module: String,
    pub image_module: String,
    pub detector: DetectorKind,
    pub timeout: Duration,
    pub image_timeout: Duration,
    pub retries: usize,
    pub retry_interval: Duration,
    pub max_images: usize,
    pub topk: Option<u32>,
    pub styles: StyleCatalog,
    pub max_concurrency: usize,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let detector = match var("LANGUAGE_DETECTOR", "hub").to_lowercase().as_str() {
            "hub" => DetectorKind::Hub,
            "local" => DetectorKind::Local,
            other => {
                return Err(Error::Config(format!(
                    "LANGUAGE_DETECTOR must be 'hub' or 'local', got '{}'",
                    other
                )))
            }
        };

        let max_images = parse_number::<usize>("MAX_IMAGES", &var("MAX_IMAGES", "4"))?;
        if max_images == 0 {
            return Err(Error::Config("MAX_IMAGES must be at least 1".to_string()));
        }

        let max_concurrency =
            parse_number::<usize>("MAX_CONCURRENCY", &var("MAX_CONCURRENCY", "100"))?;
        if max_concurrency == 0 {
            return Err(Error::Config(
                "MAX_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        let topk = match var("GENERATION_TOPK", "4").to_lowercase().as_str() {
            "none" | "0" => None,
            raw => Some(parse_number::<u32>("GENERATION_TOPK", raw)?),
        };

        let styles = match lookup("STYLES").filter(|v| !v.trim().is_empty()) {
            Some(raw) => StyleCatalog::parse_list(&raw)?,
            None => StyleCatalog::default(),
        };

        Ok(Self {
            hub_base_url: var("HUB_BASE_URL", "http://127.0.0.1:8866")
                .trim_end_matches('/')
                .to_string(),
            hub_access_token: lookup("HUB_ACCESS_TOKEN").filter(|v| !v.trim().is_empty()),
            recognition_module: var("HUB_RECOGNITION_MODULE", "baidu_language_recognition"),
            translation_module: var("HUB_TRANSLATION_MODULE", "baidu_translate"),
            image_module: var("HUB_IMAGE_MODULE", "ernie_vilg"),
            detector,
            timeout: Duration::from_secs(parse_number(
                "HUB_TIMEOUT_SECS",
                &var("HUB_TIMEOUT_SECS", "30"),
            )?),
            image_timeout: Duration::from_secs(parse_number(
                "HUB_IMAGE_TIMEOUT_SECS",
                &var("HUB_IMAGE_TIMEOUT_SECS", "120"),
            )?),
            retries: parse_number("HUB_RETRIES", &var("HUB_RETRIES", "0"))?,
            retry_interval: Duration::from_millis(parse_number(
                "HUB_RETRY_INTERVAL_MS",
                &var("HUB_RETRY_INTERVAL_MS", "2000"),
            )?),
            max_images,
            topk,
            styles,
            max_concurrency,
            bind_addr: var("BIND_ADDR", "0.0.0.0:7860"),
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}
