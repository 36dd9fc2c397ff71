//! Wire payloads for the model-serving predict endpoints.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Status code the serving layer reports for a successful prediction.
pub const STATUS_OK: &str = "000";

/// Response envelope shared by every predict endpoint.
#[derive(Debug, Deserialize)]
pub struct HubEnvelope<T> {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub msg: String,
    pub results: Option<T>,
}

impl<T> HubEnvelope<T> {
    pub fn into_results(self, module: &str) -> Result<T> {
        if !self.status.is_empty() && self.status != STATUS_OK {
            let msg = if self.msg.is_empty() {
                format!("{} failed with status {}", module, self.status)
            } else {
                self.msg
            };
            return Err(Error::Hub(msg));
        }
        self.results
            .ok_or_else(|| Error::Hub(format!("{} returned no results", module)))
    }
}

/// Request body for language recognition.
#[derive(Debug, Serialize)]
pub struct RecognitionRequest<'a> {
    pub query: &'a str,
}

/// Request body for translation.
#[derive(Debug, Serialize)]
pub struct TranslationRequest<'a> {
    pub query: &'a str,
    pub source_lang: &'a str,
    pub target_lang: &'a str,
}

/// Request body for text-to-image generation.
#[derive(Debug, Serialize)]
pub struct ImageRequest<'a> {
    pub text_prompts: &'a str,
    pub style: &'a str,
    pub visualization: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topk: Option<u32>,
}
