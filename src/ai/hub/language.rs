use super::client::HubHttpClient;
use super::types::RecognitionRequest;
use crate::ai::LanguageRecognitionService;
use crate::models::LanguageCode;
use crate::{Error, Result};
use async_trait::async_trait;

pub struct HubLanguageClient {
    http: HubHttpClient,
}

impl HubLanguageClient {
    pub fn new(http: HubHttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl LanguageRecognitionService for HubLanguageClient {
    async fn recognize(&self, text: &str) -> Result<LanguageCode> {
        tracing::debug!("Recognizing language via {}", self.http.module());

        let code: String = self
            .http
            .predict(&RecognitionRequest { query: text })
            .await?;

        let code = LanguageCode::new(code);
        if code.as_str().is_empty() {
            return Err(Error::Hub(format!(
                "{} returned an empty language code",
                self.http.module()
            )));
        }
        Ok(code)
    }
}
