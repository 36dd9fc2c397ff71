use super::client::HubHttpClient;
use super::types::TranslationRequest;
use crate::ai::TranslationService;
use crate::models::LanguageCode;
use crate::Result;
use async_trait::async_trait;

pub struct HubTranslateClient {
    http: HubHttpClient,
}

impl HubTranslateClient {
    pub fn new(http: HubHttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl TranslationService for HubTranslateClient {
    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String> {
        tracing::debug!(
            "Translating {} -> {} via {}",
            source,
            target,
            self.http.module()
        );

        self.http
            .predict(&TranslationRequest {
                query: text,
                source_lang: source.as_str(),
                target_lang: target.as_str(),
            })
            .await
    }
}
