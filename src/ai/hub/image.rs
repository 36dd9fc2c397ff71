use super::client::HubHttpClient;
use super::types::ImageRequest;
use crate::ai::ImageGenerationService;
use crate::models::{GeneratedImage, GenerationRequest};
use crate::{Error, Result};
use async_trait::async_trait;

pub struct HubImageClient {
    http: HubHttpClient,
}

impl HubImageClient {
    pub fn new(http: HubHttpClient) -> Self {
        Self { http }
    }

    fn decode_image(index: usize, encoded: &str) -> Result<GeneratedImage> {
        // Some deployments answer with data URIs instead of bare base64.
        let payload = match encoded.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => encoded,
        };

        use base64::Engine as _;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::Hub(format!("Failed to decode image {}: {}", index, e)))?;
        Ok(GeneratedImage::from_bytes(bytes))
    }
}

#[async_trait]
impl ImageGenerationService for HubImageClient {
    async fn generate_images(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<Vec<GeneratedImage>> {
        tracing::debug!(
            "Requesting images from {} (style: {}, topk: {:?})",
            self.http.module(),
            request.style,
            request.topk
        );

        let encoded: Vec<String> = self
            .http
            .predict(&ImageRequest {
                text_prompts: request.prompt,
                style: request.style,
                visualization: request.visualization,
                topk: request.topk,
            })
            .await?;

        encoded
            .iter()
            .enumerate()
            .map(|(i, data)| Self::decode_image(i, data))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_client(server: &MockServer) -> HubImageClient {
        HubImageClient::new(HubHttpClient::new(
            server.uri(),
            "ernie_vilg".to_string(),
            Duration::from_secs(5),
        ))
    }

    fn request<'a>(topk: Option<u32>) -> GenerationRequest<'a> {
        GenerationRequest {
            prompt: "戴着眼镜的猫",
            style: "油画",
            visualization: false,
            topk,
        }
    }

    #[tokio::test]
    async fn test_generate_images_decodes_results_in_order() {
        let server = MockServer::start().await;

        let png = vec![0x89, 0x50, 0x4E, 0x47];
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0];
        let b64 = base64::engine::general_purpose::STANDARD;

        Mock::given(method("POST"))
            .and(path("/predict/ernie_vilg"))
            .and(body_json(json!({
                "text_prompts": "戴着眼镜的猫",
                "style": "油画",
                "visualization": false,
                "topk": 4
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "000",
                "msg": "",
                "results": [
                    b64.encode(&png),
                    format!("data:image/jpeg;base64,{}", b64.encode(&jpeg))
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let images = make_client(&server)
            .generate_images(&request(Some(4)))
            .await
            .unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].data, png);
        assert_eq!(images[0].mime_type, "image/png");
        assert_eq!(images[1].data, jpeg);
        assert_eq!(images[1].mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_invalid_base64_is_hub_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/predict/ernie_vilg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "000",
                "msg": "",
                "results": ["!!!invalid-base64!!!"]
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate_images(&request(None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Hub(_)));
    }

    #[tokio::test]
    async fn test_api_error_returns_hub_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/predict/ernie_vilg"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate_images(&request(Some(4)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
