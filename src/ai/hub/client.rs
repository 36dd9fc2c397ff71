use super::types::HubEnvelope;
use crate::{Error, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio_retry::{strategy::FixedInterval, Retry};

/// How often a failed call is re-issued. The default never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: usize,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 0,
            interval: Duration::from_millis(2000),
        }
    }
}

/// REST client for one module hosted on a PaddleHub-style serving endpoint.
///
/// Requests go to `{base_url}/predict/{module}` and answers are unwrapped
/// from the `{status, msg, results}` envelope.
pub struct HubHttpClient {
    pub(crate) client: Client,
    access_token: Option<String>,
    pub(crate) base_url: String,
    module: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HubHttpClient {
    pub fn new(base_url: String, module: String, timeout: Duration) -> Self {
        Self::new_with_client(base_url, module, timeout, Client::new())
    }

    pub fn new_with_client(
        base_url: String,
        module: String,
        timeout: Duration,
        client: Client,
    ) -> Self {
        Self {
            client,
            access_token: None,
            base_url: base_url.trim_end_matches('/').to_string(),
            module,
            timeout,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_access_token(mut self, access_token: Option<String>) -> Self {
        self.access_token = access_token;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    fn predict_url(&self) -> String {
        format!("{}/predict/{}", self.base_url, self.module)
    }

    async fn post_once<Req: Serialize + Sync, Resp: DeserializeOwned>(
        &self,
        url: &str,
        request: &Req,
    ) -> Result<Resp> {
        let mut builder = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .json(request);
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Failed to send request to {}: {}", self.module, e);
            e
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!(
                "Model service error from {} (status {}): {}",
                self.module,
                status,
                error_text
            );
            return Err(Error::Hub(format!(
                "{} returned status {}: {}",
                self.module, status, error_text
            )));
        }

        let body = response.text().await?;
        let envelope: HubEnvelope<Resp> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                "Failed to parse {} response: {}\nBody: {}",
                self.module,
                e,
                body
            );
            Error::Hub(format!("Failed to parse {} response: {}", self.module, e))
        })?;

        envelope.into_results(&self.module)
    }

    /// Calls the module's predict endpoint, retrying per the configured policy.
    pub async fn predict<Req: Serialize + Sync, Resp: DeserializeOwned>(
        &self,
        request: &Req,
    ) -> Result<Resp> {
        let url = self.predict_url();
        let strategy = FixedInterval::new(self.retry.interval).take(self.retry.retries);

        Retry::start(strategy, || {
            let url = url.as_str();
            async move {
                self.post_once(url, request).await.map_err(|e| {
                    if self.retry.retries > 0 {
                        tracing::warn!("{} call failed: {}. Will retry...", self.module, e);
                    }
                    e
                })
            }
        })
        .await
    }
}
