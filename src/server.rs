//! HTTP surface for the pipeline.
//!
//! `/api/normalize` and `/api/generate` expose the two stages separately and
//! hand a trigger token from the first to the second; `/api/text2image` runs
//! both in one request.

use crate::app::{App, Submission};
use crate::models::{NormalizedPrompt, Prompt, RequestOutcome, RequestState, TriggerToken};
use crate::Error;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize)]
struct ApiErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::DuplicateDispatch(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }

        let body = ApiErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct NormalizeBody {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub prompt: String,
    pub style: usize,
    pub trigger_token: u64,
}

#[derive(Debug, Deserialize)]
pub struct TextToImageBody {
    pub prompt: String,
    pub style: usize,
}

/// What the normalization stage reports to the page.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct NormalizeResponse {
    pub advisory_visible: bool,
    pub advisory_text: Option<String>,
    pub normalized_prompt: Option<String>,
    pub trigger_token: Option<u64>,
    pub status_text: Option<String>,
}

/// What the generation stage reports to the page.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct GenerateResponse {
    pub status_text: String,
    pub images: Vec<String>,
}

impl From<&RequestOutcome> for GenerateResponse {
    fn from(outcome: &RequestOutcome) -> Self {
        Self {
            status_text: outcome.status_text().to_string(),
            images: outcome.images().iter().map(|i| i.to_data_uri()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TextToImageResponse {
    pub advisory_visible: bool,
    pub advisory_text: Option<String>,
    pub normalized_prompt: Option<String>,
    pub trigger_token: u64,
    pub status_text: String,
    pub images: Vec<String>,
    pub states: Vec<RequestState>,
}

impl From<Submission> for TextToImageResponse {
    fn from(submission: Submission) -> Self {
        let GenerateResponse {
            status_text,
            images,
        } = GenerateResponse::from(&submission.outcome);
        Self {
            advisory_visible: submission.advisory.is_visible(),
            advisory_text: submission.advisory.text().map(str::to_string),
            normalized_prompt: submission.normalized_prompt,
            trigger_token: submission.token.get(),
            status_text,
            images,
            states: submission.trace.states().to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StyleResponse {
    pub index: usize,
    pub name: String,
}

async fn list_styles(State(app): State<Arc<App>>) -> Json<Vec<StyleResponse>> {
    Json(
        app.styles()
            .entries()
            .map(|e| StyleResponse {
                index: e.index,
                name: e.name.to_string(),
            })
            .collect(),
    )
}

async fn normalize(
    State(app): State<Arc<App>>,
    Json(body): Json<NormalizeBody>,
) -> ApiResult<Json<NormalizeResponse>> {
    let prompt = Prompt::new(body.prompt)?;

    let response = match app.normalize(&prompt).await {
        Ok(normalization) => NormalizeResponse {
            advisory_visible: normalization.advisory.is_visible(),
            advisory_text: normalization.advisory.text().map(str::to_string),
            normalized_prompt: Some(normalization.normalized.prompt),
            trigger_token: Some(normalization.normalized.token.get()),
            status_text: None,
        },
        Err(e) => {
            warn!("Normalization failed at {} stage: {}", e.stage(), e);
            NormalizeResponse {
                advisory_visible: false,
                advisory_text: None,
                normalized_prompt: None,
                trigger_token: None,
                status_text: Some(e.to_string()),
            }
        }
    };
    Ok(Json(response))
}

async fn generate(
    State(app): State<Arc<App>>,
    Json(body): Json<GenerateBody>,
) -> ApiResult<Json<GenerateResponse>> {
    let prompt = Prompt::new(body.prompt)?;
    let style = app.styles().select(body.style)?;

    let outcome = app
        .dispatch(
            NormalizedPrompt {
                prompt: prompt.as_str().to_string(),
                token: TriggerToken::new(body.trigger_token),
            },
            style,
        )
        .await?;
    Ok(Json(GenerateResponse::from(&outcome)))
}

async fn text_to_image(
    State(app): State<Arc<App>>,
    Json(body): Json<TextToImageBody>,
) -> ApiResult<Json<TextToImageResponse>> {
    let prompt = Prompt::new(body.prompt)?;
    let style = app.styles().select(body.style)?;

    let submission = app.submit(&prompt, style).await;
    Ok(Json(TextToImageResponse::from(submission)))
}

/// Build the router. At most `max_concurrency` requests run at once; the
/// rest wait for a slot.
pub fn router(app: Arc<App>, max_concurrency: usize) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/api/styles", get(list_styles))
        .route("/api/normalize", post(normalize))
        .route("/api/generate", post(generate))
        .route("/api/text2image", post(text_to_image))
        .layer(GlobalConcurrencyLimitLayer::new(max_concurrency))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub async fn serve(app: App, bind_addr: &str, max_concurrency: usize) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(
        "Listening on http://{} (max {} concurrent requests)",
        listener.local_addr()?,
        max_concurrency
    );

    axum::serve(listener, router(Arc::new(app), max_concurrency))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
