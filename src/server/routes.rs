//! HTTP route handlers for the attribution API.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::attribution::{pagedata, AnalysisRequest, AnalysisResult, PageData};

use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/analyze", post(analyze))
        .route("/api/settings", get(get_settings).post(update_settings))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "whomadethis",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Analysis request.
///
/// Callers send either a pre-extracted `pageData` snapshot or the raw
/// `pageHtml`; when both are present the snapshot wins.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// URL of the image to attribute.
    pub image_url: String,
    /// URL of the page hosting the image.
    pub page_url: String,
    /// Structured snapshot of the hosting page.
    #[serde(default)]
    pub page_data: Option<PageData>,
    /// Rendered HTML of the hosting page.
    #[serde(default)]
    pub page_html: Option<String>,
}

/// Handle analysis requests.
async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>, (StatusCode, String)> {
    let page_data = match (request.page_data, request.page_html) {
        (Some(data), _) => Some(data),
        (None, Some(html)) => Some(
            pagedata::from_html(&html)
                .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid page HTML: {e}")))?,
        ),
        (None, None) => None,
    };

    let service = state.service.read().await.clone();
    let result = service
        .analyze(&AnalysisRequest {
            image_url: request.image_url,
            page_url: request.page_url,
            page_data,
        })
        .await;

    Ok(Json(result))
}

/// Settings response, echoing the stored key so a settings UI can
/// round-trip it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    /// Configured SauceNAO API key, when one is set.
    pub sauce_nao_key: Option<String>,
}

async fn current_settings(state: &AppState) -> SettingsResponse {
    SettingsResponse {
        sauce_nao_key: state.service.read().await.config().saucenao_key.clone(),
    }
}

/// Return the current settings.
async fn get_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(current_settings(&state).await)
}

/// Settings update request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    /// SauceNAO API key; empty or absent clears it.
    pub sauce_nao_key: Option<String>,
}

/// Handle settings updates.
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SettingsRequest>,
) -> Result<Json<SettingsResponse>, (StatusCode, String)> {
    state
        .set_saucenao_key(request.sauce_nao_key)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Settings error: {e}")))?;

    Ok(Json(current_settings(&state).await))
}
