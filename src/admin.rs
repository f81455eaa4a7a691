//! Admin HTTP API: browse, edit, export and import resources.

use crate::cache::MetricsReport;
use crate::config::Config;
use crate::formats::{self, FormatError};
use crate::i18n::CultureError;
use crate::provider::{ImportReport, LocalizationProvider};
use crate::resource::LocalizationResource;
use crate::security::{is_authorized, API_KEY_HEADER};
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

#[derive(Clone)]
pub struct AdminState {
    pub provider: Arc<LocalizationProvider>,
    pub api_key: Option<String>,
    pub show_invariant_culture: bool,
    pub hide_delete_button: bool,
}

impl AdminState {
    pub fn from_config(provider: Arc<LocalizationProvider>, config: &Config) -> Self {
        Self {
            provider,
            api_key: config.api_key.clone(),
            show_invariant_culture: config.show_invariant_culture,
            hide_delete_button: config.hide_delete_button,
        }
    }
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Missing or invalid API key")]
    Unauthorized,

    #[error(transparent)]
    Culture(#[from] CultureError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Resource '{0}' not found")]
    NotFound(String),

    #[error("Internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for AdminError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<CultureError>() {
            Ok(culture) => AdminError::Culture(culture),
            Err(err) => AdminError::Internal(err),
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::Unauthorized => StatusCode::UNAUTHORIZED,
            AdminError::Culture(_) | AdminError::Format(_) => StatusCode::BAD_REQUEST,
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::Internal(e) => {
                error!("Admin request failed: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Build the admin router. Mutating routes sit behind the API key check.
pub fn router(state: AdminState) -> Router {
    let mutating = Router::new()
        .route("/api/resources/update", post(update_translation))
        .route("/api/resources/remove", post(remove_translation))
        .route("/api/resources/:key", delete(delete_resource))
        .route("/api/import/csv", post(import_csv))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(health))
        .route("/api/resources", get(list_resources))
        .route("/api/export/csv", get(export_csv))
        .route("/api/json/:language", get(render_json))
        .merge(mutating)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn require_api_key(
    State(state): State<AdminState>,
    request: Request,
    next: Next,
) -> Result<Response, AdminError> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if !is_authorized(state.api_key.as_deref(), presented) {
        warn!("Rejected admin request to {}: bad API key", request.uri().path());
        return Err(AdminError::Unauthorized);
    }
    Ok(next.run(request).await)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
    cache: MetricsReport,
}

async fn health(State(state): State<AdminState>) -> (StatusCode, Json<HealthResponse>) {
    let cache = state.provider.cache().report();
    match state.provider.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                store: "reachable",
                cache,
            }),
        ),
        Err(e) => {
            warn!("Health check: store unreachable: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    store: "unreachable",
                    cache,
                }),
            )
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourcesResponse {
    resources: Vec<LocalizationResource>,
    languages: Vec<String>,
    show_invariant_culture: bool,
    hide_delete_button: bool,
}

async fn list_resources(
    State(state): State<AdminState>,
) -> Result<Json<ResourcesResponse>, AdminError> {
    let resources = state.provider.get_all_resources().await?;
    Ok(Json(ResourcesResponse {
        resources,
        languages: state.provider.cultures().list(state.show_invariant_culture),
        show_invariant_culture: state.show_invariant_culture,
        hide_delete_button: state.hide_delete_button,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest {
    key: String,
    language: String,
    new_translation: String,
}

async fn update_translation(
    State(state): State<AdminState>,
    Json(request): Json<UpdateRequest>,
) -> Result<StatusCode, AdminError> {
    let updated = state
        .provider
        .create_or_update_translation(&request.key, &request.language, &request.new_translation)
        .await?;

    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AdminError::NotFound(request.key))
    }
}

#[derive(Debug, Deserialize)]
struct RemoveRequest {
    key: String,
    language: String,
}

async fn remove_translation(
    State(state): State<AdminState>,
    Json(request): Json<RemoveRequest>,
) -> Result<StatusCode, AdminError> {
    let removed = state
        .provider
        .remove_translation(&request.key, &request.language)
        .await?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AdminError::NotFound(request.key))
    }
}

async fn delete_resource(
    State(state): State<AdminState>,
    Path(key): Path<String>,
) -> Result<StatusCode, AdminError> {
    if state.provider.delete_resource(&key).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AdminError::NotFound(key))
    }
}

async fn export_csv(State(state): State<AdminState>) -> Result<Response, AdminError> {
    let resources = state.provider.get_all_resources().await?;
    let export = formats::csv::export(&resources, &state.provider.cultures().list(false))?;

    Ok((
        [
            (header::CONTENT_TYPE, export.mime_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.file_name),
            ),
        ],
        export.content,
    )
        .into_response())
}

async fn import_csv(
    State(state): State<AdminState>,
    body: String,
) -> Result<Json<ImportReport>, AdminError> {
    let parsed = formats::csv::parse(&body, &state.provider.cultures().list(false))?;
    Ok(Json(state.provider.import(&parsed).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonQuery {
    #[serde(default)]
    fallback: bool,
    #[serde(default)]
    camel_case: bool,
}

async fn render_json(
    State(state): State<AdminState>,
    Path(language): Path<String>,
    Query(query): Query<JsonQuery>,
) -> Result<Json<Value>, AdminError> {
    let culture = state.provider.cultures().get(&language)?;
    let resources = state.provider.get_all_resources().await?;
    Ok(Json(Value::Object(formats::json::convert(
        &resources,
        culture.code(),
        query.fallback,
        query.camel_case,
    ))))
}
