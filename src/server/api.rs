//! REST API handlers
//!
//! Routing and serialization only; refresh logic lives in
//! [`crate::refresh`], persistence in [`crate::storage`].

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{AtlasErrorTrait, Error, ErrorCategory};
use crate::models::{CountryFilter, CountryRecord, GdpRanking, SortOrder, StatusSnapshot};
use crate::utils::error::StoreError;

use super::app::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Error body returned for every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            details: None,
        }
    }

    pub fn with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            details: Some(details.into()),
        }
    }
}

/// Body of `POST /countries/refresh`
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub message: String,
    pub total_countries: u64,
    pub image: Option<String>,
    pub last_refreshed_at: String,
    pub top_countries: Vec<GdpRanking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Query string of `GET /countries`
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> Result<CountryFilter, ApiError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let sort = non_empty(self.sort)
            .map(|s| s.parse::<SortOrder>())
            .transpose()
            .map_err(ApiError::BadRequest)?;

        Ok(CountryFilter {
            region: non_empty(self.region),
            currency: non_empty(self.currency),
            sort,
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure of a single request, translated into a status code and body
#[derive(Debug)]
pub enum ApiError {
    Service(Error),
    BadRequest(String),
    ImageNotFound,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Service(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Service(Error::Store(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(msg) => {
                tracing::warn!(error = %msg, "Rejected request");
                (StatusCode::BAD_REQUEST, ErrorResponse::new(msg))
            }
            Self::ImageNotFound => {
                tracing::warn!("Summary image requested before any refresh");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("Summary image not found"),
                )
            }
            Self::Service(err) => {
                let category = err.category();
                let chain = err.chain();
                match category {
                    ErrorCategory::NotFound => {
                        tracing::warn!(error = %chain, "Country not found");
                        (StatusCode::NOT_FOUND, ErrorResponse::new("Country not found"))
                    }
                    ErrorCategory::Upstream => {
                        tracing::error!(
                            category = category.as_str(),
                            recoverable = err.is_recoverable(),
                            error = %chain,
                            "Upstream failure"
                        );
                        let details = match &err {
                            Error::UpstreamUnavailable { upstream, cause } => {
                                format!("Could not fetch data from {upstream}: {cause}")
                            }
                            other => other.to_string(),
                        };
                        (
                            StatusCode::SERVICE_UNAVAILABLE,
                            ErrorResponse::with_details("External data source unavailable", details),
                        )
                    }
                    _ => {
                        tracing::error!(
                            category = category.as_str(),
                            error = %chain,
                            debug = ?err,
                            "Request failed"
                        );
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            ErrorResponse::with_details("Internal server error", chain),
                        )
                    }
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/status", get(status))
        .route("/countries", get(list_countries))
        .route("/countries/refresh", post(refresh_countries))
        .route("/countries/image", get(summary_image))
        .route("/countries/{name}", get(get_country).delete(delete_country))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Welcome to the Country Atlas API" }))
}

/// Run the refresh pipeline
async fn refresh_countries(State(state): State<AppState>) -> Result<Json<RefreshResponse>, ApiError> {
    let report = state.orchestrator.refresh().await?;

    Ok(Json(RefreshResponse {
        message: String::from("Refreshed"),
        total_countries: report.total_countries,
        image: report.image.map(|p| p.display().to_string()),
        last_refreshed_at: report.last_refreshed_at,
        top_countries: report.top_countries,
        warning: report.render_warning,
    }))
}

async fn list_countries(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CountryRecord>>, ApiError> {
    let filter = query.into_filter()?;
    Ok(Json(state.repository.list(&filter)?))
}

async fn get_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CountryRecord>, ApiError> {
    state
        .repository
        .get_by_name(&name)?
        .map(Json)
        .ok_or_else(|| Error::NotFound(name).into())
}

async fn delete_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.repository.delete_by_name(&name)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound(name).into())
    }
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusSnapshot>, ApiError> {
    Ok(Json(state.repository.status()?))
}

async fn summary_image(State(state): State<AppState>) -> Result<Response, ApiError> {
    match tokio::fs::read(state.renderer.image_path()).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response()),
        Err(e) if image_missing(e.kind()) => Err(ApiError::ImageNotFound),
        Err(e) => Err(Error::Io(e).into()),
    }
}

/// A path component that is not a directory means no image was ever written there
fn image_missing(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
    )
}

// ============================================================================
// Tests
// ============================================================================
