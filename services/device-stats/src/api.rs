//! HTTP JSON API for users, devices, readings and statistics analysis

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::analyzer::{analyze_device, analyze_user, AnalysisOutcome};
use crate::config::ApiConfig;
use crate::reading::{deserialize_timestamp, NewReading, StatsWindow};
use crate::store::{DeviceUpdate, InMemoryStore, NewDevice, NewUser, UserUpdate};
use crate::StatsError;

const NO_DATA_DETAIL: &str = "No statistics found for the specified period";

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<InMemoryStore>,
    pub config: ApiConfig,
    /// Cancelled on shutdown; aborts analyses still in flight
    pub cancel: CancellationToken,
}

/// Build the service router
pub fn build_router(state: ApiState) -> Router {
    let resources = Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/", get(list_users).post(create_user))
        .route(
            "/users/{user_id}",
            get(read_user).put(update_user).delete(delete_user),
        )
        .route("/devices", get(list_devices).post(create_device))
        .route("/devices/", get(list_devices).post(create_device))
        .route(
            "/devices/{device_id}",
            get(read_device).put(update_device).delete(delete_device),
        )
        .route(
            "/stats/devices/{device_id}",
            get(read_device_stats).post(create_device_stats),
        )
        .route(
            "/stats/devices/{device_id}/analyze",
            post(analyze_device_stats),
        )
        .route("/stats/users/{user_id}/analyze", post(analyze_user_stats));

    let prefix = state.config.prefix.clone();
    let router = if prefix.is_empty() || prefix == "/" {
        Router::new().merge(resources)
    } else {
        Router::new().nest(&prefix, resources)
    };

    router
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl IntoResponse for StatsError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            StatsError::DeviceNotFound(_) => (StatusCode::NOT_FOUND, "Device not found".to_string()),
            StatsError::UserNotFound(_) => (StatusCode::NOT_FOUND, "User not found".to_string()),
            StatsError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            StatsError::InvalidInput(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            StatsError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            _ => {
                tracing::error!("Request failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };
        detail_response(status, detail)
    }
}

fn detail_response(status: StatusCode, detail: String) -> Response {
    (status, Json(serde_json::json!({ "detail": detail }))).into_response()
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    skip: usize,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ReadingsQuery {
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    skip: usize,
    #[serde(default)]
    limit: Option<usize>,
}

/// Resolve the page size, defaulting to and capped at `max_page_size`
fn page_limit(limit: Option<usize>, config: &ApiConfig) -> crate::Result<usize> {
    match limit {
        None => Ok(config.max_page_size),
        Some(limit) if (1..=config.max_page_size).contains(&limit) => Ok(limit),
        Some(limit) => Err(StatsError::InvalidInput(format!(
            "limit must be between 1 and {}, got {}",
            config.max_page_size, limit
        ))),
    }
}

/// Parse the optional analysis body; an empty body or `null` means unbounded
fn parse_window(body: &Bytes) -> crate::Result<StatsWindow> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StatsWindow::unbounded());
    }
    let window: Option<StatsWindow> = serde_json::from_slice(body)
        .map_err(|e| StatsError::InvalidInput(format!("invalid time range: {}", e)))?;
    Ok(window.unwrap_or_default())
}

async fn list_users(
    State(state): State<ApiState>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, StatsError> {
    let limit = page_limit(page.limit, &state.config)?;
    Ok(Json(state.store.list_users(page.skip, limit).await))
}

async fn create_user(
    State(state): State<ApiState>,
    Json(new_user): Json<NewUser>,
) -> Result<impl IntoResponse, StatsError> {
    let user = state.store.create_user(new_user).await?;
    tracing::info!("Registered user {} ({})", user.id, user.username);
    Ok((StatusCode::CREATED, Json(user)))
}

async fn read_user(
    State(state): State<ApiState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, StatsError> {
    state
        .store
        .get_user(user_id)
        .await
        .map(Json)
        .ok_or(StatsError::UserNotFound(user_id))
}

async fn update_user(
    State(state): State<ApiState>,
    Path(user_id): Path<i64>,
    Json(update): Json<UserUpdate>,
) -> Result<impl IntoResponse, StatsError> {
    Ok(Json(state.store.update_user(user_id, update).await?))
}

async fn delete_user(
    State(state): State<ApiState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, StatsError> {
    state.store.delete_user(user_id).await?;
    tracing::info!("Deleted user {}", user_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_devices(
    State(state): State<ApiState>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, StatsError> {
    let limit = page_limit(page.limit, &state.config)?;
    Ok(Json(state.store.list_devices(page.skip, limit).await))
}

async fn create_device(
    State(state): State<ApiState>,
    Json(new_device): Json<NewDevice>,
) -> Result<impl IntoResponse, StatsError> {
    let device = state.store.create_device(new_device).await?;
    tracing::info!("Registered device '{}'", device.device_id);
    Ok((StatusCode::CREATED, Json(device)))
}

async fn read_device(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse, StatsError> {
    state
        .store
        .get_device(&device_id)
        .await
        .map(Json)
        .ok_or(StatsError::DeviceNotFound(device_id))
}

async fn update_device(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
    Json(update): Json<DeviceUpdate>,
) -> Result<impl IntoResponse, StatsError> {
    Ok(Json(state.store.update_device(&device_id, update).await?))
}

async fn delete_device(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse, StatsError> {
    state.store.delete_device(&device_id).await?;
    tracing::info!("Deleted device '{}'", device_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn create_device_stats(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
    Json(new_reading): Json<NewReading>,
) -> Result<impl IntoResponse, StatsError> {
    let reading = state.store.add_reading(&device_id, new_reading).await?;
    tracing::debug!(
        "Stored reading {} for device '{}' at {}",
        reading.id,
        device_id,
        reading.timestamp
    );
    Ok((StatusCode::CREATED, Json(reading)))
}

async fn read_device_stats(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
    Query(query): Query<ReadingsQuery>,
) -> Result<impl IntoResponse, StatsError> {
    let limit = page_limit(query.limit, &state.config)?;
    let window = StatsWindow::new(query.start_time, query.end_time);
    let readings = state
        .store
        .list_device_readings(&device_id, &window, query.skip, limit)
        .await?;
    Ok(Json(readings))
}

async fn analyze_device_stats(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
    body: Bytes,
) -> Result<Response, StatsError> {
    let window = parse_window(&body)?;
    let outcome = analyze_device(
        state.store.as_ref(),
        &device_id,
        &window,
        Some(&state.cancel),
    )
    .await
    .inspect_err(|e| tracing::warn!("Analysis of device '{}' refused: {}", device_id, e))?;

    Ok(match outcome {
        AnalysisOutcome::Ready(analysis) => Json(analysis).into_response(),
        AnalysisOutcome::NoData => {
            detail_response(StatusCode::NOT_FOUND, NO_DATA_DETAIL.to_string())
        }
    })
}

async fn analyze_user_stats(
    State(state): State<ApiState>,
    Path(user_id): Path<i64>,
    body: Bytes,
) -> Result<Response, StatsError> {
    let window = parse_window(&body)?;
    let outcome = analyze_user(state.store.as_ref(), user_id, &window, Some(&state.cancel))
        .await
        .inspect_err(|e| tracing::warn!("Analysis of user {} refused: {}", user_id, e))?;

    Ok(match outcome {
        AnalysisOutcome::Ready(analysis) => Json(analysis).into_response(),
        AnalysisOutcome::NoData => {
            detail_response(StatusCode::NOT_FOUND, NO_DATA_DETAIL.to_string())
        }
    })
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
