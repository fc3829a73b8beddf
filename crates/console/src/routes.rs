use crate::error::ApiError;
use crate::state::ConsoleState;
use assistant::{ask_or_fallback, ChatMessage, Feature};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use common::cameras::{CameraConfig, CameraDraft};
use gallery::TileView;
use mock_feeds::{ComfortReadings, DashboardStats, EnergyPoint, SecurityEvent};
use registry::{ScheduleDraft, ScheduleItem};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(state: ConsoleState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Camera registry
        .route("/v1/cameras", get(list_cameras).post(add_camera))
        .route(
            "/v1/cameras/:id",
            get(get_camera).put(update_camera).delete(remove_camera),
        )
        .route("/v1/cameras/:id/toggle-state", post(toggle_state))
        .route("/v1/cameras/:id/toggle-motion", post(toggle_motion))
        .route("/v1/cameras/:id/toggle-recording", post(toggle_recording))
        .route("/v1/cameras/:id/restart", post(restart_stream))
        // Gallery
        .route("/v1/tiles", get(list_tiles))
        .route("/v1/tiles/:id", get(get_tile))
        // Schedules
        .route("/v1/schedules", get(list_schedules).post(add_schedule))
        .route("/v1/schedules/:id", put(update_schedule).delete(remove_schedule))
        .route("/v1/schedules/:id/toggle", post(toggle_schedule))
        // Dashboard feeds
        .route("/v1/feeds/dashboard", get(dashboard_feed))
        .route("/v1/feeds/energy", get(energy_feed))
        .route("/v1/feeds/security", get(security_feed))
        .route("/v1/feeds/comfort", get(comfort_feed))
        // Assistant
        .route("/v1/assistant/submit", post(submit_prompt))
        .route("/v1/assistant/ask", post(ask_feature))
        .route(
            "/v1/assistant/chat",
            get(chat_history).post(chat_send).delete(chat_clear),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "console"
    }))
}

// Cameras

async fn list_cameras(State(state): State<ConsoleState>) -> Json<Vec<CameraConfig>> {
    let desk = state.desk().lock().await;
    Json(desk.cameras().iter().map(CameraConfig::redacted).collect())
}

async fn get_camera(
    State(state): State<ConsoleState>,
    Path(id): Path<String>,
) -> Result<Json<CameraConfig>, ApiError> {
    let desk = state.desk().lock().await;
    desk.camera(&id)
        .map(|camera| Json(camera.redacted()))
        .ok_or_else(|| ApiError::not_found(format!("no camera with id {id}")))
}

async fn add_camera(
    State(state): State<ConsoleState>,
    Json(draft): Json<CameraDraft>,
) -> Result<(StatusCode, Json<CameraConfig>), ApiError> {
    let camera = state.desk().lock().await.add(draft)?;
    info!(camera_id = %camera.id, name = %camera.name, "camera added");
    Ok((StatusCode::CREATED, Json(camera.redacted())))
}

async fn update_camera(
    State(state): State<ConsoleState>,
    Path(id): Path<String>,
    Json(draft): Json<CameraDraft>,
) -> Result<Json<CameraConfig>, ApiError> {
    let camera = state.desk().lock().await.update(&id, draft)?;
    Ok(Json(camera.redacted()))
}

async fn remove_camera(
    State(state): State<ConsoleState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let removed = state.desk().lock().await.remove(&id)?;
    info!(camera_id = %removed.id, "camera removed");
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_state(
    State(state): State<ConsoleState>,
    Path(id): Path<String>,
) -> Result<Json<CameraConfig>, ApiError> {
    Ok(Json(state.desk().lock().await.toggle_desired_state(&id)?.redacted()))
}

async fn toggle_motion(
    State(state): State<ConsoleState>,
    Path(id): Path<String>,
) -> Result<Json<CameraConfig>, ApiError> {
    Ok(Json(state.desk().lock().await.toggle_motion_detection(&id)?.redacted()))
}

async fn toggle_recording(
    State(state): State<ConsoleState>,
    Path(id): Path<String>,
) -> Result<Json<CameraConfig>, ApiError> {
    Ok(Json(state.desk().lock().await.toggle_recording(&id)?.redacted()))
}

async fn restart_stream(
    State(state): State<ConsoleState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.desk().lock().await.restart(&id)?;
    Ok(StatusCode::ACCEPTED)
}

// Tiles

async fn list_tiles(State(state): State<ConsoleState>) -> Json<Vec<TileView>> {
    Json(state.desk().lock().await.tiles())
}

async fn get_tile(
    State(state): State<ConsoleState>,
    Path(id): Path<String>,
) -> Result<Json<TileView>, ApiError> {
    state
        .desk()
        .lock()
        .await
        .tile(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no camera with id {id}")))
}

// Schedules

async fn list_schedules(State(state): State<ConsoleState>) -> Json<Vec<ScheduleItem>> {
    Json(state.schedules().lock().await.list().to_vec())
}

async fn add_schedule(
    State(state): State<ConsoleState>,
    Json(draft): Json<ScheduleDraft>,
) -> Result<(StatusCode, Json<ScheduleItem>), ApiError> {
    let item = state.schedules().lock().await.add(draft)?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_schedule(
    State(state): State<ConsoleState>,
    Path(id): Path<String>,
    Json(draft): Json<ScheduleDraft>,
) -> Result<Json<ScheduleItem>, ApiError> {
    Ok(Json(state.schedules().lock().await.update(&id, draft)?))
}

async fn remove_schedule(
    State(state): State<ConsoleState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.schedules().lock().await.remove(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_schedule(
    State(state): State<ConsoleState>,
    Path(id): Path<String>,
) -> Result<Json<ScheduleItem>, ApiError> {
    Ok(Json(state.schedules().lock().await.toggle_active(&id)?))
}

// Feeds

async fn dashboard_feed(State(state): State<ConsoleState>) -> Json<DashboardStats> {
    Json(state.feeds().dashboard_stats().await)
}

async fn energy_feed(State(state): State<ConsoleState>) -> Json<Vec<EnergyPoint>> {
    Json(state.feeds().energy_series().await)
}

async fn security_feed(State(state): State<ConsoleState>) -> Json<Vec<SecurityEvent>> {
    Json(state.feeds().security_log().await)
}

async fn comfort_feed(State(state): State<ConsoleState>) -> Json<ComfortReadings> {
    Json(state.feeds().comfort_readings().await)
}

// Assistant

#[derive(Debug, Deserialize)]
struct PromptRequest {
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    feature: Feature,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    text: String,
}

/// Raw submission. Failures surface as errors instead of fallback text.
async fn submit_prompt(
    State(state): State<ConsoleState>,
    Json(req): Json<PromptRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("prompt must not be empty"));
    }
    let answer = state.assistant().submit(&req.prompt).await?;
    Ok(Json(json!({ "answer": answer })))
}

async fn ask_feature(
    State(state): State<ConsoleState>,
    Json(req): Json<AskRequest>,
) -> impl IntoResponse {
    let assistant = state.assistant();
    let answer = ask_or_fallback(assistant.as_ref(), req.feature, &req.prompt).await;
    Json(json!({ "feature": req.feature, "answer": answer }))
}

async fn chat_history(State(state): State<ConsoleState>) -> Json<Vec<ChatMessage>> {
    Json(state.chat().lock().await.messages().to_vec())
}

async fn chat_send(
    State(state): State<ConsoleState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("text must not be empty"));
    }
    let assistant = state.assistant();
    let reply = state.chat().lock().await.send(assistant.as_ref(), text).await;
    Ok(Json(reply))
}

async fn chat_clear(State(state): State<ConsoleState>) -> StatusCode {
    state.chat().lock().await.clear();
    StatusCode::NO_CONTENT
}
