//! REST API and SSE routes

use crate::manager::{self, LoadRequest};
use crate::state::{AppState, LoadedSession, SessionMetadata};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt as FuturesStreamExt};
use rr_core::history::{GapComparison, LapTimes};
use rr_core::live::{DriverInfo, RaceSummary};
use rr_core::lookups::Stint;
use rr_core::model::{DriverIdentity, FrameMask, StandingEntry, WeatherSample};
use rr_core::replay::Overlays;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

/// Upper bound on frames returned by one range request
pub const MAX_FRAMES_PER_REQUEST: usize = 1000;

type ApiResult<T> = Result<T, (StatusCode, String)>;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sources", get(list_sources))
        // Session endpoints
        .route("/api/session/load", post(session_load))
        .route("/api/session", get(session_info).delete(session_unload))
        .route("/api/drivers", get(list_drivers))
        .route("/api/drivers/:code", get(driver_info))
        .route("/api/standings", get(standings))
        .route("/api/track-status", get(track_status))
        .route("/api/strategy", get(strategy))
        // Lap-indexed race history
        .route("/api/position-history", get(position_history))
        .route("/api/lap-times", get(lap_times))
        .route("/api/gap", get(gap))
        .route("/api/weather", get(weather))
        .route("/api/summary", get(race_summary))
        // Replay endpoints
        .route("/api/replay/info", get(replay_info))
        .route("/api/replay/overlays", get(replay_overlays))
        .route("/api/replay/frames", get(replay_frames))
        .route("/api/replay/frames/:index", get(replay_frame))
        .route("/api/replay/control", post(replay_control))
        .route("/api/replay/stream", get(replay_stream))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn require_session(state: &AppState) -> ApiResult<Arc<LoadedSession>> {
    state
        .loaded()
        .await
        .ok_or((StatusCode::BAD_REQUEST, "No session loaded".to_string()))
}

/// Seconds since race start -> session time
fn session_time(loaded: &LoadedSession, elapsed: f64) -> ApiResult<f64> {
    if !elapsed.is_finite() {
        return Err((StatusCode::BAD_REQUEST, format!("Invalid time: {}", elapsed)));
    }
    Ok(loaded.bundle.info().race_start + elapsed)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn list_sources(State(state): State<AppState>) -> Json<Vec<manager::SourceEntry>> {
    let data_dir = state.config.data_dir.clone();
    let sources = tokio::task::spawn_blocking(move || manager::available_sources(&data_dir))
        .await
        .unwrap_or_default();
    Json(sources)
}

// === Session Endpoints ===

async fn session_load(
    State(state): State<AppState>,
    Json(request): Json<LoadRequest>,
) -> ApiResult<Json<SessionMetadata>> {
    let loaded = manager::load_session(&state, request).await.map_err(|e| {
        tracing::warn!("Session load failed: {}", e);
        (e.status(), e.to_string())
    })?;
    Ok(Json(loaded.metadata()))
}

async fn session_info(State(state): State<AppState>) -> ApiResult<Json<SessionMetadata>> {
    let loaded = state
        .loaded()
        .await
        .ok_or((StatusCode::NOT_FOUND, "No session loaded".to_string()))?;
    Ok(Json(loaded.metadata()))
}

async fn session_unload(State(state): State<AppState>) -> ApiResult<StatusCode> {
    if state.loaded().await.is_none() {
        return Err((StatusCode::NOT_FOUND, "No session loaded".to_string()));
    }
    state.replace_session(None).await;
    tracing::info!("Session unloaded");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_drivers(State(state): State<AppState>) -> ApiResult<Json<Vec<DriverIdentity>>> {
    let loaded = require_session(&state).await?;
    Ok(Json(loaded.bundle.drivers().to_vec()))
}

#[derive(Deserialize)]
struct StandingsQuery {
    lap: Option<u32>,
    t: Option<f64>,
}

async fn standings(
    State(state): State<AppState>,
    Query(query): Query<StandingsQuery>,
) -> ApiResult<Json<Vec<StandingEntry>>> {
    let loaded = require_session(&state).await?;
    let live = loaded.bundle.live();

    match (query.lap, query.t) {
        (Some(lap), _) => live
            .standings_at_lap(lap)
            .map(Json)
            .ok_or((StatusCode::NOT_FOUND, format!("No car completed lap {}", lap))),
        (None, Some(t)) => Ok(Json(live.standings_at_time(session_time(&loaded, t)?, None))),
        (None, None) => Err((
            StatusCode::BAD_REQUEST,
            "Provide either 'lap' or 't'".to_string(),
        )),
    }
}

#[derive(Deserialize)]
struct TimeQuery {
    t: f64,
}

#[derive(Serialize)]
struct TrackStatusResponse {
    code: String,
    name: String,
}

async fn track_status(
    State(state): State<AppState>,
    Query(query): Query<TimeQuery>,
) -> ApiResult<Json<TrackStatusResponse>> {
    let loaded = require_session(&state).await?;
    let status = loaded
        .bundle
        .live()
        .current_track_status(session_time(&loaded, query.t)?);
    Ok(Json(TrackStatusResponse {
        code: status.code().to_string(),
        name: status.name().to_string(),
    }))
}

#[derive(Deserialize)]
struct LapQuery {
    lap: Option<u32>,
}

/// Requested lap, defaulting to the final lap of the session
fn as_of_lap(loaded: &LoadedSession, lap: Option<u32>) -> u32 {
    lap.unwrap_or_else(|| loaded.bundle.live().history().total_laps())
}

async fn strategy(
    State(state): State<AppState>,
    Query(query): Query<LapQuery>,
) -> ApiResult<Json<BTreeMap<String, Vec<Stint>>>> {
    let loaded = require_session(&state).await?;
    let Some(lap) = query.lap else {
        return Ok(Json(loaded.bundle.stints().clone()));
    };
    let live = loaded.bundle.live();
    let stints = live
        .roster()
        .drivers()
        .iter()
        .map(|d| (d.code.clone(), live.history().stints(&d.code, lap)))
        .collect();
    Ok(Json(stints))
}

// === Race History Endpoints ===

async fn driver_info(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<LapQuery>,
) -> ApiResult<Json<DriverInfo>> {
    let loaded = require_session(&state).await?;
    let lap = as_of_lap(&loaded, query.lap);
    loaded
        .bundle
        .live()
        .driver_info(&code.to_uppercase(), lap)
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("No laps for {} up to lap {}", code, lap)))
}

async fn position_history(
    State(state): State<AppState>,
    Query(query): Query<LapQuery>,
) -> ApiResult<Json<BTreeMap<String, Vec<Option<u32>>>>> {
    let loaded = require_session(&state).await?;
    let lap = as_of_lap(&loaded, query.lap);
    Ok(Json(loaded.bundle.live().position_history(lap)))
}

#[derive(Deserialize)]
struct LapTimesQuery {
    driver: String,
    lap: Option<u32>,
    /// Most recent laps to return; all laps when omitted
    last: Option<usize>,
}

async fn lap_times(
    State(state): State<AppState>,
    Query(query): Query<LapTimesQuery>,
) -> ApiResult<Json<LapTimes>> {
    let loaded = require_session(&state).await?;
    let code = query.driver.to_uppercase();
    let live = loaded.bundle.live();
    if live.roster().get(&code).is_none() {
        return Err((StatusCode::NOT_FOUND, format!("Unknown driver: {}", query.driver)));
    }
    let lap = as_of_lap(&loaded, query.lap);
    Ok(Json(live.history().lap_times(&code, lap, query.last)))
}

#[derive(Deserialize)]
struct GapQuery {
    a: String,
    b: String,
    lap: Option<u32>,
}

async fn gap(
    State(state): State<AppState>,
    Query(query): Query<GapQuery>,
) -> ApiResult<Json<GapComparison>> {
    let loaded = require_session(&state).await?;
    let lap = as_of_lap(&loaded, query.lap);
    Ok(Json(loaded.bundle.live().history().gap_between(
        &query.a.to_uppercase(),
        &query.b.to_uppercase(),
        lap,
    )))
}

async fn weather(
    State(state): State<AppState>,
    Query(query): Query<LapQuery>,
) -> ApiResult<Json<WeatherSample>> {
    let loaded = require_session(&state).await?;
    let lap = as_of_lap(&loaded, query.lap);
    loaded
        .bundle
        .live()
        .weather_at_lap(lap)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("No weather for lap {}", lap)))
}

async fn race_summary(
    State(state): State<AppState>,
    Query(query): Query<LapQuery>,
) -> ApiResult<Json<RaceSummary>> {
    let loaded = require_session(&state).await?;
    let lap = as_of_lap(&loaded, query.lap);
    Ok(Json(loaded.bundle.live().race_summary(lap)))
}

// === Replay Endpoints ===

fn internal(e: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

async fn replay_info(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let loaded = require_session(&state).await?;
    let playback = state.playback.read().await.as_ref().map(|p| p.info());
    let mut info = serde_json::to_value(loaded.bundle.info()).map_err(internal)?;
    info["playback"] = serde_json::to_value(playback).map_err(internal)?;
    Ok(Json(info))
}

async fn replay_overlays(State(state): State<AppState>) -> ApiResult<Json<Overlays>> {
    let loaded = require_session(&state).await?;
    Ok(Json(loaded.bundle.overlays().clone()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum WireFormat {
    #[default]
    Json,
    Msgpack,
}

#[derive(Deserialize)]
struct ReplayFramesQuery {
    #[serde(default)]
    start: usize,
    count: Option<usize>,
    fields: Option<String>,
    #[serde(default)]
    format: WireFormat,
}

/// Encode already-filtered frame values in the requested wire format
fn encode<T: Serialize>(value: &T, format: WireFormat) -> ApiResult<Response> {
    match format {
        WireFormat::Json => Ok(Json(value).into_response()),
        WireFormat::Msgpack => {
            let bytes = rmp_serde::to_vec_named(value).map_err(internal)?;
            Ok(([(header::CONTENT_TYPE, "application/msgpack")], bytes).into_response())
        }
    }
}

async fn replay_frames(
    State(state): State<AppState>,
    Query(params): Query<ReplayFramesQuery>,
) -> ApiResult<Response> {
    let loaded = require_session(&state).await?;
    let mask = params.fields.as_deref().map(FrameMask::parse);
    let count = params
        .count
        .unwrap_or(MAX_FRAMES_PER_REQUEST)
        .min(MAX_FRAMES_PER_REQUEST);

    let frames = loaded
        .bundle
        .frames_from(params.start)
        .iter()
        .take(count)
        .map(|frame| frame.to_value_filtered(mask.as_ref()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(internal)?;

    encode(&frames, params.format)
}

#[derive(Deserialize)]
struct FrameQuery {
    fields: Option<String>,
    #[serde(default)]
    format: WireFormat,
}

async fn replay_frame(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Query(params): Query<FrameQuery>,
) -> ApiResult<Response> {
    let loaded = require_session(&state).await?;
    let frame = loaded
        .bundle
        .frame(index)
        .ok_or((StatusCode::NOT_FOUND, format!("No frame at index {}", index)))?;
    let mask = params.fields.as_deref().map(FrameMask::parse);
    let value = frame.to_value_filtered(mask.as_ref()).map_err(internal)?;
    encode(&value, params.format)
}

#[derive(Deserialize)]
struct ReplayControlRequest {
    action: String,
    value: Option<f64>,
}

async fn replay_control(
    State(state): State<AppState>,
    Json(request): Json<ReplayControlRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    require_session(&state).await?;
    let mut playback = state.playback.write().await;
    let pb = playback
        .as_mut()
        .ok_or((StatusCode::BAD_REQUEST, "No session loaded".to_string()))?;

    match request.action.as_str() {
        "play" => {
            pb.play();
            drop(playback);
            manager::start_playback_task(state.clone()).await;
            Ok(Json(serde_json::json!({"status": "playing"})))
        }
        "pause" => {
            pb.pause();
            Ok(Json(serde_json::json!({"status": "paused"})))
        }
        "seek" => {
            let frame = request
                .value
                .filter(|v| v.is_finite() && *v >= 0.0)
                .ok_or((StatusCode::BAD_REQUEST, "Missing 'value' for seek".to_string()))?
                as usize;
            pb.seek(frame);
            Ok(Json(serde_json::json!({"status": "seeked", "frame": pb.current_frame()})))
        }
        "speed" => {
            let speed = request
                .value
                .ok_or((StatusCode::BAD_REQUEST, "Missing 'value' for speed".to_string()))?;
            pb.set_speed(speed);
            Ok(Json(serde_json::json!({"status": "speed_set", "speed": pb.speed()})))
        }
        _ => Err((
            StatusCode::BAD_REQUEST,
            format!("Unknown action: {}", request.action),
        )),
    }
}

// === Replay Stream Endpoint ===

#[derive(Deserialize)]
struct StreamQuery {
    fields: Option<String>,
}

async fn replay_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let frame_mask = query.fields.map(|f| FrameMask::parse(&f));

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let mask = frame_mask.clone();
        async move {
            match result {
                Ok(frame) => match frame.to_json_filtered(mask.as_ref()) {
                    Ok(json) => Some(Ok(Event::default().data(json))),
                    Err(e) => {
                        tracing::error!("Failed to serialize frame: {}", e);
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!("Broadcast stream error: {}", e);
                    None
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
