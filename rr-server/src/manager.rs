//! Session lifecycle manager
//!
//! This module handles:
//! - Listing the available session sources
//! - Resolving a load request to a source
//! - Loading and building the replay on a blocking thread
//! - Driving live playback through the broadcast channel

use crate::config::check_interval;
use crate::state::{AppState, LoadedSession};
use axum::http::StatusCode;
use rr_adapters::{DemoSource, FileSource};
use rr_core::{build_replay, ReplayConfig, ReplayError, SessionSource};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

const DUMP_EXTENSIONS: &[&str] = &[".json", ".json.zst"];

/// How often a paused playback task checks for resume
const PAUSED_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unknown session source: {0}")]
    UnknownSource(String),

    #[error("source '{0}' needs a path")]
    MissingPath(String),

    #[error("path must be relative to the data directory: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    InvalidInterval(String),

    #[error("failed to load session: {0:#}")]
    Source(anyhow::Error),

    #[error("failed to build replay: {0}")]
    Build(#[from] ReplayError),

    #[error("load task failed: {0}")]
    Join(String),
}

impl LoadError {
    pub fn status(&self) -> StatusCode {
        match self {
            LoadError::Build(_) | LoadError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// A load request as posted to the API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadRequest {
    /// "demo" or "file"
    pub source: String,
    /// Dump path relative to the data directory, for file sources
    pub path: Option<String>,
    pub interval: Option<f64>,
    /// Race length for the demo source
    pub laps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceEntry {
    pub source: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Demo plus every session dump in `data_dir`
pub fn available_sources(data_dir: &Path) -> Vec<SourceEntry> {
    let mut sources = vec![SourceEntry {
        source: "demo".to_string(),
        name: "Demo Grand Prix".to_string(),
        path: None,
    }];

    let entries = match std::fs::read_dir(data_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot scan data dir {}: {}", data_dir.display(), e);
            return sources;
        }
    };

    let mut dumps: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| {
            let lower = name.to_ascii_lowercase();
            DUMP_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        })
        .collect();
    dumps.sort();

    sources.extend(dumps.into_iter().map(|file| {
        let source = FileSource::new(&file);
        SourceEntry {
            source: "file".to_string(),
            name: source.name().to_string(),
            path: Some(file),
        }
    }));
    sources
}

/// Resolve a dump path under `data_dir`, refusing anything that escapes it
fn resolve_dump_path(data_dir: &Path, path: &str) -> Result<PathBuf, LoadError> {
    let relative = Path::new(path);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if path.is_empty() || escapes {
        return Err(LoadError::InvalidPath(path.to_string()));
    }
    Ok(data_dir.join(relative))
}

pub fn open_source(request: &LoadRequest, data_dir: &Path) -> Result<Box<dyn SessionSource>, LoadError> {
    match request.source.as_str() {
        "demo" => Ok(Box::new(match request.laps {
            Some(laps) => DemoSource::with_laps(laps),
            None => DemoSource::new(),
        })),
        "file" => {
            let path = request
                .path
                .as_deref()
                .ok_or_else(|| LoadError::MissingPath(request.source.clone()))?;
            Ok(Box::new(FileSource::new(resolve_dump_path(data_dir, path)?)))
        }
        other => Err(LoadError::UnknownSource(other.to_string())),
    }
}

/// Load a session, build its replay and make it the active one
pub async fn load_session(state: &AppState, request: LoadRequest) -> Result<Arc<LoadedSession>, LoadError> {
    let interval = check_interval(request.interval.unwrap_or(state.config.default_interval))
        .map_err(LoadError::InvalidInterval)?;
    let source = open_source(&request, &state.config.data_dir)?;
    let config = ReplayConfig {
        sample_interval: interval,
        policy: state.config.policy.clone(),
    };

    info!("Loading session from {} at {}s interval", source.name(), interval);
    let loaded = tokio::task::spawn_blocking(move || -> Result<LoadedSession, LoadError> {
        let session = source.load().map_err(LoadError::Source)?;
        let bundle = build_replay(&session, &config)?;
        Ok(LoadedSession::new(source.name(), bundle))
    })
    .await
    .map_err(|e| LoadError::Join(e.to_string()))??;

    let loaded = Arc::new(loaded);
    state.replace_session(Some(loaded.clone())).await;
    info!(
        "Session loaded: {} ({} frames)",
        loaded.bundle.info().session.event_name,
        loaded.bundle.info().frame_count
    );
    Ok(loaded)
}

/// Start the playback background task that pushes frames through the broadcast channel
pub async fn start_playback_task(state: AppState) {
    let Some(loaded) = state.loaded().await else {
        return;
    };

    let cancel_token = {
        let mut cancel = state.playback_cancel.write().await;
        if let Some(token) = cancel.take() {
            token.cancel();
        }
        let token = tokio_util::sync::CancellationToken::new();
        *cancel = Some(token.clone());
        token
    };

    let tx = state.frame_tx.clone();
    let playback = state.playback.clone();

    tokio::spawn(async move {
        info!("Playback task started");

        loop {
            if cancel_token.is_cancelled() {
                break;
            }

            let (index, playing, tick) = {
                let pb = playback.read().await;
                match &*pb {
                    Some(pb) => (pb.current_frame(), pb.is_playing(), pb.tick_secs()),
                    None => break,
                }
            };

            if !playing {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    _ = tokio::time::sleep(PAUSED_POLL) => continue,
                }
            }

            if let Some(frame) = loaded.bundle.frame(index) {
                // Ignore error if no receivers (they'll get the next frame)
                let _ = tx.send(frame.clone());
            }

            {
                let mut pb = playback.write().await;
                match pb.as_mut() {
                    Some(pb) => {
                        if pb.advance().is_none() {
                            info!("Playback reached the end of the replay");
                        }
                    }
                    None => break,
                }
            }

            if !tick.is_finite() || tick <= 0.0 {
                error!("Invalid playback tick {}s, stopping", tick);
                break;
            }
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_secs_f64(tick)) => {},
            }
        }

        info!("Playback task ended");
    });
}
