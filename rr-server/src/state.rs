//! Application state management

use crate::config::ServerConfig;
use crate::replay::Playback;
use chrono::{DateTime, Utc};
use rr_core::model::ReplayFrame;
use rr_core::ReplayBundle;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;

/// A session whose replay has been built
pub struct LoadedSession {
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub bundle: ReplayBundle,
}

impl LoadedSession {
    pub fn new(source: impl Into<String>, bundle: ReplayBundle) -> Self {
        Self {
            source: source.into(),
            loaded_at: Utc::now(),
            bundle,
        }
    }

    pub fn metadata(&self) -> SessionMetadata {
        let info = self.bundle.info();
        SessionMetadata {
            source: self.source.clone(),
            loaded_at: self.loaded_at,
            event_name: info.session.event_name.clone(),
            circuit_name: info.session.circuit_name.clone(),
            year: info.session.year,
            round: info.session.round,
            total_laps: info.total_laps,
            total_frames: info.total_frames,
            frame_count: info.frame_count,
            sample_interval: info.sample_interval,
            drivers: self.bundle.drivers().len(),
        }
    }
}

/// Summary returned by the session endpoints
#[derive(Debug, Clone, Serialize)]
pub struct SessionMetadata {
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub event_name: String,
    pub circuit_name: String,
    pub year: i32,
    pub round: u32,
    pub total_laps: u32,
    pub total_frames: usize,
    pub frame_count: usize,
    pub sample_interval: f64,
    pub drivers: usize,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,

    /// Currently loaded session (None until a load succeeds)
    pub session: Arc<RwLock<Option<Arc<LoadedSession>>>>,

    /// Broadcast channel for played-back frames
    /// Multiple consumers can subscribe to receive frames
    pub frame_tx: broadcast::Sender<ReplayFrame>,

    /// Playhead over the loaded replay
    pub playback: Arc<RwLock<Option<Playback>>>,

    /// Cancellation token for the playback task
    pub playback_cancel: Arc<RwLock<Option<CancellationToken>>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        // Create broadcast channel with capacity for 100 frames
        let (frame_tx, _) = broadcast::channel(100);

        Self {
            config: Arc::new(config),
            session: Arc::new(RwLock::new(None)),
            frame_tx,
            playback: Arc::new(RwLock::new(None)),
            playback_cancel: Arc::new(RwLock::new(None)),
        }
    }

    /// Subscribe to played-back frames
    pub fn subscribe(&self) -> broadcast::Receiver<ReplayFrame> {
        self.frame_tx.subscribe()
    }

    pub async fn loaded(&self) -> Option<Arc<LoadedSession>> {
        self.session.read().await.clone()
    }

    /// Swap in a new session, stopping playback of the old one
    pub async fn replace_session(&self, loaded: Option<Arc<LoadedSession>>) {
        self.stop_playback().await;
        *self.playback.write().await = loaded.as_ref().map(|l| {
            let info = l.bundle.info();
            Playback::new(info.total_frames, info.sample_interval)
        });
        *self.session.write().await = loaded;
    }

    pub async fn stop_playback(&self) {
        if let Some(token) = self.playback_cancel.write().await.take() {
            token.cancel();
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
