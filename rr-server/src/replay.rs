//! Playback state for the loaded replay
//!
//! Tracks the playhead over the replay grid plus play/pause/seek/speed
//! controls. The playhead is a grid index; grid points with no cars on
//! track are stepped over without emitting a frame.

use serde::Serialize;

pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 64.0;

#[derive(Debug, Clone)]
pub struct Playback {
    current_frame: usize,
    total_frames: usize,
    sample_interval: f64,
    playing: bool,
    speed: f64,
}

impl Playback {
    /// Paused at the first grid index
    pub fn new(total_frames: usize, sample_interval: f64) -> Self {
        Self {
            current_frame: 0,
            total_frames,
            sample_interval,
            playing: false,
            speed: 1.0,
        }
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn play(&mut self) {
        if self.current_frame + 1 >= self.total_frames {
            self.current_frame = 0;
        }
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn seek(&mut self, frame: usize) {
        self.current_frame = frame.min(self.total_frames.saturating_sub(1));
    }

    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() {
            self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        }
    }

    /// Wall-clock seconds between emitted frames
    pub fn tick_secs(&self) -> f64 {
        self.sample_interval / self.speed
    }

    /// Step the playhead; stops playing at the last grid index
    pub fn advance(&mut self) -> Option<usize> {
        if !self.playing {
            return None;
        }

        if self.current_frame >= self.total_frames.saturating_sub(1) {
            self.playing = false;
            return None;
        }

        self.current_frame += 1;
        Some(self.current_frame)
    }

    pub fn info(&self) -> PlaybackInfo {
        PlaybackInfo {
            current_frame: self.current_frame,
            total_frames: self.total_frames,
            playing: self.playing,
            speed: self.speed,
        }
    }
}

/// Serializable playback status for the API
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackInfo {
    pub current_frame: usize,
    pub total_frames: usize,
    pub playing: bool,
    pub speed: f64,
}
