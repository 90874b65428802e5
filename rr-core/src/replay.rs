//! Frame assembler
//!
//! `build_replay` is the single entry point that turns a loaded [`Session`]
//! into a [`ReplayBundle`]: the numbered frames, the overlays the client
//! draws around them, and the [`LiveState`] used for on-demand queries.
//! The bundle is immutable once built; reloading a session builds a new one.

use crate::config::ReplayConfig;
use crate::error::{GeometryError, ReplayError};
use crate::geometry::{
    build_drs_zones, centroid, fallback_outline, fastest_lap, hires_outline, lap_trace,
    resolve_rotation_degrees, rotate_corners, CornerMarkers, Polyline, Rotation,
};
use crate::grid::{build_grid, DriverTrack};
use crate::live::LiveState;
use crate::lookups::{
    build_race_control, build_sector_lookup, build_stints, build_weather_timeline, lap_records,
    LapRecord, PitStop, RaceControlEntry, SectorTimes, Stint, WeatherPoint,
};
use crate::model::{DriverFrame, DriverIdentity, ReplayFrame, Session, SessionInfo};
use crate::roster::FALLBACK_TEAM_COLOR;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Replay-wide metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReplayInfo {
    pub session: SessionInfo,
    /// Grid length, including indices with no frame
    pub total_frames: usize,
    /// Frames actually emitted
    pub frame_count: usize,
    pub total_laps: u32,
    pub race_start: f64,
    pub race_end: f64,
    pub sample_interval: f64,
    pub rotation: Rotation,
}

/// Static and timeline overlays drawn around the cars
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overlays {
    pub track_outline: Polyline,
    /// `None` when the session has no circuit info
    pub corners: Option<CornerMarkers>,
    pub drs_zones: Vec<Polyline>,
    pub weather: Vec<WeatherPoint>,
    pub race_control: Vec<RaceControlEntry>,
    pub sectors: BTreeMap<String, BTreeMap<u32, SectorTimes>>,
    pub pit_events: BTreeMap<String, Vec<PitStop>>,
    pub x_range: [f64; 2],
    pub y_range: [f64; 2],
}

/// Everything built for one session's replay
#[derive(Debug, Clone)]
pub struct ReplayBundle {
    info: ReplayInfo,
    grid: Vec<f64>,
    frames: Vec<ReplayFrame>,
    /// Grid index -> position in `frames`
    slots: Vec<Option<usize>>,
    overlays: Overlays,
    stints: BTreeMap<String, Vec<Stint>>,
    live: LiveState,
}

impl ReplayBundle {
    pub fn info(&self) -> &ReplayInfo {
        &self.info
    }

    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    /// Emitted frames in grid order
    pub fn frames(&self) -> &[ReplayFrame] {
        &self.frames
    }

    /// Frame at grid index `index`; `None` for an index with no cars on track
    pub fn frame(&self, index: usize) -> Option<&ReplayFrame> {
        self.slots.get(index).copied().flatten().map(|i| &self.frames[i])
    }

    /// Emitted frames with grid index >= `index`
    pub fn frames_from(&self, index: usize) -> &[ReplayFrame] {
        let start = self.frames.partition_point(|f| f.frame_index < index);
        &self.frames[start..]
    }

    /// First emitted frame at or after grid index `index`
    pub fn seek(&self, index: usize) -> Option<&ReplayFrame> {
        self.frames_from(index).first()
    }

    pub fn overlays(&self) -> &Overlays {
        &self.overlays
    }

    pub fn stints(&self) -> &BTreeMap<String, Vec<Stint>> {
        &self.stints
    }

    pub fn live(&self) -> &LiveState {
        &self.live
    }

    pub fn drivers(&self) -> &[DriverIdentity] {
        self.live.roster().drivers()
    }
}

/// Race span from the lap table: earliest lap start to latest lap completion
fn race_span(laps: &BTreeMap<String, Vec<LapRecord>>) -> Option<(f64, f64)> {
    let records = || laps.values().flatten();
    let start = records()
        .filter_map(|r| r.lap_start_time)
        .min_by(f64::total_cmp)?;
    let end = records()
        .filter_map(|r| r.lap_end_time)
        .max_by(f64::total_cmp)?;
    Some((start, end))
}

fn padded_range(values: impl Iterator<Item = f64>, pad: f64) -> [f64; 2] {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return [-pad, pad];
    }
    [lo - pad, hi + pad]
}

/// Build the full replay for a session
///
/// Fails only when the session has no usable timing data. Missing circuit
/// info, telemetry gaps and drivers without GPS degrade the output instead.
pub fn build_replay(session: &Session, config: &ReplayConfig) -> Result<ReplayBundle, ReplayError> {
    config.validate()?;
    let policy = &config.policy;

    let laps = lap_records(&session.laps);
    let (race_start, race_end) = race_span(&laps).ok_or(ReplayError::NoLapData)?;
    if session.results.is_empty() {
        return Err(ReplayError::NoResults);
    }

    let grid = build_grid(race_start, race_end, config.sample_interval)?;
    if grid.is_empty() {
        return Err(ReplayError::EmptyTimeline {
            start: race_start,
            end: race_end,
        });
    }
    info!(
        "Replay grid: {:.1}s to {:.1}s, {} points at {}s",
        race_start,
        race_end,
        grid.len(),
        config.sample_interval
    );

    let live = LiveState::build(session, &laps, policy.clone());
    let roster = live.roster();

    // === Interpolate every driver onto the grid ===
    let mut tracks: Vec<(DriverTrack, &str)> = Vec::with_capacity(roster.len());
    for driver in roster.drivers() {
        let Some(positions) = session.positions.get(&driver.car_number) else {
            warn!("No position data for {} (#{}), skipping", driver.code, driver.car_number);
            continue;
        };
        let car = session
            .car_data
            .get(&driver.car_number)
            .map(Vec::as_slice)
            .unwrap_or_default();
        match DriverTrack::interpolate(&driver.code, positions, car, &grid) {
            Ok(track) => tracks.push((track, driver.color.as_str())),
            Err(e) => warn!("Skipping driver: {}", e),
        }
    }

    // Cars missing from the results table are drawn under their number
    for (number, positions) in &session.positions {
        if roster.by_car_number(number).is_some() {
            continue;
        }
        warn!("Car #{} has no results row, drawing it by number", number);
        let car = session.car_data.get(number).map(Vec::as_slice).unwrap_or_default();
        match DriverTrack::interpolate(number, positions, car, &grid) {
            Ok(track) => tracks.push((track, FALLBACK_TEAM_COLOR)),
            Err(e) => warn!("Skipping driver: {}", e),
        }
    }

    // === One rotation for cars and circuit decoration ===
    let degrees = resolve_rotation_degrees(session.circuit.as_ref()).unwrap_or_else(|e| {
        warn!("Drawing circuit unrotated: {}", e);
        0.0
    });
    let (cx, cy) = centroid(tracks.iter().flat_map(|(t, _)| t.positions())).unwrap_or((0.0, 0.0));
    let rotation = Rotation::new(degrees, cx, cy);
    for (track, _) in tracks.iter_mut() {
        track.rotate(&rotation);
    }

    // === Frames ===
    let mut frames = Vec::new();
    let mut slots = vec![None; grid.len()];
    for (i, &t) in grid.iter().enumerate() {
        let drivers: Vec<DriverFrame> = tracks
            .iter()
            .filter_map(|(track, color)| track.frame_at(i, color))
            .collect();
        if drivers.is_empty() {
            continue;
        }

        let mut standings = live.standings_at_time(t, Some(drivers.as_slice()));
        let leader_lap = LiveState::leader_lap(&standings);
        standings.truncate(policy.standings_limit);

        slots[i] = Some(frames.len());
        frames.push(ReplayFrame {
            frame_index: i,
            elapsed_time: t - race_start,
            leader_lap,
            track_status: live.current_track_status(t),
            drivers,
            standings,
        });
    }
    debug!("Emitted {} of {} grid frames", frames.len(), grid.len());

    // === Overlays ===
    let driver_order: Vec<String> = roster.drivers().iter().map(|d| d.code.clone()).collect();
    let total_laps = session.total_laps();

    let hires = fastest_lap(&laps)
        .ok_or(GeometryError::NoLapTrace)
        .and_then(|lap| lap_trace(session, lap))
        .map(|trace| hires_outline(&trace, &rotation));
    let track_outline = match hires {
        Ok(outline) if !outline.is_empty() => outline,
        other => {
            if let Err(e) = other {
                warn!("Fastest-lap outline unavailable ({}), using raw positions", e);
            }
            fallback_outline(session, &driver_order, race_end - race_start, total_laps, &rotation)
                .unwrap_or_else(|e| {
                    warn!("Track outline unavailable: {}", e);
                    Polyline::default()
                })
        }
    };

    let corners = match rotate_corners(session.circuit.as_ref(), &rotation) {
        Ok(markers) => Some(markers),
        Err(e) => {
            warn!("Corner markers unavailable: {}", e);
            None
        }
    };

    let leader = session.results.first().map(|r| r.abbreviation.as_str());
    let drs_zones = build_drs_zones(session, &laps, leader, &rotation).unwrap_or_else(|e| {
        warn!("DRS zones unavailable: {}", e);
        Vec::new()
    });

    let all_positions = || tracks.iter().flat_map(|(t, _)| t.positions());
    let overlays = Overlays {
        x_range: padded_range(all_positions().map(|(x, _)| x), policy.axis_padding),
        y_range: padded_range(all_positions().map(|(_, y)| y), policy.axis_padding),
        track_outline,
        corners,
        drs_zones,
        weather: build_weather_timeline(&session.weather, race_start),
        race_control: build_race_control(&session.race_control, race_start),
        sectors: build_sector_lookup(&laps),
        pit_events: live.pit_events().clone(),
    };

    info!(
        "Replay built: {} frames, {} drivers, outline {} pts, {} DRS zones",
        frames.len(),
        tracks.len(),
        overlays.track_outline.len(),
        overlays.drs_zones.len()
    );

    let info = ReplayInfo {
        session: session.info.clone(),
        total_frames: grid.len(),
        frame_count: frames.len(),
        total_laps,
        race_start,
        race_end,
        sample_interval: config.sample_interval,
        rotation,
    };
    let stints = build_stints(&laps);

    Ok(ReplayBundle {
        info,
        grid,
        frames,
        slots,
        overlays,
        stints,
        live,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RacePolicy;
    use crate::model::{CarSample, CircuitInfo, Corner, LapRow, PositionSample, ResultRow};

    fn result(number: &str, code: &str, team: &str) -> ResultRow {
        ResultRow {
            driver_number: number.into(),
            abbreviation: code.into(),
            team_name: team.into(),
            status: "Finished".into(),
            ..Default::default()
        }
    }

    /// Two cars on a straight line, VER present for the whole race and NOR
    /// only between t=20 and t=60
    fn small_session() -> Session {
        let mut laps = Vec::new();
        for n in 1..=4u32 {
            let end = 20.0 * n as f64;
            laps.push(LapRow {
                driver: "VER".into(),
                driver_number: "1".into(),
                lap_number: n,
                lap_start_time: Some(end - 20.0),
                time: Some(end),
                lap_time: Some(20.0),
                position: Some(1),
                ..Default::default()
            });
            laps.push(LapRow {
                driver: "NOR".into(),
                driver_number: "4".into(),
                lap_number: n,
                lap_start_time: Some(end - 20.0),
                time: Some(end + 0.5),
                lap_time: Some(20.5),
                position: Some(2),
                ..Default::default()
            });
        }
        let line = |from: f64, to: f64| -> Vec<PositionSample> {
            let mut t = from;
            let mut out = Vec::new();
            while t <= to {
                out.push(PositionSample { session_time: t, x: t * 10.0, y: 0.0 });
                t += 0.25;
            }
            out
        };
        Session {
            laps,
            results: vec![result("1", "VER", "Red Bull Racing"), result("4", "NOR", "McLaren")],
            positions: BTreeMap::from([("1".to_string(), line(0.0, 80.0)), ("4".to_string(), line(20.0, 60.0))]),
            car_data: BTreeMap::from([(
                "1".to_string(),
                vec![
                    CarSample { session_time: 0.0, speed: Some(100.0), ..Default::default() },
                    CarSample { session_time: 80.0, speed: Some(300.0), ..Default::default() },
                ],
            )]),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_rejects_missing_data() {
        let config = ReplayConfig::default();
        let mut session = small_session();
        session.results.clear();
        assert_eq!(build_replay(&session, &config).unwrap_err(), ReplayError::NoResults);

        let empty = Session::default();
        assert_eq!(build_replay(&empty, &config).unwrap_err(), ReplayError::NoLapData);

        let bad = ReplayConfig::with_interval(0.0);
        assert_eq!(
            build_replay(&small_session(), &bad).unwrap_err(),
            ReplayError::InvalidInterval(0.0)
        );
    }

    #[test]
    fn test_grid_and_frame_indices() {
        let bundle = build_replay(&small_session(), &ReplayConfig::with_interval(4.0)).unwrap();
        let info = bundle.info();
        assert_eq!(info.race_start, 0.0);
        assert_eq!(info.race_end, 80.5);
        assert_eq!(info.total_frames, 21);
        assert_eq!(bundle.grid()[0], 0.0);
        assert_eq!(info.total_laps, 4);

        for frame in bundle.frames() {
            assert_eq!(bundle.frame(frame.frame_index), Some(frame));
        }
    }

    #[test]
    fn test_driver_absent_outside_sample_range() {
        let bundle = build_replay(&small_session(), &ReplayConfig::with_interval(4.0)).unwrap();
        for frame in bundle.frames() {
            let t = bundle.grid()[frame.frame_index];
            let has_nor = frame.drivers.iter().any(|d| d.code == "NOR");
            assert_eq!(has_nor, (20.0..=60.0).contains(&t), "t={t}");
        }
    }

    #[test]
    fn test_frames_without_cars_are_omitted() {
        let mut session = small_session();
        // VER's GPS drops out after t=40
        if let Some(samples) = session.positions.get_mut("1") {
            samples.retain(|p| p.session_time <= 40.0);
        }
        session.positions.remove("4");
        let bundle = build_replay(&session, &ReplayConfig::with_interval(4.0)).unwrap();
        assert_eq!(bundle.frames().len(), 11);
        assert!(bundle.frame(11).is_none());
        assert!(bundle.seek(11).is_none());
        assert_eq!(bundle.info().frame_count, 11);
    }

    #[test]
    fn test_frame_contents() {
        let bundle = build_replay(&small_session(), &ReplayConfig::with_interval(4.0)).unwrap();
        let frame = bundle.frame(5).unwrap();
        assert_eq!(frame.elapsed_time, 20.0);
        // VER completes lap 1 at t=20; NOR is not yet classified
        assert_eq!(frame.leader_lap, 1);
        assert_eq!(frame.standings[1].position, None);
        assert_eq!(frame.track_status.name(), "Green");

        let ver = frame.drivers.iter().find(|d| d.code == "VER").unwrap();
        assert_eq!(ver.color, "#3671C6");
        assert_eq!(ver.speed, 150.0);
        let nor = frame.drivers.iter().find(|d| d.code == "NOR").unwrap();
        assert_eq!(nor.speed, 0.0, "no car data");

        assert_eq!(frame.standings[0].code, "VER");
        assert_eq!(frame.standings[0].speed, 150.0);
    }

    #[test]
    fn test_standings_truncated_to_limit() {
        let mut config = ReplayConfig::with_interval(4.0);
        config.policy = RacePolicy { standings_limit: 1, ..RacePolicy::default() };
        let bundle = build_replay(&small_session(), &config).unwrap();
        assert!(bundle.frames().iter().all(|f| f.standings.len() == 1));
        assert!(bundle.frames().iter().any(|f| f.drivers.len() == 2));
    }

    #[test]
    fn test_missing_circuit_degrades() {
        let bundle = build_replay(&small_session(), &ReplayConfig::default()).unwrap();
        let overlays = bundle.overlays();
        assert!(overlays.corners.is_none());
        assert!(overlays.drs_zones.is_empty());
        assert!(!overlays.track_outline.is_empty());
        assert_eq!(bundle.info().rotation.degrees, 0.0);
        assert_eq!(overlays.x_range, [-800.0, 1600.0]);
        assert_eq!(overlays.y_range, [-800.0, 800.0]);
    }

    #[test]
    fn test_rotation_shared_by_cars_and_corners() {
        let mut session = small_session();
        session.circuit = Some(CircuitInfo {
            rotation: Some(90.0),
            corners: vec![Corner { number: 1, x: 400.0, y: 0.0 }],
        });
        let bundle = build_replay(&session, &ReplayConfig::with_interval(4.0)).unwrap();
        let rotation = bundle.info().rotation;
        assert_eq!(rotation.degrees, 90.0);

        // VER at t=40 sits at raw (400, 0), the same spot as the corner
        let frame = bundle.frame(10).unwrap();
        let ver = frame.drivers.iter().find(|d| d.code == "VER").unwrap();
        let corners = bundle.overlays().corners.as_ref().unwrap();
        assert!((ver.x - corners.x[0]).abs() < 1e-6);
        assert!((ver.y - corners.y[0]).abs() < 1e-6);
    }

    #[test]
    fn test_build_rejects_tiny_interval() {
        let config = ReplayConfig::with_interval(1e-300);
        assert_eq!(
            build_replay(&small_session(), &config).unwrap_err(),
            ReplayError::InvalidInterval(1e-300)
        );
    }

    #[test]
    fn test_outline_falls_back_without_lap_times() {
        let mut session = small_session();
        for lap in session.laps.iter_mut() {
            lap.lap_time = None;
        }
        let bundle = build_replay(&session, &ReplayConfig::with_interval(4.0)).unwrap();
        let outline = &bundle.overlays().track_outline;
        assert!(!outline.is_empty());
        assert!(bundle.overlays().drs_zones.is_empty());
    }

    #[test]
    fn test_car_without_results_row_drawn_by_number() {
        let mut session = small_session();
        let samples = session.positions["1"].clone();
        session.positions.insert("77".to_string(), samples);
        let bundle = build_replay(&session, &ReplayConfig::with_interval(4.0)).unwrap();

        let frame = bundle.frame(5).unwrap();
        let unknown = frame.drivers.iter().find(|d| d.code == "77").unwrap();
        assert_eq!(unknown.color, FALLBACK_TEAM_COLOR);
        assert!(frame.standings.iter().all(|s| s.code != "77"));
    }
}
