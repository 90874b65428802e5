//! Geometry normalizer
//!
//! Rotates car positions and circuit decoration into one on-screen frame,
//! and builds the static track outline and DRS zone polylines.
//!
//! Every transform here goes through a single [`Rotation`], so the outline,
//! corner markers and DRS zones stay aligned with the car dots.

use crate::error::GeometryError;
use crate::lookups::LapRecord;
use crate::model::{CircuitInfo, Session};
use crate::series::TimeIndexedSeries;
use serde::Serialize;
use std::collections::BTreeMap;

/// Target point count for the high-resolution outline
pub const OUTLINE_TARGET_POINTS: usize = 600;

/// Raw DRS values at or above this mean the flap is open
pub const DRS_ACTIVE_THRESHOLD: f64 = 10.0;

/// Shortest contiguous DRS run kept as a zone
pub const DRS_MIN_RUN: usize = 5;

/// A candidate lap needs at least this many active samples to yield zones
pub const DRS_MIN_ACTIVE: usize = 10;

/// Maximum points per emitted DRS zone
pub const DRS_ZONE_MAX_POINTS: usize = 30;

/// Mid-race leader laps scanned as DRS candidates
const DRS_LEADER_LAPS: usize = 10;

/// Assumed GPS cadence when sizing the fallback outline
const FALLBACK_SAMPLE_RATE_HZ: f64 = 4.0;

// ============================================================================
// Rotation
// ============================================================================

/// Rotate `(x, y)` by `deg` degrees counter-clockwise about `(cx, cy)`
pub fn rotate(x: f64, y: f64, deg: f64, cx: f64, cy: f64) -> (f64, f64) {
    let (sin, cos) = deg.to_radians().sin_cos();
    let (dx, dy) = (x - cx, y - cy);
    (cx + dx * cos - dy * sin, cy + dx * sin + dy * cos)
}

/// A planar rotation about a fixed center
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rotation {
    pub degrees: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl Rotation {
    pub fn new(degrees: f64, center_x: f64, center_y: f64) -> Self {
        Self {
            degrees,
            center_x,
            center_y,
        }
    }

    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn is_identity(&self) -> bool {
        self.degrees == 0.0
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        if self.is_identity() {
            return (x, y);
        }
        rotate(x, y, self.degrees, self.center_x, self.center_y)
    }

    pub fn inverse(&self) -> Self {
        Self::new(-self.degrees, self.center_x, self.center_y)
    }
}

/// Published map rotation in degrees
///
/// A circuit without rotation metadata is drawn unrotated; a session
/// without circuit info at all is an error the caller recovers from.
pub fn resolve_rotation_degrees(circuit: Option<&CircuitInfo>) -> Result<f64, GeometryError> {
    let circuit = circuit.ok_or(GeometryError::CircuitUnavailable)?;
    Ok(circuit.rotation.filter(|r| r.is_finite()).unwrap_or(0.0))
}

/// Mean of the given points, ignoring non-finite ones
pub fn centroid(points: impl IntoIterator<Item = (f64, f64)>) -> Option<(f64, f64)> {
    let (mut sx, mut sy, mut n) = (0.0, 0.0, 0usize);
    for (x, y) in points {
        if x.is_finite() && y.is_finite() {
            sx += x;
            sy += y;
            n += 1;
        }
    }
    (n > 0).then(|| (sx / n as f64, sy / n as f64))
}

// ============================================================================
// Polylines
// ============================================================================

/// An open polyline in rotated screen coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Polyline {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Polyline {
    fn from_points(points: impl IntoIterator<Item = (f64, f64)>, rotation: &Rotation) -> Self {
        let (x, y) = points.into_iter().map(|(x, y)| rotation.apply(x, y)).unzip();
        Self { x, y }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Every `stride`-th point, starting with the first
fn stride_by<T: Copy>(points: &[T], stride: usize) -> Vec<T> {
    points.iter().step_by(stride.max(1)).copied().collect()
}

/// Keep at most `max_points`, evenly strided
fn downsample<T: Copy>(points: &[T], max_points: usize) -> Vec<T> {
    stride_by(points, points.len().div_ceil(max_points.max(1)))
}

// ============================================================================
// Lap traces
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracePoint {
    pub t: f64,
    pub x: f64,
    pub y: f64,
    /// Raw DRS value held from the most recent car sample
    pub drs: Option<f64>,
}

/// Position trace of a single lap, merged with DRS state
#[derive(Debug, Clone, PartialEq)]
pub struct LapTrace {
    pub driver_code: String,
    pub lap_number: u32,
    pub points: Vec<TracePoint>,
}

impl LapTrace {
    pub fn drs_active_count(&self) -> usize {
        self.points.iter().filter(|p| is_drs_active(p.drs)).count()
    }
}

fn is_drs_active(drs: Option<f64>) -> bool {
    drs.is_some_and(|v| v >= DRS_ACTIVE_THRESHOLD)
}

/// Extract a lap's position samples between lap start and lap end
pub fn lap_trace(session: &Session, lap: &LapRecord) -> Result<LapTrace, GeometryError> {
    let (start, end) = match (lap.lap_start_time, lap.lap_end_time) {
        (Some(s), Some(e)) if e > s => (s, e),
        _ => return Err(GeometryError::NoLapTrace),
    };
    let number = session
        .car_number(&lap.driver_code)
        .ok_or(GeometryError::NoLapTrace)?;
    let positions = session
        .positions
        .get(number)
        .ok_or(GeometryError::NoLapTrace)?;

    let drs = session
        .car_data
        .get(number)
        .map(|samples| TimeIndexedSeries::from_unsorted(samples.iter().map(|c| (c.session_time, c.drs))))
        .unwrap_or_default();

    let mut points: Vec<TracePoint> = positions
        .iter()
        .filter(|p| p.session_time >= start && p.session_time <= end)
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .map(|p| TracePoint {
            t: p.session_time,
            x: p.x,
            y: p.y,
            drs: drs.at(p.session_time).copied().flatten(),
        })
        .collect();
    points.sort_by(|a, b| a.t.total_cmp(&b.t));

    if points.is_empty() {
        return Err(GeometryError::NoLapTrace);
    }
    Ok(LapTrace {
        driver_code: lap.driver_code.clone(),
        lap_number: lap.lap_number,
        points,
    })
}

/// Lap with the lowest recorded lap time among fully timed laps
pub fn fastest_lap(laps: &BTreeMap<String, Vec<LapRecord>>) -> Option<&LapRecord> {
    laps.values()
        .flatten()
        .filter(|r| r.lap_start_time.is_some() && r.lap_end_time.is_some())
        .filter_map(|r| r.lap_time.map(|lt| (lt, r)))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, r)| r)
}

// ============================================================================
// Track outline
// ============================================================================

/// Outline from a single lap trace, strided down to about 600 points
pub fn hires_outline(trace: &LapTrace, rotation: &Rotation) -> Polyline {
    let stride = (trace.points.len() / OUTLINE_TARGET_POINTS).max(1);
    Polyline::from_points(
        stride_by(&trace.points, stride).into_iter().map(|p| (p.x, p.y)),
        rotation,
    )
}

/// Approximate outline from the first lap's worth of one car's raw samples
///
/// Uses the first driver in `driver_order` that has any position data.
pub fn fallback_outline(
    session: &Session,
    driver_order: &[String],
    race_span: f64,
    total_laps: u32,
    rotation: &Rotation,
) -> Result<Polyline, GeometryError> {
    let samples = driver_order
        .iter()
        .filter_map(|code| session.car_number(code))
        .filter_map(|number| session.positions.get(number))
        .find(|samples| !samples.is_empty())
        .ok_or(GeometryError::NoPositionData)?;

    let mut ordered: Vec<(f64, f64, f64)> = samples
        .iter()
        .filter(|p| p.session_time.is_finite() && p.x.is_finite() && p.y.is_finite())
        .map(|p| (p.session_time, p.x, p.y))
        .collect();
    ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

    let lap_duration = race_span.max(0.0) / f64::from(total_laps.max(1));
    let limit = (lap_duration * FALLBACK_SAMPLE_RATE_HZ) as usize;
    let outline = Polyline::from_points(
        ordered.into_iter().take(limit).map(|(_, x, y)| (x, y)),
        rotation,
    );
    if outline.is_empty() {
        return Err(GeometryError::NoPositionData);
    }
    Ok(outline)
}

// ============================================================================
// DRS zones
// ============================================================================

/// Contiguous DRS-active runs of at least [`DRS_MIN_RUN`] samples
///
/// Each run is downsampled to at most [`DRS_ZONE_MAX_POINTS`] points.
pub fn drs_runs(points: &[TracePoint]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();

    let mut close = |current: &mut Vec<(f64, f64)>| {
        if current.len() >= DRS_MIN_RUN {
            runs.push(downsample(current, DRS_ZONE_MAX_POINTS));
        }
        current.clear();
    };

    for p in points {
        if is_drs_active(p.drs) {
            current.push((p.x, p.y));
        } else {
            close(&mut current);
        }
    }
    close(&mut current);
    runs
}

/// The fastest lap plus up to ten laps from a third of the way into the leader's race
pub fn drs_candidates<'a>(
    laps: &'a BTreeMap<String, Vec<LapRecord>>,
    leader_code: Option<&str>,
) -> Vec<&'a LapRecord> {
    let mut candidates: Vec<&LapRecord> = fastest_lap(laps).into_iter().collect();
    if let Some(leader_laps) = leader_code.and_then(|code| laps.get(code)) {
        let from = leader_laps.len() / 3;
        candidates.extend(leader_laps.iter().skip(from).take(DRS_LEADER_LAPS));
    }
    candidates
}

/// Candidate trace with the most active DRS samples
///
/// Ties keep the earlier candidate.
pub fn select_drs_trace(candidates: Vec<LapTrace>) -> Result<LapTrace, GeometryError> {
    let mut best: Option<(usize, LapTrace)> = None;
    for trace in candidates {
        let count = trace.drs_active_count();
        if best.as_ref().map_or(true, |(n, _)| count > *n) {
            best = Some((count, trace));
        }
    }
    match best {
        Some((count, trace)) if count >= DRS_MIN_ACTIVE => Ok(trace),
        _ => Err(GeometryError::NoDrsData),
    }
}

/// DRS zone polylines from the candidate lap with the most DRS usage
pub fn build_drs_zones(
    session: &Session,
    laps: &BTreeMap<String, Vec<LapRecord>>,
    leader_code: Option<&str>,
    rotation: &Rotation,
) -> Result<Vec<Polyline>, GeometryError> {
    let traces = drs_candidates(laps, leader_code)
        .into_iter()
        .filter_map(|lap| lap_trace(session, lap).ok())
        .collect();
    let best = select_drs_trace(traces)?;

    Ok(drs_runs(&best.points)
        .into_iter()
        .map(|run| Polyline::from_points(run, rotation))
        .collect())
}

// ============================================================================
// Corners
// ============================================================================

/// Rotated corner markers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CornerMarkers {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub numbers: Vec<u32>,
}

pub fn rotate_corners(
    circuit: Option<&CircuitInfo>,
    rotation: &Rotation,
) -> Result<CornerMarkers, GeometryError> {
    let circuit = circuit.ok_or(GeometryError::CircuitUnavailable)?;
    let mut markers = CornerMarkers::default();
    for corner in circuit.corners.iter().filter(|c| c.x.is_finite() && c.y.is_finite()) {
        let (x, y) = rotation.apply(corner.x, corner.y);
        markers.x.push(x);
        markers.y.push(y);
        markers.numbers.push(corner.number);
    }
    Ok(markers)
}
