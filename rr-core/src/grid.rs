//! Time grid and per-driver interpolation
//!
//! The grid is the replay clock: `N = ceil((end - start) / interval)` evenly
//! spaced session times starting at `start`. Each driver's irregular GPS and
//! telemetry samples are linearly resampled onto it. Grid points outside a
//! channel's sampled range get no value, never an extrapolated one.

use crate::error::{ChannelError, ReplayError};
use crate::geometry::Rotation;
use crate::model::{CarSample, DriverFrame, PositionSample};
use crate::units::{channel_level, channel_value};

/// Upper bound on grid points for one replay
pub const MAX_GRID_POINTS: usize = 500_000;

/// Uniform ascending timestamps covering `[start, end)`
///
/// Returns an empty grid for a non-positive span or interval, and
/// `GridTooLarge` when the span would need more than [`MAX_GRID_POINTS`].
pub fn build_grid(start: f64, end: f64, interval: f64) -> Result<Vec<f64>, ReplayError> {
    if !(start.is_finite() && end.is_finite() && interval.is_finite()) || interval <= 0.0 || end <= start {
        return Ok(Vec::new());
    }
    let points = ((end - start) / interval).ceil();
    if !points.is_finite() || points > MAX_GRID_POINTS as f64 {
        return Err(ReplayError::GridTooLarge {
            points,
            max: MAX_GRID_POINTS,
        });
    }
    let n = points as usize;
    Ok((0..n).map(|i| start + i as f64 * interval).collect())
}

/// Linear interpolation of `(xs, ys)` at each grid time
///
/// `xs` must be ascending and `grid` ascending; the sweep is linear in
/// `xs.len() + grid.len()`. Grid times before `xs[0]` or after the last
/// sample are `None`.
pub fn interp(xs: &[f64], ys: &[f64], grid: &[f64]) -> Vec<Option<f64>> {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return vec![None; grid.len()];
    }
    let (first, last) = (xs[0], xs[n - 1]);
    let mut j = 0;

    grid.iter()
        .map(|&t| {
            if !(first..=last).contains(&t) {
                return None;
            }
            while j + 1 < n && xs[j + 1] <= t {
                j += 1;
            }
            if j + 1 == n {
                return Some(ys[n - 1]);
            }
            let (x0, x1) = (xs[j], xs[j + 1]);
            let (y0, y1) = (ys[j], ys[j + 1]);
            let span = x1 - x0;
            if span <= 0.0 {
                return Some(y1);
            }
            Some(y0 + (y1 - y0) * (t - x0) / span)
        })
        .collect()
}

/// Interpolate one channel after dropping samples where it is missing
fn interp_channel<S>(
    samples: &[S],
    time: impl Fn(&S) -> f64,
    value: impl Fn(&S) -> Option<f64>,
    grid: &[f64],
) -> Vec<Option<f64>> {
    let mut pairs: Vec<(f64, f64)> = samples
        .iter()
        .filter_map(|s| {
            let t = time(s);
            let v = value(s)?;
            (t.is_finite() && v.is_finite()).then_some((t, v))
        })
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
    interp(&xs, &ys, grid)
}

/// One driver's signals resampled onto the grid
#[derive(Debug, Clone, PartialEq)]
pub struct DriverTrack {
    pub code: String,
    pub x: Vec<Option<f64>>,
    pub y: Vec<Option<f64>>,
    pub speed: Vec<Option<f64>>,
    pub throttle: Vec<Option<f64>>,
    pub brake: Vec<Option<f64>>,
    pub gear: Vec<Option<f64>>,
    pub drs: Vec<Option<f64>>,
}

impl DriverTrack {
    /// Resample a driver's position and car samples onto `grid`
    ///
    /// Telemetry channels are optional; a driver without any finite position
    /// sample is an error.
    pub fn interpolate(
        code: &str,
        positions: &[PositionSample],
        car: &[CarSample],
        grid: &[f64],
    ) -> Result<Self, ChannelError> {
        let mut fixes: Vec<&PositionSample> = positions
            .iter()
            .filter(|p| p.session_time.is_finite() && p.x.is_finite() && p.y.is_finite())
            .collect();
        if fixes.is_empty() {
            return Err(ChannelError::NoPositionSamples(code.to_string()));
        }
        fixes.sort_by(|a, b| a.session_time.total_cmp(&b.session_time));
        let ts: Vec<f64> = fixes.iter().map(|p| p.session_time).collect();
        let xs: Vec<f64> = fixes.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = fixes.iter().map(|p| p.y).collect();

        let t = |c: &CarSample| c.session_time;
        Ok(Self {
            code: code.to_string(),
            x: interp(&ts, &xs, grid),
            y: interp(&ts, &ys, grid),
            speed: interp_channel(car, t, |c| c.speed, grid),
            throttle: interp_channel(car, t, |c| c.throttle, grid),
            brake: interp_channel(car, t, |c| c.brake, grid),
            gear: interp_channel(car, t, |c| c.gear, grid),
            drs: interp_channel(car, t, |c| c.drs, grid),
        })
    }

    /// Position at grid index `i`, if the car has one
    pub fn position(&self, i: usize) -> Option<(f64, f64)> {
        match (self.x.get(i).copied().flatten(), self.y.get(i).copied().flatten()) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    /// All grid positions the car has
    pub fn positions(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        (0..self.x.len()).filter_map(|i| self.position(i))
    }

    /// Rotate the whole position array in place
    pub fn rotate(&mut self, rotation: &Rotation) {
        if rotation.is_identity() {
            return;
        }
        for (x, y) in self.x.iter_mut().zip(self.y.iter_mut()) {
            if let (Some(px), Some(py)) = (x.as_mut(), y.as_mut()) {
                let (rx, ry) = rotation.apply(*px, *py);
                *px = rx;
                *py = ry;
            }
        }
    }

    /// Frame entry at grid index `i`; `None` when the car has no position there
    pub fn frame_at(&self, i: usize, color: &str) -> Option<DriverFrame> {
        let (x, y) = self.position(i)?;
        let channel = |v: &[Option<f64>]| v.get(i).copied().flatten();
        Some(DriverFrame {
            code: self.code.clone(),
            x,
            y,
            speed: channel_value(channel(&self.speed[..])),
            throttle: channel_value(channel(&self.throttle[..])),
            brake: channel_value(channel(&self.brake[..])),
            gear: channel_level(channel(&self.gear[..])),
            drs: channel_level(channel(&self.drs[..])),
            color: color.to_string(),
        })
    }
}
