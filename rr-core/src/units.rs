//! Numeric rounding for replay payloads
//!
//! Coordinates and telemetry are rounded before they reach the wire. The
//! `round*` functions are usable as `#[serde(serialize_with = ...)]` hooks; `round_to` is the plain helper the
//! builders use when the rounded value itself is part of the model.

use serde::Serializer;

/// Round `val` to `decimals` decimal places
pub fn round_to(val: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (val * factor).round() / factor
}

/// Round f64 to 1 decimal place for compact JSON serialization
pub fn round1<S: Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round_to(*val, 1))
}

/// Round an optional f64 to 3 decimal places
pub fn round3_opt<S: Serializer>(val: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    match val {
        Some(v) => s.serialize_some(&round_to(*v, 3)),
        None => s.serialize_none(),
    }
}

/// Lap time as `M:SS.mmm`
pub fn format_lap_time(secs: f64) -> String {
    let millis = (secs.max(0.0) * 1000.0).round() as u64;
    let (mins, rest) = (millis / 60_000, millis % 60_000);
    format!("{}:{:02}.{:03}", mins, rest / 1000, rest % 1000)
}

/// Secondary telemetry value rounded to 1 decimal, `0.0` when absent
pub fn channel_value(val: Option<f64>) -> f64 {
    match val {
        Some(v) if v.is_finite() => round_to(v, 1),
        _ => 0.0,
    }
}

/// Discrete telemetry value (gear, DRS) rounded to the nearest integer, `0` when absent
pub fn channel_level(val: Option<f64>) -> i32 {
    match val {
        Some(v) if v.is_finite() => v.round() as i32,
        _ => 0,
    }
}
