//! Lap-indexed race history
//!
//! `LapHistory` answers "as of lap N" questions from each driver's own lap
//! records rather than from a moment in session time: position traces,
//! lap-time pace, stint breakdowns and head-to-head gaps. Gaps use the
//! session time at each lap completion, the same cumulative race time the
//! live standings use.

use crate::lookups::{mean_lap_time, stints_for, LapRecord, Stint};
use crate::model::Compound;
use crate::units::{format_lap_time, round3_opt, round_to};
use serde::Serialize;
use std::collections::BTreeMap;

/// Laps a gap trend is measured over
pub const GAP_TREND_WINDOW: u32 = 5;

/// Gap changes smaller than this over the window count as stable
const GAP_STABLE_SECS: f64 = 0.1;

/// One lap of a lap-time history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedLap {
    pub lap: u32,
    #[serde(serialize_with = "round3_opt")]
    pub time: Option<f64>,
    pub time_str: Option<String>,
    pub compound: Compound,
}

impl TimedLap {
    fn from_record(r: &LapRecord) -> Self {
        TimedLap {
            lap: r.lap_number,
            time: r.lap_time,
            time_str: r.lap_time.map(format_lap_time),
            compound: r.compound,
        }
    }
}

/// A driver's recent laps with pace figures over them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapTimes {
    pub driver: String,
    pub laps: Vec<TimedLap>,
    pub average_pace: Option<f64>,
    pub average_pace_str: Option<String>,
    pub best_lap: Option<f64>,
    pub best_lap_str: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GapTrend {
    Stable,
    Increasing,
    Decreasing,
}

/// Gap between two drivers at a lap and how it moved over the last few laps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapComparison {
    pub driver_a: String,
    pub driver_b: String,
    /// Absolute gap in seconds; `None` unless both completed the lap
    pub gap: Option<f64>,
    pub ahead: Option<String>,
    pub trend: Option<GapTrend>,
    /// Mean change of `a - b` per lap over the window
    pub rate_per_lap: Option<f64>,
}

/// A stint change, from one compound to the next
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TyreChange {
    pub driver: String,
    /// First lap on the new set
    pub lap: u32,
    pub from_compound: Compound,
    pub to_compound: Compound,
    pub stint: u32,
}

/// Per-driver lap records, ordered by lap number
#[derive(Debug, Clone, Default)]
pub struct LapHistory {
    records: BTreeMap<String, Vec<LapRecord>>,
    total_laps: u32,
}

impl LapHistory {
    pub fn new(records: BTreeMap<String, Vec<LapRecord>>) -> Self {
        let total_laps = records
            .values()
            .flatten()
            .map(|r| r.lap_number)
            .max()
            .unwrap_or(0);
        Self { records, total_laps }
    }

    /// Highest lap number any driver recorded
    pub fn total_laps(&self) -> u32 {
        self.total_laps
    }

    /// The driver's record for `lap`
    pub fn record(&self, code: &str, lap: u32) -> Option<&LapRecord> {
        let records = self.records.get(code)?;
        records
            .binary_search_by_key(&lap, |r| r.lap_number)
            .ok()
            .map(|i| &records[i])
    }

    /// The driver's records numbered `as_of_lap` or lower
    pub fn laps_up_to(&self, code: &str, as_of_lap: u32) -> &[LapRecord] {
        let Some(records) = self.records.get(code) else {
            return &[];
        };
        let end = records.partition_point(|r| r.lap_number <= as_of_lap);
        &records[..end]
    }

    /// Classification at the end of each lap from 1 to `as_of_lap`
    pub fn positions(&self, code: &str, as_of_lap: u32) -> Vec<Option<u32>> {
        (1..=as_of_lap)
            .map(|lap| self.record(code, lap).and_then(|r| r.position))
            .collect()
    }

    /// Lap times up to `as_of_lap`, the last `last_n` of them when given
    pub fn lap_times(&self, code: &str, as_of_lap: u32, last_n: Option<usize>) -> LapTimes {
        let laps = self.laps_up_to(code, as_of_lap);
        let laps = match last_n {
            Some(n) => &laps[laps.len().saturating_sub(n)..],
            None => laps,
        };
        let times = || laps.iter().filter_map(|r| r.lap_time);
        let average_pace = mean_lap_time(times());
        let best_lap = times().min_by(f64::total_cmp).map(|t| round_to(t, 3));

        LapTimes {
            driver: code.to_string(),
            laps: laps.iter().map(TimedLap::from_record).collect(),
            average_pace,
            average_pace_str: average_pace.map(format_lap_time),
            best_lap,
            best_lap_str: best_lap.map(format_lap_time),
        }
    }

    /// Stints over the laps up to `as_of_lap`
    pub fn stints(&self, code: &str, as_of_lap: u32) -> Vec<Stint> {
        stints_for(self.laps_up_to(code, as_of_lap))
    }

    /// Compound changes up to `as_of_lap`, detected where the stint number rises
    pub fn tyre_changes(&self, code: &str, as_of_lap: u32) -> Vec<TyreChange> {
        self.laps_up_to(code, as_of_lap)
            .windows(2)
            .filter_map(|pair| {
                let (prev, next) = (&pair[0], &pair[1]);
                match (prev.stint, next.stint) {
                    (Some(a), Some(b)) if b > a => Some(TyreChange {
                        driver: code.to_string(),
                        lap: next.lap_number,
                        from_compound: prev.compound,
                        to_compound: next.compound,
                        stint: b,
                    }),
                    _ => None,
                }
            })
            .collect()
    }

    /// Pit entries logged up to `as_of_lap`
    pub fn pit_entries(&self, code: &str, as_of_lap: u32) -> usize {
        self.laps_up_to(code, as_of_lap)
            .iter()
            .filter(|r| r.pit_in_time.is_some())
            .count()
    }

    fn completion(&self, code: &str, lap: u32) -> Option<f64> {
        self.record(code, lap).and_then(|r| r.lap_end_time)
    }

    /// Gap between `a` and `b` at `as_of_lap`, with its trend over the
    /// last [`GAP_TREND_WINDOW`] laps
    pub fn gap_between(&self, a: &str, b: &str, as_of_lap: u32) -> GapComparison {
        let mut comparison = GapComparison {
            driver_a: a.to_string(),
            driver_b: b.to_string(),
            gap: None,
            ahead: None,
            trend: None,
            rate_per_lap: None,
        };
        let (Some(time_a), Some(time_b)) = (self.completion(a, as_of_lap), self.completion(b, as_of_lap)) else {
            return comparison;
        };

        let gap = time_a - time_b;
        comparison.gap = Some(round_to(gap.abs(), 3));
        comparison.ahead = Some((if gap > 0.0 { b } else { a }).to_string());

        let first = as_of_lap.saturating_sub(GAP_TREND_WINDOW - 1).max(1);
        let gaps: Vec<f64> = (first..=as_of_lap)
            .filter_map(|lap| Some(self.completion(a, lap)? - self.completion(b, lap)?))
            .collect();
        if let (Some(start), Some(end)) = (gaps.first(), gaps.last()) {
            if gaps.len() >= 2 {
                let delta = end - start;
                comparison.rate_per_lap = Some(round_to(delta / (gaps.len() - 1) as f64, 3));
                comparison.trend = Some(if delta.abs() < GAP_STABLE_SECS {
                    GapTrend::Stable
                } else if delta > 0.0 {
                    GapTrend::Increasing
                } else {
                    GapTrend::Decreasing
                });
            }
        }
        comparison
    }
}
