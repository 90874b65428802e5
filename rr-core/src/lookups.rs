//! Lookup builders
//!
//! Turn the raw lap table and event logs into per-driver, time-ordered
//! lookups. Each builder is a pure function of its input tables and reads
//! no other builder's output, so they can run in any order.

use crate::model::{
    Compound, LapRow, RaceControlMessage, TrackStatus, TrackStatusChange, WeatherSample,
};
use crate::series::TimeIndexedSeries;
use crate::units::{round3_opt, round_to};
use serde::Serialize;
use std::collections::BTreeMap;

/// Two sector times within this many seconds count as tied for session best
pub const SECTOR_BEST_TOLERANCE: f64 = 0.01;

/// Weather samples this long before race start are still reported
const WEATHER_LEAD_IN_SECS: f64 = 300.0;

/// Per-driver lookups keyed by driver code
pub type DriverLookup<T> = BTreeMap<String, TimeIndexedSeries<T>>;

// ============================================================================
// Lap records
// ============================================================================

/// A validated lap, one per driver per lap number
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapRecord {
    pub driver_code: String,
    pub lap_number: u32,
    /// Session time at lap completion; absent for a lap that was never finished
    pub lap_end_time: Option<f64>,
    pub lap_start_time: Option<f64>,
    pub lap_time: Option<f64>,
    pub compound: Compound,
    pub tyre_life: u32,
    pub stint: Option<u32>,
    pub position: Option<u32>,
    pub sector1: Option<f64>,
    pub sector2: Option<f64>,
    pub sector3: Option<f64>,
    pub is_personal_best: bool,
    pub pit_in_time: Option<f64>,
    pub pit_out_time: Option<f64>,
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

impl LapRecord {
    fn from_row(row: &LapRow) -> Self {
        LapRecord {
            driver_code: row.driver.clone(),
            lap_number: row.lap_number,
            lap_end_time: finite(row.time),
            lap_start_time: finite(row.lap_start_time),
            lap_time: finite(row.lap_time),
            compound: row.compound,
            tyre_life: row.tyre_life.unwrap_or(0),
            stint: row.stint,
            position: row.position,
            sector1: finite(row.sector1_time),
            sector2: finite(row.sector2_time),
            sector3: finite(row.sector3_time),
            is_personal_best: row.is_personal_best,
            pit_in_time: finite(row.pit_in_time),
            pit_out_time: finite(row.pit_out_time),
        }
    }
}

/// Group the lap table by driver, ordered by lap number
///
/// Rows without a driver code are dropped; a repeated lap number keeps its
/// first row.
pub fn lap_records(laps: &[LapRow]) -> BTreeMap<String, Vec<LapRecord>> {
    let mut by_driver: BTreeMap<String, Vec<LapRecord>> = BTreeMap::new();
    for row in laps.iter().filter(|r| !r.driver.is_empty()) {
        by_driver
            .entry(row.driver.clone())
            .or_default()
            .push(LapRecord::from_row(row));
    }
    for records in by_driver.values_mut() {
        records.sort_by_key(|r| r.lap_number);
        records.dedup_by_key(|r| r.lap_number);
    }
    by_driver
}

// ============================================================================
// Step-function lookups
// ============================================================================

fn per_driver<T>(
    laps: &BTreeMap<String, Vec<LapRecord>>,
    entry: impl Fn(&LapRecord) -> Option<(f64, T)>,
) -> DriverLookup<T> {
    laps.iter()
        .map(|(code, records)| {
            let series = TimeIndexedSeries::from_unsorted(records.iter().filter_map(&entry));
            (code.clone(), series)
        })
        .collect()
}

/// Driver -> lap number, stepped at each lap completion
pub fn build_lap_lookup(laps: &BTreeMap<String, Vec<LapRecord>>) -> DriverLookup<u32> {
    per_driver(laps, |r| r.lap_end_time.map(|t| (t, r.lap_number)))
}

/// Driver -> classification position, stepped at each lap completion
pub fn build_position_lookup(laps: &BTreeMap<String, Vec<LapRecord>>) -> DriverLookup<u32> {
    per_driver(laps, |r| match (r.lap_end_time, r.position) {
        (Some(t), Some(p)) => Some((t, p)),
        _ => None,
    })
}

/// Tyre fitted at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TyreState {
    pub compound: Compound,
    pub tyre_life: u32,
}

impl Default for TyreState {
    fn default() -> Self {
        Self {
            compound: Compound::Unknown,
            tyre_life: 0,
        }
    }
}

/// Driver -> (compound, tyre age), stepped at each lap completion
pub fn build_compound_lookup(laps: &BTreeMap<String, Vec<LapRecord>>) -> DriverLookup<TyreState> {
    per_driver(laps, |r| {
        r.lap_end_time.map(|t| {
            (
                t,
                TyreState {
                    compound: r.compound,
                    tyre_life: r.tyre_life,
                },
            )
        })
    })
}

/// Driver -> cumulative race time, which is the session time at each lap completion
pub fn build_cumulative_lookup(laps: &BTreeMap<String, Vec<LapRecord>>) -> DriverLookup<f64> {
    per_driver(laps, |r| r.lap_end_time.map(|t| (t, t)))
}

/// Session-wide track status changes
pub fn build_track_status_lookup(changes: &[TrackStatusChange]) -> TimeIndexedSeries<TrackStatus> {
    TimeIndexedSeries::from_unsorted(
        changes
            .iter()
            .map(|c| (c.time, TrackStatus::from_code(&c.code))),
    )
}

// ============================================================================
// Sectors
// ============================================================================

/// Sector times for one lap plus best-time flags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorTimes {
    #[serde(serialize_with = "round3_opt")]
    pub s1: Option<f64>,
    #[serde(serialize_with = "round3_opt")]
    pub s2: Option<f64>,
    #[serde(serialize_with = "round3_opt")]
    pub s3: Option<f64>,
    /// Personal best lap
    pub pb: bool,
    pub s1_best: bool,
    pub s2_best: bool,
    pub s3_best: bool,
}

/// Driver -> lap number -> sector times
///
/// Session-best flags are assigned after the full scan, within
/// [`SECTOR_BEST_TOLERANCE`] of the fastest time of each sector.
pub fn build_sector_lookup(
    laps: &BTreeMap<String, Vec<LapRecord>>,
) -> BTreeMap<String, BTreeMap<u32, SectorTimes>> {
    let best = |pick: fn(&LapRecord) -> Option<f64>| {
        laps.values()
            .flatten()
            .filter_map(pick)
            .fold(f64::INFINITY, f64::min)
    };
    let best_s1 = best(|r| r.sector1);
    let best_s2 = best(|r| r.sector2);
    let best_s3 = best(|r| r.sector3);

    let is_best = |v: Option<f64>, best: f64| v.is_some_and(|v| (v - best).abs() < SECTOR_BEST_TOLERANCE);

    laps.iter()
        .map(|(code, records)| {
            let sectors = records
                .iter()
                .map(|r| {
                    (
                        r.lap_number,
                        SectorTimes {
                            s1: r.sector1,
                            s2: r.sector2,
                            s3: r.sector3,
                            pb: r.is_personal_best,
                            s1_best: is_best(r.sector1, best_s1),
                            s2_best: is_best(r.sector2, best_s2),
                            s3_best: is_best(r.sector3, best_s3),
                        },
                    )
                })
                .collect();
            (code.clone(), sectors)
        })
        .collect()
}

// ============================================================================
// Pit stops
// ============================================================================

/// A pit lane visit; either side may be missing from the timing feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitStop {
    /// Lap on which the car entered (or, for an exit-only record, left) the pits
    pub lap: u32,
    pub in_time: Option<f64>,
    pub out_time: Option<f64>,
}

impl PitStop {
    /// Whether the car is in the pit lane at `t`
    ///
    /// An entry with no logged exit counts for `timeout` seconds.
    pub fn covers(&self, t: f64, timeout: f64) -> bool {
        match (self.in_time, self.out_time) {
            (Some(pit_in), Some(pit_out)) => pit_in <= t && t <= pit_out,
            (Some(pit_in), None) => pit_in <= t && t <= pit_in + timeout,
            _ => false,
        }
    }
}

/// Driver -> pit stops, pairing each entry with the next exit
///
/// The timing feed logs the entry on the in-lap and the exit on the
/// following out-lap, so pairs are formed across rows.
pub fn build_pit_events(laps: &BTreeMap<String, Vec<LapRecord>>) -> BTreeMap<String, Vec<PitStop>> {
    let mut events = BTreeMap::new();
    for (code, records) in laps {
        let mut stops = Vec::new();
        let mut open: Option<PitStop> = None;

        for r in records {
            // An out-lap's exit precedes the same row's entry
            if let Some(out) = r.pit_out_time {
                match open.take() {
                    Some(mut stop) if stop.in_time.is_some_and(|pit_in| out >= pit_in) => {
                        stop.out_time = Some(out);
                        stops.push(stop);
                    }
                    unmatched => {
                        stops.extend(unmatched);
                        stops.push(PitStop {
                            lap: r.lap_number,
                            in_time: None,
                            out_time: Some(out),
                        });
                    }
                }
            }
            if let Some(pit_in) = r.pit_in_time {
                stops.extend(open.take());
                open = Some(PitStop {
                    lap: r.lap_number,
                    in_time: Some(pit_in),
                    out_time: None,
                });
            }
        }
        stops.extend(open);

        if !stops.is_empty() {
            events.insert(code.clone(), stops);
        }
    }
    events
}

// ============================================================================
// Stints
// ============================================================================

/// A contiguous run of laps on one tyre set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stint {
    pub stint: u32,
    pub compound: Compound,
    pub start_lap: u32,
    pub end_lap: u32,
    pub laps: u32,
    /// Mean lap time, excluding the standing-start lap
    pub average_pace: Option<f64>,
    pub best_lap: Option<f64>,
    /// Seconds lost per lap of tyre age
    pub degradation_rate: Option<f64>,
}

/// Fewest timed laps a degradation fit is made from
pub const DEGRADATION_MIN_LAPS: usize = 3;

/// Mean of `values` to the millisecond; `None` when empty
pub fn mean_lap_time(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.into_iter().fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| round_to(sum / n as f64, 3))
}

/// Least-squares slope of lap time against tyre age
///
/// `samples` are `(tyre_life, lap_time)` pairs. `None` with fewer than
/// [`DEGRADATION_MIN_LAPS`] samples or when every sample has the same age.
pub fn degradation_rate(samples: &[(f64, f64)]) -> Option<f64> {
    if samples.len() < DEGRADATION_MIN_LAPS {
        return None;
    }
    let n = samples.len() as f64;
    let mean_x = samples.iter().map(|s| s.0).sum::<f64>() / n;
    let mean_y = samples.iter().map(|s| s.1).sum::<f64>() / n;
    let (sxx, sxy) = samples.iter().fold((0.0, 0.0), |(sxx, sxy), &(x, y)| {
        (sxx + (x - mean_x).powi(2), sxy + (x - mean_x) * (y - mean_y))
    });
    if sxx <= f64::EPSILON {
        return None;
    }
    Some(round_to(sxy / sxx, 4))
}

fn stint_from_laps(laps: &[LapRecord]) -> Option<Stint> {
    let (first, last) = (laps.first()?, laps.last()?);
    let timed: Vec<(f64, f64)> = laps
        .iter()
        .filter(|r| r.lap_number > 1)
        .filter_map(|r| r.lap_time.map(|t| (f64::from(r.tyre_life), t)))
        .collect();

    Some(Stint {
        stint: first.stint.unwrap_or(0),
        compound: first.compound,
        start_lap: first.lap_number,
        end_lap: last.lap_number,
        laps: laps.len() as u32,
        average_pace: mean_lap_time(timed.iter().map(|s| s.1)),
        best_lap: timed.iter().map(|s| s.1).min_by(f64::total_cmp).map(|t| round_to(t, 3)),
        degradation_rate: degradation_rate(&timed),
    })
}

/// One driver's stints, split wherever the stint number changes
pub fn stints_for(records: &[LapRecord]) -> Vec<Stint> {
    records
        .chunk_by(|a, b| a.stint.unwrap_or(0) == b.stint.unwrap_or(0))
        .filter_map(stint_from_laps)
        .collect()
}

/// Driver -> tyre stints in lap order
pub fn build_stints(laps: &BTreeMap<String, Vec<LapRecord>>) -> BTreeMap<String, Vec<Stint>> {
    laps.iter()
        .map(|(code, records)| (code.clone(), stints_for(records)))
        .collect()
}

// ============================================================================
// Session-wide timelines
// ============================================================================

/// Weather snapshot relative to race start
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherPoint {
    /// Seconds since race start (negative before the start)
    pub t: f64,
    pub air_temp: f64,
    pub track_temp: f64,
    pub humidity: f64,
    pub rainfall: bool,
    pub wind_speed: f64,
    pub wind_direction: f64,
}

pub fn build_weather_timeline(samples: &[WeatherSample], race_start: f64) -> Vec<WeatherPoint> {
    let mut points: Vec<WeatherPoint> = samples
        .iter()
        .filter(|w| w.time.is_finite() && w.time >= race_start - WEATHER_LEAD_IN_SECS)
        .map(|w| WeatherPoint {
            t: round_to(w.time - race_start, 1),
            air_temp: round_to(w.air_temp, 1),
            track_temp: round_to(w.track_temp, 1),
            humidity: round_to(w.humidity, 0),
            rainfall: w.rainfall,
            wind_speed: round_to(w.wind_speed, 1),
            wind_direction: round_to(w.wind_direction, 0),
        })
        .collect();
    points.sort_by(|a, b| a.t.total_cmp(&b.t));
    points
}

/// Race control message relative to race start
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceControlEntry {
    pub t: f64,
    pub category: String,
    pub message: String,
    pub flag: String,
    pub lap: u32,
}

pub fn build_race_control(messages: &[RaceControlMessage], race_start: f64) -> Vec<RaceControlEntry> {
    let mut entries: Vec<RaceControlEntry> = messages
        .iter()
        .filter_map(|m| {
            let t = finite(m.time)?;
            Some(RaceControlEntry {
                t: round_to(t - race_start, 1),
                category: m.category.clone(),
                message: m.message.clone(),
                flag: m.flag.clone().unwrap_or_default(),
                lap: m.lap.unwrap_or(0),
            })
        })
        .collect();
    entries.sort_by(|a, b| a.t.total_cmp(&b.t));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lap(driver: &str, n: u32, end: f64, pos: u32) -> LapRow {
        LapRow {
            driver: driver.to_string(),
            lap_number: n,
            time: Some(end),
            lap_start_time: Some(end - 90.0),
            position: Some(pos),
            tyre_life: Some(n),
            compound: Compound::Medium,
            stint: Some(1),
            ..Default::default()
        }
    }

    fn two_driver_laps() -> BTreeMap<String, Vec<LapRecord>> {
        lap_records(&[
            lap("VER", 2, 183.0, 1),
            lap("VER", 1, 95.0, 1),
            lap("VER", 3, 270.5, 1),
            lap("NOR", 1, 96.0, 2),
            lap("NOR", 2, 185.0, 2),
            lap("NOR", 3, 273.2, 2),
        ])
    }

    #[test]
    fn test_lap_records_grouped_and_ordered() {
        let laps = two_driver_laps();
        assert_eq!(laps.len(), 2);
        let ver: Vec<u32> = laps["VER"].iter().map(|r| r.lap_number).collect();
        assert_eq!(ver, vec![1, 2, 3]);
    }

    #[test]
    fn test_lap_records_drop_duplicates_and_nan() {
        let mut dup = lap("VER", 1, 95.0, 1);
        dup.time = Some(f64::NAN);
        let laps = lap_records(&[lap("VER", 1, 95.0, 1), dup, LapRow::default()]);
        assert_eq!(laps.len(), 1);
        assert_eq!(laps["VER"].len(), 1);
        assert_eq!(laps["VER"][0].lap_end_time, Some(95.0));
    }

    #[test]
    fn test_lap_lookup_steps_at_completion() {
        let lookup = build_lap_lookup(&two_driver_laps());
        let ver = &lookup["VER"];
        assert_eq!(ver.at(94.0), None);
        assert_eq!(ver.at(95.0), Some(&1));
        assert_eq!(ver.at(200.0), Some(&2));
    }

    #[test]
    fn test_position_lookup_skips_unclassified_laps() {
        let mut rows = vec![lap("HAM", 1, 100.0, 3), lap("HAM", 2, 190.0, 3)];
        rows[0].position = None;
        let lookup = build_position_lookup(&lap_records(&rows));
        assert_eq!(lookup["HAM"].len(), 1);
        assert_eq!(lookup["HAM"].at(150.0), None);
        assert_eq!(lookup["HAM"].at(190.0), Some(&3));
    }

    #[test]
    fn test_compound_lookup_defaults() {
        let lookup = build_compound_lookup(&two_driver_laps());
        let nor = &lookup["NOR"];
        assert_eq!(nor.at_or(10.0, TyreState::default()).compound, Compound::Unknown);
        let state = nor.at_or(190.0, TyreState::default());
        assert_eq!(state.compound, Compound::Medium);
        assert_eq!(state.tyre_life, 2);
    }

    #[test]
    fn test_cumulative_lookup_is_lap_end_time() {
        let lookup = build_cumulative_lookup(&two_driver_laps());
        assert_eq!(lookup["NOR"].at(200.0), Some(&185.0));
        assert_eq!(lookup["NOR"].last().map(|(t, _)| t), Some(273.2));
    }

    #[test]
    fn test_track_status_lookup_sorted() {
        let lookup = build_track_status_lookup(&[
            TrackStatusChange { time: 500.0, code: "1".into() },
            TrackStatusChange { time: 300.0, code: "4".into() },
        ]);
        assert_eq!(lookup.at(100.0), None);
        assert_eq!(lookup.at(350.0), Some(&TrackStatus::SafetyCar));
        assert_eq!(lookup.at(600.0), Some(&TrackStatus::Green));
    }

    #[test]
    fn test_sector_best_uses_tolerance() {
        let mut a = lap("VER", 1, 95.0, 1);
        a.sector1_time = Some(30.000);
        a.sector2_time = Some(31.0);
        let mut b = lap("NOR", 1, 96.0, 2);
        b.sector1_time = Some(30.005);
        b.sector2_time = Some(31.5);
        let mut c = lap("HAM", 1, 97.0, 3);
        c.sector1_time = Some(30.02);

        let sectors = build_sector_lookup(&lap_records(&[a, b, c]));
        assert!(sectors["VER"][&1].s1_best);
        assert!(sectors["NOR"][&1].s1_best, "within 0.01s counts as tied");
        assert!(!sectors["HAM"][&1].s1_best);
        assert!(sectors["VER"][&1].s2_best);
        assert!(!sectors["NOR"][&1].s2_best);
        assert!(!sectors["HAM"][&1].s3_best, "missing sector is never best");
    }

    #[test]
    fn test_sector_times_serialize_rounded() {
        let mut a = lap("VER", 1, 95.0, 1);
        a.sector1_time = Some(30.12345);
        let sectors = build_sector_lookup(&lap_records(&[a]));
        let v = serde_json::to_value(&sectors["VER"][&1]).unwrap();
        assert_eq!(v["s1"], 30.123);
        assert!(v["s2"].is_null());
    }

    #[test]
    fn test_pit_events_pair_in_and_out_across_laps() {
        let mut in_lap = lap("VER", 10, 1000.0, 1);
        in_lap.pit_in_time = Some(995.0);
        let mut out_lap = lap("VER", 11, 1110.0, 2);
        out_lap.pit_out_time = Some(1018.0);
        let events = build_pit_events(&lap_records(&[in_lap, out_lap]));

        assert_eq!(
            events["VER"],
            vec![PitStop { lap: 10, in_time: Some(995.0), out_time: Some(1018.0) }]
        );
    }

    #[test]
    fn test_pit_events_entry_without_exit() {
        let mut in_lap = lap("LEC", 30, 3000.0, 5);
        in_lap.pit_in_time = Some(2995.0);
        let events = build_pit_events(&lap_records(&[in_lap]));
        assert_eq!(events["LEC"][0].out_time, None);
        assert!(!events.contains_key("VER"));
    }

    #[test]
    fn test_pit_stop_covers() {
        let paired = PitStop { lap: 10, in_time: Some(100.0), out_time: Some(125.0) };
        assert!(paired.covers(110.0, 30.0));
        assert!(!paired.covers(126.0, 30.0));

        let open = PitStop { lap: 10, in_time: Some(100.0), out_time: None };
        assert!(open.covers(130.0, 30.0));
        assert!(!open.covers(130.5, 30.0));
        assert!(!open.covers(99.0, 30.0));

        let exit_only = PitStop { lap: 1, in_time: None, out_time: Some(50.0) };
        assert!(!exit_only.covers(50.0, 30.0));
    }

    #[test]
    fn test_stints_split_on_stint_number() {
        let mut rows: Vec<LapRow> = (1..=5).map(|n| lap("VER", n, 90.0 * n as f64, 1)).collect();
        for r in rows.iter_mut().skip(3) {
            r.stint = Some(2);
            r.compound = Compound::Hard;
        }
        let stints = build_stints(&lap_records(&rows));
        let ver = &stints["VER"];
        assert_eq!(ver.len(), 2);
        assert_eq!((ver[0].start_lap, ver[0].end_lap, ver[0].laps), (1, 3, 3));
        assert_eq!(ver[1].compound, Compound::Hard);
        assert_eq!((ver[1].start_lap, ver[1].end_lap), (4, 5));
        assert_eq!(ver[0].average_pace, None, "no lap times recorded");
    }

    #[test]
    fn test_stint_pace_and_degradation() {
        // Lap 1 is slow off the grid and must not count
        let times = [99.0, 90.0, 90.1, 90.2, 90.3];
        let rows: Vec<LapRow> = times
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                let mut row = lap("NOR", i as u32 + 1, 100.0 * (i + 1) as f64, 2);
                row.lap_time = Some(t);
                row
            })
            .collect();
        let stints = build_stints(&lap_records(&rows));
        let stint = &stints["NOR"][0];
        assert_eq!(stint.average_pace, Some(90.15));
        assert_eq!(stint.best_lap, Some(90.0));
        assert_eq!(stint.degradation_rate, Some(0.1));
    }

    #[test]
    fn test_degradation_needs_spread_and_samples() {
        assert_eq!(degradation_rate(&[(1.0, 90.0), (2.0, 90.5)]), None);
        assert_eq!(degradation_rate(&[(3.0, 90.0), (3.0, 90.5), (3.0, 91.0)]), None);
        assert_eq!(degradation_rate(&[(1.0, 91.0), (2.0, 90.8), (3.0, 90.6)]), Some(-0.2));
        assert_eq!(mean_lap_time(Vec::new()), None);
    }

    #[test]
    fn test_weather_timeline_relative_and_filtered() {
        let samples = vec![
            WeatherSample { time: 3000.0, air_temp: 20.04, ..Default::default() },
            WeatherSample { time: 3400.0, humidity: 55.6, ..Default::default() },
            WeatherSample { time: 3660.0, rainfall: true, ..Default::default() },
        ];
        let timeline = build_weather_timeline(&samples, 3600.0);
        assert_eq!(timeline.len(), 2, "sample 600s before the start is dropped");
        assert_eq!(timeline[0].t, -200.0);
        assert_eq!(timeline[0].humidity, 56.0);
        assert!(timeline[1].rainfall);
    }

    #[test]
    fn test_race_control_sorted_and_timed() {
        let messages = vec![
            RaceControlMessage { time: Some(3700.0), message: "SAFETY CAR DEPLOYED".into(), ..Default::default() },
            RaceControlMessage { time: None, message: "untimed".into(), ..Default::default() },
            RaceControlMessage {
                time: Some(3650.0),
                category: "Flag".into(),
                flag: Some("YELLOW".into()),
                lap: Some(1),
                ..Default::default()
            },
        ];
        let entries = build_race_control(&messages, 3600.0);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].t, 50.0);
        assert_eq!(entries[0].flag, "YELLOW");
        assert_eq!(entries[1].flag, "");
        assert_eq!(entries[1].lap, 0);
    }
}
