//! Live state resolver
//!
//! Answers "what did the race look like at session time `t`" from the
//! step-function lookups: each driver's lap, classification, tyre and pit
//! state, the track status, and a fully ordered standings table with gaps.
//!
//! `LiveState` is usable on its own (point queries straight from a
//! [`Session`]) and is also what the replay builder calls once per frame.
//! Lap-indexed queries ("as of lap N") go through its [`LapHistory`].

use crate::config::RacePolicy;
use crate::history::{LapHistory, TimedLap, TyreChange};
use crate::lookups::{
    build_compound_lookup, build_cumulative_lookup, build_lap_lookup, build_pit_events,
    build_position_lookup, build_track_status_lookup, lap_records, DriverLookup, LapRecord,
    PitStop, TyreState,
};
use crate::model::{
    Compound, DriverFrame, RetirementRecord, Session, StandingEntry, TrackStatus, WeatherSample,
};
use crate::roster::{build_retirements, DriverRoster};
use crate::series::TimeIndexedSeries;
use crate::units::format_lap_time;
use serde::Serialize;
use std::collections::BTreeMap;

/// Sort key position for unclassified drivers
const UNCLASSIFIED_RANK: u32 = 99;

/// Recent laps listed in a driver summary
const RECENT_LAPS: usize = 3;

/// Places gained or lost since the start before a driver counts as a mover
const MOVER_THRESHOLD: i64 = 2;

/// Render a time gap, or "" when it is within the noise floor
fn format_gap(secs: f64, noise_floor: f64) -> String {
    if secs > noise_floor {
        format!("+{:.1}s", secs.abs())
    } else {
        String::new()
    }
}

fn format_lap_deficit(laps: u32) -> String {
    if laps > 1 {
        format!("+{laps} LAPS")
    } else {
        format!("+{laps} LAP")
    }
}

/// Working row while a standings table is assembled
struct Row {
    entry: StandingEntry,
    cum_time: Option<f64>,
}

/// One driver's state at the end of a lap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverInfo {
    pub code: String,
    pub full_name: String,
    pub team: String,
    pub color: String,
    /// Lap the figures below come from
    pub lap: u32,
    pub position: Option<u32>,
    pub grid_position: Option<u32>,
    pub compound: Compound,
    pub tyre_life: u32,
    pub stint: Option<u32>,
    pub total_pit_stops: usize,
    pub recent_lap_times: Vec<TimedLap>,
    pub best_lap: Option<f64>,
    pub best_lap_str: Option<String>,
}

/// Track status change mapped to the lap it happened on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEvent {
    pub lap: u32,
    pub status: TrackStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoppedCar {
    pub driver: String,
    pub last_lap: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionMover {
    pub driver: String,
    pub grid: u32,
    pub current: u32,
    /// Places gained; negative when places were lost
    pub change: i64,
}

/// Key events of the race up to a lap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceSummary {
    pub lap: u32,
    pub total_laps: u32,
    pub pit_stops: Vec<TyreChange>,
    /// Safety car, VSC and red flag periods
    pub neutralisations: Vec<StatusEvent>,
    /// Drivers with no record for the lap
    pub retirements: Vec<StoppedCar>,
    pub position_movers: Vec<PositionMover>,
}

/// Point-in-time race state over one session's lookups
#[derive(Debug, Clone)]
pub struct LiveState {
    roster: DriverRoster,
    laps: DriverLookup<u32>,
    positions: DriverLookup<u32>,
    tyres: DriverLookup<TyreState>,
    cumulative: DriverLookup<f64>,
    track_status: TimeIndexedSeries<TrackStatus>,
    pit_events: BTreeMap<String, Vec<PitStop>>,
    retirements: BTreeMap<String, RetirementRecord>,
    /// Lap number -> session time the first car completed it
    lap_completions: BTreeMap<u32, f64>,
    history: LapHistory,
    /// Finite-time samples in time order
    weather: Vec<WeatherSample>,
    policy: RacePolicy,
}

impl LiveState {
    pub fn from_session(session: &Session, policy: RacePolicy) -> Self {
        Self::build(session, &lap_records(&session.laps), policy)
    }

    /// Build from already-grouped lap records
    pub fn build(
        session: &Session,
        laps: &BTreeMap<String, Vec<LapRecord>>,
        policy: RacePolicy,
    ) -> Self {
        let mut lap_completions: BTreeMap<u32, f64> = BTreeMap::new();
        for r in laps.values().flatten() {
            if let Some(end) = r.lap_end_time {
                let slot = lap_completions.entry(r.lap_number).or_insert(end);
                *slot = slot.min(end);
            }
        }

        let mut weather: Vec<WeatherSample> = session
            .weather
            .iter()
            .filter(|w| w.time.is_finite())
            .cloned()
            .collect();
        weather.sort_by(|a, b| a.time.total_cmp(&b.time));

        Self {
            roster: DriverRoster::from_results(&session.results),
            laps: build_lap_lookup(laps),
            positions: build_position_lookup(laps),
            tyres: build_compound_lookup(laps),
            cumulative: build_cumulative_lookup(laps),
            track_status: build_track_status_lookup(&session.track_status),
            pit_events: build_pit_events(laps),
            retirements: build_retirements(&session.results),
            lap_completions,
            history: LapHistory::new(laps.clone()),
            weather,
            policy,
        }
    }

    pub fn roster(&self) -> &DriverRoster {
        &self.roster
    }

    pub fn history(&self) -> &LapHistory {
        &self.history
    }

    pub fn pit_events(&self) -> &BTreeMap<String, Vec<PitStop>> {
        &self.pit_events
    }

    pub fn retirements(&self) -> &BTreeMap<String, RetirementRecord> {
        &self.retirements
    }

    // === Per-driver point queries ===

    /// Lap the driver is on; lap 1 until their first completion
    pub fn current_lap(&self, code: &str, t: f64) -> u32 {
        self.laps
            .get(code)
            .and_then(|s| s.at(t))
            .copied()
            .filter(|&lap| lap > 0)
            .unwrap_or(1)
    }

    /// Last recorded classification; `None` before the driver's first timed lap
    pub fn current_position(&self, code: &str, t: f64) -> Option<u32> {
        self.positions.get(code).and_then(|s| s.at(t)).copied()
    }

    pub fn current_tyre(&self, code: &str, t: f64) -> TyreState {
        self.tyres
            .get(code)
            .map(|s| s.at_or(t, TyreState::default()))
            .unwrap_or_default()
    }

    pub fn current_compound(&self, code: &str, t: f64) -> (Compound, u32) {
        let tyre = self.current_tyre(code, t);
        (tyre.compound, tyre.tyre_life)
    }

    /// Track status at `t`; green before the first recorded change
    pub fn current_track_status(&self, t: f64) -> TrackStatus {
        self.track_status.at_or(t, TrackStatus::Green)
    }

    /// Cumulative race time held from the driver's last lap completion at or before `t`
    pub fn cumulative_time(&self, code: &str, t: f64) -> Option<f64> {
        self.cumulative.get(code).and_then(|s| s.at(t)).copied()
    }

    /// Driver's final cumulative time data point
    pub fn last_known_time(&self, code: &str) -> Option<f64> {
        self.cumulative.get(code).and_then(|s| s.last()).map(|(_, &v)| v)
    }

    /// A non-finisher shows as retired once `t` is past their last timing
    /// point by more than the grace window
    pub fn is_retired(&self, code: &str, t: f64) -> bool {
        if !self.retirements.contains_key(code) {
            return false;
        }
        self.last_known_time(code)
            .is_some_and(|last| t > last + self.policy.retirement_grace_secs)
    }

    pub fn is_in_pit(&self, code: &str, t: f64) -> bool {
        self.pit_events.get(code).is_some_and(|stops| {
            stops
                .iter()
                .any(|stop| stop.covers(t, self.policy.pit_lane_timeout_secs))
        })
    }

    // === Standings ===

    /// Full, ordered standings at session time `t`
    ///
    /// Speeds come from `frame_drivers` when given (0 for cars not in the
    /// frame). Active classified drivers come first by position, then
    /// unclassified ones, then retired drivers.
    pub fn standings_at_time(&self, t: f64, frame_drivers: Option<&[DriverFrame]>) -> Vec<StandingEntry> {
        let speed_of = |code: &str| {
            frame_drivers
                .and_then(|drivers| drivers.iter().find(|d| d.code == code))
                .map_or(0.0, |d| d.speed)
        };

        let mut rows: Vec<Row> = self
            .roster
            .drivers()
            .iter()
            .map(|driver| {
                let code = driver.code.as_str();
                let tyre = self.current_tyre(code, t);
                Row {
                    entry: StandingEntry {
                        position: self.current_position(code, t),
                        code: driver.code.clone(),
                        team: driver.team.clone(),
                        lap: self.current_lap(code, t),
                        compound: tyre.compound,
                        tyre_life: tyre.tyre_life,
                        speed: speed_of(code),
                        gap: String::new(),
                        interval: String::new(),
                        retired: self.is_retired(code, t),
                        in_pit: self.is_in_pit(code, t),
                    },
                    cum_time: self.cumulative_time(code, t),
                }
            })
            .collect();

        // Stable sort keeps roster order among equal keys
        rows.sort_by_key(|r| {
            (
                r.entry.retired,
                r.entry.position.is_none(),
                r.entry.position.unwrap_or(UNCLASSIFIED_RANK),
            )
        });

        self.assign_gaps(&mut rows);
        rows.into_iter().map(|r| r.entry).collect()
    }

    fn assign_gaps(&self, rows: &mut [Row]) {
        let Some(leader) = rows.first() else {
            return;
        };
        let leader_lap = leader.entry.lap;
        let leader_cum = leader.cum_time;
        let floor = self.policy.gap_noise_floor_secs;
        let mut prev_cum = leader_cum;

        for (i, row) in rows.iter_mut().enumerate() {
            let entry = &mut row.entry;
            if i == 0 || entry.position.is_none() {
                // leader and unclassified rows carry no gap
            } else if entry.lap < leader_lap {
                entry.gap = format_lap_deficit(leader_lap - entry.lap);
                entry.interval = entry.gap.clone();
            } else if let (Some(cum), Some(lead)) = (row.cum_time, leader_cum) {
                entry.gap = format_gap(cum - lead, floor);
                entry.interval = match prev_cum {
                    Some(prev) => format_gap(cum - prev, floor),
                    None => entry.gap.clone(),
                };
            }

            if row.cum_time.is_some() {
                prev_cum = row.cum_time;
            }
        }
    }

    /// Session time at which the first car completed `lap`
    pub fn lap_completion_time(&self, lap: u32) -> Option<f64> {
        self.lap_completions.get(&lap).copied()
    }

    /// Standings as of lap `lap`, built from each driver's own lap record
    ///
    /// Only drivers who completed the lap appear, so every row reports
    /// `lap`; gaps are the differences in completion time. `None` when no
    /// car completed that lap.
    pub fn standings_at_lap(&self, lap: u32) -> Option<Vec<StandingEntry>> {
        let mut rows: Vec<Row> = self
            .roster
            .drivers()
            .iter()
            .filter_map(|driver| {
                let record = self.history.record(&driver.code, lap)?;
                let end = record.lap_end_time?;
                Some(Row {
                    entry: StandingEntry {
                        position: record.position,
                        code: driver.code.clone(),
                        team: driver.team.clone(),
                        lap,
                        compound: record.compound,
                        tyre_life: record.tyre_life,
                        speed: 0.0,
                        gap: String::new(),
                        interval: String::new(),
                        retired: false,
                        in_pit: self.is_in_pit(&driver.code, end),
                    },
                    cum_time: Some(end),
                })
            })
            .collect();
        if rows.is_empty() {
            return None;
        }

        rows.sort_by_key(|r| (r.entry.position.is_none(), r.entry.position.unwrap_or(UNCLASSIFIED_RANK)));
        self.assign_gaps(&mut rows);
        Some(rows.into_iter().map(|r| r.entry).collect())
    }

    // === Lap-indexed queries ===

    /// Classification per lap for every driver, laps 1 to `as_of_lap`
    pub fn position_history(&self, as_of_lap: u32) -> BTreeMap<String, Vec<Option<u32>>> {
        self.roster
            .drivers()
            .iter()
            .map(|d| (d.code.clone(), self.history.positions(&d.code, as_of_lap)))
            .collect()
    }

    /// Driver summary at `as_of_lap`, or at their last lap before it
    pub fn driver_info(&self, code: &str, as_of_lap: u32) -> Option<DriverInfo> {
        let laps = self.history.laps_up_to(code, as_of_lap);
        let current = laps.last()?;
        let identity = self.roster.get(code);
        let best = self.history.lap_times(code, as_of_lap, None);

        Some(DriverInfo {
            code: code.to_string(),
            full_name: identity.map_or_else(|| code.to_string(), |d| d.full_name.clone()),
            team: self.roster.team(code).to_string(),
            color: self.roster.color(code).to_string(),
            lap: current.lap_number,
            position: current.position,
            grid_position: identity.and_then(|d| d.grid_position),
            compound: current.compound,
            tyre_life: current.tyre_life,
            stint: current.stint,
            total_pit_stops: self.history.pit_entries(code, as_of_lap),
            recent_lap_times: self.history.lap_times(code, as_of_lap, Some(RECENT_LAPS)).laps,
            best_lap: best.best_lap,
            best_lap_str: best.best_lap.map(format_lap_time),
        })
    }

    /// Lap whose first completion is nearest to session time `t`
    fn lap_at(&self, t: f64) -> Option<u32> {
        self.lap_completions
            .iter()
            .min_by(|a, b| (a.1 - t).abs().total_cmp(&(b.1 - t).abs()))
            .map(|(&lap, _)| lap)
    }

    /// Weather sample nearest to the first completion of `lap`
    pub fn weather_at_lap(&self, lap: u32) -> Option<&WeatherSample> {
        let t = self.lap_completion_time(lap)?;
        let i = self.weather.partition_point(|w| w.time < t);
        let after = self.weather.get(i);
        let before = i.checked_sub(1).and_then(|j| self.weather.get(j));
        match (before, after) {
            (Some(b), Some(a)) if t - b.time <= a.time - t => Some(b),
            (_, Some(a)) => Some(a),
            (b, None) => b,
        }
    }

    /// Pit stops, neutralisations, stopped cars and big movers up to `as_of_lap`
    pub fn race_summary(&self, as_of_lap: u32) -> RaceSummary {
        let drivers = self.roster.drivers();

        let pit_stops = drivers
            .iter()
            .flat_map(|d| self.history.tyre_changes(&d.code, as_of_lap))
            .collect();

        let neutralisations = self
            .track_status
            .iter()
            .filter(|(_, status)| {
                matches!(status, TrackStatus::SafetyCar | TrackStatus::Vsc | TrackStatus::RedFlag)
            })
            .filter_map(|(t, status)| {
                let lap = self.lap_at(t)?;
                (lap <= as_of_lap).then(|| StatusEvent { lap, status: status.clone() })
            })
            .collect();

        let retirements = drivers
            .iter()
            .filter_map(|d| {
                let last_lap = self.history.laps_up_to(&d.code, as_of_lap).last()?.lap_number;
                (last_lap < as_of_lap).then(|| StoppedCar {
                    driver: d.code.clone(),
                    last_lap,
                })
            })
            .collect();

        let mut position_movers: Vec<PositionMover> = self
            .standings_at_lap(as_of_lap)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                let grid = self.roster.get(&entry.code)?.grid_position?;
                let current = entry.position?;
                let change = i64::from(grid) - i64::from(current);
                (change.abs() >= MOVER_THRESHOLD).then(|| PositionMover {
                    driver: entry.code,
                    grid,
                    current,
                    change,
                })
            })
            .collect();
        position_movers.sort_by_key(|m| std::cmp::Reverse(m.change.abs()));

        RaceSummary {
            lap: as_of_lap,
            total_laps: self.history.total_laps(),
            pit_stops,
            neutralisations,
            retirements,
            position_movers,
        }
    }

    /// Leader's lap for an already-sorted standings table
    pub fn leader_lap(standings: &[StandingEntry]) -> u32 {
        standings.first().map_or(1, |s| s.lap)
    }
}
