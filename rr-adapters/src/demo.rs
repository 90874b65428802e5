//! Demo source that generates a synthetic race for testing
//!
//! Simulates a short race on a closed circuit: six cars, one pit stop each,
//! a yellow flag, a safety car, a VSC, a mechanical retirement and a lapped
//! backmarker. Telemetry follows a lap profile of straights, braking zones,
//! corners and acceleration phases. Output is fully deterministic.

use anyhow::{ensure, Result};
use chrono::NaiveDate;
use rr_core::adapter::SessionSource;
use rr_core::model::*;
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use tracing::debug;

/// Session time of lights out
const RACE_START: f64 = 3600.0;

/// GPS cadence (seconds between samples)
const GPS_PERIOD: f64 = 0.25;

/// Car data cadence, deliberately unaligned with GPS
const CAR_DATA_HZ: f64 = 3.7;

const DEFAULT_LAPS: u32 = 20;

// =============================================================================
// Track definition: the segments that form a lap
// =============================================================================

#[derive(Clone, Copy, PartialEq)]
enum SegmentKind {
    Straight, // Full throttle, top speed
    Braking,  // Heavy braking into a corner
    Corner,   // Constant-ish speed cornering
    Accel,    // Accelerating out of a corner
}

#[derive(Clone, Copy)]
struct TrackSegment {
    kind: SegmentKind,
    duration: f64,     // seconds to traverse at reference pace
    target_speed: f64, // km/h at end of segment
    drs: bool,         // inside a DRS zone
}

const fn seg(kind: SegmentKind, duration: f64, target_speed: f64, drs: bool) -> TrackSegment {
    TrackSegment {
        kind,
        duration,
        target_speed,
        drs,
    }
}

/// A simple circuit: 84s lap, mix of corners and straights
const DEMO_TRACK: &[TrackSegment] = &[
    // Start/finish straight
    seg(SegmentKind::Straight, 8.0, 270.0, true),
    // T1: heavy braking into slow right-hander
    seg(SegmentKind::Braking, 3.0, 101.0, false),
    seg(SegmentKind::Corner, 4.0, 90.0, false),
    seg(SegmentKind::Accel, 3.5, 198.0, false),
    // Short straight
    seg(SegmentKind::Straight, 4.0, 223.0, false),
    // T2: medium braking into fast left-hander
    seg(SegmentKind::Braking, 2.0, 162.0, false),
    seg(SegmentKind::Corner, 3.5, 151.0, false),
    seg(SegmentKind::Accel, 3.0, 209.0, false),
    // Back straight
    seg(SegmentKind::Straight, 10.0, 288.0, true),
    // T3/T4: chicane, quick right-left
    seg(SegmentKind::Braking, 2.5, 126.0, false),
    seg(SegmentKind::Corner, 2.0, 115.0, false),
    seg(SegmentKind::Corner, 2.0, 108.0, false),
    seg(SegmentKind::Accel, 3.0, 180.0, false),
    // Medium straight
    seg(SegmentKind::Straight, 6.0, 245.0, false),
    // T5: long sweeping right
    seg(SegmentKind::Braking, 1.5, 187.0, false),
    seg(SegmentKind::Corner, 5.0, 180.0, false),
    seg(SegmentKind::Accel, 3.0, 216.0, false),
    // T6: tight hairpin left
    seg(SegmentKind::Braking, 3.5, 79.0, false),
    seg(SegmentKind::Corner, 4.5, 72.0, false),
    seg(SegmentKind::Accel, 4.0, 198.0, false),
    // Run to start/finish
    seg(SegmentKind::Straight, 6.0, 259.0, false),
];

fn track_duration() -> f64 {
    DEMO_TRACK.iter().map(|s| s.duration).sum()
}

// =============================================================================
// Lap profile derived from track position
// =============================================================================

struct LapState {
    speed: f64,
    throttle: f64,
    brake: f64,
    gear: u8,
    in_drs_zone: bool,
}

fn compute_lap_state(lap_time: f64) -> LapState {
    let t = lap_time.rem_euclid(track_duration());

    // Find current segment
    let mut elapsed = 0.0;
    let mut seg_idx = DEMO_TRACK.len() - 1;
    for (i, seg) in DEMO_TRACK.iter().enumerate() {
        if elapsed + seg.duration > t {
            seg_idx = i;
            break;
        }
        elapsed += seg.duration;
    }
    if seg_idx == DEMO_TRACK.len() - 1 {
        elapsed = track_duration() - DEMO_TRACK[seg_idx].duration;
    }

    let seg = DEMO_TRACK[seg_idx];
    let seg_t = ((t - elapsed) / seg.duration).clamp(0.0, 1.0);

    // Previous segment's target speed (for interpolation start)
    let prev_target_speed = DEMO_TRACK[(seg_idx + DEMO_TRACK.len() - 1) % DEMO_TRACK.len()].target_speed;

    let smooth_t = smoothstep(seg_t);
    let speed = lerp(prev_target_speed, seg.target_speed, smooth_t);

    let (throttle, brake) = match seg.kind {
        SegmentKind::Straight => (100.0, 0.0),
        SegmentKind::Braking => (0.0, 100.0),
        // Maintenance throttle through the corner, more toward exit
        SegmentKind::Corner => (20.0 + 30.0 * seg_t, 0.0),
        SegmentKind::Accel => (50.0 + 50.0 * smooth_t, 0.0),
    };

    LapState {
        speed,
        throttle,
        brake,
        gear: speed_to_gear(speed),
        in_drs_zone: seg.drs,
    }
}

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn speed_to_gear(kph: f64) -> u8 {
    match kph {
        x if x < 60.0 => 1,
        x if x < 100.0 => 2,
        x if x < 135.0 => 3,
        x if x < 165.0 => 4,
        x if x < 195.0 => 5,
        x if x < 225.0 => 6,
        x if x < 255.0 => 7,
        _ => 8,
    }
}

/// Simple deterministic noise from a seed
fn noise(seed: f64) -> f64 {
    let x = (seed * 12.9898 + 78.233).sin() * 43_758.547;
    x - x.floor()
}

/// Small jitter centered around 0
fn jitter(seed: f64, amplitude: f64) -> f64 {
    (noise(seed) - 0.5) * 2.0 * amplitude
}

/// Closed circuit shape in track units, parameterised by lap fraction
fn circuit_point(frac: f64) -> (f64, f64) {
    let a = frac * TAU;
    (
        3200.0 * a.cos() + 600.0 * (2.0 * a).cos(),
        1800.0 * a.sin() - 400.0 * (3.0 * a).sin(),
    )
}

// =============================================================================
// Entry list
// =============================================================================

struct Entrant {
    number: &'static str,
    code: &'static str,
    name: &'static str,
    team: &'static str,
    /// Seconds per lap slower than the reference pace
    pace: f64,
    start_compound: Compound,
}

const ENTRANTS: &[Entrant] = &[
    Entrant { number: "1", code: "VER", name: "Max Verstappen", team: "Red Bull Racing", pace: 0.0, start_compound: Compound::Medium },
    Entrant { number: "4", code: "NOR", name: "Lando Norris", team: "McLaren", pace: 0.25, start_compound: Compound::Medium },
    Entrant { number: "16", code: "LEC", name: "Charles Leclerc", team: "Ferrari", pace: 0.45, start_compound: Compound::Medium },
    Entrant { number: "63", code: "RUS", name: "George Russell", team: "Mercedes", pace: 0.7, start_compound: Compound::Medium },
    Entrant { number: "14", code: "ALO", name: "Fernando Alonso", team: "Aston Martin", pace: 0.9, start_compound: Compound::Medium },
    Entrant { number: "23", code: "ALB", name: "Alexander Albon", team: "Williams", pace: 5.5, start_compound: Compound::Soft },
];

/// Index into `ENTRANTS` of the car that suffers an engine failure
const RETIREE: usize = 4;

const SAFETY_CAR_LAP_LOSS: f64 = 12.0;
const IN_LAP_LOSS: f64 = 6.0;
const OUT_LAP_LOSS: f64 = 16.0;

// =============================================================================
// Race plan
// =============================================================================

struct LapPlan {
    number: u32,
    start: f64,
    end: f64,
    pit_in: Option<f64>,
    pit_out: Option<f64>,
    compound: Compound,
    tyre_life: u32,
    stint: u32,
}

impl LapPlan {
    fn duration(&self) -> f64 {
        self.end - self.start
    }
}

struct CarPlan {
    entrant: &'static Entrant,
    laps: Vec<LapPlan>,
    retired: bool,
    /// Last GPS/car data timestamp
    signal_end: f64,
}

impl CarPlan {
    /// Lap fraction at `t`, continuing at the last lap's pace past the final lap
    fn track_fraction(&self, t: f64) -> f64 {
        let idx = self.laps.partition_point(|l| l.end <= t);
        match self.laps.get(idx) {
            Some(lap) => ((t - lap.start) / lap.duration()).clamp(0.0, 1.0),
            None => match self.laps.last() {
                Some(last) => ((t - last.end) / last.duration()).fract(),
                None => 0.0,
            },
        }
    }

    fn lap_at(&self, t: f64) -> Option<&LapPlan> {
        self.laps.iter().find(|l| l.start <= t && t < l.end)
    }

    fn in_pit_lane(&self, t: f64) -> bool {
        self.laps.windows(2).any(|w| match (w[0].pit_in, w[1].pit_out) {
            (Some(pit_in), Some(pit_out)) => pit_in <= t && t <= pit_out,
            _ => false,
        })
    }
}

/// Race-wide timeline events, as session times
struct Incidents {
    safety_car_laps: (u32, u32),
    yellow: Option<(f64, f64)>,
    safety_car: Option<(f64, f64)>,
    vsc: Option<(f64, f64, f64)>,
}

/// Deterministic synthetic race
pub struct DemoSource {
    name: String,
    laps: u32,
}

impl DemoSource {
    pub fn new() -> Self {
        Self::with_laps(DEFAULT_LAPS)
    }

    /// A shorter or longer race; incidents scale with race length
    pub fn with_laps(laps: u32) -> Self {
        Self {
            name: "demo".to_string(),
            laps,
        }
    }

    pub fn laps(&self) -> u32 {
        self.laps
    }

    fn pit_lap(&self, car: usize) -> u32 {
        (self.laps * 2 / 5).max(2) + car as u32 % 3
    }

    fn retire_after(&self) -> Option<u32> {
        (self.laps >= 5).then_some(self.laps * 3 / 5)
    }

    fn plan_car(&self, car: usize, sc_laps: (u32, u32)) -> CarPlan {
        let entrant = &ENTRANTS[car];
        let pit_lap = self.pit_lap(car);
        let retire_after = if car == RETIREE { self.retire_after() } else { None };
        let last_lap = retire_after.unwrap_or(self.laps);

        let mut laps = Vec::with_capacity(last_lap as usize);
        let mut start = RACE_START;
        for n in 1..=last_lap {
            let mut lap_time = track_duration() + entrant.pace + jitter(car as f64 * 31.0 + n as f64, 0.35);
            if n == 1 {
                // Standing start, staggered by grid slot
                lap_time += 3.0 + 0.35 * car as f64;
            }
            if (sc_laps.0..=sc_laps.1).contains(&n) {
                lap_time += SAFETY_CAR_LAP_LOSS;
            }

            let pitted = pit_lap < self.laps;
            let mut pit_in = None;
            let mut pit_out = None;
            if pitted && n == pit_lap {
                lap_time += IN_LAP_LOSS;
                pit_in = Some(start + lap_time - 3.0);
            }
            if pitted && n == pit_lap + 1 {
                lap_time += OUT_LAP_LOSS;
                pit_out = Some(start + 19.0);
            }

            let (stint, compound, tyre_life) = if pitted && n > pit_lap {
                (2, Compound::Hard, n - pit_lap)
            } else {
                (1, entrant.start_compound, n)
            };

            laps.push(LapPlan {
                number: n,
                start,
                end: start + lap_time,
                pit_in,
                pit_out,
                compound,
                tyre_life,
                stint,
            });
            start += lap_time;
        }

        CarPlan {
            entrant,
            signal_end: start,
            laps,
            retired: retire_after.is_some(),
        }
    }

    fn plan_race(&self) -> (Vec<CarPlan>, f64, Incidents) {
        let sc_first = self.laps / 4 + 1;
        let safety_car_laps = (sc_first, sc_first + 1);
        let mut cars: Vec<CarPlan> = (0..ENTRANTS.len())
            .map(|i| self.plan_car(i, safety_car_laps))
            .collect();

        // Chequered flag falls when the first car completes the final lap
        let race_end = cars
            .iter()
            .filter(|c| !c.retired)
            .filter_map(|c| c.laps.last().map(|l| l.end))
            .fold(f64::INFINITY, f64::min);

        for car in &mut cars {
            if car.retired {
                // Coasts for a while on the lap it fails, then the signal stops
                car.signal_end += 25.0;
                continue;
            }
            // Everyone else finishes the lap they are on at the flag
            car.laps.retain(|l| l.number == 1 || l.start < race_end);
            car.signal_end = car.laps.last().map_or(race_end, |l| l.end) + 20.0;
        }

        let leader = &cars[0];
        let leader_lap = |n: u32| leader.laps.iter().find(|l| l.number == n);
        let yellow = leader_lap(3).map(|l| (l.start + 30.0, l.start + 45.0));
        let safety_car = match (leader_lap(safety_car_laps.0), leader_lap(safety_car_laps.1)) {
            (Some(first), Some(last)) => Some((first.start + 5.0, last.end)),
            _ => None,
        };
        let vsc = leader_lap(self.laps * 3 / 4)
            .filter(|l| l.number > safety_car_laps.1)
            .map(|l| (l.start + 20.0, l.start + 50.0, l.start + 60.0));

        let incidents = Incidents {
            safety_car_laps,
            yellow,
            safety_car,
            vsc,
        };
        (cars, race_end, incidents)
    }

    fn generate(&self) -> Session {
        let (cars, race_end, incidents) = self.plan_race();

        let mut session = Session {
            info: SessionInfo {
                event_name: "Demo Grand Prix".to_string(),
                circuit_name: "Demo Circuit".to_string(),
                country: "Demoland".to_string(),
                year: 2024,
                round: 1,
                date: NaiveDate::from_ymd_opt(2024, 3, 2),
            },
            circuit: Some(demo_circuit()),
            ..Default::default()
        };

        session.laps = lap_table(&cars);
        session.results = results_table(&cars, self.laps);
        for car in &cars {
            let number = car.entrant.number.to_string();
            session.positions.insert(number.clone(), gps_samples(car));
            session.car_data.insert(number, car_samples(car, &incidents));
        }
        session.track_status = track_status_log(&incidents);
        session.weather = weather_samples(race_end);
        session.race_control = race_control_log(&cars, race_end, self.laps, &incidents);

        debug!(
            "Demo race generated: {} laps, {} lap rows, chequered flag at {:.1}s",
            self.laps,
            session.laps.len(),
            race_end
        );
        session
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSource for DemoSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Session> {
        ensure!(self.laps >= 3, "demo race needs at least 3 laps, got {}", self.laps);
        Ok(self.generate())
    }
}

// =============================================================================
// Table builders
// =============================================================================

fn lap_table(cars: &[CarPlan]) -> Vec<LapRow> {
    let mut rows = Vec::new();
    for (car_idx, car) in cars.iter().enumerate() {
        let mut best = f64::INFINITY;
        for lap in &car.laps {
            let lap_time = lap.duration();
            let seed = car_idx as f64 * 101.0 + lap.number as f64;
            let s1 = lap_time * 0.32 + jitter(seed * 1.1, 0.08);
            let s2 = lap_time * 0.35 + jitter(seed * 1.2, 0.08);
            let s3 = lap_time - s1 - s2;

            let clean = lap.number > 1 && lap.pit_in.is_none() && lap.pit_out.is_none();
            let is_personal_best = clean && lap_time < best;
            if is_personal_best {
                best = lap_time;
            }

            // Classification at the line: rank among cars that completed this lap
            let position = cars
                .iter()
                .filter_map(|other| other.laps.iter().find(|l| l.number == lap.number))
                .filter(|other| other.end < lap.end)
                .count() as u32
                + 1;

            rows.push(LapRow {
                driver: car.entrant.code.to_string(),
                driver_number: car.entrant.number.to_string(),
                lap_number: lap.number,
                time: Some(lap.end),
                lap_start_time: Some(lap.start),
                lap_time: Some(lap_time),
                compound: lap.compound,
                tyre_life: Some(lap.tyre_life),
                stint: Some(lap.stint),
                position: Some(position),
                // No first-sector time on a standing start
                sector1_time: (lap.number > 1).then_some(s1),
                sector2_time: Some(s2),
                sector3_time: Some(s3),
                is_personal_best,
                pit_in_time: lap.pit_in,
                pit_out_time: lap.pit_out,
            });
        }
    }
    rows
}

fn results_table(cars: &[CarPlan], total_laps: u32) -> Vec<ResultRow> {
    let mut order: Vec<&CarPlan> = cars.iter().collect();
    order.sort_by(|a, b| {
        let key = |c: &CarPlan| (c.retired, std::cmp::Reverse(c.laps.len()));
        let end = |c: &CarPlan| c.laps.last().map_or(f64::INFINITY, |l| l.end);
        key(*a).cmp(&key(*b)).then(end(*a).total_cmp(&end(*b)))
    });

    const POINTS: [f64; 10] = [25.0, 18.0, 15.0, 12.0, 10.0, 8.0, 6.0, 4.0, 2.0, 1.0];
    let grid_order = |code: &str| ENTRANTS.iter().position(|e| e.code == code).map(|i| i as u32 + 1);

    order
        .iter()
        .enumerate()
        .map(|(i, car)| {
            let completed = car.laps.len() as u32;
            let status = if car.retired {
                "Engine".to_string()
            } else {
                match total_laps.saturating_sub(completed) {
                    0 => "Finished".to_string(),
                    1 => "+1 Lap".to_string(),
                    n => format!("+{n} Laps"),
                }
            };
            ResultRow {
                driver_number: car.entrant.number.to_string(),
                abbreviation: car.entrant.code.to_string(),
                full_name: car.entrant.name.to_string(),
                team_name: car.entrant.team.to_string(),
                headshot_url: None,
                status,
                position: Some(i as u32 + 1),
                grid_position: grid_order(car.entrant.code),
                points: if car.retired { 0.0 } else { POINTS.get(i).copied().unwrap_or(0.0) },
            }
        })
        .collect()
}

fn gps_samples(car: &CarPlan) -> Vec<PositionSample> {
    let seed = car.entrant.pace * 1000.0;
    let count = ((car.signal_end - RACE_START) / GPS_PERIOD) as usize;
    (0..=count)
        .map(|k| {
            let t = RACE_START + k as f64 * GPS_PERIOD + jitter(seed + k as f64, 0.03).abs();
            let (x, y) = circuit_point(car.track_fraction(t));
            PositionSample {
                session_time: t,
                x: x + jitter(seed + k as f64 * 1.7, 1.5),
                y: y + jitter(seed + k as f64 * 1.9, 1.5),
            }
        })
        .collect()
}

fn car_samples(car: &CarPlan, incidents: &Incidents) -> Vec<CarSample> {
    let count = ((car.signal_end - RACE_START) * CAR_DATA_HZ) as usize;
    let (sc_first, sc_last) = incidents.safety_car_laps;

    (0..=count)
        .map(|k| {
            let t = RACE_START + k as f64 / CAR_DATA_HZ;
            let lap = car.lap_at(t);
            let lap_number = lap.map_or(0, |l| l.number);
            let under_sc = (sc_first..=sc_last).contains(&lap_number);

            if car.in_pit_lane(t) {
                return CarSample {
                    session_time: t,
                    speed: Some(80.0),
                    throttle: Some(25.0),
                    brake: Some(0.0),
                    gear: Some(3.0),
                    drs: Some(1.0),
                };
            }

            let state = compute_lap_state(car.track_fraction(t) * track_duration());
            let speed = if under_sc { state.speed * 0.6 } else { state.speed };
            let drs_open = state.in_drs_zone && lap_number >= 3 && !under_sc;
            CarSample {
                session_time: t,
                speed: Some((speed + jitter(t, 1.5)).max(0.0)),
                throttle: Some(state.throttle),
                brake: Some(state.brake),
                gear: Some(f64::from(if under_sc { speed_to_gear(speed) } else { state.gear })),
                drs: Some(if drs_open { 12.0 } else { 1.0 }),
            }
        })
        .collect()
}

fn demo_circuit() -> CircuitInfo {
    let total = track_duration();
    let mut corners = Vec::new();
    let mut elapsed = 0.0;
    for seg in DEMO_TRACK {
        if seg.kind == SegmentKind::Corner {
            let (x, y) = circuit_point((elapsed + seg.duration / 2.0) / total);
            corners.push(Corner {
                number: corners.len() as u32 + 1,
                x,
                y,
            });
        }
        elapsed += seg.duration;
    }
    CircuitInfo {
        rotation: Some(92.0),
        corners,
    }
}

fn track_status_log(incidents: &Incidents) -> Vec<TrackStatusChange> {
    let change = |time: f64, code: &str| TrackStatusChange {
        time,
        code: code.to_string(),
    };
    let mut log = vec![change(RACE_START - 900.0, "1")];
    if let Some((from, to)) = incidents.yellow {
        log.extend([change(from, "2"), change(to, "1")]);
    }
    if let Some((from, to)) = incidents.safety_car {
        log.extend([change(from, "4"), change(to, "1")]);
    }
    if let Some((from, ending, to)) = incidents.vsc {
        log.extend([change(from, "6"), change(ending, "7"), change(to, "1")]);
    }
    log
}

fn weather_samples(race_end: f64) -> Vec<WeatherSample> {
    let first = RACE_START - 900.0;
    let count = ((race_end + 300.0 - first) / 60.0) as usize;
    (0..=count)
        .map(|k| {
            let phase = k as f64 / 20.0;
            WeatherSample {
                time: first + k as f64 * 60.0,
                air_temp: 24.0 + 0.6 * phase.sin(),
                track_temp: 38.5 + 1.2 * phase.sin() + jitter(k as f64, 0.2),
                humidity: 52.0 + 3.0 * phase.cos(),
                rainfall: false,
                wind_speed: (2.0 + jitter(k as f64 * 1.3, 0.6)).max(0.0),
                wind_direction: (200.0 + 15.0 * phase.sin()).rem_euclid(360.0),
            }
        })
        .collect()
}

fn race_control_log(cars: &[CarPlan], race_end: f64, total_laps: u32, incidents: &Incidents) -> Vec<RaceControlMessage> {
    let msg = |time: f64, category: &str, message: String, flag: Option<&str>, lap: u32| RaceControlMessage {
        time: Some(time),
        category: category.to_string(),
        message,
        flag: flag.map(str::to_string),
        lap: Some(lap),
    };

    let mut log = vec![msg(RACE_START - 900.0, "Flag", "GREEN LIGHT - PIT EXIT OPEN".into(), Some("GREEN"), 1)];
    if let Some((from, to)) = incidents.yellow {
        log.push(msg(from, "Flag", "YELLOW IN TRACK SECTOR 7".into(), Some("YELLOW"), 3));
        log.push(msg(to, "Flag", "CLEAR IN TRACK SECTOR 7".into(), Some("CLEAR"), 3));
    }
    if let Some((from, to)) = incidents.safety_car {
        let (first, last) = incidents.safety_car_laps;
        log.push(msg(from, "SafetyCar", "SAFETY CAR DEPLOYED".into(), None, first));
        log.push(msg(to - 40.0, "SafetyCar", "SAFETY CAR IN THIS LAP".into(), None, last));
        log.push(msg(to, "Flag", "TRACK CLEAR".into(), Some("GREEN"), last + 1));
    }
    if let Some(car) = cars.iter().find(|c| c.retired) {
        let lap = car.laps.last().map_or(1, |l| l.number + 1);
        log.push(msg(
            car.signal_end,
            "Other",
            format!("CAR {} ({}) STOPPED ON TRACK", car.entrant.number, car.entrant.code),
            None,
            lap,
        ));
    }
    if let Some((from, ending, _)) = incidents.vsc {
        let lap = total_laps * 3 / 4;
        log.push(msg(from, "SafetyCar", "VIRTUAL SAFETY CAR DEPLOYED".into(), None, lap));
        log.push(msg(ending, "SafetyCar", "VIRTUAL SAFETY CAR ENDING".into(), None, lap));
    }
    log.push(msg(race_end, "Flag", "CHEQUERED FLAG".into(), Some("CHEQUERED"), total_laps));
    log
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_duration() {
        assert!((track_duration() - 84.0).abs() < 1e-9);
    }

    #[test]
    fn test_lap_state_profile() {
        let straight = compute_lap_state(7.0);
        assert_eq!(straight.throttle, 100.0);
        assert!(straight.in_drs_zone);
        let braking = compute_lap_state(9.0);
        assert_eq!(braking.brake, 100.0);
        assert!(!braking.in_drs_zone);
        assert!(braking.gear < straight.gear);
    }

    #[test]
    fn test_circuit_is_closed() {
        let (x0, y0) = circuit_point(0.0);
        let (x1, y1) = circuit_point(1.0);
        assert!((x0 - x1).abs() < 1e-6 && (y0 - y1).abs() < 1e-6);
    }

    #[test]
    fn test_speed_to_gear() {
        assert_eq!(speed_to_gear(50.0), 1);
        assert_eq!(speed_to_gear(150.0), 4);
        assert_eq!(speed_to_gear(300.0), 8);
    }

    #[test]
    fn test_plan_car_pit_stop() {
        let source = DemoSource::new();
        let car = source.plan_car(0, (6, 7));
        let pit_lap = source.pit_lap(0) as usize;
        assert!(car.laps[pit_lap - 1].pit_in.is_some());
        assert!(car.laps[pit_lap].pit_out.is_some());
        assert_eq!(car.laps[pit_lap].compound, Compound::Hard);
        assert_eq!(car.laps[pit_lap].tyre_life, 1);
        assert!(car.laps.windows(2).all(|w| w[0].end == w[1].start));
    }

    #[test]
    fn test_track_fraction_continues_past_last_lap() {
        let source = DemoSource::with_laps(3);
        let car = source.plan_car(0, (9, 9));
        let last = car.laps.last().unwrap();
        assert_eq!(car.track_fraction(last.start), 0.0);
        let beyond = car.track_fraction(last.end + last.duration() / 2.0);
        assert!((beyond - 0.5).abs() < 1e-9);
    }
}
