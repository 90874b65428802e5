//! Race session data model
//!
//! Two halves live here:
//! - the raw, read-only session tables a [`SessionSource`](crate::SessionSource)
//!   hands to the engine (`Session` and its row types), and
//! - the replay output records the engine produces (`ReplayFrame`,
//!   `DriverFrame`, `StandingEntry`) plus identity and retirement records.
//!
//! All times are session-relative seconds (elapsed since session start).
//! Optional columns are `Option<T>`; rows missing a required value are
//! dropped by the lookup builders rather than defaulted.

use crate::units::round1;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

// === Session (input) ===

/// One race session's full dataset, as loaded by a session source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub info: SessionInfo,

    /// One row per driver per lap
    pub laps: Vec<LapRow>,

    /// Final classification, one row per entrant
    pub results: Vec<ResultRow>,

    /// GPS samples keyed by car number
    pub positions: BTreeMap<String, Vec<PositionSample>>,

    /// Car telemetry samples keyed by car number
    pub car_data: BTreeMap<String, Vec<CarSample>>,

    /// Track status change log
    pub track_status: Vec<TrackStatusChange>,

    pub weather: Vec<WeatherSample>,

    pub race_control: Vec<RaceControlMessage>,

    /// Static circuit geometry; `None` when the provider has none
    pub circuit: Option<CircuitInfo>,
}

impl Session {
    /// Highest lap number present in the lap table
    pub fn total_laps(&self) -> u32 {
        self.laps.iter().map(|l| l.lap_number).max().unwrap_or(0)
    }

    /// Car number for a driver code, resolved through the results table
    pub fn car_number(&self, code: &str) -> Option<&str> {
        self.results
            .iter()
            .find(|r| r.abbreviation == code)
            .map(|r| r.driver_number.as_str())
    }
}

/// Event metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInfo {
    pub event_name: String,
    pub circuit_name: String,
    pub country: String,
    pub year: i32,
    pub round: u32,
    pub date: Option<NaiveDate>,
}

/// One row of the lap table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LapRow {
    /// Three-letter driver code
    pub driver: String,
    pub driver_number: String,
    pub lap_number: u32,

    /// Session time at which the lap was completed
    pub time: Option<f64>,
    pub lap_start_time: Option<f64>,
    pub lap_time: Option<f64>,

    pub compound: Compound,
    pub tyre_life: Option<u32>,
    pub stint: Option<u32>,

    /// Classification position at the end of this lap
    pub position: Option<u32>,

    pub sector1_time: Option<f64>,
    pub sector2_time: Option<f64>,
    pub sector3_time: Option<f64>,
    pub is_personal_best: bool,

    pub pit_in_time: Option<f64>,
    pub pit_out_time: Option<f64>,
}

/// One row of the final results table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultRow {
    pub driver_number: String,
    pub abbreviation: String,
    pub full_name: String,
    pub team_name: String,
    pub headshot_url: Option<String>,
    /// "Finished", "+1 Lap", or a retirement reason
    pub status: String,
    pub position: Option<u32>,
    pub grid_position: Option<u32>,
    pub points: f64,
}

/// Raw GPS sample at native cadence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub session_time: f64,
    pub x: f64,
    pub y: f64,
}

/// Raw car telemetry sample; any channel may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarSample {
    pub session_time: f64,
    /// km/h
    pub speed: Option<f64>,
    /// 0-100
    pub throttle: Option<f64>,
    /// 0-100
    pub brake: Option<f64>,
    pub gear: Option<f64>,
    /// Raw DRS state; values >= 10 mean the flap is open
    pub drs: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackStatusChange {
    pub time: f64,
    /// Numeric status code as published ("1" green, "4" safety car, ...)
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSample {
    pub time: f64,
    pub air_temp: f64,
    pub track_temp: f64,
    pub humidity: f64,
    pub rainfall: bool,
    pub wind_speed: f64,
    pub wind_direction: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceControlMessage {
    pub time: Option<f64>,
    pub category: String,
    pub message: String,
    pub flag: Option<String>,
    pub lap: Option<u32>,
}

/// Static circuit geometry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitInfo {
    /// Published map rotation in degrees
    pub rotation: Option<f64>,
    pub corners: Vec<Corner>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Corner {
    pub number: u32,
    pub x: f64,
    pub y: f64,
}

/// Tyre compound
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Compound::Soft => "SOFT",
            Compound::Medium => "MEDIUM",
            Compound::Hard => "HARD",
            Compound::Intermediate => "INTERMEDIATE",
            Compound::Wet => "WET",
            Compound::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Track status, decoded from the published status code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TrackStatus {
    /// Race start is assumed green-flag
    #[default]
    Green,
    Yellow,
    SafetyCar,
    RedFlag,
    Vsc,
    VscEnding,
    /// Unrecognised code, reported verbatim
    Other(String),
}

impl TrackStatus {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" => TrackStatus::Green,
            "2" => TrackStatus::Yellow,
            "4" => TrackStatus::SafetyCar,
            "5" => TrackStatus::RedFlag,
            "6" => TrackStatus::Vsc,
            "7" => TrackStatus::VscEnding,
            other => TrackStatus::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            TrackStatus::Green => "1",
            TrackStatus::Yellow => "2",
            TrackStatus::SafetyCar => "4",
            TrackStatus::RedFlag => "5",
            TrackStatus::Vsc => "6",
            TrackStatus::VscEnding => "7",
            TrackStatus::Other(code) => code,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TrackStatus::Green => "Green",
            TrackStatus::Yellow => "Yellow",
            TrackStatus::SafetyCar => "Safety Car",
            TrackStatus::RedFlag => "Red Flag",
            TrackStatus::Vsc => "VSC",
            TrackStatus::VscEnding => "VSC Ending",
            TrackStatus::Other(code) => code,
        }
    }
}

/// Serialized as its display name
impl Serialize for TrackStatus {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}

// === Derived records ===

/// Stable per-session driver identity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverIdentity {
    pub car_number: String,
    pub code: String,
    pub full_name: String,
    pub team: String,
    pub grid_position: Option<u32>,
    pub headshot_url: Option<String>,
    /// Team colour as `#RRGGBB`
    pub color: String,
}

/// A classified non-finisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetirementRecord {
    pub driver_code: String,
    pub status_reason: String,
}

/// One car's interpolated state in a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverFrame {
    pub code: String,
    #[serde(serialize_with = "round1")]
    pub x: f64,
    #[serde(serialize_with = "round1")]
    pub y: f64,
    pub speed: f64,
    pub throttle: f64,
    pub brake: f64,
    pub gear: i32,
    pub drs: i32,
    pub color: String,
}

/// One row of a standings snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingEntry {
    /// Last recorded classification; `None` before the driver's first timed lap
    pub position: Option<u32>,
    pub code: String,
    pub team: String,
    pub lap: u32,
    pub compound: Compound,
    pub tyre_life: u32,
    pub speed: f64,
    /// Gap to the leader: "", "+1.2s" or "+1 LAP"
    pub gap: String,
    /// Gap to the car ahead, same format
    pub interval: String,
    pub retired: bool,
    pub in_pit: bool,
}

/// Terminal replay unit, addressed by `frame_index`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayFrame {
    pub frame_index: usize,
    /// Seconds since race start
    #[serde(serialize_with = "round1")]
    pub elapsed_time: f64,
    /// Current lap of the race leader
    pub leader_lap: u32,
    pub track_status: TrackStatus,
    pub drivers: Vec<DriverFrame>,
    pub standings: Vec<StandingEntry>,
}

// === Field masking for selective output ===

/// Specifies which optional frame sections to include in serialized output
///
/// `frame_index`, `elapsed_time`, `leader_lap` and `track_status` are
/// always present; `drivers` and `standings` are opt-in when a mask is given.
#[derive(Debug, Clone, Default)]
pub struct FrameMask {
    fields: HashSet<String>,
}

impl FrameMask {
    /// Create a mask from a comma-separated list of field names
    pub fn parse(fields: &str) -> Self {
        let fields: HashSet<String> = fields
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self { fields }
    }

    /// Check if a field should be included
    pub fn includes(&self, field: &str) -> bool {
        self.fields.contains(&field.to_lowercase())
    }
}

impl FromStr for FrameMask {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl ReplayFrame {
    /// Serialize this frame to a JSON value respecting the given mask
    pub fn to_value_filtered(&self, mask: Option<&FrameMask>) -> serde_json::Result<serde_json::Value> {
        let Some(mask) = mask else {
            return serde_json::to_value(self);
        };

        let mut map = serde_json::Map::new();
        map.insert("frame_index".to_string(), serde_json::to_value(self.frame_index)?);
        map.insert(
            "elapsed_time".to_string(),
            serde_json::to_value(crate::units::round_to(self.elapsed_time, 1))?,
        );
        map.insert("leader_lap".to_string(), serde_json::to_value(self.leader_lap)?);
        map.insert("track_status".to_string(), serde_json::to_value(&self.track_status)?);

        if mask.includes("drivers") {
            map.insert("drivers".to_string(), serde_json::to_value(&self.drivers)?);
        }
        if mask.includes("standings") {
            map.insert("standings".to_string(), serde_json::to_value(&self.standings)?);
        }

        Ok(serde_json::Value::Object(map))
    }

    /// Serialize this frame to a JSON string respecting the given mask
    pub fn to_json_filtered(&self, mask: Option<&FrameMask>) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_value_filtered(mask)?)
    }
}
