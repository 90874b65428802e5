//! Driver roster: identities, team colours and retirements from the results table

use crate::model::{DriverIdentity, ResultRow, RetirementRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// Colour used for teams missing from the palette
pub const FALLBACK_TEAM_COLOR: &str = "#888888";

const TEAM_COLORS: &[(&str, &str)] = &[
    ("McLaren", "#FF8000"),
    ("Red Bull Racing", "#3671C6"),
    ("Mercedes", "#27F4D2"),
    ("Ferrari", "#E8002D"),
    ("Aston Martin", "#229971"),
    ("Alpine", "#0093CC"),
    ("Williams", "#64C4FF"),
    ("Racing Bulls", "#6692FF"),
    ("Kick Sauber", "#52E252"),
    ("Haas F1 Team", "#B6BABD"),
];

pub fn team_color(team: &str) -> &'static str {
    TEAM_COLORS
        .iter()
        .find(|(name, _)| *name == team)
        .map(|(_, color)| *color)
        .unwrap_or(FALLBACK_TEAM_COLOR)
}

/// Whether a results status string is a finishing classification
///
/// Lapped finishers carry statuses like "+1 Lap" and count as finished.
pub fn is_finishing_status(status: &str) -> bool {
    let status = status.trim();
    status.is_empty() || status == "Finished" || status.contains("Lap")
}

/// Stable per-session driver mappings
#[derive(Debug, Clone, Default, Serialize)]
pub struct DriverRoster {
    /// Drivers in results order
    drivers: Vec<DriverIdentity>,
    #[serde(skip)]
    by_code: BTreeMap<String, usize>,
    #[serde(skip)]
    by_number: BTreeMap<String, usize>,
}

impl DriverRoster {
    pub fn from_results(results: &[ResultRow]) -> Self {
        let mut roster = DriverRoster::default();
        for row in results.iter().filter(|r| !r.abbreviation.is_empty()) {
            if roster.by_code.contains_key(&row.abbreviation) {
                continue;
            }
            let idx = roster.drivers.len();
            roster.by_code.insert(row.abbreviation.clone(), idx);
            if !row.driver_number.is_empty() {
                roster.by_number.insert(row.driver_number.clone(), idx);
            }
            roster.drivers.push(DriverIdentity {
                car_number: row.driver_number.clone(),
                code: row.abbreviation.clone(),
                full_name: if row.full_name.is_empty() {
                    row.abbreviation.clone()
                } else {
                    row.full_name.clone()
                },
                team: row.team_name.clone(),
                grid_position: row.grid_position,
                headshot_url: row.headshot_url.clone().filter(|u| !u.is_empty()),
                color: team_color(&row.team_name).to_string(),
            });
        }
        roster
    }

    pub fn drivers(&self) -> &[DriverIdentity] {
        &self.drivers
    }

    pub fn get(&self, code: &str) -> Option<&DriverIdentity> {
        self.by_code.get(code).map(|&i| &self.drivers[i])
    }

    pub fn by_car_number(&self, number: &str) -> Option<&DriverIdentity> {
        self.by_number.get(number).map(|&i| &self.drivers[i])
    }

    pub fn team(&self, code: &str) -> &str {
        self.get(code).map(|d| d.team.as_str()).unwrap_or("")
    }

    pub fn color(&self, code: &str) -> &str {
        self.get(code)
            .map(|d| d.color.as_str())
            .unwrap_or(FALLBACK_TEAM_COLOR)
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

/// Non-finishers from the final classification, keyed by driver code
pub fn build_retirements(results: &[ResultRow]) -> BTreeMap<String, RetirementRecord> {
    results
        .iter()
        .filter(|r| !r.abbreviation.is_empty() && !is_finishing_status(&r.status))
        .map(|r| {
            (
                r.abbreviation.clone(),
                RetirementRecord {
                    driver_code: r.abbreviation.clone(),
                    status_reason: r.status.trim().to_string(),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(number: &str, code: &str, team: &str, status: &str) -> ResultRow {
        ResultRow {
            driver_number: number.to_string(),
            abbreviation: code.to_string(),
            team_name: team.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_team_color_palette_and_fallback() {
        assert_eq!(team_color("Ferrari"), "#E8002D");
        assert_eq!(team_color("Haas F1 Team"), "#B6BABD");
        assert_eq!(team_color("Minardi"), FALLBACK_TEAM_COLOR);
    }

    #[test]
    fn test_roster_mappings() {
        let roster = DriverRoster::from_results(&[
            result("1", "VER", "Red Bull Racing", "Finished"),
            result("4", "NOR", "McLaren", "Finished"),
            result("99", "", "Nobody", "Finished"),
        ]);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.by_car_number("4").map(|d| d.code.as_str()), Some("NOR"));
        assert_eq!(roster.team("VER"), "Red Bull Racing");
        assert_eq!(roster.color("NOR"), "#FF8000");
        assert_eq!(roster.color("XXX"), FALLBACK_TEAM_COLOR);
        assert!(roster.get("VER").and_then(|d| d.headshot_url.as_ref()).is_none());
        assert_eq!(roster.get("NOR").map(|d| d.full_name.as_str()), Some("NOR"), "name falls back to code");
    }

    #[test]
    fn test_finishing_statuses() {
        assert!(is_finishing_status("Finished"));
        assert!(is_finishing_status("+1 Lap"));
        assert!(is_finishing_status("+3 Laps"));
        assert!(is_finishing_status(""));
        assert!(!is_finishing_status("Engine"));
        assert!(!is_finishing_status("Collision damage"));
    }

    #[test]
    fn test_build_retirements() {
        let retirements = build_retirements(&[
            result("1", "VER", "Red Bull Racing", "Finished"),
            result("16", "LEC", "Ferrari", "Engine"),
            result("22", "TSU", "Racing Bulls", "+1 Lap"),
        ]);
        assert_eq!(retirements.len(), 1);
        assert_eq!(retirements["LEC"].status_reason, "Engine");
    }
}
