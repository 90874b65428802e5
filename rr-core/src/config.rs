//! Replay build configuration

use crate::error::ReplayError;
use serde::{Deserialize, Serialize};

/// Default replay sample interval in seconds
pub const DEFAULT_SAMPLE_INTERVAL: f64 = 4.0;

/// Finest grid step accepted; GPS arrives at roughly 4 Hz
pub const MIN_SAMPLE_INTERVAL: f64 = 0.05;

/// Tunable race-state policy
///
/// None of these have a documented derivation; they are exposed so a
/// deployment can adjust them per circuit or session length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RacePolicy {
    /// Seconds past a non-finisher's last timing point before they show as retired
    pub retirement_grace_secs: f64,
    /// Time gaps at or below this are rendered as no gap
    pub gap_noise_floor_secs: f64,
    /// How long a car counts as in the pit lane after a pit entry with no logged exit
    pub pit_lane_timeout_secs: f64,
    /// Standings rows kept per replay frame
    pub standings_limit: usize,
    /// Padding added around the car position extents
    pub axis_padding: f64,
}

impl Default for RacePolicy {
    fn default() -> Self {
        Self {
            retirement_grace_secs: 120.0,
            gap_noise_floor_secs: 0.05,
            pit_lane_timeout_secs: 30.0,
            standings_limit: 20,
            axis_padding: 800.0,
        }
    }
}

/// Parameters for a single replay build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Seconds between grid points
    pub sample_interval: f64,
    pub policy: RacePolicy,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            policy: RacePolicy::default(),
        }
    }
}

impl ReplayConfig {
    pub fn with_interval(sample_interval: f64) -> Self {
        Self {
            sample_interval,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ReplayError> {
        if !self.sample_interval.is_finite() || self.sample_interval < MIN_SAMPLE_INTERVAL {
            return Err(ReplayError::InvalidInterval(self.sample_interval));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_values() {
        let policy = RacePolicy::default();
        assert_eq!(policy.retirement_grace_secs, 120.0);
        assert_eq!(policy.gap_noise_floor_secs, 0.05);
        assert_eq!(policy.pit_lane_timeout_secs, 30.0);
        assert_eq!(policy.standings_limit, 20);
    }

    #[test]
    fn test_policy_partial_deserialize_keeps_defaults() {
        let policy: RacePolicy = serde_json::from_str(r#"{"retirement_grace_secs": 60.0}"#).unwrap();
        assert_eq!(policy.retirement_grace_secs, 60.0);
        assert_eq!(policy.gap_noise_floor_secs, 0.05);
    }

    #[test]
    fn test_validate_rejects_bad_intervals() {
        assert!(ReplayConfig::with_interval(2.0).validate().is_ok());
        assert_eq!(
            ReplayConfig::with_interval(0.0).validate(),
            Err(ReplayError::InvalidInterval(0.0))
        );
        assert!(ReplayConfig::with_interval(-1.0).validate().is_err());
        assert!(ReplayConfig::with_interval(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_tiny_intervals() {
        assert_eq!(
            ReplayConfig::with_interval(1e-300).validate(),
            Err(ReplayError::InvalidInterval(1e-300))
        );
        assert!(ReplayConfig::with_interval(1e-6).validate().is_err());
        assert!(ReplayConfig::with_interval(MIN_SAMPLE_INTERVAL).validate().is_ok());
    }
}
