//! Threshold-based operating state table

use crate::StateError;
use serde::{Deserialize, Serialize};
use signal_series::SignalSeries;
use std::fmt;

/// Operating state of the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatingState {
    #[serde(rename = "Off")]
    Off,
    #[serde(rename = "On")]
    On,
    #[serde(rename = "Standby")]
    Standby,
    #[serde(rename = "Normal Production")]
    NormalProduction,
    #[serde(rename = "Abnormal Production")]
    AbnormalProduction,
}

impl OperatingState {
    /// Display label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::On => "On",
            Self::Standby => "Standby",
            Self::NormalProduction => "Normal Production",
            Self::AbnormalProduction => "Abnormal Production",
        }
    }
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bounds (inclusive) of each powered state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateThresholds {
    /// Highest reading still considered idle-on
    pub on_max: f64,
    /// Highest reading still considered standby
    pub standby_max: f64,
    /// Highest reading still considered normal production
    pub normal_max: f64,
}

impl Default for StateThresholds {
    fn default() -> Self {
        Self {
            on_max: 20.0,
            standby_max: 30.0,
            normal_max: 150.0,
        }
    }
}

impl StateThresholds {
    /// Bounds must be positive and strictly increasing
    pub fn validate(&self) -> Result<(), StateError> {
        let ordered = 0.0 < self.on_max && self.on_max < self.standby_max && self.standby_max < self.normal_max;
        if !ordered {
            return Err(StateError::InvalidConfig(format!(
                "state thresholds must satisfy 0 < on_max < standby_max < normal_max, got {} / {} / {}",
                self.on_max, self.standby_max, self.normal_max
            )));
        }
        Ok(())
    }
}

/// Stateless lookup from reading to operating state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RuleBasedStateDetector {
    thresholds: StateThresholds,
}

impl RuleBasedStateDetector {
    pub fn new(thresholds: StateThresholds) -> Result<Self, StateError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &StateThresholds {
        &self.thresholds
    }

    /// State for a single reading
    ///
    /// Anything outside the powered bands, including negative readings, is
    /// abnormal production.
    pub fn classify(&self, value: f64) -> OperatingState {
        let t = &self.thresholds;
        if value == 0.0 {
            OperatingState::Off
        } else if value > 0.0 && value <= t.on_max {
            OperatingState::On
        } else if value > t.on_max && value <= t.standby_max {
            OperatingState::Standby
        } else if value > t.standby_max && value <= t.normal_max {
            OperatingState::NormalProduction
        } else {
            OperatingState::AbnormalProduction
        }
    }

    /// State for every sample, in order
    pub fn classify_states(&self, series: &SignalSeries) -> Vec<OperatingState> {
        series.iter().map(|s| self.classify(s.value)).collect()
    }
}
