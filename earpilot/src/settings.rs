//! Read-only instrument configuration.

use bitflags::bitflags;
use earpilot_traits::{EarPilotError, HeadingSource};
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;

pub const MAX_MOUNT_OFFSET: f64 = 45.0;
pub const MAX_BANK_STEP: f64 = 45.0;
pub const MIN_PITCH_SCALE: f64 = 0.5;
pub const MAX_PITCH_SCALE: f64 = 45.0;

bitflags! {
    /// Cue channels that may announce.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Channels: u8 {
        const BANK = 0b001;
        const PITCH = 0b010;
        const HEADING = 0b100;
    }
}

impl Default for Channels {
    fn default() -> Self {
        Channels::all()
    }
}

/// Wording and sign choices for bank callouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuePolicy {
    /// Appended to the bank number while returning toward level
    pub leveling_mark: String,
    /// Appended while banking further away from level
    pub departing_mark: String,
    /// Flip the sign of the slip pitch shift
    pub invert_slip_pitch: bool,
}

impl Default for CuePolicy {
    fn default() -> Self {
        CuePolicy {
            leveling_mark: "?".to_string(),
            departing_mark: ".".to_string(),
            invert_slip_pitch: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Degrees clockwise from the aircraft's nose to the device's forward axis
    pub mount_offset: f64,
    /// Bank bucket size (deg)
    pub bank_step: f64,
    /// Degrees of pitch per tone step
    pub pitch_scale: f64,
    pub channels: Channels,
    pub heading_source: HeadingSource,
    /// Seconds between idle re-announcements
    pub idle_interval: f64,
    pub climb_beta: f64,
    pub coordination_beta: f64,
    pub cue_policy: CuePolicy,
    /// Passed through to the announcer
    pub voice: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            mount_offset: 0.0,
            bank_step: 5.0,
            pitch_scale: 3.0,
            channels: Channels::default(),
            heading_source: HeadingSource::default(),
            idle_interval: 2.0,
            climb_beta: 0.3,
            coordination_beta: 0.1,
            cue_policy: CuePolicy::default(),
            voice: "Alex".to_string(),
        }
    }
}

impl Settings {
    /// Reads a JSON settings file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Settings, EarPilotError> {
        let json = read_to_string(path)?;
        Settings::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Settings, EarPilotError> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| EarPilotError::ConfigurationError(format!("Invalid settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, EarPilotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EarPilotError::ConfigurationError(format!("Cannot encode settings: {}", e)))
    }

    pub fn validate(&self) -> Result<(), EarPilotError> {
        if !self.mount_offset.is_finite() || self.mount_offset.abs() > MAX_MOUNT_OFFSET {
            return Err(EarPilotError::ConfigurationError(format!(
                "mount_offset {} outside ±{}°",
                self.mount_offset, MAX_MOUNT_OFFSET
            )));
        }
        if !(self.bank_step > 0.0 && self.bank_step <= MAX_BANK_STEP) {
            return Err(EarPilotError::ConfigurationError(format!(
                "bank_step {} outside (0, {}]",
                self.bank_step, MAX_BANK_STEP
            )));
        }
        if !(MIN_PITCH_SCALE..=MAX_PITCH_SCALE).contains(&self.pitch_scale) {
            return Err(EarPilotError::ConfigurationError(format!(
                "pitch_scale {} outside [{}, {}]",
                self.pitch_scale, MIN_PITCH_SCALE, MAX_PITCH_SCALE
            )));
        }
        if !(self.idle_interval > 0.0 && self.idle_interval.is_finite()) {
            return Err(EarPilotError::ConfigurationError(format!(
                "idle_interval {} must be positive",
                self.idle_interval
            )));
        }
        for (name, beta) in [
            ("climb_beta", self.climb_beta),
            ("coordination_beta", self.coordination_beta),
        ] {
            if !(beta > 0.0 && beta <= 1.0) {
                return Err(EarPilotError::ConfigurationError(format!(
                    "{} {} outside (0, 1]",
                    name, beta
                )));
            }
        }
        Ok(())
    }
}
