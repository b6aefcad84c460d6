use serde::Serialize;
use std::fmt;

/// Snapshot of everything the instrument knows. Rebuilt in full whenever an
/// input changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AttitudeState {
    /// Degrees, nose up positive
    pub pitch: f64,
    /// Degrees, right wing down positive
    pub roll: f64,
    /// Degrees turned right since the last zero, in (-180, 180]
    pub yaw: f64,
    /// Degrees clockwise from north, in [0, 360)
    pub heading: f64,
    /// Feet per minute
    pub climb_rate: f64,
    /// Negative when the ball is left of center
    pub coordination: f64,
    /// Feet
    pub altitude: f64,
    /// Seconds, newest input
    pub timestamp: f64,
}

impl fmt::Display for AttitudeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pitch={:+6.1} roll={:+6.1} yaw={:+6.1} hdg={:5.1} vs={:+7.0}fpm ball={:+5.2} alt={:.0}ft",
            self.pitch,
            self.roll,
            self.yaw,
            self.heading,
            self.climb_rate,
            self.coordination,
            self.altitude
        )
    }
}
