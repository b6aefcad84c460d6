//! Scripted sensor source for exercising the instrument without hardware.

use crate::geometry::{compose, forward_axis, lateral_axis, normalize_degrees, yaw_rotation};
use crate::estimator::FRAME_HEADING_OFFSET;
use clap::ValueEnum;
use earpilot_traits::{
    EarPilotError, HeadingSource, Quaternion, SensorSample, SensorSource, Vector3,
};
use log::debug;
use nalgebra::UnitQuaternion;
use strum_macros::{Display, EnumIter};

const TURN_BANK: f64 = 20.0;
const ROLL_IN_SECONDS: f64 = 4.0;
/// Standard-rate turn, deg/s
const TURN_RATE: f64 = 3.0;
const CLIMB_PITCH: f64 = 6.0;
const PITCH_UP_SECONDS: f64 = 3.0;
/// m/s, about 500 ft/min
const CLIMB_SPEED: f64 = 2.5;
const SWEEP_RATE: f64 = 10.0;
const ROLL_IN_SLIP: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Maneuver {
    Level,
    LeftTurn,
    RightTurn,
    Climb,
    HeadingSweep,
}

/// Attitude the script wants at a given moment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Target {
    roll: f64,
    pitch: f64,
    turn_rate: f64,
    climb_speed: f64,
    slip: f64,
}

fn ramp(t: f64, seconds: f64) -> f64 {
    (t / seconds).clamp(0.0, 1.0)
}

impl Maneuver {
    fn target(self, t: f64) -> Target {
        match self {
            Maneuver::Level => Target::default(),
            Maneuver::LeftTurn | Maneuver::RightTurn => {
                let direction = if self == Maneuver::LeftTurn { -1.0 } else { 1.0 };
                let progress = ramp(t, ROLL_IN_SECONDS);
                Target {
                    roll: direction * TURN_BANK * progress,
                    turn_rate: direction * TURN_RATE * progress,
                    // Ball slides toward the low wing until the turn settles.
                    slip: if progress < 1.0 {
                        direction * ROLL_IN_SLIP
                    } else {
                        0.0
                    },
                    ..Target::default()
                }
            }
            Maneuver::Climb => {
                let progress = ramp(t, PITCH_UP_SECONDS);
                Target {
                    pitch: CLIMB_PITCH * progress,
                    climb_speed: CLIMB_SPEED * progress,
                    ..Target::default()
                }
            }
            Maneuver::HeadingSweep => Target {
                turn_rate: SWEEP_RATE,
                ..Target::default()
            },
        }
    }
}

/// Synthesizes one frame of samples per poll at a fixed sample rate.
pub struct ScriptedSource {
    maneuver: Maneuver,
    rate: f64,
    frame: u64,
    heading: f64,
    altitude: f64,
    stopped: bool,
}

impl ScriptedSource {
    pub fn new(maneuver: Maneuver, rate: f64) -> Result<Self, EarPilotError> {
        if !(rate > 0.0 && rate.is_finite()) {
            return Err(EarPilotError::ConfigurationError(format!(
                "Sample rate {} must be positive",
                rate
            )));
        }
        Ok(ScriptedSource {
            maneuver,
            rate,
            frame: 0,
            heading: 90.0,
            altitude: 300.0,
            stopped: false,
        })
    }

    pub fn with_start(mut self, heading: f64, altitude: f64) -> Self {
        self.heading = normalize_degrees(heading);
        self.altitude = altitude;
        self
    }

    /// Seconds since the script started.
    pub fn elapsed(&self) -> f64 {
        self.frame as f64 / self.rate
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    fn orientation(&self, target: &Target) -> UnitQuaternion<f64> {
        let yaw = yaw_rotation(FRAME_HEADING_OFFSET - self.heading);
        let pitch = UnitQuaternion::from_axis_angle(&lateral_axis(), target.pitch.to_radians());
        let roll = UnitQuaternion::from_axis_angle(&forward_axis(), target.roll.to_radians());
        compose(&yaw, &compose(&pitch, &roll))
    }
}

impl SensorSource for ScriptedSource {
    fn poll(&mut self) -> Result<Vec<SensorSample>, EarPilotError> {
        if self.stopped {
            return Ok(Vec::new());
        }

        let timestamp = self.elapsed();
        let target = self.maneuver.target(timestamp);
        let q = self.orientation(&target);

        let mut samples = vec![
            SensorSample::Orientation {
                quaternion: Quaternion::new(q.w as f32, q.i as f32, q.j as f32, q.k as f32),
                timestamp,
            },
            SensorSample::Heading {
                degrees: self.heading,
                timestamp,
                source: HeadingSource::Magnetic,
            },
            SensorSample::Acceleration {
                vector: Vector3::new(
                    0.0,
                    target.slip as f32,
                    (-1.0 / target.roll.to_radians().cos()) as f32,
                ),
                timestamp,
            },
        ];

        let frames_per_second = self.rate.round().max(1.0) as u64;
        if self.frame % frames_per_second == 0 {
            samples.push(SensorSample::Altitude {
                meters: self.altitude,
                timestamp,
            });
        }

        let dt = 1.0 / self.rate;
        self.heading = normalize_degrees(self.heading + target.turn_rate * dt);
        self.altitude += target.climb_speed * dt;
        self.frame += 1;
        Ok(samples)
    }

    fn stop(&mut self) -> Result<(), EarPilotError> {
        debug!("Scripted {} source stopped at {:.1}s", self.maneuver, self.elapsed());
        self.stopped = true;
        Ok(())
    }
}
