use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::sync::{mpsc, PoisonError};
use strum_macros::{Display, EnumIter, EnumString};

// --- Basic Types ---
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vector3 { x, y, z }
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector3(x={}, y={}, z={})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Quaternion { w, x, y, z }
    }

    pub fn identity() -> Self {
        Quaternion { w: 1.0, x: 0.0, y: 0.0, z: 0.0 }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::identity()
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quaternion(w={}, x={}, y={}, z={})", self.w, self.x, self.y, self.z)
    }
}

// --- Sensor Samples ---

/// Where a heading sample came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HeadingSource {
    /// Magnetic compass heading (deg)
    #[default]
    Magnetic,
    /// Satellite course over ground (deg)
    Satellite,
    /// Heading derived from the orientation stream itself
    Attitude,
}

/// The sensor streams the core consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum SensorKind {
    Orientation,
    Heading,
    Acceleration,
    Altitude,
}

/// One sample pushed by a sensor source. Timestamps are seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorSample {
    /// Device attitude in the world frame (unit quaternion, WXYZ)
    Orientation { quaternion: Quaternion, timestamp: f64 },
    /// Heading in degrees, clockwise from north
    Heading { degrees: f64, timestamp: f64, source: HeadingSource },
    /// Gravity plus user acceleration in the device frame (g)
    Acceleration { vector: Vector3, timestamp: f64 },
    /// Altitude above the reference datum (m)
    Altitude { meters: f64, timestamp: f64 },
    /// The stream stopped delivering; the core resets it to neutral
    Unavailable(SensorKind),
}

impl SensorSample {
    pub fn kind(&self) -> SensorKind {
        match self {
            SensorSample::Orientation { .. } => SensorKind::Orientation,
            SensorSample::Heading { .. } => SensorKind::Heading,
            SensorSample::Acceleration { .. } => SensorKind::Acceleration,
            SensorSample::Altitude { .. } => SensorKind::Altitude,
            SensorSample::Unavailable(kind) => *kind,
        }
    }
}

// --- Announcements ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VoiceChannel {
    /// Bank callouts
    #[default]
    Primary,
    /// Heading callouts, kept apart from bank so they can overlap
    Secondary,
}

/// Timbre a tone is played with, picked from the sign of its pitch index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum ToneTimbre {
    Ascending,
    Descending,
    Neutral,
}

impl ToneTimbre {
    pub fn for_step(step: i32) -> Self {
        match step.signum() {
            1 => ToneTimbre::Ascending,
            -1 => ToneTimbre::Descending,
            _ => ToneTimbre::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Announcement {
    Speech {
        text: String,
        /// Degrees clockwise from straight ahead
        pan: f64,
        pitch_shift: f64,
        voice: VoiceChannel,
    },
    Tone {
        pitch_index: i32,
    },
}

// --- Standard Error Type ---
#[derive(Debug)]
pub enum EarPilotError {
    /// Invalid, unreadable or unparsable settings
    ConfigurationError(String),
    /// A sensor source failed to deliver samples
    SourceError(String),
    /// Error related to multithreading locks (e.g., poisoned)
    LockError(String),
    /// Error sending a command to the instrument thread
    CommandSendError(String),
    /// Catch-all for other errors
    Other(String),
}

impl fmt::Display for EarPilotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EarPilotError::ConfigurationError(s) => write!(f, "Configuration error: {}", s),
            EarPilotError::SourceError(s) => write!(f, "Sensor source error: {}", s),
            EarPilotError::LockError(s) => write!(f, "Lock error: {}", s),
            EarPilotError::CommandSendError(s) => write!(f, "Command send error: {}", s),
            EarPilotError::Other(s) => write!(f, "Other EarPilot error: {}", s),
        }
    }
}

impl StdError for EarPilotError {}

impl From<std::io::Error> for EarPilotError {
    fn from(err: std::io::Error) -> Self {
        EarPilotError::ConfigurationError(format!("I/O error: {}", err))
    }
}

impl<T> From<PoisonError<T>> for EarPilotError {
    fn from(err: PoisonError<T>) -> Self {
        EarPilotError::LockError(format!("Lock poisoned: {}", err))
    }
}

impl<T> From<mpsc::SendError<T>> for EarPilotError {
    fn from(err: mpsc::SendError<T>) -> Self {
        EarPilotError::CommandSendError(format!("Failed to send command: {}", err))
    }
}

// --- Collaborator Traits ---

pub trait SensorSource {
    /// Drains the samples that arrived since the previous poll.
    fn poll(&mut self) -> Result<Vec<SensorSample>, EarPilotError>;

    fn stop(&mut self) -> Result<(), EarPilotError>;
}

/// Receives announcement requests. Calls are fire-and-forget.
pub trait Announcer {
    fn speak(&mut self, text: &str, pan: f64, pitch_shift: f64, voice: VoiceChannel);

    fn tone(&mut self, pitch_index: i32);
}

impl Announcer for Vec<Announcement> {
    fn speak(&mut self, text: &str, pan: f64, pitch_shift: f64, voice: VoiceChannel) {
        self.push(Announcement::Speech {
            text: text.to_string(),
            pan,
            pitch_shift,
            voice,
        });
    }

    fn tone(&mut self, pitch_index: i32) {
        self.push(Announcement::Tone { pitch_index });
    }
}

impl<A: Announcer + ?Sized> Announcer for Box<A> {
    fn speak(&mut self, text: &str, pan: f64, pitch_shift: f64, voice: VoiceChannel) {
        (**self).speak(text, pan, pitch_shift, voice)
    }

    fn tone(&mut self, pitch_index: i32) {
        (**self).tone(pitch_index)
    }
}
