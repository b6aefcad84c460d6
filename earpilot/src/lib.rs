//! Attitude estimation and spoken cue scheduling for an audio flight
//! instrument.
//!
//! Samples from a [`SensorSource`] flow through a [`FlightTracker`], which
//! owns the estimator and filters and publishes an [`AttitudeState`]. A
//! [`CueScheduler`] turns that state into speech and tone requests for an
//! [`Announcer`]. [`Instrument`] wires the pieces together and
//! [`InstrumentThread`] runs one in the background.

pub mod announcer;
pub mod coordination;
pub mod cues;
pub mod estimator;
pub mod geometry;
pub mod heading;
pub mod instrument;
pub mod settings;
pub mod sim;
pub mod state;
pub mod tracker;
pub mod vertical;

#[cfg(feature = "imu")]
pub mod imu_source;

pub use earpilot_traits::{
    Announcement, Announcer, EarPilotError, HeadingSource, SensorKind, SensorSample,
    SensorSource, ToneTimbre, VoiceChannel,
};

pub use announcer::LogAnnouncer;
pub use coordination::CoordinationFilter;
pub use cues::{Axis, CueChannelState, CueScheduler, Trend};
pub use estimator::{Attitude, AttitudeEstimator};
pub use heading::HeadingResolver;
pub use instrument::{Instrument, InstrumentCommand, InstrumentThread};
pub use settings::{Channels, CuePolicy, Settings};
pub use sim::{Maneuver, ScriptedSource};
pub use state::AttitudeState;
pub use tracker::FlightTracker;
pub use vertical::VerticalRateFilter;

#[cfg(feature = "imu")]
pub use imu_source::ImuSensorSource;
