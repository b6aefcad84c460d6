use super::{CueChannel, CueChannelState};
use crate::geometry::{circular_difference, normalize_degrees};
use crate::state::AttitudeState;
use earpilot_traits::{Announcer, VoiceChannel};
use log::trace;
use strum_macros::{Display, EnumIter};

const MIN_CHANGE: f64 = 2.0;
const SMALL_CHANGE: f64 = 5.0;
const MEDIUM_CHANGE: f64 = 10.0;
const MEDIUM_WINDOW: f64 = 1.0;
const PAN_SCALE: f64 = 1.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Cardinal {
    North,
    East,
    South,
    West,
}

impl Cardinal {
    /// 90°-wide sector containing `heading`.
    pub fn from_heading(heading: f64) -> Cardinal {
        let heading = normalize_degrees(heading);
        if !(45.0..315.0).contains(&heading) {
            Cardinal::North
        } else if heading < 135.0 {
            Cardinal::East
        } else if heading < 225.0 {
            Cardinal::South
        } else {
            Cardinal::West
        }
    }

    pub fn center(self) -> f64 {
        match self {
            Cardinal::North => 0.0,
            Cardinal::East => 90.0,
            Cardinal::South => 180.0,
            Cardinal::West => 270.0,
        }
    }
}

/// Names the cardinal sector on the secondary voice, panned toward where that
/// direction lies relative to the nose.
#[derive(Debug, Clone)]
pub struct HeadingChannel {
    idle_interval: f64,
    state: CueChannelState,
}

impl HeadingChannel {
    pub fn new(idle_interval: f64) -> Self {
        HeadingChannel {
            idle_interval,
            state: CueChannelState::default(),
        }
    }

    fn suppressed(&self, delta: f64, elapsed: f64) -> bool {
        let delta = delta.abs();
        delta < MIN_CHANGE
            || (delta < SMALL_CHANGE && elapsed < self.idle_interval)
            || (delta < MEDIUM_CHANGE && elapsed < MEDIUM_WINDOW)
    }
}

impl CueChannel for HeadingChannel {
    fn update(
        &mut self,
        state: &AttitudeState,
        now: f64,
        idle: bool,
        announcer: &mut dyn Announcer,
    ) -> bool {
        let heading = state.heading;

        let last_announced_at = match self.state.last_announced_at {
            Some(at) => at,
            None if !idle => {
                trace!("Heading baseline primed at {:.1}", heading);
                self.state.last_bucket = heading;
                self.state.last_magnitude = heading;
                self.state.last_announced_at = Some(now);
                return false;
            }
            None => f64::NEG_INFINITY,
        };

        let delta = circular_difference(heading, self.state.last_bucket);
        if !idle && self.suppressed(delta, now - last_announced_at) {
            return false;
        }

        let cardinal = Cardinal::from_heading(heading);
        let offset = circular_difference(heading, cardinal.center());
        trace!("Heading cue: {} at {:.1}, idle={}", cardinal, heading, idle);
        announcer.speak(
            &cardinal.to_string(),
            -offset * PAN_SCALE,
            0.0,
            VoiceChannel::Secondary,
        );

        self.state.last_bucket = heading;
        self.state.last_magnitude = heading;
        self.state.last_announced_at = Some(now);
        true
    }

    fn reset(&mut self) {
        self.state = CueChannelState::default();
    }

    fn state(&self) -> &CueChannelState {
        &self.state
    }
}
