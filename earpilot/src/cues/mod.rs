//! Announcement scheduling.
//!
//! Each monitored axis owns a [`CueChannel`] that decides on its own whether a
//! new value is worth saying. A shared idle timer walks the enabled channels
//! round-robin and asks one of them to repeat itself whenever nothing has been
//! said for a full interval.

mod bank;
mod heading;
mod pitch;

pub use bank::BankChannel;
pub use heading::{Cardinal, HeadingChannel};
pub use pitch::PitchChannel;

use crate::settings::{Channels, Settings};
use crate::state::AttitudeState;
use earpilot_traits::Announcer;
use log::trace;
use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Axis {
    Bank,
    Pitch,
    Heading,
}

impl Axis {
    fn flag(self) -> Channels {
        match self {
            Axis::Bank => Channels::BANK,
            Axis::Pitch => Channels::PITCH,
            Axis::Heading => Channels::HEADING,
        }
    }

    fn from_phase(phase: usize) -> Axis {
        match phase % 3 {
            0 => Axis::Bank,
            1 => Axis::Pitch,
            _ => Axis::Heading,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
pub enum Trend {
    Leveling,
    #[default]
    Departing,
}

/// Memory of what a channel last said.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CueChannelState {
    /// Quantized value last announced: bank bucket, pitch step or heading
    pub last_bucket: f64,
    /// Signed degrees last announced: spoken bank, pitch of the tone step or
    /// spoken heading
    pub last_magnitude: f64,
    pub last_trend: Trend,
    pub last_announced_at: Option<f64>,
}

pub trait CueChannel {
    /// Announces if the channel's rules say so. `idle` asks for an
    /// unconditional repeat of the current value. Returns whether anything
    /// was announced.
    fn update(
        &mut self,
        state: &AttitudeState,
        now: f64,
        idle: bool,
        announcer: &mut dyn Announcer,
    ) -> bool;

    fn reset(&mut self);

    fn state(&self) -> &CueChannelState;
}

#[derive(Debug, Clone)]
struct IdleTimer {
    interval: f64,
    phase: usize,
    next_due: Option<f64>,
}

impl IdleTimer {
    fn new(interval: f64) -> Self {
        IdleTimer {
            interval,
            phase: 0,
            next_due: None,
        }
    }

    fn schedule(&mut self, now: f64) {
        self.next_due = Some(now + self.interval);
    }

    fn is_due(&self, now: f64) -> bool {
        self.next_due.is_some_and(|due| now >= due)
    }

    /// Next enabled axis in round-robin order.
    fn next_axis(&mut self, enabled: Channels) -> Option<Axis> {
        for _ in 0..3 {
            let axis = Axis::from_phase(self.phase);
            self.phase = (self.phase + 1) % 3;
            if enabled.contains(axis.flag()) {
                return Some(axis);
            }
        }
        None
    }
}

pub struct CueScheduler {
    enabled: Channels,
    bank: BankChannel,
    pitch: PitchChannel,
    heading: HeadingChannel,
    idle: IdleTimer,
}

impl CueScheduler {
    /// `settings` must already have passed [`Settings::validate`].
    pub fn new(settings: &Settings) -> Self {
        CueScheduler {
            enabled: settings.channels,
            bank: BankChannel::new(settings.bank_step, settings.cue_policy.clone()),
            pitch: PitchChannel::new(settings.pitch_scale),
            heading: HeadingChannel::new(settings.idle_interval),
            idle: IdleTimer::new(settings.idle_interval),
        }
    }

    /// Runs every enabled channel against `state`. When none of them had
    /// anything new and the idle interval has passed, one channel repeats
    /// itself. Returns the number of announcements made.
    pub fn tick(&mut self, state: &AttitudeState, now: f64, announcer: &mut dyn Announcer) -> usize {
        if self.idle.next_due.is_none() {
            self.idle.schedule(now);
        }

        let mut fired = 0;
        for axis in Axis::iter() {
            if !self.enabled.contains(axis.flag()) {
                continue;
            }
            if self.channel_mut(axis).update(state, now, false, announcer) {
                fired += 1;
            }
        }

        if fired > 0 {
            self.idle.schedule(now);
            return fired;
        }

        if self.idle.is_due(now) {
            if let Some(axis) = self.idle.next_axis(self.enabled) {
                trace!("Idle repeat on {} channel", axis);
                if self.channel_mut(axis).update(state, now, true, announcer) {
                    fired += 1;
                }
            }
            self.idle.schedule(now);
        }
        fired
    }

    /// Forgets bank and pitch history after the attitude reference changed.
    pub fn reset_attitude_channels(&mut self) {
        self.bank.reset();
        self.pitch.reset();
    }

    /// Forgets all history after the heading frame changed.
    pub fn reset_all_channels(&mut self) {
        self.reset_attitude_channels();
        self.heading.reset();
    }

    pub fn channel_state(&self, axis: Axis) -> &CueChannelState {
        match axis {
            Axis::Bank => self.bank.state(),
            Axis::Pitch => self.pitch.state(),
            Axis::Heading => self.heading.state(),
        }
    }

    pub fn enabled(&self) -> Channels {
        self.enabled
    }

    fn channel_mut(&mut self, axis: Axis) -> &mut dyn CueChannel {
        match axis {
            Axis::Bank => &mut self.bank,
            Axis::Pitch => &mut self.pitch,
            Axis::Heading => &mut self.heading,
        }
    }
}
