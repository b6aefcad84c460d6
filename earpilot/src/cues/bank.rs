use super::{CueChannel, CueChannelState, Trend};
use crate::settings::CuePolicy;
use crate::state::AttitudeState;
use earpilot_traits::{Announcer, VoiceChannel};
use log::trace;

const SIDE_PAN: f64 = 90.0;

/// Speaks the bank angle in fixed buckets, panned toward the low wing.
#[derive(Debug, Clone)]
pub struct BankChannel {
    step: f64,
    policy: CuePolicy,
    state: CueChannelState,
}

impl BankChannel {
    pub fn new(step: f64, policy: CuePolicy) -> Self {
        BankChannel {
            step,
            policy,
            state: CueChannelState::default(),
        }
    }

    pub fn bucket(&self, roll: f64) -> f64 {
        (roll / self.step).round() * self.step
    }

    fn announce(&self, bucket: f64, trend: Trend, coordination: f64, announcer: &mut dyn Announcer) {
        if bucket == 0.0 {
            announcer.speak("Level", 0.0, 0.0, VoiceChannel::Primary);
            return;
        }

        let mark = match trend {
            Trend::Leveling => &self.policy.leveling_mark,
            Trend::Departing => &self.policy.departing_mark,
        };
        let text = format!("{}{}", spoken_degrees(bucket.abs()), mark);
        let slip = if self.policy.invert_slip_pitch {
            -coordination
        } else {
            coordination
        };

        if bucket < 0.0 {
            announcer.speak(&text, -SIDE_PAN, slip, VoiceChannel::Primary);
        } else {
            announcer.speak(&text, SIDE_PAN, -slip, VoiceChannel::Primary);
        }
    }
}

fn spoken_degrees(degrees: f64) -> String {
    if degrees.fract().abs() < 1.0e-9 {
        format!("{:.0}", degrees)
    } else {
        format!("{:.1}", degrees)
    }
}

impl CueChannel for BankChannel {
    fn update(
        &mut self,
        state: &AttitudeState,
        now: f64,
        idle: bool,
        announcer: &mut dyn Announcer,
    ) -> bool {
        let bucket = self.bucket(state.roll);
        let previous = self.state.last_bucket;

        let trend = if bucket != previous {
            if bucket.abs() < previous.abs() {
                Trend::Leveling
            } else {
                Trend::Departing
            }
        } else {
            self.state.last_trend
        };

        let changed = bucket != previous || trend != self.state.last_trend;
        let still_level = bucket == 0.0 && previous == 0.0;
        if !idle && (!changed || still_level) {
            return false;
        }

        trace!("Bank cue: bucket {} ({}), idle={}", bucket, trend, idle);
        self.announce(bucket, trend, state.coordination, announcer);
        self.state = CueChannelState {
            last_bucket: bucket,
            last_magnitude: bucket,
            last_trend: trend,
            last_announced_at: Some(now),
        };
        true
    }

    fn reset(&mut self) {
        self.state = CueChannelState::default();
    }

    fn state(&self) -> &CueChannelState {
        &self.state
    }
}
