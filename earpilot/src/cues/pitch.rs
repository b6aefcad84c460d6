use super::{CueChannel, CueChannelState};
use crate::state::AttitudeState;
use earpilot_traits::Announcer;
use log::trace;

/// Plays one tone per pitch step; higher notes for nose up.
#[derive(Debug, Clone)]
pub struct PitchChannel {
    scale: f64,
    state: CueChannelState,
}

impl PitchChannel {
    pub fn new(scale: f64) -> Self {
        PitchChannel {
            scale,
            state: CueChannelState::default(),
        }
    }

    pub fn step(&self, pitch: f64) -> i32 {
        (pitch / self.scale).round() as i32
    }
}

impl CueChannel for PitchChannel {
    fn update(
        &mut self,
        state: &AttitudeState,
        now: f64,
        idle: bool,
        announcer: &mut dyn Announcer,
    ) -> bool {
        let step = self.step(state.pitch);
        let previous = self.state.last_bucket as i32;
        if !idle && (step == previous || (step == 0 && previous == 0)) {
            return false;
        }

        trace!("Pitch cue: step {}, idle={}", step, idle);
        announcer.tone(step);
        self.state.last_bucket = step as f64;
        self.state.last_magnitude = step as f64 * self.scale;
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
