use earpilot_traits::{Announcer, ToneTimbre, VoiceChannel};
use log::info;

/// Reference pitch for tone index 0 (MIDI A4).
const BASE_NOTE: i32 = 69;

/// Writes announcements to the log instead of an audio engine.
#[derive(Debug, Clone)]
pub struct LogAnnouncer {
    voice: String,
    spoken: usize,
    tones: usize,
}

impl LogAnnouncer {
    pub fn new(voice: impl Into<String>) -> Self {
        LogAnnouncer {
            voice: voice.into(),
            spoken: 0,
            tones: 0,
        }
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn spoken(&self) -> usize {
        self.spoken
    }

    pub fn tones(&self) -> usize {
        self.tones
    }
}

impl Announcer for LogAnnouncer {
    fn speak(&mut self, text: &str, pan: f64, pitch_shift: f64, voice: VoiceChannel) {
        self.spoken += 1;
        info!(
            "[{} / {}] \"{}\" pan={:+.0}° pitch={:+.2}",
            self.voice, voice, text, pan, pitch_shift
        );
    }

    fn tone(&mut self, pitch_index: i32) {
        self.tones += 1;
        info!(
            "[tone] note {} ({})",
            BASE_NOTE.saturating_add(pitch_index),
            ToneTimbre::for_step(pitch_index)
        );
    }
}
