use earpilot::geometry::forward_axis;
use earpilot::{
    Announcement, Axis, Channels, CueChannelState, EarPilotError, HeadingSource, Instrument,
    SensorKind, SensorSample, SensorSource, Settings, VerticalRateFilter, VoiceChannel,
};
use earpilot_traits::Quaternion;
use nalgebra::UnitQuaternion;
use std::collections::VecDeque;

const STEP: f64 = 0.25;

/// Hands out one queued batch per poll, then nothing.
struct Queue(VecDeque<Vec<SensorSample>>);

impl SensorSource for Queue {
    fn poll(&mut self) -> Result<Vec<SensorSample>, EarPilotError> {
        Ok(self.0.pop_front().unwrap_or_default())
    }

    fn stop(&mut self) -> Result<(), EarPilotError> {
        self.0.clear();
        Ok(())
    }
}

fn rolled(degrees: f64, timestamp: f64) -> SensorSample {
    let q = UnitQuaternion::from_axis_angle(&forward_axis(), degrees.to_radians());
    SensorSample::Orientation {
        quaternion: Quaternion::new(q.w as f32, q.i as f32, q.j as f32, q.k as f32),
        timestamp,
    }
}

fn magnetic(degrees: f64, timestamp: f64) -> SensorSample {
    SensorSample::Heading {
        degrees,
        timestamp,
        source: HeadingSource::Magnetic,
    }
}

fn only(channels: Channels) -> Settings {
    Settings {
        channels,
        ..Settings::default()
    }
}

fn instrument(
    settings: Settings,
    batches: Vec<Vec<SensorSample>>,
) -> Instrument<Queue, Vec<Announcement>> {
    Instrument::new(settings, Queue(batches.into()), Vec::new()).unwrap()
}

fn texts(said: &[Announcement]) -> Vec<String> {
    said.iter()
        .filter_map(|a| match a {
            Announcement::Speech { text, .. } => Some(text.clone()),
            Announcement::Tone { .. } => None,
        })
        .collect()
}

#[test]
fn bank_fires_once_on_departure_then_on_idle() {
    let rolls = [0.0, 0.0, 6.0, 6.0, 6.0];
    let batches = rolls
        .iter()
        .enumerate()
        .map(|(i, roll)| vec![rolled(*roll, i as f64 * STEP)])
        .collect();
    let mut instrument = instrument(only(Channels::BANK), batches);

    let mut fired_at = Vec::new();
    for i in 0..=12 {
        let now = i as f64 * STEP;
        let before = instrument.announcer().len();
        instrument.step(now);
        if instrument.announcer().len() > before {
            fired_at.push(now);
        }
    }

    assert_eq!(fired_at, vec![0.5, 2.5]);
    let said = instrument.announcer();
    assert_eq!(said[0], said[1]);
    match &said[0] {
        Announcement::Speech {
            text, pan, voice, ..
        } => {
            assert_eq!(text, "5.");
            assert_eq!(*pan, 90.0);
            assert_eq!(*voice, VoiceChannel::Primary);
        }
        other => panic!("expected speech, got {:?}", other),
    }
}

#[test]
fn heading_wrap_across_north_stays_quiet() {
    let batches = vec![vec![magnetic(358.0, 0.0)], vec![magnetic(2.0, STEP)]];
    let mut instrument = instrument(only(Channels::HEADING), batches);
    instrument.step(0.0);
    instrument.step(STEP);
    assert!(instrument.announcer().is_empty());
    assert_eq!(instrument.state().heading, 2.0);
}

#[test]
fn heading_large_change_names_north() {
    let batches = vec![vec![magnetic(340.0, 0.0)], vec![magnetic(10.0, STEP)]];
    let mut instrument = instrument(only(Channels::HEADING), batches);
    instrument.step(0.0);
    assert!(instrument.announcer().is_empty());
    instrument.step(STEP);
    assert_eq!(texts(instrument.announcer()), vec!["North".to_string()]);
    match &instrument.announcer()[0] {
        Announcement::Speech { voice, .. } => assert_eq!(*voice, VoiceChannel::Secondary),
        other => panic!("expected speech, got {:?}", other),
    }
}

#[test]
fn climb_rate_is_positive_and_settles_monotonically() {
    let mut filter = VerticalRateFilter::new(0.3);
    filter.update(100.0, 0.0);
    filter.update(101.0, 1.0);
    let first = filter.update(103.0, 2.0);
    assert!(filter.instantaneous() > 0.0);
    assert!(first > 0.0);

    let mut previous = first;
    for i in 3..20 {
        let rate = filter.update(103.0 + 2.0 * (i - 2) as f64, i as f64);
        assert!(rate > previous);
        previous = rate;
    }
}

#[test]
fn orientation_dropout_returns_to_level_once() {
    let batches = vec![
        vec![rolled(0.0, 0.0)],
        vec![rolled(20.0, STEP)],
        vec![SensorSample::Unavailable(SensorKind::Orientation)],
    ];
    let mut instrument = instrument(only(Channels::BANK), batches);
    for i in 0..5 {
        instrument.step(i as f64 * STEP);
    }
    assert_eq!(texts(instrument.announcer()), vec!["20.", "Level"]);
    assert_eq!(instrument.state().roll, 0.0);
}

#[test]
fn zero_discards_bank_history() {
    let batches = vec![vec![rolled(0.0, 0.0)], vec![rolled(20.0, STEP)]];
    let mut instrument = instrument(only(Channels::BANK), batches);
    instrument.step(0.0);
    instrument.step(STEP);
    assert_eq!(texts(instrument.announcer()), vec!["20."]);

    instrument.zero();
    assert_eq!(
        *instrument.cues().channel_state(Axis::Bank),
        CueChannelState::default()
    );
    assert!(instrument.state().roll.abs() < 1.0e-6);

    // Level against the new reference is not news.
    instrument.step(2.0 * STEP);
    assert_eq!(instrument.announcer().len(), 1);
}

#[test]
fn settings_survive_json_round_trip() {
    let settings = Settings {
        mount_offset: -12.5,
        bank_step: 8.0,
        channels: Channels::BANK | Channels::HEADING,
        heading_source: HeadingSource::Satellite,
        voice: "Samantha".to_string(),
        ..Settings::default()
    };
    let json = settings.to_json().unwrap();
    assert_eq!(Settings::from_json(&json).unwrap(), settings);

    let path = std::env::temp_dir().join(format!("earpilot-settings-{}.json", std::process::id()));
    std::fs::write(&path, &json).unwrap();
    let loaded = Settings::load(&path);
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded.unwrap(), settings);
}

#[test]
fn settings_validation_rejects_out_of_range_values() {
    assert!(Settings::from_json(r#"{ "mount_offset": 60.0 }"#).is_err());
    assert!(Settings::from_json(r#"{ "bank_step": 0.0 }"#).is_err());
    assert!(Settings::from_json(r#"{ "idle_interval": -1.0 }"#).is_err());
    assert!(matches!(
        Settings::load("/nonexistent/earpilot.json"),
        Err(EarPilotError::ConfigurationError(_))
    ));

    let settings = Settings::from_json(r#"{ "channels": "BANK | HEADING" }"#).unwrap();
    assert_eq!(settings.channels, Channels::BANK | Channels::HEADING);
}
