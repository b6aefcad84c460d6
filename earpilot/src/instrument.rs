use crate::cues::CueScheduler;
use crate::settings::Settings;
use crate::state::AttitudeState;
use crate::tracker::FlightTracker;
use earpilot_traits::{Announcer, EarPilotError, SensorSource};
use log::{debug, error, warn};
use std::sync::{mpsc, Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// The tracker, the cue scheduler and their two collaborators, driven from a
/// single context.
pub struct Instrument<S: SensorSource, A: Announcer> {
    tracker: FlightTracker,
    cues: CueScheduler,
    source: S,
    announcer: A,
}

impl<S: SensorSource, A: Announcer> Instrument<S, A> {
    /// Fails with a configuration error when `settings` do not validate.
    pub fn new(settings: Settings, source: S, announcer: A) -> Result<Self, EarPilotError> {
        settings.validate()?;
        Ok(Instrument {
            cues: CueScheduler::new(&settings),
            tracker: FlightTracker::new(settings),
            source,
            announcer,
        })
    }

    /// Drains the source, then lets the cue channels speak. A failed read
    /// is logged and the step carries on with the state it has.
    pub fn step(&mut self, now: f64) -> AttitudeState {
        match self.source.poll() {
            Ok(samples) => {
                for sample in samples {
                    self.tracker.handle(sample);
                }
            }
            Err(e) => error!("Failed to read sensor source: {}", e),
        }

        let state = self.tracker.state();
        self.cues.tick(&state, now, &mut self.announcer);
        state
    }

    pub fn zero(&mut self) {
        debug!("Zero requested");
        self.tracker.zero();
        self.cues.reset_attitude_channels();
    }

    pub fn zero_heading_frame(&mut self) {
        debug!("Heading frame zero requested");
        self.tracker.zero_heading_frame();
        self.cues.reset_all_channels();
    }

    pub fn stop(&mut self) -> Result<(), EarPilotError> {
        self.source.stop()
    }

    pub fn state(&self) -> AttitudeState {
        self.tracker.state()
    }

    pub fn tracker(&self) -> &FlightTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut FlightTracker {
        &mut self.tracker
    }

    pub fn cues(&self) -> &CueScheduler {
        &self.cues
    }

    pub fn announcer(&self) -> &A {
        &self.announcer
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

#[derive(Debug)]
pub enum InstrumentCommand {
    Zero,
    ZeroHeadingFrame,
    Stop,
}

/// Runs an [`Instrument`] on its own thread at a fixed period.
pub struct InstrumentThread {
    state: Arc<RwLock<AttitudeState>>,
    command_tx: mpsc::Sender<InstrumentCommand>,
    handle: Option<JoinHandle<()>>,
}

impl InstrumentThread {
    pub fn spawn<S, A>(
        settings: Settings,
        source: S,
        announcer: A,
        period: Duration,
    ) -> Result<Self, EarPilotError>
    where
        S: SensorSource + Send + 'static,
        A: Announcer + Send + 'static,
    {
        if period.is_zero() {
            return Err(EarPilotError::ConfigurationError(
                "Instrument period must be non-zero".to_string(),
            ));
        }

        let instrument = Instrument::new(settings, source, announcer)?;
        let state = Arc::new(RwLock::new(AttitudeState::default()));
        let (command_tx, command_rx) = mpsc::channel();
        let shared = Arc::clone(&state);

        let handle = thread::Builder::new()
            .name("earpilot-instrument".to_string())
            .spawn(move || run_instrument(instrument, shared, command_rx, period))
            .map_err(|e| EarPilotError::Other(format!("Failed to spawn instrument thread: {}", e)))?;

        Ok(InstrumentThread {
            state,
            command_tx,
            handle: Some(handle),
        })
    }

    /// Latest published state.
    pub fn state(&self) -> Result<AttitudeState, EarPilotError> {
        let state = self.state.read()?;
        Ok(*state)
    }

    pub fn zero(&self) -> Result<(), EarPilotError> {
        self.command_tx.send(InstrumentCommand::Zero)?;
        Ok(())
    }

    pub fn zero_heading_frame(&self) -> Result<(), EarPilotError> {
        self.command_tx.send(InstrumentCommand::ZeroHeadingFrame)?;
        Ok(())
    }

    /// Stops the loop and waits for the thread to exit.
    pub fn stop(&mut self) -> Result<(), EarPilotError> {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return Ok(()),
        };
        // The thread may already be gone; joining is what matters.
        let _ = self.command_tx.send(InstrumentCommand::Stop);
        handle
            .join()
            .map_err(|_| EarPilotError::Other("Instrument thread panicked".to_string()))
    }
}

impl Drop for InstrumentThread {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn run_instrument<S: SensorSource, A: Announcer>(
    mut instrument: Instrument<S, A>,
    state: Arc<RwLock<AttitudeState>>,
    command_rx: mpsc::Receiver<InstrumentCommand>,
    period: Duration,
) {
    debug!("Instrument thread started, period {:?}", period);
    let start = Instant::now();
    let mut next_time = start + period;

    'running: loop {
        while let Ok(command) = command_rx.try_recv() {
            match command {
                InstrumentCommand::Zero => instrument.zero(),
                InstrumentCommand::ZeroHeadingFrame => instrument.zero_heading_frame(),
                InstrumentCommand::Stop => break 'running,
            }
        }

        let snapshot = instrument.step(start.elapsed().as_secs_f64());
        match state.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(e) => {
                error!("Instrument state lock poisoned: {}", e);
                break;
            }
        }

        let now = Instant::now();
        if next_time > now {
            thread::sleep(next_time - now);
        } else {
            warn!("Instrument step overran by {:?}", now - next_time);
            next_time = now;
        }
        next_time += period;
    }

    if let Err(e) = instrument.stop() {
        error!("Failed to stop sensor source: {}", e);
    }
    debug!("Instrument thread exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{circular_difference, forward_axis};
    use earpilot_traits::{Announcement, HeadingSource, Quaternion, SensorSample};
    use nalgebra::UnitQuaternion;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Replays a fixed list of batches, one per poll.
    struct Replay {
        batches: Vec<Vec<SensorSample>>,
        stopped: Arc<AtomicBool>,
    }

    impl SensorSource for Replay {
        fn poll(&mut self) -> Result<Vec<SensorSample>, EarPilotError> {
            if self.batches.is_empty() {
                return Ok(Vec::new());
            }
            Ok(self.batches.remove(0))
        }

        fn stop(&mut self) -> Result<(), EarPilotError> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    impl SensorSource for Failing {
        fn poll(&mut self) -> Result<Vec<SensorSample>, EarPilotError> {
            Err(EarPilotError::SourceError("unplugged".to_string()))
        }

        fn stop(&mut self) -> Result<(), EarPilotError> {
            Ok(())
        }
    }

    fn altitude(meters: f64, timestamp: f64) -> SensorSample {
        SensorSample::Altitude { meters, timestamp }
    }

    #[test]
    fn test_step_feeds_tracker_and_cues() {
        let source = Replay {
            batches: vec![
                vec![altitude(100.0, 0.0)],
                vec![altitude(103.0, 1.0)],
            ],
            stopped: Arc::new(AtomicBool::new(false)),
        };
        let mut instrument =
            Instrument::new(Settings::default(), source, Vec::<Announcement>::new()).unwrap();
        instrument.step(0.0);
        let state = instrument.step(1.0);
        assert!(state.climb_rate > 0.0);
        assert!(state.altitude > 330.0);
    }

    #[test]
    fn test_source_errors_do_not_propagate() {
        let mut instrument =
            Instrument::new(Settings::default(), Failing, Vec::<Announcement>::new()).unwrap();
        let state = instrument.step(0.0);
        assert_eq!(state, AttitudeState::default());
    }

    fn rolled(degrees: f64, timestamp: f64) -> SensorSample {
        let q = UnitQuaternion::from_axis_angle(&forward_axis(), degrees.to_radians());
        SensorSample::Orientation {
            quaternion: Quaternion::new(q.w as f32, q.i as f32, q.j as f32, q.k as f32),
            timestamp,
        }
    }

    fn wait_for(instrument: &InstrumentThread, ready: impl Fn(&AttitudeState) -> bool) -> AttitudeState {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let state = instrument.state().unwrap();
            if ready(&state) || Instant::now() >= deadline {
                return state;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_thread_publishes_and_stops() {
        let stopped = Arc::new(AtomicBool::new(false));
        let source = Replay {
            batches: vec![
                vec![rolled(0.0, 0.0), altitude(50.0, 0.0)],
                vec![rolled(10.0, 0.1)],
            ],
            stopped: Arc::clone(&stopped),
        };
        let settings = Settings {
            heading_source: HeadingSource::Attitude,
            ..Settings::default()
        };
        let mut instrument =
            InstrumentThread::spawn(settings, source, Vec::<Announcement>::new(), Duration::from_millis(2))
                .unwrap();

        let state = wait_for(&instrument, |s| s.roll > 9.0);
        assert!(state.altitude > 160.0);
        assert!((state.roll - 10.0).abs() < 1.0e-3);
        assert!((state.heading - 270.0).abs() < 1.0e-3);

        instrument.zero().unwrap();
        let state = wait_for(&instrument, |s| s.roll.abs() < 1.0e-3);
        assert!(state.roll.abs() < 1.0e-3);
        assert!((state.heading - 270.0).abs() < 1.0e-3);

        instrument.zero_heading_frame().unwrap();
        let state = wait_for(&instrument, |s| circular_difference(s.heading, 0.0).abs() < 1.0e-3);
        assert!(circular_difference(state.heading, 0.0).abs() < 1.0e-3);
        assert!(state.roll.abs() < 1.0e-3);

        instrument.stop().unwrap();
        assert!(stopped.load(Ordering::SeqCst));
        assert!(instrument.zero().is_err());
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let settings = Settings {
            bank_step: 0.0,
            ..Settings::default()
        };
        let result = Instrument::new(settings.clone(), Failing, Vec::<Announcement>::new());
        assert!(matches!(result, Err(EarPilotError::ConfigurationError(_))));

        let result = InstrumentThread::spawn(
            settings,
            Failing,
            Vec::<Announcement>::new(),
            Duration::from_millis(2),
        );
        assert!(matches!(result, Err(EarPilotError::ConfigurationError(_))));
    }

    #[test]
    fn test_zero_period_is_rejected() {
        let result = InstrumentThread::spawn(
            Settings::default(),
            Failing,
            Vec::<Announcement>::new(),
            Duration::ZERO,
        );
        assert!(matches!(result, Err(EarPilotError::ConfigurationError(_))));
    }
}
