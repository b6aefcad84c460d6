//! Sample dispatch and state publication.

use crate::coordination::CoordinationFilter;
use crate::estimator::{Attitude, AttitudeEstimator};
use crate::geometry::{unit_quaternion, vector};
use crate::heading::HeadingResolver;
use crate::settings::Settings;
use crate::state::AttitudeState;
use crate::vertical::VerticalRateFilter;
use earpilot_traits::{HeadingSource, Quaternion, SensorKind, SensorSample, Vector3};
use log::{trace, warn};

pub type Subscriber = Box<dyn FnMut(&AttitudeState) + Send>;

/// Owns the estimator and filters. Every accepted sample rebuilds the whole
/// [`AttitudeState`] and hands it to each subscriber.
pub struct FlightTracker {
    settings: Settings,
    estimator: AttitudeEstimator,
    heading: HeadingResolver,
    vertical: VerticalRateFilter,
    coordination: CoordinationFilter,
    attitude: Attitude,
    timestamp: f64,
    state: AttitudeState,
    subscribers: Vec<Subscriber>,
}

impl FlightTracker {
    pub fn new(settings: Settings) -> Self {
        FlightTracker {
            estimator: AttitudeEstimator::new(),
            heading: HeadingResolver::new(settings.heading_source),
            vertical: VerticalRateFilter::new(settings.climb_beta),
            coordination: CoordinationFilter::new(settings.coordination_beta, settings.mount_offset),
            attitude: Attitude::default(),
            timestamp: 0.0,
            state: AttitudeState::default(),
            subscribers: Vec::new(),
            settings,
        }
    }

    pub fn handle(&mut self, sample: SensorSample) {
        match sample {
            SensorSample::Orientation {
                quaternion,
                timestamp,
            } => self.on_orientation_sample(&quaternion, timestamp),
            SensorSample::Heading {
                degrees,
                timestamp,
                source,
            } => self.on_heading_sample(degrees, timestamp, source),
            SensorSample::Acceleration { vector, timestamp } => {
                self.on_acceleration_sample(&vector, timestamp)
            }
            SensorSample::Altitude { meters, timestamp } => {
                self.on_altitude_sample(meters, timestamp)
            }
            SensorSample::Unavailable(kind) => self.on_unavailable(kind),
        }
    }

    pub fn on_orientation_sample(&mut self, quaternion: &Quaternion, timestamp: f64) {
        let raw = match unit_quaternion(quaternion) {
            Some(raw) => raw,
            None => {
                warn!("Dropping degenerate orientation sample {}", quaternion);
                return;
            }
        };
        self.attitude = self.estimator.update(raw, self.settings.mount_offset);
        self.touch(timestamp);
        self.recompute();
    }

    pub fn on_heading_sample(&mut self, degrees: f64, timestamp: f64, source: HeadingSource) {
        if !degrees.is_finite() {
            warn!("Dropping non-finite {} heading sample", source);
            return;
        }
        let resolved = self
            .heading
            .update(degrees, timestamp, source, self.settings.mount_offset);
        if resolved.is_none() {
            trace!(
                "Ignoring {} heading, preferred source is {}",
                source,
                self.heading.preferred()
            );
            return;
        }
        self.touch(timestamp);
        self.recompute();
    }

    pub fn on_acceleration_sample(&mut self, apparent_gravity: &Vector3, timestamp: f64) {
        let apparent_gravity = vector(apparent_gravity);
        if !apparent_gravity.iter().all(|c| c.is_finite()) {
            warn!("Dropping non-finite acceleration sample");
            return;
        }
        self.coordination
            .update(apparent_gravity, self.estimator.zero_reference());
        self.touch(timestamp);
        self.recompute();
    }

    pub fn on_altitude_sample(&mut self, meters: f64, timestamp: f64) {
        if !meters.is_finite() {
            warn!("Dropping non-finite altitude sample");
            return;
        }
        self.vertical.update(meters, timestamp);
        self.touch(timestamp);
        self.recompute();
    }

    /// Returns the stream's quantities to neutral. The next valid sample
    /// starts a new baseline.
    pub fn on_unavailable(&mut self, kind: SensorKind) {
        warn!("{} stream unavailable, resetting to neutral", kind);
        match kind {
            SensorKind::Orientation => {
                self.estimator.reset();
                self.attitude = Attitude::default();
            }
            SensorKind::Heading => self.heading.reset(),
            SensorKind::Acceleration => self.coordination.reset(),
            SensorKind::Altitude => self.vertical.reset(),
        }
        self.recompute();
    }

    /// Makes the current orientation read level. The heading frame is kept.
    pub fn zero(&mut self) {
        self.estimator.zero();
        self.reapply_latest();
    }

    /// Like [`zero`](Self::zero), and the current nose direction becomes 0°.
    pub fn zero_heading_frame(&mut self) {
        self.estimator.zero_heading_frame();
        self.reapply_latest();
    }

    pub fn state(&self) -> AttitudeState {
        self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn estimator(&self) -> &AttitudeEstimator {
        &self.estimator
    }

    /// Registers a callback that receives every recomputed state.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&AttitudeState) + Send + 'static,
    {
        self.subscribers.push(Box::new(callback));
    }

    fn reapply_latest(&mut self) {
        self.attitude = match self.estimator.latest().copied() {
            Some(raw) => self.estimator.update(raw, self.settings.mount_offset),
            None => Attitude::default(),
        };
        self.recompute();
    }

    fn touch(&mut self, timestamp: f64) {
        if timestamp > self.timestamp {
            self.timestamp = timestamp;
        }
    }

    fn recompute(&mut self) {
        let heading = match self.settings.heading_source {
            HeadingSource::Attitude => self.estimator.heading(),
            HeadingSource::Magnetic | HeadingSource::Satellite => self.heading.heading(),
        };

        self.state = AttitudeState {
            pitch: self.attitude.pitch,
            roll: self.attitude.roll,
            yaw: self.attitude.yaw,
            heading,
            climb_rate: self.vertical.rate(),
            coordination: self.coordination.value(),
            altitude: self.vertical.altitude_ft(),
            timestamp: self.timestamp,
        };

        for subscriber in self.subscribers.iter_mut() {
            subscriber(&self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{forward_axis, lateral_axis};
    use nalgebra::UnitQuaternion;
    use std::sync::{Arc, Mutex};

    fn wire(q: UnitQuaternion<f64>) -> Quaternion {
        Quaternion::new(q.w as f32, q.i as f32, q.j as f32, q.k as f32)
    }

    fn rolled(degrees: f64) -> Quaternion {
        wire(UnitQuaternion::from_axis_angle(
            &forward_axis(),
            degrees.to_radians(),
        ))
    }

    #[test]
    fn test_orientation_updates_roll() {
        let mut tracker = FlightTracker::new(Settings::default());
        tracker.on_orientation_sample(&Quaternion::identity(), 0.0);
        tracker.on_orientation_sample(&rolled(15.0), 0.1);
        let state = tracker.state();
        assert!((state.roll - 15.0).abs() < 1.0e-3);
        assert_eq!(state.timestamp, 0.1);
    }

    #[test]
    fn test_degenerate_orientation_is_dropped() {
        let mut tracker = FlightTracker::new(Settings::default());
        tracker.on_orientation_sample(&Quaternion::identity(), 0.0);
        tracker.on_orientation_sample(&rolled(10.0), 0.1);
        tracker.on_orientation_sample(&Quaternion::new(0.0, 0.0, 0.0, 0.0), 0.2);
        assert!((tracker.state().roll - 10.0).abs() < 1.0e-3);
        assert_eq!(tracker.state().timestamp, 0.1);
    }

    #[test]
    fn test_heading_prefers_configured_source() {
        let mut tracker = FlightTracker::new(Settings {
            heading_source: HeadingSource::Satellite,
            mount_offset: 10.0,
            ..Settings::default()
        });
        tracker.on_heading_sample(90.0, 0.0, HeadingSource::Magnetic);
        assert_eq!(tracker.state().heading, 0.0);
        tracker.on_heading_sample(90.0, 0.0, HeadingSource::Satellite);
        assert_eq!(tracker.state().heading, 80.0);
    }

    #[test]
    fn test_attitude_heading_source_uses_orientation() {
        let mut tracker = FlightTracker::new(Settings {
            heading_source: HeadingSource::Attitude,
            ..Settings::default()
        });
        tracker.on_orientation_sample(&Quaternion::identity(), 0.0);
        assert!((tracker.state().heading - 270.0).abs() < 1.0e-3);
        tracker.on_heading_sample(45.0, 0.1, HeadingSource::Magnetic);
        assert!((tracker.state().heading - 270.0).abs() < 1.0e-3);
    }

    #[test]
    fn test_unavailable_resets_to_neutral() {
        let mut tracker = FlightTracker::new(Settings::default());
        tracker.on_orientation_sample(&Quaternion::identity(), 0.0);
        tracker.on_orientation_sample(&rolled(20.0), 0.1);
        tracker.on_altitude_sample(100.0, 0.0);
        tracker.on_altitude_sample(110.0, 1.0);
        assert!(tracker.state().climb_rate > 0.0);

        tracker.on_unavailable(SensorKind::Orientation);
        tracker.on_unavailable(SensorKind::Altitude);
        let state = tracker.state();
        assert_eq!(state.roll, 0.0);
        assert_eq!(state.climb_rate, 0.0);
        assert_eq!(state.altitude, 0.0);

        // The first sample after the dropout is the new level.
        tracker.on_orientation_sample(&rolled(20.0), 0.2);
        assert!(tracker.state().roll.abs() < 1.0e-9);
    }

    #[test]
    fn test_zero_reads_level_immediately() {
        let mut tracker = FlightTracker::new(Settings::default());
        tracker.on_orientation_sample(&Quaternion::identity(), 0.0);
        let pitched = wire(UnitQuaternion::from_axis_angle(
            &lateral_axis(),
            7f64.to_radians(),
        ));
        tracker.on_orientation_sample(&pitched, 0.1);
        assert!((tracker.state().pitch - 7.0).abs() < 1.0e-3);

        tracker.zero();
        assert!(tracker.state().pitch.abs() < 1.0e-3);
    }

    #[test]
    fn test_zero_heading_frame_reads_north() {
        let mut tracker = FlightTracker::new(Settings {
            heading_source: HeadingSource::Attitude,
            ..Settings::default()
        });
        tracker.on_orientation_sample(&Quaternion::identity(), 0.0);
        tracker.zero_heading_frame();
        let heading = tracker.state().heading;
        assert!(heading < 1.0e-3 || heading > 360.0 - 1.0e-3);
    }

    #[test]
    fn test_subscribers_see_every_recompute() {
        let mut tracker = FlightTracker::new(Settings::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        tracker.subscribe(move |state| sink.lock().unwrap().push(state.altitude));

        tracker.on_altitude_sample(10.0, 0.0);
        tracker.on_altitude_sample(20.0, 1.0);
        tracker.on_heading_sample(5.0, 1.0, HeadingSource::Satellite);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!((seen[1] - 20.0 * 3.280_84).abs() < 1.0e-9);
    }
}
