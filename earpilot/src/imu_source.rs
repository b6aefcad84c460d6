//! Adapter from any `imu_traits::ImuReader` to a [`SensorSource`].

use crate::geometry::{normalize_degrees, STANDARD_GRAVITY};
use earpilot_traits::{
    EarPilotError, HeadingSource, Quaternion, SensorKind, SensorSample, SensorSource, Vector3,
};
use imu_traits::{ImuError, ImuReader};
use log::trace;
use std::time::Instant;

/// Polls an IMU reader and converts its latest frame into samples.
///
/// The accelerometer reports specific force in m/s², which points up when the
/// device is at rest. It is negated and scaled to g so it reads as apparent
/// gravity. The Euler yaw is counter-clockwise and becomes a clockwise heading.
pub struct ImuSensorSource<R: ImuReader> {
    reader: R,
    start: Instant,
}

impl<R: ImuReader> ImuSensorSource<R> {
    pub fn new(reader: R) -> Self {
        ImuSensorSource {
            reader,
            start: Instant::now(),
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }
}

impl<R: ImuReader> SensorSource for ImuSensorSource<R> {
    fn poll(&mut self) -> Result<Vec<SensorSample>, EarPilotError> {
        let data = match self.reader.get_data() {
            Ok(data) => data,
            // Readers report "nothing new" as a read error.
            Err(ImuError::ReadError(reason)) => {
                trace!("No IMU data: {}", reason);
                return Ok(Vec::new());
            }
            Err(e) => return Err(EarPilotError::SourceError(e.to_string())),
        };
        let timestamp = self.start.elapsed().as_secs_f64();

        let mut samples = Vec::with_capacity(3);
        match data.quaternion {
            Some(q) => samples.push(SensorSample::Orientation {
                quaternion: Quaternion::new(q.w, q.x, q.y, q.z),
                timestamp,
            }),
            None => samples.push(SensorSample::Unavailable(SensorKind::Orientation)),
        }

        if let Some(a) = data.accelerometer {
            let scale = -1.0 / STANDARD_GRAVITY as f32;
            samples.push(SensorSample::Acceleration {
                vector: Vector3::new(a.x * scale, a.y * scale, a.z * scale),
                timestamp,
            });
        }

        if let Some(euler) = data.euler {
            samples.push(SensorSample::Heading {
                degrees: normalize_degrees(-(euler.z as f64)),
                timestamp,
                source: HeadingSource::Magnetic,
            });
        }

        Ok(samples)
    }

    fn stop(&mut self) -> Result<(), EarPilotError> {
        self.reader
            .stop()
            .map_err(|e| EarPilotError::SourceError(format!("Failed to stop IMU: {}", e)))
    }
}
