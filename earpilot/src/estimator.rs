//! Attitude estimation from raw device orientation.
//!
//! Yaw is removed from the zero reference before bank and pitch are measured,
//! so neither reading depends on heading.
//!
//! Known limitation: as pitch approaches ±90° the bank twist becomes
//! ill-conditioned. The decomposition still returns a value and no special
//! case is made for it.

use crate::geometry::{
    compose, forward_axis, lateral_axis, normalize_degrees, signed_twist, vertical_axis,
    wrap_signed_degrees, yaw_rotation,
};
use log::debug;
use nalgebra::UnitQuaternion;

/// Maps the counter-clockwise device yaw onto a clockwise compass heading for a
/// device whose forward axis is -X.
pub const FRAME_HEADING_OFFSET: f64 = 270.0;

/// Signed angles in degrees. Positive roll is right wing down, positive pitch
/// is nose up, positive yaw is a turn to the right since the last zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Attitude {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

#[derive(Debug, Clone, Default)]
pub struct AttitudeEstimator {
    zero_reference: Option<UnitQuaternion<f64>>,
    latest: Option<UnitQuaternion<f64>>,
    /// Counter-clockwise yaw (deg) of the heading frame's origin.
    heading_frame_yaw: f64,
    heading_frame_pending: bool,
    mount_offset: f64,
    heading: f64,
}

impl AttitudeEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decomposes `raw` into pitch/roll/yaw relative to the zero reference.
    ///
    /// `mount_offset` is clockwise-positive degrees between the aircraft's
    /// nose and the device's forward axis. The first sample after a reset
    /// becomes the zero reference and reads as level.
    pub fn update(&mut self, raw: UnitQuaternion<f64>, mount_offset: f64) -> Attitude {
        let mut raw = raw;
        raw.renormalize();
        self.latest = Some(raw);
        self.mount_offset = mount_offset;

        let absolute_yaw = signed_twist(&raw, &vertical_axis());
        if self.heading_frame_pending {
            self.capture_heading_frame(absolute_yaw);
        }
        self.heading = normalize_degrees(
            FRAME_HEADING_OFFSET - (absolute_yaw - self.heading_frame_yaw) - mount_offset,
        );

        let zero = match self.zero_reference {
            Some(zero) => zero,
            None => {
                debug!("Captured zero reference from first orientation sample");
                self.zero_reference = Some(raw);
                return Attitude::default();
            }
        };

        let relative = compose(&raw, &zero.inverse());
        let yaw_delta = signed_twist(&relative, &vertical_axis());

        let de_yawed_zero = compose(&yaw_rotation(yaw_delta), &zero);
        let relative_attitude = compose(&raw, &de_yawed_zero.inverse());

        // The nose sits `mount_offset` degrees counter-clockwise of the device.
        let axes = yaw_rotation(absolute_yaw + mount_offset);
        let forward = axes * forward_axis();
        let lateral = axes * lateral_axis();

        Attitude {
            pitch: signed_twist(&relative_attitude, &lateral),
            roll: signed_twist(&relative_attitude, &forward),
            // Reported clockwise, like heading.
            yaw: wrap_signed_degrees(-yaw_delta),
        }
    }

    /// Resets pitch and roll to level at the current orientation. The heading
    /// frame is kept.
    pub fn zero(&mut self) {
        debug!("Zeroing attitude reference");
        self.zero_reference = self.latest;
    }

    /// Zeroes attitude and makes the current forward direction read 0°.
    pub fn zero_heading_frame(&mut self) {
        self.zero();
        debug!("Zeroing heading frame");
        match self.latest {
            Some(raw) => {
                let absolute_yaw = signed_twist(&raw, &vertical_axis());
                self.capture_heading_frame(absolute_yaw);
                self.heading = 0.0;
            }
            None => self.heading_frame_pending = true,
        }
    }

    /// Forgets the zero reference after a sensor dropout so the next valid
    /// sample becomes the new baseline.
    pub fn reset(&mut self) {
        self.zero_reference = None;
        self.latest = None;
        self.heading = 0.0;
    }

    /// Compass heading (deg) of the aircraft's nose in the heading frame.
    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn zero_reference(&self) -> Option<&UnitQuaternion<f64>> {
        self.zero_reference.as_ref()
    }

    pub fn latest(&self) -> Option<&UnitQuaternion<f64>> {
        self.latest.as_ref()
    }

    pub fn mount_offset(&self) -> f64 {
        self.mount_offset
    }

    fn capture_heading_frame(&mut self, absolute_yaw: f64) {
        self.heading_frame_yaw = absolute_yaw - FRAME_HEADING_OFFSET + self.mount_offset;
        self.heading_frame_pending = false;
    }
}
