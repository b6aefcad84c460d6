use crate::geometry::{compose, lateral_axis, signed_twist, vertical_axis, yaw_rotation};
use nalgebra::{UnitQuaternion, Vector3};

/// Slip/skid indicator: the lateral share of apparent gravity, smoothed.
///
/// Negative means the ball sits left of center. The value is not clamped.
#[derive(Debug, Clone)]
pub struct CoordinationFilter {
    beta: f64,
    mount_offset: f64,
    value: f64,
}

impl CoordinationFilter {
    pub fn new(beta: f64, mount_offset: f64) -> Self {
        CoordinationFilter {
            beta,
            mount_offset,
            value: 0.0,
        }
    }

    /// `apparent_gravity` is gravity plus user acceleration in g, device frame.
    pub fn update(
        &mut self,
        apparent_gravity: Vector3<f64>,
        zero: Option<&UnitQuaternion<f64>>,
    ) -> f64 {
        let mount_frame = match zero {
            Some(zero) => {
                let zero_yaw = signed_twist(zero, &vertical_axis());
                compose(&yaw_rotation(-zero_yaw), zero)
            }
            None => UnitQuaternion::identity(),
        };

        let lateral = yaw_rotation(self.mount_offset) * lateral_axis();
        let sample = (mount_frame * apparent_gravity).dot(lateral.as_ref());

        self.value = self.beta * sample + (1.0 - self.beta) * self.value;
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::forward_axis;

    const TOLERANCE: f64 = 1.0e-9;

    fn settle(filter: &mut CoordinationFilter, g: Vector3<f64>, zero: Option<&UnitQuaternion<f64>>) -> f64 {
        let mut value = 0.0;
        for _ in 0..400 {
            value = filter.update(g, zero);
        }
        value
    }

    #[test]
    fn test_level_device_reads_centered() {
        let mut filter = CoordinationFilter::new(0.1, 0.0);
        let value = settle(&mut filter, Vector3::new(0.0, 0.0, -1.0), None);
        assert!(value.abs() < TOLERANCE);
    }

    #[test]
    fn test_lateral_load_is_signed() {
        let mut filter = CoordinationFilter::new(0.1, 0.0);
        let left = settle(&mut filter, Vector3::new(0.0, -0.2, -1.0), None);
        assert!((left + 0.2).abs() < 1.0e-6);

        filter.reset();
        assert_eq!(filter.value(), 0.0);
        let right = settle(&mut filter, Vector3::new(0.0, 0.2, -1.0), None);
        assert!((right - 0.2).abs() < 1.0e-6);
    }

    #[test]
    fn test_first_update_is_smoothed() {
        let mut filter = CoordinationFilter::new(0.1, 0.0);
        let value = filter.update(Vector3::new(0.0, -0.5, -1.0), None);
        assert!((value + 0.05).abs() < TOLERANCE);
    }

    #[test]
    fn test_zero_yaw_does_not_leak_into_lateral_axis() {
        // A device zeroed while pointing anywhere still measures along its own
        // right axis.
        let zero = yaw_rotation(73.0);
        let mut filter = CoordinationFilter::new(0.1, 0.0);
        let value = settle(&mut filter, Vector3::new(0.0, -0.3, -1.0), Some(&zero));
        assert!((value + 0.3).abs() < 1.0e-6);
    }

    #[test]
    fn test_mount_offset_rotates_lateral_axis() {
        let right = yaw_rotation(30.0) * lateral_axis();
        let down = Vector3::new(0.0, 0.0, -1.0);

        let mut filter = CoordinationFilter::new(0.1, 30.0);
        let value = settle(&mut filter, down + right.into_inner() * 0.2, None);
        assert!((value - 0.2).abs() < 1.0e-6);

        filter.reset();
        let value = settle(&mut filter, down - right.into_inner() * 0.2, None);
        assert!((value + 0.2).abs() < 1.0e-6);

        // A load along the device's own right axis is only partly lateral.
        filter.reset();
        let value = settle(&mut filter, Vector3::new(0.0, 0.2, -1.0), None);
        assert!((value - 0.2 * 30f64.to_radians().cos()).abs() < 1.0e-6);
    }

    #[test]
    fn test_mount_tilt_is_removed() {
        // Mounted with the right wing 10° low: at rest the device sees part of
        // gravity along +Y, which the zero orientation cancels.
        let tilt = UnitQuaternion::from_axis_angle(&forward_axis(), 10f64.to_radians());
        let at_rest = tilt.inverse() * Vector3::new(0.0, 0.0, -1.0);
        assert!(at_rest.y.abs() > 0.1);

        let mut filter = CoordinationFilter::new(0.1, 0.0);
        let value = settle(&mut filter, at_rest, Some(&tilt));
        assert!(value.abs() < 1.0e-6);
    }
}
