//! Quaternion and angle helpers shared by the estimator and the filters.
//!
//! World frame: +Z is up, yaw twists are counter-clockwise about +Z.
//! Device frame: the instrument is mounted landscape, so the device's -X axis
//! points out the nose and +Y points along the right wing.

use earpilot_traits::{Quaternion as RawQuaternion, Vector3 as RawVector3};
use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};

pub const FEET_PER_METER: f64 = 3.280_84;
pub const STANDARD_GRAVITY: f64 = 9.806_65;

const MIN_QUATERNION_NORM: f64 = 1.0e-6;
const MIN_TWIST_NORM: f64 = 1.0e-9;

pub fn vertical_axis() -> Unit<Vector3<f64>> {
    Vector3::z_axis()
}

pub fn forward_axis() -> Unit<Vector3<f64>> {
    Unit::new_unchecked(Vector3::new(-1.0, 0.0, 0.0))
}

pub fn lateral_axis() -> Unit<Vector3<f64>> {
    Vector3::y_axis()
}

/// Converts a wire quaternion, rejecting non-finite or zero-length input.
pub fn unit_quaternion(raw: &RawQuaternion) -> Option<UnitQuaternion<f64>> {
    let q = Quaternion::new(raw.w as f64, raw.x as f64, raw.y as f64, raw.z as f64);
    if !q.coords.iter().all(|c| c.is_finite()) {
        return None;
    }
    UnitQuaternion::try_new(q, MIN_QUATERNION_NORM)
}

pub fn vector(raw: &RawVector3) -> Vector3<f64> {
    Vector3::new(raw.x as f64, raw.y as f64, raw.z as f64)
}

/// Counter-clockwise rotation about the vertical axis.
pub fn yaw_rotation(degrees: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&vertical_axis(), degrees.to_radians())
}

/// `a * b`, renormalized so repeated composition cannot drift off unit length.
pub fn compose(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    let mut product = a * b;
    product.renormalize();
    product
}

/// Signed angle (deg) of the twist of `rotation` about `axis`.
///
/// The twist is the projection of the rotation onto `axis`. Its own axis comes
/// back either parallel or antiparallel to `axis`; antiparallel means the
/// rotation ran the other way, so the angle is negated.
pub fn signed_twist(rotation: &UnitQuaternion<f64>, axis: &Unit<Vector3<f64>>) -> f64 {
    let q = rotation.quaternion();
    let projected = axis.as_ref() * q.imag().dot(axis.as_ref());
    let twist = match UnitQuaternion::try_new(
        Quaternion::from_parts(q.scalar(), projected),
        MIN_TWIST_NORM,
    ) {
        Some(twist) => twist,
        // A half-turn swing leaves nothing to measure about this axis.
        None => return 0.0,
    };

    match twist.axis_angle() {
        Some((twist_axis, angle)) => {
            if twist_axis.dot(axis.as_ref()) < 0.0 {
                -angle.to_degrees()
            } else {
                angle.to_degrees()
            }
        }
        None => 0.0,
    }
}

/// Wraps into [0, 360).
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wraps into (-180, 180].
pub fn wrap_signed_degrees(degrees: f64) -> f64 {
    let wrapped = normalize_degrees(degrees);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Shortest signed angle (deg) taking `from` onto `to`.
pub fn circular_difference(to: f64, from: f64) -> f64 {
    let delta = (to - from).to_radians();
    delta.sin().atan2(delta.cos()).to_degrees()
}
