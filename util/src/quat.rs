//! Vector and quaternion utility functions
//!
//! Rotations are expressed as Hamilton quaternions built from an axis and an
//! angle. Vectors are rotated by embedding them as pure quaternions and
//! conjugating with the rotation, i.e. `q * v * q^-1`.
//!
//! Planar angles between direction vectors are signed using the z component of
//! the turn from the first vector to the second. [`AngleSign`] selects how that
//! sign is computed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Norms below this are treated as zero when normalising.
const DEGENERATE_NORM: f64 = 1e-12;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The method used to sign the result of [`angle_between`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngleSign {
    /// Positive when `b` is counter-clockwise of `a` about +Z, using the z
    /// component of `a x b`.
    CrossProduct,

    /// Negative when the z component of the elementwise product `a * b` is
    /// positive.
    ///
    /// For vectors in the XY plane that component is always zero, so the
    /// resulting angle is never negative.
    Elementwise,
}

impl Default for AngleSign {
    fn default() -> Self {
        AngleSign::CrossProduct
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Unit vector along +X, the robot's canonical forward direction.
pub fn x_axis() -> Vector3<f64> {
    Vector3::new(1.0, 0.0, 0.0)
}

/// Unit vector along +Z, the vertical axis.
pub fn z_axis() -> Vector3<f64> {
    Vector3::new(0.0, 0.0, 1.0)
}

/// The quaternion representing no rotation.
pub fn identity() -> Quaternion<f64> {
    Quaternion::new(1.0, 0.0, 0.0, 0.0)
}

/// Build the quaternion rotating by `angle_rad` about the unit vector `axis`.
pub fn make_quaternion(angle_rad: f64, axis: &Vector3<f64>) -> Quaternion<f64> {
    let half_angle = angle_rad / 2.0;
    let sin_half = half_angle.sin();

    Quaternion::new(
        half_angle.cos(),
        sin_half * axis[0],
        sin_half * axis[1],
        sin_half * axis[2],
    )
}

/// Inverse of a quaternion, the conjugate divided by the squared norm.
///
/// The zero quaternion has no inverse, in which case the zero quaternion is
/// returned.
pub fn quaternion_inverse(q: &Quaternion<f64>) -> Quaternion<f64> {
    let norm_sq = q.norm_squared();

    if norm_sq < DEGENERATE_NORM {
        return Quaternion::new(0.0, 0.0, 0.0, 0.0);
    }

    q.conjugate() / norm_sq
}

/// Rotate the vector `v` by the quaternion `q`.
pub fn rotate(q: &Quaternion<f64>, v: &Vector3<f64>) -> Vector3<f64> {
    let v_quat = Quaternion::new(0.0, v[0], v[1], v[2]);
    let res = *q * v_quat * quaternion_inverse(q);

    Vector3::new(res.i, res.j, res.k)
}

/// Rotate `v` by `angle_rad` about the vertical axis.
pub fn rotate_about_z(v: &Vector3<f64>, angle_rad: f64) -> Vector3<f64> {
    rotate(&make_quaternion(angle_rad, &z_axis()), v)
}

/// Return the unit vector in the direction of `v`, or the zero vector if `v`
/// has no length.
pub fn unit(v: &Vector3<f64>) -> Vector3<f64> {
    let n = v.norm();

    if n < DEGENERATE_NORM || !n.is_finite() {
        return Vector3::zeros();
    }

    v / n
}

/// Signed angle in radians from direction `a` to direction `b`.
///
/// The magnitude is in `[0, pi]`. If either vector has no length the angle is
/// zero.
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>, sign: AngleSign) -> f64 {
    let a = unit(a);
    let b = unit(b);

    if a == Vector3::zeros() || b == Vector3::zeros() {
        return 0.0;
    }

    // Rounding can push the dot of two unit vectors just outside acos' domain
    let angle = a.dot(&b).max(-1.0).min(1.0).acos();

    let negative = match sign {
        AngleSign::CrossProduct => a.cross(&b)[2] < 0.0,
        AngleSign::Elementwise => a.component_mul(&b)[2] > 0.0,
    };

    if negative {
        -angle
    } else {
        angle
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
