//! Navigation control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use comms_if::eqpt::NUM_RANGE_SENSORS;
use util::quat::AngleSign;

use super::NavCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for navigation control.
///
/// Any key missing from the parameter file takes its default value, which
/// gives the standard Bug2 tuning for a Pioneer sized robot.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct NavCtrlParams {

    // ---- SENSING ----

    /// Distance at or below which a sensor reports zero clearance.
    ///
    /// Units: meters
    pub min_detection_dist_m: f64,

    /// Distance above which a sensor reports full clearance.
    ///
    /// Units: meters
    pub max_detection_dist_m: f64,

    /// Which sensors of the ring face forwards and along the flanks.
    pub sensor_roles: SensorRoles,

    // ---- MOTION ----

    /// Nominal wheel speed while driving forwards.
    ///
    /// Units: radians/second
    pub base_wheel_speed_rads: f64,

    /// Front clearance below which an obstacle is considered to be ahead.
    pub obstacle_clearance_threshold: f64,

    /// Heading error above which the Moving state steers towards the target.
    ///
    /// Units: radians
    pub moving_head_tol_rad: f64,

    /// Tolerance used to end rotation and to detect the leave point while
    /// enveloping.
    ///
    /// Units: radians
    pub exit_tol_rad: f64,

    /// How the sign of the angle between two headings is computed.
    pub angle_sign: AngleSign,

    // ---- WALL FOLLOWING ----

    /// Desired standoff from the followed wall, in clearance units (0 is
    /// touching, 1 is at the maximum detection distance).
    pub indent_dist: f64,

    /// Rate at which the PID controllers are assumed to be sampled.
    ///
    /// Units: hertz
    pub pid_sample_rate_hz: f64,

    /// Gains of the distance stabilisation controller, acting on the standoff
    /// error.
    pub dist_stab_pid: PidGains,

    /// Gains of the follower controller, acting on the difference between the
    /// flank sensors.
    pub follower_pid: PidGains,

    /// Symmetric limit applied to the controllers' integral accumulators, or
    /// `None` for no limit.
    pub pid_integral_limit: Option<f64>,

    /// If true both controllers are reset every time wall following begins.
    /// Otherwise their memory carries over between obstacles.
    pub reset_pids_on_enveloping_entry: bool
}

/// Indexes (0-based) of the sensors with a particular role.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SensorRoles {
    pub front: usize,
    pub left_flank: usize,
    pub right_flank: usize
}

/// Proportional, integral and derivative gains.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(default)]
pub struct PidGains {
    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for NavCtrlParams {
    fn default() -> Self {
        Self {
            min_detection_dist_m: 0.0,
            max_detection_dist_m: 1.0,
            sensor_roles: SensorRoles::default(),
            base_wheel_speed_rads: 1.0,
            obstacle_clearance_threshold: 0.6,
            moving_head_tol_rad: 1f64.to_radians(),
            exit_tol_rad: 5f64.to_radians(),
            angle_sign: AngleSign::default(),
            indent_dist: 0.5,
            pid_sample_rate_hz: 50.0,
            dist_stab_pid: PidGains::new(2.0, 0.0, 0.5),
            follower_pid: PidGains::new(2.0, 0.0, 0.0),
            pid_integral_limit: None,
            reset_pids_on_enveloping_entry: false
        }
    }
}

impl Default for SensorRoles {
    fn default() -> Self {
        Self {
            front: 4,
            left_flank: 8,
            right_flank: 7
        }
    }
}

impl PidGains {
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self { k_p, k_i, k_d }
    }
}

impl NavCtrlParams {
    /// Check that the parameters are usable.
    ///
    /// This must be done before the control loop starts, never during it.
    pub fn validate(&self) -> Result<(), NavCtrlError> {
        let roles = [
            ("front", self.sensor_roles.front),
            ("left_flank", self.sensor_roles.left_flank),
            ("right_flank", self.sensor_roles.right_flank)
        ];
        for (name, index) in roles.iter() {
            if *index >= NUM_RANGE_SENSORS {
                return Err(invalid(format!(
                    "sensor role {} has index {}, but there are only {} sensors",
                    name, index, NUM_RANGE_SENSORS
                )))
            }
        }

        if !(self.pid_sample_rate_hz > 0.0) || !self.pid_sample_rate_hz.is_finite() {
            return Err(invalid(format!(
                "PID sample rate must be positive, found {}", self.pid_sample_rate_hz
            )))
        }

        if !(self.max_detection_dist_m > self.min_detection_dist_m) {
            return Err(invalid(format!(
                "max detection distance ({} m) must be greater than min detection distance ({} m)",
                self.max_detection_dist_m, self.min_detection_dist_m
            )))
        }

        let finite = [
            ("base_wheel_speed_rads", self.base_wheel_speed_rads),
            ("obstacle_clearance_threshold", self.obstacle_clearance_threshold),
            ("indent_dist", self.indent_dist),
            ("moving_head_tol_rad", self.moving_head_tol_rad),
            ("exit_tol_rad", self.exit_tol_rad)
        ];
        for (name, value) in finite.iter() {
            if !value.is_finite() {
                return Err(invalid(format!("{} must be finite, found {}", name, value)))
            }
        }

        if self.moving_head_tol_rad < 0.0 || self.exit_tol_rad < 0.0 {
            return Err(invalid("heading tolerances must not be negative".into()))
        }

        if let Some(limit) = self.pid_integral_limit {
            if !(limit > 0.0) {
                return Err(invalid(format!(
                    "PID integral limit must be positive, found {}", limit
                )))
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn invalid(msg: String) -> NavCtrlError {
    NavCtrlError::InvalidParams(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(NavCtrlParams::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let params: NavCtrlParams = util::params::from_str(r#"
            indent_dist = 0.4
            angle_sign = "Elementwise"

            [follower_pid]
            k_p = 3.0
        "#).unwrap();

        assert_eq!(params.indent_dist, 0.4);
        assert_eq!(params.angle_sign, AngleSign::Elementwise);
        assert_eq!(params.follower_pid, PidGains::new(3.0, 0.0, 0.0));
        assert_eq!(params.dist_stab_pid, PidGains::new(2.0, 0.0, 0.5));
        assert_eq!(params.sensor_roles, SensorRoles::default());
        assert_eq!(params.pid_integral_limit, None);
    }

    #[test]
    fn test_invalid_sensor_role() {
        let mut params = NavCtrlParams::default();
        params.sensor_roles.right_flank = NUM_RANGE_SENSORS;

        assert!(matches!(params.validate(), Err(NavCtrlError::InvalidParams(_))));
    }

    #[test]
    fn test_invalid_sample_rate() {
        let mut params = NavCtrlParams::default();

        params.pid_sample_rate_hz = 0.0;
        assert!(params.validate().is_err());

        params.pid_sample_rate_hz = -50.0;
        assert!(params.validate().is_err());

        params.pid_sample_rate_hz = f64::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_invalid_detection_range() {
        let mut params = NavCtrlParams::default();
        params.max_detection_dist_m = params.min_detection_dist_m;

        assert!(params.validate().is_err());
    }

    #[test]
    fn test_invalid_integral_limit() {
        let mut params = NavCtrlParams::default();
        params.pid_integral_limit = Some(0.0);

        assert!(params.validate().is_err());
    }
}
