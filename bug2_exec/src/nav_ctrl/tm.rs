//! Navigation telemetry record
//!
//! One flat record per control cycle, written to the session archive as CSV.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::Serialize;

use super::{NavStateKind, StatusReport};
use comms_if::eqpt::WheelDems;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Telemetry for a single navigation cycle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NavTm {
    pub tick: u64,
    pub elapsed_s: f64,

    pub pos_x_m: f64,
    pub pos_y_m: f64,
    pub yaw_rad: f64,
    pub target_dist_m: f64,

    pub state_in: NavStateKind,
    pub state_out: NavStateKind,

    pub angle_rad: Option<f64>,
    pub front_clearance: f64,
    pub flank_delta: Option<f64>,
    pub standoff_error: Option<f64>,
    pub u_dist_stab: Option<f64>,
    pub u_follower: Option<f64>,
    pub front_penalty: Option<f64>,

    pub left_rads: Option<f64>,
    pub right_rads: Option<f64>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NavTm {
    pub fn new(
        tick: u64,
        elapsed_s: f64,
        robot_pos_m: &Vector3<f64>,
        target_pos_m: &Vector3<f64>,
        yaw_rad: f64,
        report: &StatusReport,
        dems: Option<&WheelDems>
    ) -> Self {
        let target_dist_m = (target_pos_m.xy() - robot_pos_m.xy()).norm();

        Self {
            tick,
            elapsed_s,
            pos_x_m: robot_pos_m[0],
            pos_y_m: robot_pos_m[1],
            yaw_rad,
            target_dist_m,
            state_in: report.state_in,
            state_out: report.state_out,
            angle_rad: report.angle_rad,
            front_clearance: report.front_clearance,
            flank_delta: report.flank_delta,
            standoff_error: report.standoff_error,
            u_dist_stab: report.u_dist_stab,
            u_follower: report.u_follower,
            front_penalty: report.front_penalty,
            left_rads: dems.map(|d| d.left_rads),
            right_rads: dems.map(|d| d.right_rads)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tm_from_report() {
        let report = StatusReport {
            state_in: NavStateKind::Moving,
            state_out: NavStateKind::Rotating,
            front_clearance: 0.4,
            ..Default::default()
        };

        let tm = NavTm::new(
            3,
            0.6,
            &Vector3::new(1.0, 1.0, 0.1),
            &Vector3::new(4.0, 5.0, 0.0),
            0.2,
            &report,
            None
        );

        assert_eq!(tm.target_dist_m, 5.0);
        assert_eq!(tm.state_out, NavStateKind::Rotating);
        assert!(tm.left_rads.is_none());
        assert!(tm.u_follower.is_none());
    }
}
