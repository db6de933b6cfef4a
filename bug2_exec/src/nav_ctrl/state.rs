//! Navigation control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace};
use nalgebra::Vector3;
use serde::Serialize;

// Internal
use super::*;
use comms_if::eqpt::{RangeSweep, WheelDems};
use util::quat::angle_between;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Bug2 navigation controller.
///
/// Owns the navigation state and both wall following controllers for the
/// lifetime of a run.
pub struct NavCtrl {
    params: NavCtrlParams,

    /// Executing state
    state: NavState,

    /// Controller objects used while enveloping
    controllers: WallFollowControllers,

    report: StatusReport
}

/// Everything the controller needs for one cycle.
#[derive(Debug, Clone, Copy)]
pub struct NavInput {
    /// Unit vector the robot is facing along
    pub heading: Vector3<f64>,

    /// Vector from the robot to the target in the XY plane
    pub target_vec: Vector3<f64>,

    /// Clearance of each sensor
    pub clearance: ClearanceArray
}

/// Demands for the cycle, or `None` if the active state issued no command,
/// along with the cycle's status report.
pub type NavOutput = (Option<WheelDems>, StatusReport);

/// The status report containing the quantities evaluated during a cycle.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// State at the start of the cycle
    pub state_in: NavStateKind,

    /// State at the end of the cycle
    pub state_out: NavStateKind,

    /// Clearance of the front sensor
    pub front_clearance: f64,

    /// The angle compared against a tolerance this cycle, if any. This is the
    /// heading error in Moving and Rotating, and the leave angle in Enveloping.
    pub angle_rad: Option<f64>,

    /// Difference between the right and left flank clearances
    pub flank_delta: Option<f64>,

    /// Error between the nearest flank clearance and the indent distance
    pub standoff_error: Option<f64>,

    /// Distance stabilisation controller output
    pub u_dist_stab: Option<f64>,

    /// Follower controller output
    pub u_follower: Option<f64>,

    /// Turn applied to avoid an obstacle in front while enveloping
    pub front_penalty: Option<f64>
}

/// Output of a state's step function.
struct StepOutput {
    /// State to switch to, if the state is changing
    next: Option<NavState>,

    /// Demands to send to the wheels, if any
    dems: Option<WheelDems>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible states of navigation. Each state is handled by a `mode_xyz`
/// function.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NavState {
    /// Driving towards the target.
    Moving,

    /// Turning on the spot until the robot faces `target_heading`, which was
    /// captured when the obstacle was detected.
    Rotating {
        target_heading: Vector3<f64>
    },

    /// Following the boundary of an obstacle until the leave point.
    Enveloping
}

/// The state without any associated data, used for reporting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum NavStateKind {
    Moving,
    Rotating,
    Enveloping
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NavCtrl {
    /// Create a new controller in the Moving state.
    pub fn new(params: NavCtrlParams) -> Result<Self, NavCtrlError> {
        params.validate()?;

        let controllers = WallFollowControllers::new(&params);

        Ok(Self {
            params,
            state: NavState::Moving,
            controllers,
            report: StatusReport::default()
        })
    }

    /// Process one navigation cycle.
    ///
    /// Returns the wheel demands for this cycle, or `None` if the active state
    /// issued no command, along with the status report.
    pub fn proc(
        &mut self,
        input: &NavInput
    ) -> Result<NavOutput, NavCtrlError> {

        input.check()?;

        // Setup cycle data
        let kind = self.state.kind();
        self.report = StatusReport {
            state_in: kind,
            state_out: kind,
            front_clearance: input.clearance[self.params.sensor_roles.front],
            ..Default::default()
        };

        // State execution
        let output = match self.state {
            NavState::Moving => mode_moving(
                &self.params, input, &mut self.report
            ),
            NavState::Rotating { target_heading } => mode_rotating(
                &self.params, input, &target_heading, &mut self.report
            ),
            NavState::Enveloping => mode_enveloping(
                &self.params, input, &mut self.controllers, &mut self.report
            )
        };

        if let Some(next) = output.next {
            info!("NavCtrl: {:?} -> {:?}", self.state.kind(), next.kind());

            if next == NavState::Enveloping && self.params.reset_pids_on_enveloping_entry {
                self.controllers.reset();
            }

            self.state = next;
        }

        self.report.state_out = self.state.kind();

        if let Some(dems) = output.dems {
            trace!(
                "NavCtrl demands: left {:.4} rad/s, right {:.4} rad/s",
                dems.left_rads, dems.right_rads
            );
        }

        Ok((output.dems, self.report))
    }

    /// The current navigation state.
    pub fn state(&self) -> &NavState {
        &self.state
    }

    /// The report from the most recent cycle.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    pub fn params(&self) -> &NavCtrlParams {
        &self.params
    }

    pub fn controllers(&self) -> &WallFollowControllers {
        &self.controllers
    }
}

impl NavInput {
    /// Build the input from raw pose and sensor data.
    ///
    /// Fails if any sensor reports a detection without a finite distance.
    pub fn from_raw(
        robot_yaw_rad: f64,
        robot_pos_m: &Vector3<f64>,
        target_pos_m: &Vector3<f64>,
        sweep: &RangeSweep,
        params: &NavCtrlParams
    ) -> Result<Self, NavCtrlError> {
        Ok(Self {
            heading: heading_from_yaw(robot_yaw_rad),
            target_vec: planar_target_vector(robot_pos_m, target_pos_m),
            clearance: normalise_sweep(
                sweep,
                params.min_detection_dist_m,
                params.max_detection_dist_m
            )?
        })
    }

    /// Check that no part of the input is NaN or infinite.
    fn check(&self) -> Result<(), NavCtrlError> {
        if self.heading.iter().any(|v| !v.is_finite()) {
            return Err(NavCtrlError::NonFiniteInput("heading"))
        }
        if self.target_vec.iter().any(|v| !v.is_finite()) {
            return Err(NavCtrlError::NonFiniteInput("target vector"))
        }
        if self.clearance.iter().any(|v| !v.is_finite()) {
            return Err(NavCtrlError::NonFiniteInput("clearance"))
        }

        Ok(())
    }
}

impl NavState {
    pub fn kind(&self) -> NavStateKind {
        match self {
            NavState::Moving => NavStateKind::Moving,
            NavState::Rotating { .. } => NavStateKind::Rotating,
            NavState::Enveloping => NavStateKind::Enveloping
        }
    }
}

impl Default for NavStateKind {
    fn default() -> Self {
        NavStateKind::Moving
    }
}

impl StepOutput {
    fn drive(left_rads: f64, right_rads: f64) -> Self {
        Self {
            next: None,
            dems: Some(WheelDems::new(left_rads, right_rads))
        }
    }

    fn switch_to(state: NavState) -> Self {
        Self {
            next: Some(state),
            dems: None
        }
    }
}

// ---------------------------------------------------------------------------
// STATE FUNCTIONS
// ---------------------------------------------------------------------------

/// State moving towards the target.
///
/// If an obstacle is ahead the robot switches to Rotating, aiming a quarter
/// turn counter-clockwise of its current heading. Otherwise it steers towards
/// the target whenever the heading error is outside tolerance.
fn mode_moving(
    params: &NavCtrlParams,
    input: &NavInput,
    report: &mut StatusReport
) -> StepOutput {

    let front = input.clearance[params.sensor_roles.front];

    if front < params.obstacle_clearance_threshold {
        info!("Obstacle ahead (front clearance {:.3})", front);

        return StepOutput::switch_to(NavState::Rotating {
            target_heading: quarter_turn_ccw(&input.heading)
        })
    }

    let angle = angle_between(&input.heading, &input.target_vec, params.angle_sign);
    report.angle_rad = Some(angle);

    let base = params.base_wheel_speed_rads;

    if angle.abs() > params.moving_head_tol_rad {
        StepOutput::drive(base + angle, base - angle)
    }
    else {
        StepOutput::drive(base, base)
    }
}

/// State turning on the spot to the heading captured on entering the state.
///
/// Once within tolerance the robot begins enveloping the obstacle.
fn mode_rotating(
    params: &NavCtrlParams,
    input: &NavInput,
    target_heading: &Vector3<f64>,
    report: &mut StatusReport
) -> StepOutput {

    let angle = angle_between(&input.heading, target_heading, params.angle_sign);
    report.angle_rad = Some(angle);

    if angle.abs() > params.exit_tol_rad {
        StepOutput::drive(angle, -angle)
    }
    else {
        StepOutput::switch_to(NavState::Enveloping)
    }
}

/// State following the obstacle's boundary.
///
/// The robot leaves the obstacle when the target lies a quarter turn
/// counter-clockwise of its heading. Until then the flank sensors drive two
/// PID controllers, one holding the robot parallel to the wall and one holding
/// it at the indent distance, while the front sensor turns it away from
/// anything directly ahead.
fn mode_enveloping(
    params: &NavCtrlParams,
    input: &NavInput,
    controllers: &mut WallFollowControllers,
    report: &mut StatusReport
) -> StepOutput {

    let perp = quarter_turn_ccw(&input.heading);
    let leave_angle = angle_between(&perp, &input.target_vec, params.angle_sign);
    report.angle_rad = Some(leave_angle);

    if leave_angle.abs() < params.exit_tol_rad {
        info!("Leave point reached (leave angle {:.4} rad)", leave_angle);
        return StepOutput::switch_to(NavState::Moving)
    }

    let roles = &params.sensor_roles;
    let right = input.clearance[roles.right_flank];
    let left = input.clearance[roles.left_flank];
    let front = input.clearance[roles.front];

    let delta = right - left;

    let standoff_error = if delta < 0.0 {
        right - params.indent_dist
    }
    else {
        left - params.indent_dist
    };

    let u_dist_stab = controllers.dist_stab.output(standoff_error);
    let u_follower = controllers.follower.output(delta);

    let front_penalty = 1.0 - front;

    report.flank_delta = Some(delta);
    report.standoff_error = Some(standoff_error);
    report.u_dist_stab = Some(u_dist_stab);
    report.u_follower = Some(u_follower);
    report.front_penalty = Some(front_penalty);

    let base = params.base_wheel_speed_rads;

    StepOutput::drive(
        base + u_follower + u_dist_stab - front_penalty,
        base - u_follower - u_dist_stab + front_penalty
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use comms_if::eqpt::NUM_RANGE_SENSORS;
    use util::quat::{rotate_about_z, AngleSign};

    const TOL: f64 = 1e-9;

    fn input(heading: Vector3<f64>, target_vec: Vector3<f64>) -> NavInput {
        NavInput {
            heading,
            target_vec,
            clearance: [1.0; NUM_RANGE_SENSORS]
        }
    }

    fn x() -> Vector3<f64> {
        Vector3::new(1.0, 0.0, 0.0)
    }

    fn nav_in(state: NavState) -> NavCtrl {
        let mut nav = NavCtrl::new(NavCtrlParams::default()).unwrap();
        nav.state = state;
        nav
    }

    #[test]
    fn test_starts_moving() {
        let nav = NavCtrl::new(NavCtrlParams::default()).unwrap();
        assert_eq!(*nav.state(), NavState::Moving);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut params = NavCtrlParams::default();
        params.sensor_roles.front = 99;

        assert!(NavCtrl::new(params).is_err());
    }

    /// Straight-line approach with the target 10 degrees off the heading.
    #[test]
    fn test_moving_steers_towards_target() {
        let mut nav = nav_in(NavState::Moving);
        let ten_deg = 10f64.to_radians();

        let mut i = input(x(), rotate_about_z(&x(), ten_deg) * 3.0);
        i.clearance[4] = 0.9;

        let (dems, report) = nav.proc(&i).unwrap();
        let dems = dems.unwrap();

        assert!((dems.left_rads - (1.0 + ten_deg)).abs() < 1e-6);
        assert!((dems.right_rads - (1.0 - ten_deg)).abs() < 1e-6);
        assert_eq!(*nav.state(), NavState::Moving);
        assert_eq!(report.state_out, NavStateKind::Moving);
    }

    #[test]
    fn test_moving_straight_within_tolerance() {
        let mut nav = nav_in(NavState::Moving);

        let i = input(x(), rotate_about_z(&x(), 0.5f64.to_radians()));
        let (dems, _) = nav.proc(&i).unwrap();

        assert_eq!(dems, Some(WheelDems::new(1.0, 1.0)));
    }

    /// An obstacle ahead triggers rotation towards a quarter turn left.
    #[test]
    fn test_moving_detects_obstacle() {
        let mut nav = nav_in(NavState::Moving);
        let heading = rotate_about_z(&x(), 0.4);

        let mut i = input(heading, x());
        i.clearance[4] = 0.3;

        let (dems, report) = nav.proc(&i).unwrap();

        assert!(dems.is_none());
        assert_eq!(report.state_in, NavStateKind::Moving);
        assert_eq!(report.state_out, NavStateKind::Rotating);

        match nav.state() {
            NavState::Rotating { target_heading } => {
                let expected = rotate_about_z(&heading, std::f64::consts::FRAC_PI_2);
                assert!((target_heading - expected).norm() < TOL);
            },
            s => panic!("Expected Rotating, found {:?}", s)
        }
    }

    #[test]
    fn test_rotating_turns_on_the_spot() {
        let target_heading = rotate_about_z(&x(), 0.5);
        let mut nav = nav_in(NavState::Rotating { target_heading });

        let (dems, _) = nav.proc(&input(x(), x())).unwrap();
        let dems = dems.unwrap();

        assert!((dems.left_rads - 0.5).abs() < 1e-6);
        assert!((dems.right_rads + 0.5).abs() < 1e-6);
        assert_eq!(nav.state().kind(), NavStateKind::Rotating);
    }

    /// Rotation within tolerance moves on to enveloping without a command.
    #[test]
    fn test_rotating_complete() {
        let target_heading = rotate_about_z(&x(), 2f64.to_radians());
        let mut nav = nav_in(NavState::Rotating { target_heading });

        let (dems, report) = nav.proc(&input(x(), x())).unwrap();

        assert!(dems.is_none());
        assert_eq!(*nav.state(), NavState::Enveloping);
        assert_eq!(report.state_out, NavStateKind::Enveloping);
    }

    /// The target is 3 degrees from the left perpendicular, so the robot
    /// leaves the obstacle.
    #[test]
    fn test_enveloping_leave_point() {
        let mut nav = nav_in(NavState::Enveloping);
        let target_vec = rotate_about_z(&x(), 93f64.to_radians()) * 2.0;

        let (dems, _) = nav.proc(&input(x(), target_vec)).unwrap();

        assert!(dems.is_none());
        assert_eq!(*nav.state(), NavState::Moving);
    }

    /// Wall following step with the flank clearances 0.6 (right) and 0.4
    /// (left).
    #[test]
    fn test_enveloping_wall_follow_step() {
        let mut nav = nav_in(NavState::Enveloping);

        let mut i = input(x(), -x());
        i.clearance[7] = 0.6;
        i.clearance[8] = 0.4;
        i.clearance[4] = 0.8;

        let (dems, report) = nav.proc(&i).unwrap();
        let dems = dems.unwrap();

        assert!((report.flank_delta.unwrap() - 0.2).abs() < TOL);
        assert!((report.standoff_error.unwrap() + 0.1).abs() < TOL);

        // dist: 2 * -0.1 + 0.5 * (-0.1 / 0.02), follower: 2 * 0.2
        let u_dist = -2.7;
        let u_follow = 0.4;
        let penalty = 1.0 - 0.8;

        assert!((report.u_dist_stab.unwrap() - u_dist).abs() < 1e-6);
        assert!((report.u_follower.unwrap() - u_follow).abs() < 1e-6);
        assert!((dems.left_rads - (1.0 + u_follow + u_dist - penalty)).abs() < 1e-6);
        assert!((dems.right_rads - (1.0 - u_follow - u_dist + penalty)).abs() < 1e-6);
        assert_eq!(*nav.state(), NavState::Enveloping);
    }

    #[test]
    fn test_enveloping_uses_nearest_flank_for_standoff() {
        let mut nav = nav_in(NavState::Enveloping);

        let mut i = input(x(), -x());
        i.clearance[7] = 0.3;
        i.clearance[8] = 0.7;

        let (_, report) = nav.proc(&i).unwrap();

        assert!((report.flank_delta.unwrap() + 0.4).abs() < TOL);
        assert!((report.standoff_error.unwrap() + 0.2).abs() < TOL);
    }

    /// Controller memory carries over from one obstacle to the next by
    /// default.
    #[test]
    fn test_pid_memory_survives_reentry() {
        let mut nav = nav_in(NavState::Enveloping);

        let mut i = input(x(), -x());
        i.clearance[7] = 0.9;
        i.clearance[8] = 0.6;
        nav.proc(&i).unwrap();

        let prev = nav.controllers().follower.prev_error();
        assert!((prev - 0.3).abs() < TOL);

        // Around again: Enveloping -> Moving -> Rotating -> Enveloping
        nav.state = NavState::Rotating { target_heading: x() };
        nav.proc(&input(x(), x())).unwrap();
        assert_eq!(*nav.state(), NavState::Enveloping);

        assert!((nav.controllers().follower.prev_error() - prev).abs() < TOL);
    }

    #[test]
    fn test_pid_reset_on_entry_when_configured() {
        let mut params = NavCtrlParams::default();
        params.reset_pids_on_enveloping_entry = true;
        let mut nav = NavCtrl::new(params).unwrap();
        nav.state = NavState::Enveloping;

        let mut i = input(x(), -x());
        i.clearance[7] = 0.9;
        i.clearance[8] = 0.6;
        nav.proc(&i).unwrap();
        assert!(nav.controllers().follower.prev_error() != 0.0);

        nav.state = NavState::Rotating { target_heading: x() };
        nav.proc(&input(x(), x())).unwrap();

        assert_eq!(nav.controllers().follower.prev_error(), 0.0);
        assert_eq!(nav.controllers().dist_stab.integral(), 0.0);
    }

    /// With the elementwise sign the heading error is never negative, so the
    /// robot always turns the same way.
    #[test]
    fn test_elementwise_sign_always_turns_clockwise() {
        let mut params = NavCtrlParams::default();
        params.angle_sign = AngleSign::Elementwise;
        let mut nav = NavCtrl::new(params).unwrap();

        let ten_deg = 10f64.to_radians();
        let (dems, _) = nav.proc(&input(x(), rotate_about_z(&x(), -ten_deg))).unwrap();
        let dems = dems.unwrap();

        assert!((dems.left_rads - (1.0 + ten_deg)).abs() < 1e-6);
        assert!((dems.right_rads - (1.0 - ten_deg)).abs() < 1e-6);

        let mut nav = NavCtrl::new(NavCtrlParams::default()).unwrap();
        let (dems, _) = nav.proc(&input(x(), rotate_about_z(&x(), -ten_deg))).unwrap();
        let dems = dems.unwrap();

        assert!((dems.left_rads - (1.0 - ten_deg)).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let mut nav = nav_in(NavState::Moving);

        let mut i = input(x(), x());
        i.clearance[3] = f64::NAN;

        assert!(matches!(nav.proc(&i), Err(NavCtrlError::NonFiniteInput(_))));
        assert_eq!(*nav.state(), NavState::Moving);
    }

    #[test]
    fn test_input_from_raw() {
        let params = NavCtrlParams::default();
        let mut sweep = [comms_if::eqpt::RangeReading::clear(); NUM_RANGE_SENSORS];
        sweep[4] = comms_if::eqpt::RangeReading::detected(0.25);

        let i = NavInput::from_raw(
            std::f64::consts::FRAC_PI_2,
            &Vector3::new(1.0, 1.0, 0.2),
            &Vector3::new(1.0, 3.0, 0.0),
            &sweep,
            &params
        ).unwrap();

        assert!((i.heading - Vector3::new(0.0, 1.0, 0.0)).norm() < TOL);
        assert_eq!(i.target_vec, Vector3::new(0.0, 2.0, 0.0));
        assert!((i.clearance[4] - 0.25).abs() < TOL);
        assert_eq!(i.clearance[0], 1.0);
    }

    #[test]
    fn test_input_from_raw_rejects_nan_detection() {
        let params = NavCtrlParams::default();
        let mut sweep = [comms_if::eqpt::RangeReading::clear(); NUM_RANGE_SENSORS];
        sweep[4] = comms_if::eqpt::RangeReading::detected(f64::NAN);

        let r = NavInput::from_raw(
            0.0,
            &Vector3::new(0.0, 0.0, 0.0),
            &Vector3::new(1.0, 0.0, 0.0),
            &sweep,
            &params
        );

        assert!(matches!(r, Err(NavCtrlError::InvalidReading { sensor: 5, .. })));
    }
}
