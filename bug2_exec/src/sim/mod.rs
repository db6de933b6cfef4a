//! # Simulation module
//!
//! A kinematic simulation of a differential drive robot with a ring of 16
//! sonar sensors in a world of circular obstacles.
//!
//! The world advances by one step each time wheel velocities are commanded,
//! so a simulation runs as fast as the control loop does and is fully
//! deterministic. Pose and sonar reads never advance the world.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{Vector2, Vector3};
use std::sync::{Arc, Mutex, MutexGuard};

// Internal
pub use params::*;
use comms_if::{
    eqpt::{MotorActuator, PoseSource, RangeReading, RangeSensorArray, RangeSweep, NUM_RANGE_SENSORS},
    CommsError
};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Mounting of each sonar on the robot: x and y in the body frame in meters,
/// then the direction it faces in degrees. Index 0 is sensor 1.
pub const SONAR_RING: [(f64, f64, f64); NUM_RANGE_SENSORS] = [
    (0.069, 0.136, 90.0),
    (0.114, 0.119, 50.0),
    (0.148, 0.078, 30.0),
    (0.166, 0.027, 10.0),
    (0.166, -0.027, -10.0),
    (0.148, -0.078, -30.0),
    (0.114, -0.119, -50.0),
    (0.069, -0.136, -90.0),
    (-0.157, -0.136, -90.0),
    (-0.203, -0.119, -130.0),
    (-0.237, -0.078, -150.0),
    (-0.255, -0.027, -170.0),
    (-0.255, 0.027, 170.0),
    (-0.237, 0.078, 150.0),
    (-0.203, 0.119, 130.0),
    (-0.157, 0.136, 90.0),
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle to a simulated robot.
///
/// Clones share the same world, so one clone can be handed to the driver as
/// each of the pose source, the range sensors and the motors.
#[derive(Clone)]
pub struct SimRobot {
    world: Arc<Mutex<SimWorld>>
}

/// State of the simulated world.
#[derive(Debug, Clone)]
pub struct SimWorld {
    params: SimParams,

    /// Duration of one step.
    ///
    /// Units: seconds
    step_s: f64,

    pos_m: Vector2<f64>,
    yaw_rad: f64,

    time_s: f64,
    num_steps: u64,

    min_target_dist_m: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Invalid simulation parameters: {0}")]
    InvalidParams(String)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimRobot {
    /// Create a new simulation, stepping by `step_s` seconds on every wheel
    /// command.
    pub fn new(params: SimParams, step_s: f64) -> Result<Self, SimError> {
        params.validate()?;

        if !(step_s > 0.0) {
            return Err(SimError::InvalidParams(format!(
                "step must be positive, found {} s", step_s
            )))
        }

        let pos_m = Vector2::new(params.start_pos_m[0], params.start_pos_m[1]);
        let target_m = Vector2::new(params.target_pos_m[0], params.target_pos_m[1]);

        let world = SimWorld {
            step_s,
            pos_m,
            yaw_rad: wrap_pi(params.start_yaw_rad),
            time_s: 0.0,
            num_steps: 0,
            min_target_dist_m: (target_m - pos_m).norm(),
            params
        };

        Ok(Self {
            world: Arc::new(Mutex::new(world))
        })
    }

    /// Get a copy of the current world state.
    pub fn snapshot(&self) -> Result<SimWorld, CommsError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<SimWorld>, CommsError> {
        self.world
            .lock()
            .map_err(|_| CommsError::Driver("simulation world lock poisoned".into()))
    }
}

impl PoseSource for SimRobot {
    fn target_position(&mut self) -> Result<Vector3<f64>, CommsError> {
        let world = self.lock()?;
        let t = world.params.target_pos_m;
        Ok(Vector3::new(t[0], t[1], 0.0))
    }

    fn robot_position(&mut self) -> Result<Vector3<f64>, CommsError> {
        let world = self.lock()?;
        Ok(Vector3::new(world.pos_m[0], world.pos_m[1], 0.0))
    }

    fn robot_yaw(&mut self) -> Result<f64, CommsError> {
        Ok(self.lock()?.yaw_rad)
    }
}

impl RangeSensorArray for SimRobot {
    fn read_all(&mut self) -> Result<RangeSweep, CommsError> {
        Ok(self.lock()?.sonar_sweep())
    }
}

impl MotorActuator for SimRobot {
    fn set_wheel_velocities(&mut self, left_rads: f64, right_rads: f64) -> Result<(), CommsError> {
        if !left_rads.is_finite() || !right_rads.is_finite() {
            return Err(CommsError::InvalidData(format!(
                "wheel demands must be finite, found ({}, {})", left_rads, right_rads
            )))
        }

        self.lock()?.step(left_rads, right_rads);

        Ok(())
    }
}

impl SimWorld {
    /// Advance the world by one step with the given wheel velocities.
    ///
    /// The velocities are held constant over the step and the pose is
    /// integrated at the step's midpoint heading.
    pub fn step(&mut self, left_rads: f64, right_rads: f64) {
        let r = self.params.wheel_radius_m;

        let speed_ms = r * (left_rads + right_rads) / 2.0;
        let turn_rate_rads = r * (right_rads - left_rads) / self.params.axle_length_m;

        let mid_yaw_rad = self.yaw_rad + 0.5 * turn_rate_rads * self.step_s;

        self.pos_m += Vector2::new(mid_yaw_rad.cos(), mid_yaw_rad.sin()) * speed_ms * self.step_s;
        self.yaw_rad = wrap_pi(self.yaw_rad + turn_rate_rads * self.step_s);

        self.time_s += self.step_s;
        self.num_steps += 1;

        let dist = self.target_dist_m();
        if dist < self.min_target_dist_m {
            self.min_target_dist_m = dist;
        }

        trace!(
            "Sim step {}: pos ({:.3}, {:.3}) m, yaw {:.3} rad",
            self.num_steps, self.pos_m[0], self.pos_m[1], self.yaw_rad
        );
    }

    /// Read every sonar against the obstacles in the world.
    pub fn sonar_sweep(&self) -> RangeSweep {
        let mut sweep = [RangeReading::clear(); NUM_RANGE_SENSORS];

        let (sin_yaw, cos_yaw) = self.yaw_rad.sin_cos();

        for (reading, (x_m, y_m, angle_deg)) in sweep.iter_mut().zip(SONAR_RING.iter()) {
            let origin = self.pos_m + Vector2::new(
                cos_yaw * x_m - sin_yaw * y_m,
                sin_yaw * x_m + cos_yaw * y_m
            );
            let dir_rad = self.yaw_rad + angle_deg.to_radians();
            let dir = Vector2::new(dir_rad.cos(), dir_rad.sin());

            let nearest_m = self.params.obstacles
                .iter()
                .filter_map(|o| ray_circle_dist(&origin, &dir, o))
                .fold(f64::INFINITY, f64::min);

            // Sonar reports the detected point in its own frame, along its
            // boresight
            if nearest_m <= self.params.sonar_range_m {
                *reading = RangeReading::from_detected_point(
                    true,
                    &Vector3::new(nearest_m, 0.0, 0.0)
                );
            }
        }

        sweep
    }

    /// Distance from the robot to the target.
    pub fn target_dist_m(&self) -> f64 {
        let t = self.params.target_pos_m;
        (Vector2::new(t[0], t[1]) - self.pos_m).norm()
    }

    pub fn pos_m(&self) -> Vector2<f64> {
        self.pos_m
    }

    pub fn yaw_rad(&self) -> f64 {
        self.yaw_rad
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn num_steps(&self) -> u64 {
        self.num_steps
    }

    /// The closest the robot has been to the target since the start.
    pub fn min_target_dist_m(&self) -> f64 {
        self.min_target_dist_m
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Distance along a ray to the first intersection with a circle.
///
/// `dir` must be a unit vector. If the origin is inside the circle the
/// distance is zero. Returns `None` if the ray misses.
pub fn ray_circle_dist(
    origin: &Vector2<f64>,
    dir: &Vector2<f64>,
    obstacle: &CircleObstacle
) -> Option<f64> {
    let centre = Vector2::new(obstacle.centre_m[0], obstacle.centre_m[1]);
    let oc = origin - centre;

    let c = oc.norm_squared() - obstacle.radius_m * obstacle.radius_m;
    if c <= 0.0 {
        return Some(0.0)
    }

    let b = oc.dot(dir);
    let disc = b * b - c;
    if disc < 0.0 {
        return None
    }

    let t = -b - disc.sqrt();
    if t >= 0.0 {
        Some(t)
    }
    else {
        None
    }
}
