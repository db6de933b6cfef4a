//! # Wall following controllers module
//!
//! This module provides the PID controllers used while enveloping an
//! obstacle. Unlike a wall-clock driven controller these assume a fixed sample
//! rate, so the time step is the same on every call regardless of how long a
//! control cycle actually took.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::{NavCtrlParams, PidGains};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A discrete PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Rate at which the controller is sampled
    sample_rate_hz: f64,

    /// Optional symmetric limit on the integral accumulation
    integral_limit: Option<f64>,

    /// Previous error
    prev_error: f64,

    /// The integral accumulation
    integral: f64
}

/// The wall following controllers
#[derive(Debug, Serialize, Clone)]
pub struct WallFollowControllers {
    /// Keeps the robot at the indent distance from the wall
    pub dist_stab: PidController,

    /// Keeps the robot parallel to the wall
    pub follower: PidController
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with zero gains.
    ///
    /// Gains are set afterwards with `set_coefficients`.
    pub fn new(sample_rate_hz: f64) -> Self {
        Self {
            k_p: 0f64,
            k_i: 0f64,
            k_d: 0f64,
            sample_rate_hz,
            integral_limit: None,
            prev_error: 0f64,
            integral: 0f64
        }
    }

    /// Create a new controller with the given gains.
    pub fn with_gains(gains: &PidGains, sample_rate_hz: f64) -> Self {
        let mut pid = Self::new(sample_rate_hz);
        pid.set_coefficients(gains.k_p, gains.k_i, gains.k_d);
        pid
    }

    /// Set the gains of the controller, leaving its memory untouched.
    pub fn set_coefficients(&mut self, k_p: f64, k_i: f64, k_d: f64) {
        self.k_p = k_p;
        self.k_i = k_i;
        self.k_d = k_d;
    }

    /// Limit the magnitude of the integral accumulation, or remove the limit
    /// with `None`.
    pub fn set_integral_limit(&mut self, limit: Option<f64>) {
        self.integral_limit = limit;
    }

    /// Get the value of the controller for the given error.
    pub fn output(&mut self, error: f64) -> f64 {
        let dt = self.dt();

        self.integral += error * dt;
        if let Some(limit) = self.integral_limit {
            self.integral = self.integral.max(-limit).min(limit);
        }

        // The previous error starts at zero, so the first call sees the whole
        // error as a step
        let deriv = (error - self.prev_error) / dt;

        self.prev_error = error;

        self.k_p * error
            + self.k_i * self.integral
            + self.k_d * deriv
    }

    /// Clear the integral accumulation and previous error.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = 0f64;
    }

    /// The time step between samples in seconds.
    pub fn dt(&self) -> f64 {
        1.0 / self.sample_rate_hz
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }
}

impl WallFollowControllers {

    /// Create a new instance of the controllers from the parameters
    pub fn new(params: &NavCtrlParams) -> Self {
        let mut dist_stab = PidController::with_gains(
            &params.dist_stab_pid, params.pid_sample_rate_hz
        );
        let mut follower = PidController::with_gains(
            &params.follower_pid, params.pid_sample_rate_hz
        );

        dist_stab.set_integral_limit(params.pid_integral_limit);
        follower.set_integral_limit(params.pid_integral_limit);

        Self { dist_stab, follower }
    }

    /// Reset both controllers.
    pub fn reset(&mut self) {
        self.dist_stab.reset();
        self.follower.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_proportional() {
        let mut pid = PidController::new(50.0);
        pid.set_coefficients(2.0, 0.0, 0.0);

        assert!((pid.output(0.5) - 1.0).abs() < TOL);
        assert!((pid.output(-0.25) + 0.5).abs() < TOL);
    }

    #[test]
    fn test_new_controller_outputs_nothing() {
        let mut pid = PidController::new(50.0);
        assert_eq!(pid.output(3.0), 0.0);
    }

    #[test]
    fn test_integral_accumulates_at_sample_rate() {
        let mut pid = PidController::new(10.0);
        pid.set_coefficients(0.0, 1.0, 0.0);

        pid.output(1.0);
        let out = pid.output(1.0);

        assert!((out - 0.2).abs() < TOL);
        assert!((pid.integral() - 0.2).abs() < TOL);
    }

    #[test]
    fn test_derivative_kick_on_first_call() {
        let mut pid = PidController::new(50.0);
        pid.set_coefficients(0.0, 0.0, 0.5);

        // (0.1 - 0) / 0.02 * 0.5
        assert!((pid.output(0.1) - 2.5).abs() < TOL);

        // No change in error, no derivative
        assert!(pid.output(0.1).abs() < TOL);
    }

    #[test]
    fn test_integral_is_unbounded_by_default() {
        let mut pid = PidController::new(1.0);
        pid.set_coefficients(0.0, 1.0, 0.0);

        for _ in 0..100 {
            pid.output(1.0);
        }

        assert!((pid.integral() - 100.0).abs() < TOL);
    }

    #[test]
    fn test_integral_limit() {
        let mut pid = PidController::new(1.0);
        pid.set_coefficients(0.0, 1.0, 0.0);
        pid.set_integral_limit(Some(5.0));

        for _ in 0..100 {
            pid.output(1.0);
        }
        assert!((pid.integral() - 5.0).abs() < TOL);

        for _ in 0..100 {
            pid.output(-1.0);
        }
        assert!((pid.integral() + 5.0).abs() < TOL);
    }

    #[test]
    fn test_reset() {
        let mut pid = PidController::new(50.0);
        pid.set_coefficients(1.0, 1.0, 1.0);

        pid.output(0.7);
        pid.output(0.3);
        pid.reset();

        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.prev_error(), 0.0);
    }

    #[test]
    fn test_coefficients_can_change_without_reset() {
        let mut pid = PidController::new(10.0);
        pid.set_coefficients(0.0, 1.0, 0.0);
        pid.output(1.0);

        pid.set_coefficients(0.0, 2.0, 0.0);

        // Integral is now 0.2, doubled by the new gain
        assert!((pid.output(1.0) - 0.4).abs() < TOL);
    }

    #[test]
    fn test_wall_follow_controllers_from_params() {
        let params = NavCtrlParams::default();
        let mut ctrls = WallFollowControllers::new(&params);

        // kp = 2, kd = 0.5, dt = 0.02
        assert!((ctrls.dist_stab.output(-0.1) + 2.7).abs() < TOL);
        // kp = 2
        assert!((ctrls.follower.output(0.2) - 0.4).abs() < TOL);

        ctrls.reset();
        assert_eq!(ctrls.dist_stab.prev_error(), 0.0);
        assert_eq!(ctrls.follower.prev_error(), 0.0);
    }
}
