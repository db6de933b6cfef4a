//! # Control loop driver
//!
//! The driver owns the navigation controller and the three equipment
//! collaborators, and runs the fixed period control loop:
//!
//! - Read the target position, robot position and yaw
//! - Read every proximity sensor
//! - Run one navigation cycle
//! - Send the wheel demands
//! - Archive the cycle's telemetry
//! - Sleep for the remainder of the period
//!
//! Reads are retried a limited number of times, writes never are. A cycle
//! which fails to communicate with the equipment does not step the navigation
//! state machine.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc
};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use crate::nav_ctrl::{tm::NavTm, NavCtrl, NavCtrlError, NavCtrlParams, NavInput, NavStateKind};
use comms_if::{
    eqpt::{MotorActuator, PoseSource, RangeSensorArray, WheelDems},
    CommsError
};
use util::{archive::Archiver, session};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Longest accepted control cycle period.
///
/// Units: seconds
pub const MAX_TICK_PERIOD_S: f64 = 60.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the control loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverParams {
    /// Target period of one control cycle, at most `MAX_TICK_PERIOD_S`.
    ///
    /// Units: seconds
    pub tick_period_s: f64,

    /// If false cycles run back to back without sleeping, which is useful
    /// for simulations that step on every command.
    pub pace_realtime: bool,

    /// Number of times a failed read is retried within a single cycle.
    pub max_read_retries: u32,

    /// Number of consecutive failed cycles after which the run is aborted.
    pub max_consec_comms_errors: u64,

    /// If true the first failed cycle aborts the run.
    pub abort_on_comms_error: bool,

    /// If true the motors are stopped on cycles where navigation issues no
    /// demands, rather than holding their previous command.
    pub stop_on_idle_tick: bool
}

/// Cancels a running control loop from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

/// The control loop driver.
pub struct Driver<P, R, M> {
    params: DriverParams,

    nav_ctrl: NavCtrl,

    pose: P,
    ranges: R,
    motors: M,

    arch_nav_tm: Option<Archiver>,

    num_ticks: u64,
    num_failed_ticks: u64,
    num_consec_comms_errors: u64,
    num_overruns: u64,
    num_consec_overruns: u64
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub end_reason: EndReason,
    pub num_ticks: u64,
    pub num_failed_ticks: u64,
    pub num_overruns: u64,
    pub final_state: NavStateKind
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reason a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndReason {
    Cancelled,
    MaxTicksReached
}

/// Errors that can occur while driving the control loop.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Invalid driver parameters: {0}")]
    InvalidParams(String),

    #[error("Could not create the navigation controller: {0}")]
    NavCtrl(#[from] NavCtrlError),

    #[error("Communication with the equipment failed: {0}")]
    Comms(CommsError),

    #[error("Communication with the equipment failed on {0} consecutive cycles")]
    CommsLimitExceeded(u64)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DriverParams {
    fn default() -> Self {
        Self {
            tick_period_s: 0.2,
            pace_realtime: true,
            max_read_retries: 2,
            max_consec_comms_errors: 5,
            abort_on_comms_error: false,
            stop_on_idle_tick: true
        }
    }
}

impl DriverParams {
    /// Check that the parameters are usable.
    pub fn validate(&self) -> Result<(), DriverError> {
        if !(self.tick_period_s > 0.0) || !self.tick_period_s.is_finite() {
            return Err(DriverError::InvalidParams(format!(
                "tick period must be positive, found {} s", self.tick_period_s
            )))
        }

        if self.tick_period_s > MAX_TICK_PERIOD_S {
            return Err(DriverError::InvalidParams(format!(
                "tick period must be at most {} s, found {} s",
                MAX_TICK_PERIOD_S, self.tick_period_s
            )))
        }

        if self.max_consec_comms_errors == 0 {
            return Err(DriverError::InvalidParams(
                "max_consec_comms_errors must be at least 1".into()
            ))
        }

        Ok(())
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the loop stops at the start of its next cycle.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl<P, R, M> Driver<P, R, M>
where
    P: PoseSource,
    R: RangeSensorArray,
    M: MotorActuator
{
    /// Create a new driver, validating both sets of parameters.
    pub fn new(
        params: DriverParams,
        nav_ctrl_params: NavCtrlParams,
        pose: P,
        ranges: R,
        motors: M
    ) -> Result<Self, DriverError> {
        params.validate()?;

        if (1.0 / params.tick_period_s - nav_ctrl_params.pid_sample_rate_hz).abs() > 1e-6 {
            debug!(
                "PID sample rate ({} Hz) differs from the control rate ({} Hz)",
                nav_ctrl_params.pid_sample_rate_hz,
                1.0 / params.tick_period_s
            );
        }

        let nav_ctrl = NavCtrl::new(nav_ctrl_params)?;

        Ok(Self {
            params,
            nav_ctrl,
            pose,
            ranges,
            motors,
            arch_nav_tm: None,
            num_ticks: 0,
            num_failed_ticks: 0,
            num_consec_comms_errors: 0,
            num_overruns: 0,
            num_consec_overruns: 0
        })
    }

    /// Archive the telemetry of every cycle with the given archiver.
    pub fn with_archiver(mut self, archiver: Archiver) -> Self {
        self.arch_nav_tm = Some(archiver);
        self
    }

    /// Run the control loop until cancelled, until `max_ticks` cycles have
    /// run, or until communications fail for too long.
    ///
    /// The motors are stopped before returning in every case.
    pub fn run(
        &mut self,
        cancel: &CancelToken,
        max_ticks: Option<u64>
    ) -> Result<RunSummary, DriverError> {

        info!("Begining control loop\n");

        let end_reason = loop {

            if cancel.is_cancelled() {
                info!("Control loop cancelled");
                break EndReason::Cancelled
            }

            if let Some(max) = max_ticks {
                if self.num_ticks >= max {
                    info!("Maximum number of cycles ({}) reached", max);
                    break EndReason::MaxTicksReached
                }
            }

            // Get cycle start time
            let cycle_start_instant = Instant::now();

            // ---- CONTROL CYCLE ----

            match self.tick() {
                Ok(_) => self.num_consec_comms_errors = 0,
                Err(e) => {
                    self.num_failed_ticks += 1;
                    self.num_consec_comms_errors += 1;

                    warn!("Cycle {} skipped: {}", self.num_ticks, e);
                    self.stop_motors();

                    if self.params.abort_on_comms_error {
                        error!("Aborting on communications error");
                        return Err(DriverError::Comms(e))
                    }

                    if self.num_consec_comms_errors >= self.params.max_consec_comms_errors {
                        error!(
                            "Maximum number of consecutive communication errors ({}) reached",
                            self.params.max_consec_comms_errors
                        );
                        return Err(DriverError::CommsLimitExceeded(self.num_consec_comms_errors))
                    }
                }
            }

            // ---- CYCLE MANAGEMENT ----

            if self.params.pace_realtime {
                self.sleep_remainder(cycle_start_instant);
            }
        };

        self.stop_motors();

        Ok(RunSummary {
            end_reason,
            num_ticks: self.num_ticks,
            num_failed_ticks: self.num_failed_ticks,
            num_overruns: self.num_overruns,
            final_state: self.nav_ctrl.state().kind()
        })
    }

    /// Execute a single control cycle.
    ///
    /// Returns the demands sent to the motors, if any. On error nothing has
    /// been sent and the navigation state is unchanged, unless the error came
    /// from the motors themselves.
    pub fn tick(&mut self) -> Result<Option<WheelDems>, CommsError> {
        let tick = self.num_ticks;
        self.num_ticks += 1;

        let retries = self.params.max_read_retries;

        // ---- DATA INPUT ----

        let pose = &mut self.pose;
        let target_pos_m = read_with_retries(retries, "target position", || pose.target_position())?;
        let robot_pos_m = read_with_retries(retries, "robot position", || pose.robot_position())?;
        let yaw_rad = read_with_retries(retries, "robot yaw", || pose.robot_yaw())?;

        let ranges = &mut self.ranges;
        let sweep = read_with_retries(retries, "range sensors", || ranges.read_all())?;

        let input = NavInput::from_raw(
            yaw_rad,
            &robot_pos_m,
            &target_pos_m,
            &sweep,
            self.nav_ctrl.params()
        ).map_err(|e| CommsError::InvalidData(e.to_string()))?;

        // ---- NAVIGATION ----

        let (dems, report) = self.nav_ctrl
            .proc(&input)
            .map_err(|e| CommsError::InvalidData(e.to_string()))?;

        // ---- DEMANDS OUTPUT ----

        match dems {
            Some(ref d) => self.motors.send_demands(d)?,
            None if self.params.stop_on_idle_tick => self.motors.stop()?,
            None => ()
        }

        // ---- WRITE ARCHIVES ----

        if let Some(ref mut arch) = self.arch_nav_tm {
            let tm = NavTm::new(
                tick,
                session::get_elapsed_seconds(),
                &robot_pos_m,
                &target_pos_m,
                yaw_rad,
                &report,
                dems.as_ref()
            );

            if let Err(e) = arch.serialise(tm) {
                warn!("Could not archive navigation telemetry: {}", e);
            }
        }

        Ok(dems)
    }

    pub fn nav_ctrl(&self) -> &NavCtrl {
        &self.nav_ctrl
    }

    pub fn num_ticks(&self) -> u64 {
        self.num_ticks
    }

    pub fn num_failed_ticks(&self) -> u64 {
        self.num_failed_ticks
    }

    pub fn motors(&self) -> &M {
        &self.motors
    }

    pub fn pose(&self) -> &P {
        &self.pose
    }

    pub fn ranges(&self) -> &R {
        &self.ranges
    }

    /// Best effort stop, failures are only logged.
    fn stop_motors(&mut self) {
        if let Err(e) = self.motors.stop() {
            warn!("Could not stop the motors: {}", e);
        }
    }

    /// Sleep until the end of the current cycle, warning if it overran.
    fn sleep_remainder(&mut self, cycle_start_instant: Instant) {
        let cycle_dur = Instant::now() - cycle_start_instant;
        let period = Duration::from_secs_f64(self.params.tick_period_s);

        match period.checked_sub(cycle_dur) {
            Some(d) => {
                self.num_consec_overruns = 0;
                thread::sleep(d);
            },
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - period.as_secs_f64()
                );
                self.num_overruns += 1;
                self.num_consec_overruns += 1;

                trace!("{} consecutive overruns", self.num_consec_overruns);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Perform a read, retrying up to `max_retries` times if it fails.
///
/// The error of the final attempt is returned.
pub fn read_with_retries<T, F>(
    max_retries: u32,
    name: &str,
    mut read: F
) -> Result<T, CommsError>
where
    F: FnMut() -> Result<T, CommsError>
{
    let mut attempt = 0;

    loop {
        match read() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                debug!("Reading {} failed ({}), retry {}/{}", name, e, attempt, max_retries);
            },
            Err(e) => return Err(e)
        }
    }
}
