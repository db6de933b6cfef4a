//! Bug2 navigation executable entry point.
//!
//! # Architecture
//!
//! The executable runs the Bug2 navigation loop against the built-in
//! simulation:
//!
//!     - Start the session and logging
//!     - Load the executable, navigation and simulation parameters
//!     - Build the simulated robot and the control loop driver
//!     - Run the control loop until Ctrl-C or the cycle limit
//!     - Save a summary of the run to the session directory
//!
//! Any other robot can be driven by implementing the `comms_if::eqpt` traits
//! and handing it to `Driver::new` in place of the simulation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use serde::Serialize;
use structopt::StructOpt;

// Internal
use bug2_lib::{
    driver::{CancelToken, Driver, RunSummary},
    nav_ctrl::NavCtrlParams,
    params::Bug2ExecParams,
    sim::{SimParams, SimRobot}
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options
#[derive(Debug, StructOpt)]
#[structopt(name = "bug2_exec", about = "Bug2 obstacle avoidance navigation")]
struct Opt {
    /// Stop after this many control cycles
    #[structopt(long)]
    max_ticks: Option<u64>,

    /// Run cycles back to back instead of at the configured period
    #[structopt(long)]
    no_pace: bool,

    /// Minimum log level, one of info, debug or trace
    #[structopt(long, default_value = "debug")]
    log_level: LevelFilter
}

/// Summary saved at the end of the run.
#[derive(Serialize)]
struct SessionSummary {
    run: RunSummary,
    sim_time_s: f64,
    final_target_dist_m: f64,
    min_target_dist_m: f64
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "bug2_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opt.log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Bug2 Navigation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut exec_params: Bug2ExecParams = util::params::load(
        "bug2_exec.toml"
    ).wrap_err("Could not load exec params")?;

    if opt.no_pace {
        exec_params.driver.pace_realtime = false;
    }

    let nav_ctrl_params: NavCtrlParams = util::params::load(
        &exec_params.nav_ctrl_params_file
    ).wrap_err("Could not load NavCtrl params")?;

    let sim_params: SimParams = util::params::load(
        &exec_params.sim_params_file
    ).wrap_err("Could not load simulation params")?;

    info!("Parameters loaded");
    info!("    Angle sign convention: {:?}", nav_ctrl_params.angle_sign);
    info!("    Obstacles in world: {}", sim_params.obstacles.len());

    // ---- INITIALISE MODULES ----

    let sim = SimRobot::new(sim_params, exec_params.driver.tick_period_s)
        .wrap_err("Failed to initialise the simulation")?;

    let arch_nav_tm = Archiver::from_path(&session, "nav_ctrl/nav_tm.csv")
        .wrap_err("Failed to create the NavCtrl archive")?;

    let mut driver = Driver::new(
        exec_params.driver.clone(),
        nav_ctrl_params,
        sim.clone(),
        sim.clone(),
        sim.clone()
    )
    .wrap_err("Failed to initialise the control loop")?
    .with_archiver(arch_nav_tm);

    info!("Module initialisation complete\n");

    // ---- CANCELLATION ----

    let cancel = CancelToken::new();
    {
        let c = cancel.clone();
        ctrlc::set_handler(move || {
            info!("Received Ctrl-C, stopping");
            c.cancel();
        })
        .wrap_err("Failed to set the Ctrl-C handler")?;
    }

    // ---- MAIN LOOP ----

    let result = driver.run(&cancel, opt.max_ticks);

    // ---- SHUTDOWN ----

    let world = sim.snapshot().wrap_err("Could not read the final simulation state")?;

    info!(
        "Robot finished at ({:.3}, {:.3}) m, {:.3} m from the target (closest {:.3} m)",
        world.pos_m()[0],
        world.pos_m()[1],
        world.target_dist_m(),
        world.min_target_dist_m()
    );

    match result {
        Ok(run) => {
            info!(
                "Run ended ({:?}) after {} cycles, {} failed, {} overran",
                run.end_reason, run.num_ticks, run.num_failed_ticks, run.num_overruns
            );

            session.save("summary.json", SessionSummary {
                run,
                sim_time_s: world.time_s(),
                final_target_dist_m: world.target_dist_m(),
                min_target_dist_m: world.min_target_dist_m()
            });

            session.exit();

            info!("End of execution");
            Ok(())
        },
        Err(e) => {
            warn!("Control loop aborted");
            session.exit();
            Err(e).wrap_err("Control loop failed")
        }
    }
}
