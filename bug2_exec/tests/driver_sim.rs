//! Control loop tests against the simulated robot.

use std::thread;
use std::time::Duration;

use bug2_lib::{
    driver::{CancelToken, Driver, DriverParams, EndReason},
    nav_ctrl::{NavCtrlParams, NavStateKind},
    sim::{CircleObstacle, SimParams, SimRobot},
};
use util::{archive::Archiver, maths::wrap_pi, quat::AngleSign};

fn unpaced() -> DriverParams {
    DriverParams {
        pace_realtime: false,
        ..Default::default()
    }
}

fn nav_params(angle_sign: AngleSign) -> NavCtrlParams {
    NavCtrlParams {
        angle_sign,
        ..Default::default()
    }
}

fn sim_with_target(target: [f64; 2]) -> SimParams {
    SimParams {
        target_pos_m: target,
        ..Default::default()
    }
}

fn build(
    driver_params: DriverParams,
    nav_ctrl_params: NavCtrlParams,
    sim_params: SimParams,
) -> (Driver<SimRobot, SimRobot, SimRobot>, SimRobot) {
    let sim = SimRobot::new(sim_params, driver_params.tick_period_s).unwrap();
    let driver = Driver::new(
        driver_params,
        nav_ctrl_params,
        sim.clone(),
        sim.clone(),
        sim.clone(),
    )
    .unwrap();

    (driver, sim)
}

/// Absolute angle between the robot's heading and the bearing to the target.
fn heading_error_rad(sim: &SimRobot) -> f64 {
    let world = sim.snapshot().unwrap();
    let target = world.params().target_pos_m;
    let pos = world.pos_m();

    let bearing = (target[1] - pos[1]).atan2(target[0] - pos[0]);
    wrap_pi(bearing - world.yaw_rad()).abs()
}

#[test]
fn test_open_field_reaches_target() {
    let (mut driver, sim) = build(
        unpaced(),
        nav_params(AngleSign::Elementwise),
        sim_with_target([3.0, -1.0]),
    );

    let summary = driver.run(&CancelToken::new(), Some(600)).unwrap();

    assert_eq!(summary.end_reason, EndReason::MaxTicksReached);
    assert_eq!(summary.num_failed_ticks, 0);

    let world = sim.snapshot().unwrap();
    assert!(
        world.min_target_dist_m() < 0.15,
        "closest approach was {} m",
        world.min_target_dist_m()
    );
}

/// With the target on the clockwise side, the elementwise sign turns the
/// robot towards it and the cross product sign turns it away.
#[test]
fn test_angle_sign_conventions_diverge() {
    let initial_err = (0.5f64).atan();

    let (mut driver, sim) = build(
        unpaced(),
        nav_params(AngleSign::Elementwise),
        sim_with_target([2.0, -1.0]),
    );
    assert!((heading_error_rad(&sim) - initial_err).abs() < 1e-9);

    driver.run(&CancelToken::new(), Some(5)).unwrap();
    let elementwise_err = heading_error_rad(&sim);

    let (mut driver, sim) = build(
        unpaced(),
        nav_params(AngleSign::CrossProduct),
        sim_with_target([2.0, -1.0]),
    );

    driver.run(&CancelToken::new(), Some(5)).unwrap();
    let cross_product_err = heading_error_rad(&sim);

    assert!(elementwise_err < initial_err);
    assert!(cross_product_err > initial_err);
}

#[test]
fn test_obstacle_triggers_rotation_then_envelope() {
    let mut sim_params = sim_with_target([4.0, 0.0]);
    sim_params
        .obstacles
        .push(CircleObstacle::new([1.5, 0.0], 0.5));

    let (mut driver, _sim) = build(unpaced(), nav_params(AngleSign::Elementwise), sim_params);

    let mut visited = vec![NavStateKind::Moving];

    for _ in 0..300 {
        driver.tick().unwrap();

        let kind = driver.nav_ctrl().state().kind();
        if visited.last() != Some(&kind) {
            visited.push(kind);
        }
    }

    assert!(
        visited.len() >= 3,
        "states visited: {:?}",
        visited
    );
    assert_eq!(
        &visited[..3],
        &[
            NavStateKind::Moving,
            NavStateKind::Rotating,
            NavStateKind::Enveloping
        ]
    );
}

#[test]
fn test_cancel_from_another_thread() {
    let params = DriverParams {
        tick_period_s: 0.01,
        ..Default::default()
    };
    let (mut driver, sim) = build(params, NavCtrlParams::default(), SimParams::default());

    let cancel = CancelToken::new();
    let c = cancel.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        c.cancel();
    });

    let summary = driver.run(&cancel, None).unwrap();
    handle.join().unwrap();

    assert_eq!(summary.end_reason, EndReason::Cancelled);
    assert!(summary.num_ticks > 0);

    // The last command sent was a stop, which takes one step
    let world = sim.snapshot().unwrap();
    assert_eq!(world.num_steps(), summary.num_ticks + 1);
}

#[test]
fn test_telemetry_archived_each_cycle() {
    let path = std::env::temp_dir().join(format!("bug2_nav_tm_test_{}.csv", std::process::id()));

    let (driver, _sim) = build(unpaced(), NavCtrlParams::default(), SimParams::default());
    let mut driver = driver.with_archiver(Archiver::from_file_path(&path).unwrap());

    driver.run(&CancelToken::new(), Some(10)).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 11);
    assert!(lines[0].starts_with("tick,elapsed_s,pos_x_m,pos_y_m,yaw_rad,target_dist_m,state_in"));
    assert!(lines[1].starts_with("0,"));
    assert!(lines[10].starts_with("9,"));
}
