//! # Bug2 Executable Parameters
//!
//! This module provides parameters for the navigation executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

use crate::driver::DriverParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Bug2ExecParams {

    /// Control loop parameters
    pub driver: DriverParams,

    /// Navigation control parameter file, relative to the params directory
    pub nav_ctrl_params_file: String,

    /// Simulation world parameter file, relative to the params directory
    pub sim_params_file: String
}

impl Default for Bug2ExecParams {
    fn default() -> Self {
        Self {
            driver: DriverParams::default(),
            nav_ctrl_params_file: "nav_ctrl.toml".into(),
            sim_params_file: "sim.toml".into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_exec_params() {
        let params: Bug2ExecParams = util::params::from_str(r#"
            sim_params_file = "sim_maze.toml"

            [driver]
            tick_period_s = 0.1
            pace_realtime = false
        "#).unwrap();

        assert_eq!(params.nav_ctrl_params_file, "nav_ctrl.toml");
        assert_eq!(params.sim_params_file, "sim_maze.toml");
        assert_eq!(params.driver.tick_period_s, 0.1);
        assert!(!params.driver.pace_realtime);
        assert_eq!(params.driver.max_read_retries, 2);
    }
}
