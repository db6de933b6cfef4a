//! Host platform utility functions

use std::path::PathBuf;

/// Environment variable pointing at the software root directory, which holds
/// the `params` and `sessions` directories.
pub const SW_ROOT_ENV_VAR: &str = "BUG2_NAV_ROOT";

/// Get the software root directory.
///
/// Taken from `BUG2_NAV_ROOT` if it is set, otherwise the current working
/// directory.
pub fn get_sw_root() -> std::io::Result<PathBuf> {
    match std::env::var_os(SW_ROOT_ENV_VAR) {
        Some(root) => Ok(PathBuf::from(root)),
        None => std::env::current_dir()
    }
}
