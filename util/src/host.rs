//! Host platform (linux for example) utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable pointing at the root of the software
/// tree, which contains the `params` and `sessions` directories.
pub const SW_ROOT_ENV_VAR: &str = "DRIVE_SW_ROOT";

/// Get the root directory of the software tree.
pub fn get_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
