//! Host platform utility functions

use std::path::PathBuf;

/// Name of the environment variable pointing at the software root.
pub const SW_ROOT_ENV_VAR: &str = "REGATTA_SW_ROOT";

/// Get the root directory of the software installation.
///
/// All parameter files and session directories are resolved relative to this
/// path.
pub fn get_regatta_sw_root() -> Result<PathBuf, std::env::VarError> {
    Ok(PathBuf::from(std::env::var(SW_ROOT_ENV_VAR)?))
}
