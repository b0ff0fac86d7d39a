pub mod cache;
pub mod init;
pub mod install;

use anyhow::Result;
use std::env;
use std::path::PathBuf;

/// Absolute project directory, defaulting to the current directory
pub fn project_dir(path: Option<PathBuf>) -> Result<PathBuf> {
    let current_dir = env::current_dir()?;
    Ok(match path {
        Some(path) => addonpm::platform::absolute_from(&current_dir, path),
        None => current_dir,
    })
}
