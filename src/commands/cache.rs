//! Cache management commands
//!
//! - `cache clean` - Remove the project's cache directory
//! - `cache path` - Show the cache location

use addonpm::{AddonsFile, AddonsPaths, Config, GitAddonCache};
use anyhow::Result;
use std::path::PathBuf;

fn project_cache(path: Option<PathBuf>) -> Result<GitAddonCache> {
    let project_dir = super::project_dir(path)?;
    let config = Config::load()?;
    let (manifest, _) = AddonsFile::load(&project_dir, config.install.manifest_file.as_deref())?;

    Ok(GitAddonCache::new(
        AddonsPaths::new(project_dir, &manifest),
        config.git.executable,
    ))
}

/// Delete every cached addon of the project
pub fn run_clean(path: Option<PathBuf>) -> Result<()> {
    let cache = project_cache(path)?;
    let cache_dir = cache.paths().cache_dir.clone();

    if !cache_dir.exists() {
        println!("Cache is already empty ({})", cache_dir.display());
        return Ok(());
    }

    tokio::runtime::Runtime::new()?.block_on(cache.clean_cache())?;
    println!("✓ Removed {}", cache_dir.display());
    Ok(())
}

/// Print where the project's cache lives
pub fn run_path(path: Option<PathBuf>) -> Result<()> {
    let cache = project_cache(path)?;
    println!("{}", cache.paths().cache_dir.display());
    Ok(())
}
