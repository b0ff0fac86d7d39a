//! addonpm - A flat, breadth-first installer for addons
//!
//! A project lists the addons it needs in an `addons.json` (or `addons.jsonc`)
//! manifest. Addons can have manifests of their own; every addon discovered,
//! however deep, is installed side by side into one addons directory.
//!
//! - Breadth-first discovery of nested manifests, with an optional depth limit
//! - Name/url based deduplication with conflict detection
//! - Shared git cache slots for addons coming from the same repository
//! - Remote and local git repositories, zip archives and symlinked folders
//!
//! # Examples
//!
//! ```no_run
//! use addonpm::{AddonsFile, AddonsPaths, AddonCache, GitAddonCache, InstallOptions, InstallOutcome, Installer};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (manifest, _) = AddonsFile::load(".", None)?;
//! let cache = GitAddonCache::new(AddonsPaths::new(".", &manifest), "git");
//! cache.ensure_cache_and_addons_directories_exist().await?;
//!
//! let installer = Installer::new(cache);
//! match installer.install(&InstallOptions::new(".")).await? {
//!     InstallOutcome::Succeeded => println!("done"),
//!     other => println!("{}", other),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`addon`] - Addon and asset value types
//! - [`manifest`] - Parse addons.json / addons.jsonc manifests
//! - [`graph`] - Classify discovered addons (resolved, duplicate, conflict)
//! - [`cache`] - Cache contract and the git/zip/symlink implementation
//! - [`installer`] - Breadth-first resolution and installation
//! - [`shell`] - Checked and unchecked process execution
//! - [`platform`] - Symlinks and path normalization
//! - [`config`] - User configuration
//! - [`error`] - Error types and result handling

pub mod addon;
pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod installer;
pub mod manifest;
pub mod platform;
pub mod shell;

pub use addon::{Addon, Asset, AssetSource, ResolvedAddon};
pub use cache::{AddonCache, AddonsPaths, GitAddonCache, ProgressCallback, TransferProgress};
pub use config::Config;
pub use error::{Error, Result};
pub use graph::{AddonGraph, ReportLevel, ResolutionResult};
pub use installer::{
    InstallEvent, InstallOptions, InstallOutcome, InstallState, Installer, ReportCallback,
};
pub use manifest::{AddonsFile, AddonsFileEntry};
pub use shell::{ProcessOutput, Shell};
