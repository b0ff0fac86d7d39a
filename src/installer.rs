//! Breadth-first addon installation
//!
//! Installing runs in two phases:
//!
//! 1. **Resolution.** Manifests are visited breadth-first starting at the
//!    project. Every addon is classified by an [`AddonGraph`]; newly resolved
//!    addons are cached, and their cached content is queued so that their own
//!    manifest is discovered.
//! 2. **Installation.** If nothing fatal was found, every resolved addon is
//!    copied (or symlinked) into the addons directory, in resolution order.
//!
//! Everything runs sequentially: cache slots are single working copies that
//! may be shared by addons wanting different checkouts.
//!
//! # Examples
//!
//! ```no_run
//! use addonpm::{AddonsFile, AddonsPaths, GitAddonCache, InstallOptions, Installer};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let (manifest, _) = AddonsFile::load(".", None)?;
//! let cache = GitAddonCache::new(AddonsPaths::new(".", &manifest), "git");
//! let installer = Installer::new(cache);
//!
//! let outcome = installer.install(&InstallOptions::new(".")).await?;
//! println!("{}", outcome);
//! # Ok(())
//! # }
//! ```

use crate::addon::ResolvedAddon;
use crate::cache::{AddonCache, TransferProgress};
use crate::graph::{AddonGraph, ResolutionResult};
use crate::manifest::AddonsFile;
use crate::{Error, Result};
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Receives every event of an install run as it happens
pub type ReportCallback = Arc<dyn Fn(&InstallEvent) + Send + Sync>;

/// Terminal result of an install run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Every resolved addon was installed
    Succeeded,
    /// A name collision was found; nothing was installed
    CannotBeResolved,
    /// The project does not require any addon
    NothingToInstall,
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            InstallOutcome::Succeeded => "Addons installed successfully",
            InstallOutcome::CannotBeResolved => {
                "Could not resolve addons; nothing was installed"
            }
            InstallOutcome::NothingToInstall => "No addons to install",
        };
        f.write_str(message)
    }
}

/// Something worth telling the user about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallEvent {
    /// One addon was classified
    Resolution(ResolutionResult),
    /// The run reached a terminal state
    Finished(InstallOutcome),
}

/// Inputs of one install run
#[derive(Clone)]
pub struct InstallOptions {
    pub project_dir: PathBuf,
    /// Maximum number of manifests visited (unset = unlimited)
    pub max_depth: Option<usize>,
    /// Manifest file name used for the project instead of auto-detection
    pub manifest_file: Option<String>,
    pub on_report: Option<ReportCallback>,
    pub progress: TransferProgress,
    pub cancel: CancellationToken,
}

impl InstallOptions {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            max_depth: None,
            manifest_file: None,
            on_report: None,
            progress: TransferProgress::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_manifest_file(mut self, manifest_file: Option<String>) -> Self {
        self.manifest_file = manifest_file;
        self
    }

    pub fn with_report(mut self, on_report: ReportCallback) -> Self {
        self.on_report = Some(on_report);
        self
    }

    pub fn with_progress(mut self, progress: TransferProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn emit(&self, event: InstallEvent) {
        if let Some(ref cb) = self.on_report {
            cb(&event);
        }
    }
}

/// Drives resolution, caching and installation over an [`AddonCache`]
///
/// Each call to [`Installer::install`] uses a fresh graph; nothing carries
/// over between runs except what the cache keeps on disk.
pub struct Installer<C> {
    cache: C,
}

impl<C: AddonCache> Installer<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Resolve and install every addon required by the project
    ///
    /// Errors from the cache abort the run immediately; addons installed
    /// before the failure stay on disk.
    pub async fn install(&self, options: &InstallOptions) -> Result<InstallOutcome> {
        let outcome = match self.resolve(options).await? {
            None => InstallOutcome::CannotBeResolved,
            Some(to_install) if to_install.is_empty() => InstallOutcome::NothingToInstall,
            Some(to_install) => {
                self.install_resolved(&to_install, &options.cancel).await?;
                InstallOutcome::Succeeded
            }
        };

        info!("{}", outcome);
        options.emit(InstallEvent::Finished(outcome));
        Ok(outcome)
    }

    /// Phase 1: breadth-first resolution and caching
    ///
    /// Returns `None` when a fatal conflict was found.
    async fn resolve(&self, options: &InstallOptions) -> Result<Option<Vec<ResolvedAddon>>> {
        let mut graph = AddonGraph::new();
        let mut search_paths = VecDeque::from([options.project_dir.clone()]);
        let mut to_install = Vec::new();
        let mut depth = 0;
        let mut fatal = false;

        while !fatal && options.max_depth.map_or(true, |max| depth < max) {
            let Some(path) = search_paths.pop_front() else {
                break;
            };
            if options.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let file_name = if depth == 0 {
                options.manifest_file.as_deref()
            } else {
                None
            };
            let (manifest, manifest_path) = AddonsFile::load(&path, file_name)?;
            debug!(
                "Visiting {} ({} addons)",
                manifest_path.display(),
                manifest.addons.len()
            );

            for (name, entry) in &manifest.addons {
                let url = self.cache.resolve_url(entry, &manifest_path).await?;
                let result = graph.add(entry.to_addon(name, &url, &manifest_path));
                debug!("{}", result);
                options.emit(InstallEvent::Resolution(result.clone()));

                let (addon, canonical) = match result {
                    ResolutionResult::CannotBeResolved { .. } => {
                        fatal = true;
                        continue;
                    }
                    ResolutionResult::AlreadyResolved { .. } => continue,
                    ResolutionResult::Resolved { addon } => (addon, None),
                    ResolutionResult::ResolvedButMightConflict {
                        addon, canonical, ..
                    } => (addon, Some(canonical)),
                };

                let resolved = ResolvedAddon::new(addon, canonical);
                search_paths.push_back(self.cache_resolved(&resolved, options).await?);
                to_install.push(resolved);
            }

            depth += 1;
        }

        Ok((!fatal).then_some(to_install))
    }

    /// Cache a newly resolved addon and return where its manifest would be
    async fn cache_resolved(
        &self,
        resolved: &ResolvedAddon,
        options: &InstallOptions,
    ) -> Result<PathBuf> {
        let addon = &resolved.addon;
        if addon.is_symlink() {
            return Ok(addon.subfolder_of(Path::new(addon.url())));
        }

        let cache_name = resolved.cache_name();
        let slot = self
            .cache
            .cache_addon(addon, cache_name, &options.progress, &options.cancel)
            .await?;
        self.cache.prepare_cache(addon, cache_name).await?;
        self.cache.update_cache(addon, cache_name).await;

        Ok(addon.subfolder_of(&slot))
    }

    /// Phase 2: copy or link every resolved addon, in resolution order
    async fn install_resolved(
        &self,
        to_install: &[ResolvedAddon],
        cancel: &CancellationToken,
    ) -> Result<()> {
        for resolved in to_install {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let addon = &resolved.addon;
            if addon.is_symlink() {
                self.cache.delete_addon(addon).await?;
                self.cache.install_addon_with_symlink(addon).await?;
                continue;
            }

            // The slot may have been moved to another ref by a sibling addon.
            let cache_name = resolved.cache_name();
            self.cache.prepare_cache(addon, cache_name).await?;
            self.cache.delete_addon(addon).await?;
            self.cache.install_addon_from_cache(addon, cache_name).await?;
        }

        Ok(())
    }
}

/// Install run as an explicit state machine
///
/// `Unresolved` is the only non-terminal state. Its single transition runs
/// [`Installer::install`] and yields the events it emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Unresolved,
    Finished(InstallOutcome),
}

impl InstallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstallState::Finished(_))
    }

    /// Advance the state
    ///
    /// Events are still streamed to `options.on_report` while the run is in
    /// progress. Terminal states do not move and emit nothing.
    pub async fn transition<C: AddonCache>(
        self,
        installer: &Installer<C>,
        options: &InstallOptions,
    ) -> Result<(InstallState, Vec<InstallEvent>)> {
        if self.is_terminal() {
            return Ok((self, Vec::new()));
        }

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let forward = options.on_report.clone();
        let on_report: ReportCallback = Arc::new(move |event: &InstallEvent| {
            if let Ok(mut events) = sink.lock() {
                events.push(event.clone());
            }
            if let Some(ref cb) = forward {
                cb(event);
            }
        });
        let recording = options.clone().with_report(on_report);

        let outcome = installer.install(&recording).await?;
        let emitted = std::mem::take(&mut *events.lock().unwrap_or_else(|e| e.into_inner()));
        Ok((InstallState::Finished(outcome), emitted))
    }
}
