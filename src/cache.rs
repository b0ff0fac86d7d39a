//! Addon cache
//!
//! Addon content is materialized once per *cache name* under the project's
//! cache directory, then copied (or symlinked) into the addons directory.
//! A cache slot is a single working copy with one checked-out ref at a time;
//! several addons sharing a url share the slot, so the slot must be prepared
//! again right before its content is read.
//!
//! [`AddonCache`] is the contract the installer drives. [`GitAddonCache`] is
//! the on-disk implementation: git clones for remote and local sources,
//! downloaded archives for zip sources, and plain symlinks for symlink sources.

use crate::addon::{Addon, AssetSource};
use crate::manifest::{AddonsFile, AddonsFileEntry};
use crate::platform;
use crate::shell::Shell;
use crate::{Error, Result};
use async_trait::async_trait;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Progress callback for long-running cache operations
///
/// Called with:
/// - `message`: Description of current operation (e.g., "Downloading ui...")
/// - `current`: Bytes downloaded or archive entries extracted so far
/// - `total`: Total bytes or entries (0 when unknown)
pub type ProgressCallback = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// Optional progress sinks for downloads and archive extraction
#[derive(Clone, Default)]
pub struct TransferProgress {
    pub download: Option<ProgressCallback>,
    pub extract: Option<ProgressCallback>,
}

/// Operations the installer needs from a cache
#[async_trait]
pub trait AddonCache: Send + Sync {
    /// Resolve an entry's url relative to the manifest that declared it
    ///
    /// Local paths become absolute; symlink sources are followed to their
    /// target. Remote urls are returned unchanged.
    async fn resolve_url(&self, entry: &AddonsFileEntry, addons_file_path: &Path)
        -> Result<String>;

    /// Make sure the slot `cache_name` holds the addon's content
    ///
    /// Returns the slot's path. Does nothing if the slot already exists.
    async fn cache_addon(
        &self,
        addon: &Addon,
        cache_name: &str,
        progress: &TransferProgress,
        cancel: &CancellationToken,
    ) -> Result<PathBuf>;

    /// Check out `addon`'s ref inside the slot `cache_name`
    async fn prepare_cache(&self, addon: &Addon, cache_name: &str) -> Result<()>;

    /// Best-effort refresh of the slot; never fails
    async fn update_cache(&self, addon: &Addon, cache_name: &str);

    /// Remove any previous install of `addon`
    async fn delete_addon(&self, addon: &Addon) -> Result<()>;

    /// Copy the addon's subfolder of the slot into the addons directory
    async fn install_addon_from_cache(&self, addon: &Addon, cache_name: &str) -> Result<()>;

    /// Link the addon's local path into the addons directory
    async fn install_addon_with_symlink(&self, addon: &Addon) -> Result<()>;

    async fn ensure_cache_and_addons_directories_exist(&self) -> Result<()>;
}

/// Where a project keeps its cache and its installed addons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonsPaths {
    pub project_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub addons_dir: PathBuf,
}

impl AddonsPaths {
    /// Paths configured by the project's root manifest
    pub fn new(project_dir: impl Into<PathBuf>, manifest: &AddonsFile) -> Self {
        let project_dir = project_dir.into();
        Self {
            cache_dir: platform::absolute_from(&project_dir, &manifest.cache_relative_path),
            addons_dir: platform::absolute_from(&project_dir, &manifest.path_relative_path),
            project_dir,
        }
    }

    pub fn cache_slot(&self, cache_name: &str) -> PathBuf {
        self.cache_dir.join(cache_name)
    }

    pub fn install_dir(&self, addon: &Addon) -> PathBuf {
        self.addons_dir.join(&addon.name)
    }
}

/// Disk-backed cache using git, HTTP downloads and zip extraction
pub struct GitAddonCache {
    paths: AddonsPaths,
    git: String,
    client: reqwest::Client,
}

impl GitAddonCache {
    pub fn new(paths: AddonsPaths, git_executable: impl Into<String>) -> Self {
        Self {
            paths,
            git: git_executable.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn paths(&self) -> &AddonsPaths {
        &self.paths
    }

    /// Remove the whole cache directory
    pub async fn clean_cache(&self) -> Result<()> {
        info!("Removing cache {}", self.paths.cache_dir.display());
        platform::remove_path(&self.paths.cache_dir).await?;
        Ok(())
    }

    fn git_in(&self, dir: impl Into<PathBuf>) -> Shell {
        Shell::new(dir, self.git.clone())
    }

    async fn cache_zip(
        &self,
        addon: &Addon,
        cache_name: &str,
        slot: &Path,
        progress: &TransferProgress,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let archive = self.paths.cache_dir.join(format!("{}.zip", cache_name));

        let result = match self
            .fetch_archive(addon, &archive, progress.download.as_ref(), cancel)
            .await
        {
            Ok(()) => {
                extract_archive(
                    archive.clone(),
                    slot.to_path_buf(),
                    addon.name.clone(),
                    progress.extract.clone(),
                    cancel.clone(),
                )
                .await
            }
            Err(e) => Err(e),
        };

        let _ = tokio::fs::remove_file(&archive).await;
        if result.is_err() {
            let _ = platform::remove_path(slot).await;
        }
        result
    }

    async fn fetch_archive(
        &self,
        addon: &Addon,
        destination: &Path,
        progress: Option<&ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if !is_http_url(addon.url()) {
            debug!("Copying archive {}", addon.url());
            tokio::fs::copy(addon.url(), destination)
                .await
                .map_err(|e| Error::Download(format!("{}: {}", addon.url(), e)))?;
            return Ok(());
        }

        info!("Downloading {}", addon.url());
        let message = format!("Downloading {}...", addon.name);
        let mut response = self.client.get(addon.url()).send().await?;
        if !response.status().is_success() {
            return Err(Error::Download(format!(
                "{} returned HTTP {}",
                addon.url(),
                response.status()
            )));
        }

        let total = response.content_length().unwrap_or(0);
        let mut file = tokio::fs::File::create(destination).await?;
        let mut downloaded: u64 = 0;

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                chunk = response.chunk() => chunk?,
            };
            let Some(bytes) = chunk else {
                break;
            };

            file.write_all(&bytes).await?;
            downloaded += bytes.len() as u64;
            if let Some(cb) = progress {
                cb(&message, downloaded, total);
            }
        }

        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl AddonCache for GitAddonCache {
    async fn resolve_url(
        &self,
        entry: &AddonsFileEntry,
        addons_file_path: &Path,
    ) -> Result<String> {
        let manifest_dir = addons_file_path.parent().unwrap_or(Path::new(""));

        let resolved = match entry.source {
            AssetSource::Remote => return Ok(entry.url.clone()),
            AssetSource::Zip if is_http_url(&entry.url) => return Ok(entry.url.clone()),
            AssetSource::Local | AssetSource::Zip => {
                platform::absolute_from(manifest_dir, &entry.url)
            }
            AssetSource::Symlink => {
                let path = platform::absolute_from(manifest_dir, &entry.url);
                platform::follow_symlink(&path).await?
            }
        };

        Ok(resolved.to_string_lossy().into_owned())
    }

    async fn cache_addon(
        &self,
        addon: &Addon,
        cache_name: &str,
        progress: &TransferProgress,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let slot = self.paths.cache_slot(cache_name);
        if tokio::fs::metadata(&slot).await.is_ok() {
            debug!("Cache `{}` already present", cache_name);
            return Ok(slot);
        }

        if !addon.is_symlink() {
            tokio::fs::create_dir_all(&self.paths.cache_dir).await?;
        }

        match addon.source() {
            AssetSource::Remote | AssetSource::Local => {
                info!("Cloning {} into cache `{}`", addon.url(), cache_name);
                self.git_in(&self.paths.cache_dir)
                    .run(&["clone", "--recurse-submodules", addon.url(), cache_name])
                    .await?;
            }
            AssetSource::Zip => {
                self.cache_zip(addon, cache_name, &slot, progress, cancel)
                    .await?;
            }
            AssetSource::Symlink => {
                return Err(Error::InvalidOperation(format!(
                    "symlink addon `{}` cannot be cached",
                    addon.name
                )));
            }
        }

        Ok(slot)
    }

    async fn prepare_cache(&self, addon: &Addon, cache_name: &str) -> Result<()> {
        if !addon.asset.is_git() {
            return Ok(());
        }

        debug!("Checking out `{}` in cache `{}`", addon.checkout(), cache_name);
        self.git_in(self.paths.cache_slot(cache_name))
            .run(&["checkout", addon.checkout()])
            .await?;
        Ok(())
    }

    async fn update_cache(&self, addon: &Addon, cache_name: &str) {
        if !addon.asset.is_git() {
            return;
        }

        let git = self.git_in(self.paths.cache_slot(cache_name));
        let steps: [&[&str]; 2] = [
            &["pull"],
            &["submodule", "update", "--init", "--recursive"],
        ];
        for args in steps {
            match git.run_unchecked(args).await {
                Ok(output) if output.success() => {}
                Ok(output) => debug!(
                    "Ignoring failed `git {}` in cache `{}`: {}",
                    args.join(" "),
                    cache_name,
                    output.stderr.trim()
                ),
                Err(e) => debug!(
                    "Ignoring failed `git {}` in cache `{}`: {}",
                    args.join(" "),
                    cache_name,
                    e
                ),
            }
        }
    }

    async fn delete_addon(&self, addon: &Addon) -> Result<()> {
        let dir = self.paths.install_dir(addon);
        debug!("Removing previous install at {}", dir.display());
        platform::remove_path(&dir).await?;
        Ok(())
    }

    async fn install_addon_from_cache(&self, addon: &Addon, cache_name: &str) -> Result<()> {
        let source = addon.subfolder_of(&self.paths.cache_slot(cache_name));
        if !tokio::fs::metadata(&source)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(Error::InvalidOperation(format!(
                "`{}` not found in cache `{}` for addon `{}`",
                addon.subfolder, cache_name, addon.name
            )));
        }

        let destination = self.paths.install_dir(addon);
        info!("Installing `{}` to {}", addon.name, destination.display());

        tokio::task::spawn_blocking(move || copy_dir_without_git(&source, &destination))
            .await
            .map_err(|e| Error::Other(format!("Copy task failed: {}", e)))??;
        Ok(())
    }

    async fn install_addon_with_symlink(&self, addon: &Addon) -> Result<()> {
        let target = addon.subfolder_of(Path::new(addon.url()));
        if tokio::fs::metadata(&target).await.is_err() {
            return Err(Error::InvalidOperation(format!(
                "symlink target {} for addon `{}` does not exist",
                target.display(),
                addon.name
            )));
        }

        let link = self.paths.install_dir(addon);
        if let Some(parent) = link.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!("Linking `{}` to {}", addon.name, target.display());
        platform::create_dir_symlink(&target, &link).await?;
        Ok(())
    }

    async fn ensure_cache_and_addons_directories_exist(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.paths.cache_dir).await?;
        tokio::fs::create_dir_all(&self.paths.addons_dir).await?;
        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Recursively copy `source` to `destination`, leaving out `.git` entries
fn copy_dir_without_git(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination)?;

    let walker = walkdir::WalkDir::new(source)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        let entry = entry.map_err(|e| Error::Io(io::Error::other(e)))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::Other(e.to_string()))?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

/// Extract `archive` into `destination` on a blocking thread
async fn extract_archive(
    archive: PathBuf,
    destination: PathBuf,
    name: String,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        unpack_zip(&archive, &destination, &name, progress.as_ref(), &cancel)
    })
    .await
    .map_err(|e| Error::Other(format!("Extraction task failed: {}", e)))?
}

fn unpack_zip(
    archive: &Path,
    destination: &Path,
    name: &str,
    progress: Option<&ProgressCallback>,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    let total = zip.len() as u64;
    let message = format!("Extracting {}...", name);

    let names: Vec<String> = zip.file_names().map(str::to_string).collect();
    let root = common_root(&names);

    fs::create_dir_all(destination)?;

    for i in 0..zip.len() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut entry = zip.by_index(i)?;
        let Some(path) = entry.enclosed_name() else {
            debug!("Skipping unsafe archive entry {}", entry.name());
            continue;
        };

        let relative = match &root {
            Some(root) => path.strip_prefix(root).unwrap_or(path.as_path()).to_path_buf(),
            None => path,
        };

        if !relative.as_os_str().is_empty() {
            let target = destination.join(&relative);
            if entry.is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&target)?;
                io::copy(&mut entry, &mut out)?;
            }
        }

        if let Some(cb) = progress {
            cb(&message, i as u64 + 1, total);
        }
    }

    Ok(())
}

/// The single top-level directory every archive entry lives under, if any
fn common_root(names: &[String]) -> Option<String> {
    let first = names.first()?;
    let (root, _) = first.split_once('/')?;
    names
        .iter()
        .all(|n| n.split_once('/').map(|(r, _)| r) == Some(root))
        .then(|| root.to_string())
}
