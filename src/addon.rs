//! Addon value types
//!
//! An [`Asset`] describes where content comes from (url, checkout ref and
//! source kind). An [`Addon`] is an asset with an identity: the name it is
//! installed under, the manifest that declared it and the subfolder of the
//! asset that actually gets installed.
//!
//! # Examples
//!
//! ```
//! use addonpm::{Addon, AssetSource};
//!
//! let a = Addon::new("ui", "https://example.com/ui.git", "main", AssetSource::Remote, "/addons/", "/p/addons.json");
//! let b = Addon::new("ui_kit", "https://example.com/ui.git", "main", AssetSource::Remote, "addons", "/p/addons.json");
//!
//! assert_eq!(a.subfolder, "addons");
//! assert!(a.is_equivalent_to(&b));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where an asset's content is obtained from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSource {
    /// A git repository on the local filesystem
    Local,
    /// A remote git repository
    #[default]
    Remote,
    /// A local directory linked into the addons directory, never cached
    Symlink,
    /// A zip archive, downloaded or read from disk
    Zip,
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetSource::Local => "local",
            AssetSource::Remote => "remote",
            AssetSource::Symlink => "symlink",
            AssetSource::Zip => "zip",
        };
        f.write_str(name)
    }
}

/// Location of some installable content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asset {
    pub url: String,
    pub checkout: String,
    pub source: AssetSource,
}

impl Asset {
    pub fn new(url: impl Into<String>, checkout: impl Into<String>, source: AssetSource) -> Self {
        Self {
            url: url.into(),
            checkout: checkout.into(),
            source,
        }
    }

    pub fn is_local(&self) -> bool {
        self.source == AssetSource::Local
    }

    pub fn is_remote(&self) -> bool {
        self.source == AssetSource::Remote
    }

    pub fn is_symlink(&self) -> bool {
        self.source == AssetSource::Symlink
    }

    pub fn is_zip(&self) -> bool {
        self.source == AssetSource::Zip
    }

    /// Whether the content is a git working copy (and can be checked out/pulled)
    pub fn is_git(&self) -> bool {
        self.is_local() || self.is_remote()
    }
}

/// A single requirement discovered in a manifest
///
/// Structural identity is `(url, subfolder, checkout)`. The name is only the
/// alias an equivalence class is installed under, see [`Addon::is_equivalent_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addon {
    /// Key in the manifest, also the destination directory name
    pub name: String,
    /// Absolute path of the manifest that declared this addon
    pub addons_file_path: PathBuf,
    /// Path inside the asset that is installed, without leading/trailing separators
    pub subfolder: String,
    pub asset: Asset,
}

impl Addon {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        checkout: impl Into<String>,
        source: AssetSource,
        subfolder: &str,
        addons_file_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            addons_file_path: addons_file_path.into(),
            subfolder: normalize_subfolder(subfolder),
            asset: Asset::new(url, checkout, source),
        }
    }

    pub fn url(&self) -> &str {
        &self.asset.url
    }

    pub fn checkout(&self) -> &str {
        &self.asset.checkout
    }

    pub fn source(&self) -> AssetSource {
        self.asset.source
    }

    pub fn is_local(&self) -> bool {
        self.asset.is_local()
    }

    pub fn is_remote(&self) -> bool {
        self.asset.is_remote()
    }

    pub fn is_symlink(&self) -> bool {
        self.asset.is_symlink()
    }

    pub fn is_zip(&self) -> bool {
        self.asset.is_zip()
    }

    /// Same `(url, subfolder, checkout)`, regardless of name
    pub fn is_equivalent_to(&self, other: &Addon) -> bool {
        self.url() == other.url()
            && self.subfolder == other.subfolder
            && self.checkout() == other.checkout()
    }

    /// Joins the subfolder onto `root`, leaving `root` untouched when there is none
    pub fn subfolder_of(&self, root: &Path) -> PathBuf {
        if self.subfolder.is_empty() {
            root.to_path_buf()
        } else {
            root.join(&self.subfolder)
        }
    }
}

impl fmt::Display for Addon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` ({}", self.name, self.url())?;
        if !self.subfolder.is_empty() {
            write!(f, ", subfolder `{}`", self.subfolder)?;
        }
        write!(f, ", checkout `{}`)", self.checkout())
    }
}

/// Trims path separators off both ends of a subfolder
pub fn normalize_subfolder(subfolder: &str) -> String {
    subfolder
        .trim_matches(|c| c == '/' || c == '\\')
        .to_string()
}

/// An addon scheduled for installation
///
/// `canonical_addon` is the first addon seen for the same url when the two
/// share a cache slot; its name is used as the slot name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddon {
    pub addon: Addon,
    pub canonical_addon: Option<Addon>,
}

impl ResolvedAddon {
    pub fn new(addon: Addon, canonical_addon: Option<Addon>) -> Self {
        Self {
            addon,
            canonical_addon,
        }
    }

    /// Name of the cache slot holding this addon's content
    pub fn cache_name(&self) -> &str {
        self.canonical_addon
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or(self.addon.name.as_str())
    }
}
