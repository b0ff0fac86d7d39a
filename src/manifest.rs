//! Manifest handling for addons.json / addons.jsonc files
//!
//! A manifest lists the addons a project (or another addon) requires. Entries
//! keep the order they were declared in, which is also the order they are
//! resolved in.
//!
//! # Examples
//!
//! ```no_run
//! use addonpm::AddonsFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (manifest, path) = AddonsFile::load(".", None)?;
//!
//! println!("{} declares {} addons", path.display(), manifest.addons.len());
//! for (name, entry) in &manifest.addons {
//!     println!("  {} -> {} @ {}", name, entry.url, entry.checkout);
//! }
//! # Ok(())
//! # }
//! ```

use crate::addon::{Addon, AssetSource};
use crate::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Manifest file names probed, in order, when no override is given
pub const MANIFEST_FILE_NAMES: [&str; 2] = ["addons.json", "addons.jsonc"];

/// File written by `addonpm init`
pub const TEMPLATE_FILE_NAME: &str = "addons.jsonc";

const TEMPLATE: &str = r#"{
  // Addons are installed into `path`, one folder per addon name.
  // Remote and local git sources are cloned into `cache` first.
  "path": "addons",
  "cache": ".addons",
  "addons": {
    // "my_addon": {
    //   "url": "https://github.com/user/my_addon.git",
    //   "checkout": "main",
    //   "subfolder": "addons/my_addon",
    //   "source": "remote"
    // }
  }
}
"#;

/// A raw row of the `addons` object
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AddonsFileEntry {
    pub url: String,

    #[serde(default)]
    pub subfolder: String,

    #[serde(default = "default_checkout")]
    pub checkout: String,

    #[serde(default)]
    pub source: AssetSource,
}

fn default_checkout() -> String {
    "main".to_string()
}

impl AddonsFileEntry {
    /// Build the addon declared by this entry
    ///
    /// `url` is the already-resolved url (absolute path for local sources).
    pub fn to_addon(&self, name: &str, url: &str, addons_file_path: &Path) -> Addon {
        Addon::new(
            name,
            url,
            self.checkout.clone(),
            self.source,
            &self.subfolder,
            addons_file_path,
        )
    }
}

/// Parsed addons manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AddonsFile {
    /// Addons in declaration order
    #[serde(default, deserialize_with = "deserialize_ordered_entries")]
    pub addons: Vec<(String, AddonsFileEntry)>,

    /// Cache directory, relative to the project
    #[serde(rename = "cache", default = "default_cache_relative_path")]
    pub cache_relative_path: String,

    /// Installation directory, relative to the project
    #[serde(rename = "path", default = "default_path_relative_path")]
    pub path_relative_path: String,
}

fn default_cache_relative_path() -> String {
    ".addons".to_string()
}

fn default_path_relative_path() -> String {
    "addons".to_string()
}

impl Default for AddonsFile {
    fn default() -> Self {
        Self {
            addons: Vec::new(),
            cache_relative_path: default_cache_relative_path(),
            path_relative_path: default_path_relative_path(),
        }
    }
}

impl AddonsFile {
    /// Find the manifest in `dir`
    ///
    /// With an override only that file name is considered. Returns `None`
    /// when no candidate exists.
    pub fn find<P: AsRef<Path>>(dir: P, file_name: Option<&str>) -> Option<PathBuf> {
        let dir = dir.as_ref();
        match file_name {
            Some(name) => Some(dir.join(name)).filter(|p| p.is_file()),
            None => MANIFEST_FILE_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|p| p.is_file()),
        }
    }

    /// Load the manifest in `dir`
    ///
    /// A directory without a manifest yields an empty manifest with default
    /// paths. The returned path is the manifest's path (or where it would be).
    pub fn load<P: AsRef<Path>>(dir: P, file_name: Option<&str>) -> Result<(Self, PathBuf)> {
        let dir = dir.as_ref();
        let Some(path) = Self::find(dir, file_name) else {
            let path = dir.join(file_name.unwrap_or(MANIFEST_FILE_NAMES[0]));
            return Ok((Self::default(), path));
        };

        let content = fs::read_to_string(&path)?;
        let manifest = Self::parse(&content).map_err(|e| match e {
            Error::Json(e) => {
                Error::InvalidManifest(format!("{}: {}", path.display(), e))
            }
            other => other,
        })?;

        Ok((manifest, path))
    }

    /// Parse manifest contents; comments are allowed
    pub fn parse(content: &str) -> Result<Self> {
        let clean = strip_json_comments(content);
        Ok(serde_json::from_str(&clean)?)
    }

    /// Whether any manifest exists in `dir`
    pub fn exists<P: AsRef<Path>>(dir: P) -> bool {
        Self::find(dir, None).is_some()
    }

    /// Write the commented starter manifest into `dir`
    pub fn write_template<P: AsRef<Path>>(dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        if let Some(existing) = Self::find(dir, None) {
            return Err(Error::InvalidOperation(format!(
                "{} already exists",
                existing.display()
            )));
        }

        let path = dir.join(TEMPLATE_FILE_NAME);
        fs::write(&path, TEMPLATE)?;
        Ok(path)
    }
}

/// Deserialize the `addons` object keeping its key order
fn deserialize_ordered_entries<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<(String, AddonsFileEntry)>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct EntriesVisitor;

    impl<'de> de::Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, AddonsFileEntry)>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("an object mapping addon names to addon entries")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: de::MapAccess<'de>,
        {
            let mut entries: Vec<(String, AddonsFileEntry)> =
                Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, entry)) = map.next_entry::<String, AddonsFileEntry>()? {
                if !is_valid_addon_name(&name) {
                    return Err(de::Error::custom(format!(
                        "invalid addon name `{}`: names must be plain folder names",
                        name
                    )));
                }
                if entries.iter().any(|(seen, _)| *seen == name) {
                    return Err(de::Error::custom(format!("duplicate addon `{}`", name)));
                }
                entries.push((name, entry));
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor)
}

/// Whether `name` can be used as a single folder name under the addons and cache directories
fn is_valid_addon_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Strips `//` and `/* */` comments outside of string literals
fn strip_json_comments(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    while let Some(c) = chars.next() {
        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
                result.push(c);
            }
            continue;
        }

        if in_block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block_comment = false;
            }
            continue;
        }

        if in_string {
            result.push(c);
            if c == '"' {
                in_string = false;
            } else if c == '\\' {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                result.push(c);
            }
            ('/', Some('/')) => {
                chars.next();
                in_line_comment = true;
            }
            ('/', Some('*')) => {
                chars.next();
                in_block_comment = true;
            }
            _ => result.push(c),
        }
    }

    result
}
