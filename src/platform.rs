//! Platform-specific filesystem helpers
//!
//! Symlinks are created differently on Windows (directory links) and Unix,
//! and local addon paths need to be made absolute before they can be compared
//! across manifests.
//!
//! # Examples
//!
//! ```
//! use addonpm::platform::absolute_from;
//! use std::path::Path;
//!
//! let path = absolute_from(Path::new("/project/addons.json").parent().unwrap(), "../shared/./ui");
//! assert_eq!(path, Path::new("/shared/ui"));
//! ```

use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve `path` against `base` and remove `.` / `..` components
///
/// Purely lexical: the path does not need to exist.
pub fn absolute_from(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    normalize_path(&joined)
}

/// Lexically normalize a path
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Whether `path` is itself a symlink (not following it)
pub async fn is_symlink(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path)
        .await
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Follow a symlink at `path` to its target, if it is one
///
/// Relative targets are resolved against the link's directory.
pub async fn follow_symlink(path: &Path) -> io::Result<PathBuf> {
    if !is_symlink(path).await {
        return Ok(path.to_path_buf());
    }
    let target = tokio::fs::read_link(path).await?;
    let parent = path.parent().unwrap_or(path);
    Ok(absolute_from(parent, target))
}

/// Create a directory symlink at `link` pointing to `target`
#[cfg(windows)]
pub async fn create_dir_symlink(target: &Path, link: &Path) -> io::Result<()> {
    tokio::fs::symlink_dir(target, link).await
}

/// Create a directory symlink at `link` pointing to `target`
#[cfg(not(windows))]
pub async fn create_dir_symlink(target: &Path, link: &Path) -> io::Result<()> {
    tokio::fs::symlink(target, link).await
}

/// Remove whatever is at `path`: a symlink, a file or a directory tree
///
/// A missing path is not an error. Symlinks are removed without touching
/// their target.
pub async fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if metadata.file_type().is_symlink() {
        remove_symlink(path).await
    } else if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    }
}

#[cfg(windows)]
async fn remove_symlink(path: &Path) -> io::Result<()> {
    // Directory links must be removed as directories on Windows.
    match tokio::fs::remove_dir(path).await {
        Ok(()) => Ok(()),
        Err(_) => tokio::fs::remove_file(path).await,
    }
}

#[cfg(not(windows))]
async fn remove_symlink(path: &Path) -> io::Result<()> {
    tokio::fs::remove_file(path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), Path::new("/a/c"));
        assert_eq!(normalize_path(Path::new("a/../../b")), Path::new("../b"));
    }

    #[test]
    fn test_absolute_from() {
        let base = Path::new("/project");
        assert_eq!(absolute_from(base, "ui"), Path::new("/project/ui"));
        assert_eq!(absolute_from(base, "/elsewhere/ui"), Path::new("/elsewhere/ui"));
        assert_eq!(absolute_from(base, "./a/../b"), Path::new("/project/b"));
    }

    #[tokio::test]
    async fn test_remove_missing_path_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        assert!(remove_path(&temp_dir.path().join("nope")).await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_directory_tree() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("tree");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("nested/file.txt"), "x").unwrap();

        remove_path(&dir).await.unwrap();
        assert!(!dir.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_round_trip_keeps_target() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("file.txt"), "x").unwrap();
        let link = temp_dir.path().join("link");

        create_dir_symlink(&target, &link).await.unwrap();
        assert!(is_symlink(&link).await);
        assert_eq!(follow_symlink(&link).await.unwrap(), target);
        assert!(link.join("file.txt").exists());

        remove_path(&link).await.unwrap();
        assert!(!is_symlink(&link).await);
        assert!(target.join("file.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_follow_relative_symlink() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("real")).unwrap();
        let link = temp_dir.path().join("alias");
        std::os::unix::fs::symlink("real", &link).unwrap();

        assert_eq!(
            follow_symlink(&link).await.unwrap(),
            temp_dir.path().join("real")
        );
    }
}
