//! Safe path resolution
//!
//! Maps a decoded request path onto a root directory without touching the
//! filesystem. Every resolved path is prefix-checked against its root before it
//! is handed back, so callers never read outside the root.

use crate::error::Error;
use std::path::{Component, Path, PathBuf};

/// Resolve a request to a single file directly under `root`
///
/// Only the leaf component of `requested` is kept. Requests that try to climb
/// out with `..` or inject an absolute path are rejected outright rather than
/// silently flattened.
pub fn resolve_leaf(root: &Path, requested: &str) -> Result<PathBuf, Error> {
    if is_absolute_like(requested) || segments(requested).any(|s| s == "..") {
        return Err(Error::Forbidden);
    }

    let leaf = segments(requested)
        .filter(|s| !s.is_empty() && *s != ".")
        .last()
        .ok_or(Error::NotFound)?;

    let candidate = root.join(leaf);
    ensure_contained(root, &candidate)?;
    Ok(candidate)
}

/// Resolve a URL path (leading `/` included) to a path under `root`
///
/// Sub-directories are allowed. `..` segments are applied lexically and may
/// not climb above `root`.
pub fn resolve_within(root: &Path, requested: &str) -> Result<PathBuf, Error> {
    let relative = requested.strip_prefix('/').unwrap_or(requested);
    if is_absolute_like(relative) {
        return Err(Error::Forbidden);
    }

    let mut parts: Vec<&str> = Vec::new();
    for segment in segments(relative) {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(Error::Forbidden);
                }
            }
            other => {
                if is_absolute_like(other) {
                    return Err(Error::Forbidden);
                }
                parts.push(other);
            }
        }
    }

    let candidate = parts.iter().fold(root.to_path_buf(), |acc, p| acc.join(p));
    ensure_contained(root, &candidate)?;
    Ok(candidate)
}

/// Containment check: `path` must be `root` or lie beneath it
///
/// Comparison is component-wise, so `/srv/public2` is not inside `/srv/public`.
pub fn ensure_contained(root: &Path, path: &Path) -> Result<(), Error> {
    if path.starts_with(root) {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\'])
}

/// Rooted paths (`/x`, `\x`) and drive or UNC prefixes (`C:`, `\\server`)
fn is_absolute_like(path: &str) -> bool {
    path.starts_with(['/', '\\'])
        || Path::new(path)
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/srv/files")
    }

    #[test]
    fn test_resolve_leaf_plain_name() {
        assert_eq!(resolve_leaf(&root(), "a.png").unwrap(), root().join("a.png"));
        assert_eq!(resolve_leaf(&root(), "a b.png").unwrap(), root().join("a b.png"));
    }

    #[test]
    fn test_resolve_leaf_discards_directories() {
        assert_eq!(resolve_leaf(&root(), "nested/dir/a.png").unwrap(), root().join("a.png"));
        assert_eq!(resolve_leaf(&root(), "./a.png").unwrap(), root().join("a.png"));
    }

    #[test]
    fn test_resolve_leaf_rejects_traversal() {
        assert!(matches!(resolve_leaf(&root(), "../secret"), Err(Error::Forbidden)));
        assert!(matches!(resolve_leaf(&root(), "x/../../etc/passwd"), Err(Error::Forbidden)));
        assert!(matches!(resolve_leaf(&root(), ".."), Err(Error::Forbidden)));
        assert!(matches!(resolve_leaf(&root(), "..\\boot.ini"), Err(Error::Forbidden)));
    }

    #[test]
    fn test_resolve_leaf_rejects_absolute() {
        assert!(matches!(resolve_leaf(&root(), "/etc/passwd"), Err(Error::Forbidden)));
        assert!(matches!(resolve_leaf(&root(), "\\windows\\win.ini"), Err(Error::Forbidden)));
    }

    #[test]
    fn test_resolve_leaf_empty_is_not_found() {
        assert!(matches!(resolve_leaf(&root(), ""), Err(Error::NotFound)));
        assert!(matches!(resolve_leaf(&root(), "./"), Err(Error::NotFound)));
    }

    #[test]
    fn test_resolve_within_nested() {
        assert_eq!(
            resolve_within(&root(), "/css/site.css").unwrap(),
            root().join("css").join("site.css")
        );
        assert_eq!(resolve_within(&root(), "/").unwrap(), root());
        assert_eq!(
            resolve_within(&root(), "/a/./b/../index.html").unwrap(),
            root().join("a").join("index.html")
        );
    }

    #[test]
    fn test_resolve_within_rejects_escape() {
        assert!(matches!(resolve_within(&root(), "/../etc/passwd"), Err(Error::Forbidden)));
        assert!(matches!(resolve_within(&root(), "/a/../../x"), Err(Error::Forbidden)));
        assert!(matches!(resolve_within(&root(), "/..\\..\\x"), Err(Error::Forbidden)));
        assert!(matches!(resolve_within(&root(), "//etc/passwd"), Err(Error::Forbidden)));
    }

    #[test]
    fn test_ensure_contained_is_component_wise() {
        assert!(ensure_contained(Path::new("/srv/public"), Path::new("/srv/public/a")).is_ok());
        assert!(ensure_contained(Path::new("/srv/public"), Path::new("/srv/public")).is_ok());
        assert!(matches!(
            ensure_contained(Path::new("/srv/public"), Path::new("/srv/public2/a")),
            Err(Error::Forbidden)
        ));
        assert!(matches!(
            ensure_contained(Path::new("/srv/public"), Path::new("/etc/passwd")),
            Err(Error::Forbidden)
        ));
    }
}
