//! Path utilities.

use std::path::{Component, Path, PathBuf};

/// Get the yamltrail configuration directory.
///
/// On Unix `~/.config/yamltrail` is preferred when it exists, otherwise the
/// platform config directory is used.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("yamltrail");
            if xdg.exists() {
                return Some(xdg);
            }
        }
    }

    dirs::config_dir().map(|p| p.join("yamltrail"))
}

/// Normalize a path by removing `.` and `..` components.
///
/// Unlike `canonicalize`, this doesn't require the path to exist.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => result.push(component),
        }
    }

    result
}

/// Express `path` relative to `root`, the form the snapshot store keys on.
///
/// Relative inputs are taken as already relative to `root`. Returns `None`
/// when the path escapes `root`.
pub fn repo_relative(path: &Path, root: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        let path = normalize(path);
        let root = normalize(root);
        return path.strip_prefix(&root).ok().map(Path::to_path_buf);
    }

    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        let joined = normalize(&root.join(path));
        return joined.strip_prefix(normalize(root)).ok().map(Path::to_path_buf);
    }

    Some(normalize(path))
}

/// Render a repository-relative path with forward slashes, as git stores it.
pub fn to_git_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Find the repository root by walking up to the nearest `.git`.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(".git").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}
