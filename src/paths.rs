//! Lexical path helpers
//!
//! Paths handed to the registry are made absolute against the working
//! directory and cleaned textually. Nothing here follows symlinks, so the
//! containment check in [`join_within`] is lexical only: a symlink inside the
//! base directory that points elsewhere is not detected.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve `path` to an absolute, cleaned path.
///
/// Relative paths are joined to the current working directory. The file
/// does not have to exist.
pub fn absolutize(path: impl AsRef<Path>) -> io::Result<PathBuf> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty path"));
    }

    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    Ok(clean(&joined))
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding segment. `..` at the root stays at the root.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Join `relative` onto `base` and return the cleaned result, or `None` if
/// the result leaves `base`.
///
/// Root and prefix components of `relative` are ignored, so `/etc/passwd`
/// is treated as `etc/passwd` under `base`. `base` is expected to be clean.
pub fn join_within(base: &Path, relative: &Path) -> Option<PathBuf> {
    let mut joined = base.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::ParentDir => joined.push(".."),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    let cleaned = clean(&joined);
    cleaned.starts_with(base).then_some(cleaned)
}

/// Display name for a tracked file: its base name.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
