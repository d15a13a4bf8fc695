//! File discovery.
//!
//! Two lookups live here:
//!
//! - **Defaults files.** Each [`SearchPath`] resolves to one directory, which
//!   is checked for `makefig.toml`. Found files are returned in
//!   priority-ascending order (last = highest). Missing files are skipped.
//! - **The Makefile.** Without an explicit path, the nearest Makefile is found
//!   by walking from the start directory toward the root, stopping at the
//!   [`Boundary`]. Directories are visited deepest first, so a Makefile in the
//!   working directory beats one in a parent.

use std::path::{Path, PathBuf};

use crate::types::{Boundary, SearchPath};

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// Returns `None` if the path cannot be resolved (e.g. no home directory).
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Existing `{dir}/{file_name}` for each search path, priority-ascending.
pub fn existing_files(search_paths: &[SearchPath], file_name: &str, app_name: &str) -> Vec<PathBuf> {
    search_paths
        .iter()
        .filter_map(|sp| resolve_search_path(sp, app_name))
        .map(|dir| dir.join(file_name))
        .filter(|path| path.is_file())
        .collect()
}

/// Directories from `start` up to the boundary, deepest first.
///
/// [`Marker(name)`](Boundary::Marker) stops at the first directory containing
/// `name`, and falls back to the root if the marker is never found.
pub fn ancestors_from(start: &Path, boundary: &Boundary) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for dir in start.ancestors() {
        dirs.push(dir.to_path_buf());
        if let Boundary::Marker(name) = boundary
            && dir.join(name).exists()
        {
            break;
        }
    }
    dirs
}

/// Nearest `file_name` at or above `start`.
pub fn find_document(start: &Path, file_name: &str, boundary: &Boundary) -> Option<PathBuf> {
    ancestors_from(start, boundary)
        .into_iter()
        .map(|dir| dir.join(file_name))
        .find(|path| path.is_file())
}
