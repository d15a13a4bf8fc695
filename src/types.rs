use std::path::PathBuf;

use crate::runner::MakeTarget;

/// Where to look for the `makefig.toml` defaults file.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".makefig")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit directory.
    Path(PathBuf),
}

/// How far up the directory tree to look for a Makefile.
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    /// Walk to the filesystem root.
    Root,
    /// Stop (inclusive) at the first directory containing this entry, e.g. `".git"`.
    Marker(&'static str),
}

/// An operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Status of every recognized key.
    List { json: bool },
    /// One key's value.
    Get { key: String },
    /// Rewrite values in place. Pairs are raw text, parsed per key.
    Set { pairs: Vec<(String, String)> },
    /// Render the seed document, to stdout or a file.
    Gen { output: Option<PathBuf> },
    /// Create the Makefile from the seed document.
    Init { force: bool },
    /// Commented template for `makefig.toml`.
    Defaults,
    /// The device catalogue.
    Devices,
    /// Run a make target.
    Make { target: MakeTarget },
}
