//! Keep the variable header of a Padauk microcontroller Makefile in sync with
//! typed settings.
//!
//! A project Makefile starts with a handful of assignments (`DEVICE`, `ARCH`,
//! `PROJECT_NAME`, `F_CPU`, `TARGET_VDD_MV`, `TARGET_VDD`, `OPT_FLAGS`) followed
//! by build rules that use them. makefig reads those values, rewrites them in
//! place, and generates a fresh Makefile from project defaults. Everything
//! except the value tokens on recognized assignment lines is left untouched.
//!
//! ```ignore
//! let result = Makefig::builder()
//!     .makefile("fw/Makefile")
//!     .handle(&ConfigAction::Set {
//!         pairs: vec![("F_CPU".into(), "16000000".into())],
//!     })?;
//! ```
//!
//! # Recognized lines
//!
//! An assignment line is optional leading spaces, an exact key name, optional
//! spaces or tabs, `=`, optional spaces or tabs, then the value. The line is
//! scanned on its own; nothing spans lines. Recipe lines (starting with a tab)
//! and other operators (`:=`, `+=`, `?=`) are never treated as assignments.
//! The first assignment for a key wins and later ones are left alone.
//!
//! Values have one of four lexical classes, see [`ValueKind`]: bare words,
//! integers and decimals end at the first whitespace, free text runs to the
//! trimmed end of the line.
//!
//! # Loading and updating
//!
//! [`Synchronizer::load`] parses every recognized key and fails on the first
//! value that doesn't fit its class. [`Synchronizer::inspect`] reports each
//! key's status without failing, which is what `config list` shows.
//!
//! [`Synchronizer::apply`] validates every update before touching the text,
//! so a bad value never leaves a half-updated document. Keys without an
//! assignment line are skipped rather than appended.
//!
//! # Project defaults
//!
//! Seed documents take their values from [`ProjectDefaults`], a confique
//! struct layered as compiled defaults, then `makefig.toml` files (platform
//! config dir, `~/.makefig`, then the working directory), then `MAKEFIG_*`
//! environment variables. Unknown keys in a defaults file are an error with
//! the file and line.
//!
//! # Clap adapter
//!
//! The `cli` module (behind the `clap` feature, on by default) provides the
//! derive types the `makefig` binary uses. The core has no CLI dependency:
//! build [`ConfigAction`] values directly and pass them to
//! [`MakefigBuilder::handle`].

pub mod error;
pub mod types;

mod builder;
#[cfg(feature = "clap")]
pub mod cli;
pub mod devices;
mod file;
mod ops;
mod persist;
pub mod runner;
pub mod schema;
mod settings;
pub mod sync;
mod validate;

#[cfg(test)]
mod fixtures;

pub use builder::{Makefig, MakefigBuilder, parse_updates};
#[cfg(feature = "clap")]
pub use cli::{ConfigArgs, ConfigSubcommand};
pub use devices::Device;
pub use error::MakefigError;
pub use ops::ConfigResult;
pub use persist::WriteMode;
pub use runner::{CommandRunner, MakeTarget, OutputChunk, ProcessRunner};
pub use schema::{DecimalFormat, FieldSpec, Schema, Value, ValueKind};
pub use settings::{MakefileSettings, ProjectDefaults};
pub use sync::{FieldReport, FieldStatus, LoadedFields, Synchronizer, Updates};
pub use types::{Boundary, ConfigAction, SearchPath};
pub use validate::check_update;
