//! Clap adapter.
//!
//! Compiled only with the `clap` feature (on by default). [`ConfigArgs`] gives
//! the `config list|get|set|gen|init|defaults` subcommand group and
//! [`Command`] adds the `make` and `devices` commands next to it. Both
//! convert into a [`ConfigAction`](crate::ConfigAction) through `into_action()`,
//! and from there everything goes through the clap-free
//! [`MakefigBuilder::handle()`](crate::MakefigBuilder::handle).

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::runner::MakeTarget;
use crate::types::ConfigAction;

/// Top-level commands of the `makefig` binary.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read or rewrite the settings in the Makefile.
    Config(ConfigArgs),
    /// Run a Makefile target.
    Make {
        #[arg(value_enum)]
        target: MakeTarget,
    },
    /// List supported devices with their ROM and RAM sizes.
    Devices,
}

impl Command {
    pub fn into_action(self) -> ConfigAction {
        match self {
            Command::Config(args) => args.into_action(),
            Command::Make { target } => ConfigAction::Make { target },
            Command::Devices => ConfigAction::Devices,
        }
    }
}

/// Args for the `config` subcommand group.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigSubcommand>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show every recognized setting and its value in the Makefile.
    List {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show one setting.
    Get {
        /// Setting name, e.g. "F_CPU".
        key: String,
    },
    /// Rewrite settings in place: `set KEY VALUE [KEY VALUE ...]`.
    Set {
        /// Alternating keys and values.
        #[arg(num_args = 2.., value_names = ["KEY", "VALUE"], required = true)]
        pairs: Vec<String>,
    },
    /// Print a fresh Makefile built from the project defaults.
    Gen {
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Create the Makefile from the project defaults.
    Init {
        /// Replace an existing Makefile.
        #[arg(long)]
        force: bool,
    },
    /// Print a commented template for makefig.toml.
    Defaults,
}

impl ConfigArgs {
    /// Bare `config` is `config list`.
    ///
    /// A trailing key without a value in `set` is dropped; clap rejects a
    /// lone key, so this only matters for odd-length lists.
    pub fn into_action(self) -> ConfigAction {
        match self.action {
            None => ConfigAction::List { json: false },
            Some(ConfigSubcommand::List { json }) => ConfigAction::List { json },
            Some(ConfigSubcommand::Get { key }) => ConfigAction::Get { key },
            Some(ConfigSubcommand::Set { pairs }) => ConfigAction::Set {
                pairs: pairs
                    .chunks_exact(2)
                    .map(|kv| (kv[0].clone(), kv[1].clone()))
                    .collect(),
            },
            Some(ConfigSubcommand::Gen { output }) => ConfigAction::Gen { output },
            Some(ConfigSubcommand::Init { force }) => ConfigAction::Init { force },
            Some(ConfigSubcommand::Defaults) => ConfigAction::Defaults,
        }
    }
}
