//! `makefig`: keep a Padauk project's Makefile settings in sync.
//!
//! ```sh
//! makefig config list
//! makefig config set DEVICE PFS173 F_CPU 16000000
//! makefig config init
//! makefig make build
//! makefig devices
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use makefig::cli::Command;
use makefig::runner::Pipe;
use makefig::{ConfigResult, Makefig, WriteMode};

#[derive(Parser, Debug)]
#[command(name = "makefig", version, about)]
struct Cli {
    /// Makefile to operate on (default: nearest Makefile up to the repo root).
    #[arg(long, short = 'f', global = true)]
    makefile: Option<PathBuf>,

    /// Replace the Makefile atomically through a temporary file.
    #[arg(long, global = true)]
    atomic: bool,

    /// Log what is read, written and spawned.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .init();

    let mut builder = Makefig::builder();
    if let Some(path) = cli.makefile {
        builder = builder.makefile(path);
    }
    if cli.atomic {
        builder = builder.write_mode(WriteMode::Atomic);
    }

    let action = cli.command.into_action();
    let result = builder.handle_with(&action, |chunk| match chunk.pipe {
        Pipe::Stdout => println!("{}", chunk.text),
        Pipe::Stderr => eprintln!("{}", chunk.text),
    });

    match result {
        Ok(result @ ConfigResult::MakeFinished { success: false, .. }) => {
            eprintln!("{result}");
            ExitCode::FAILURE
        }
        Ok(result) => {
            println!("{result}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
