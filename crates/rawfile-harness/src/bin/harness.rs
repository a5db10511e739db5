//! CLI entrypoint for the rawfile harness.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use rawfile_core::structured_log::{self, LogEmitter, LogLevel};
use rawfile_core::{ModeGrammar, Opener, stdout};
use rawfile_harness::HarnessError;

/// Drive rawfile streams from the command line.
#[derive(Debug, Parser)]
#[command(name = "rawfile-harness")]
#[command(about = "Exercise descriptor-backed streams end to end")]
struct Cli {
    /// Append structured JSONL logs to this file.
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the open flags a mode string parses to, as JSON.
    Flags {
        mode: String,
        /// Ignore unknown mode characters instead of rejecting them.
        #[arg(long)]
        compat: bool,
    },
    /// Copy a file to stdout.
    Cat {
        path: PathBuf,
        /// Number each line.
        #[arg(long)]
        lines: bool,
    },
    /// Write text to a file.
    Write {
        path: PathBuf,
        text: String,
        /// Open mode for the target file.
        #[arg(long, default_value = "w")]
        mode: String,
    },
    /// Copy one file to another.
    Copy { src: PathBuf, dst: PathBuf },
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &cli.log {
        structured_log::install(Some(LogEmitter::to_file(path, LogLevel::Debug)?));
    }
    let opener = Opener::default();
    let out = stdout();

    let result: Result<(), HarnessError> = match cli.command {
        Command::Flags { mode, compat } => {
            let grammar = if compat {
                ModeGrammar::Compat
            } else {
                ModeGrammar::Strict
            };
            rawfile_harness::flags(out, &mode, grammar).map(drop)
        }
        Command::Cat { path, lines } => rawfile_harness::cat(&opener, out, &path, lines).map(drop),
        Command::Write { path, text, mode } => {
            rawfile_harness::write_text(&opener, out, &path, &text, &mode).map(drop)
        }
        Command::Copy { src, dst } => rawfile_harness::copy(&opener, out, &src, &dst).map(drop),
    };
    structured_log::flush()?;
    result?;
    Ok(())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
