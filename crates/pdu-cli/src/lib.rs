//! Runtime of the `pdu-library` command-line tool.
//!
//! Arguments are split into global configuration flags, which `ortho_config`
//! layers over the file and environment, and the command itself, which clap
//! parses. Each failure is written as one line to stderr and becomes the
//! process exit code.

use std::ffi::OsString;
use std::fmt::Display;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use pdu_service::telemetry;
use pdu_types::ErrorCode;
use tracing::warn;

mod cli;
mod commands;
mod config;
mod errors;

use cli::Cli;
use config::{ConfigLoader, OrthoConfigLoader, command_arguments, split_config_arguments};
use errors::AppError;

/// Runs the CLI with the given arguments and output streams.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    match execute(args, stdout, loader) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            report(stdout, &error.render());
            ExitCode::SUCCESS
        }
        Err(error) => {
            report(stderr, &error);
            exit_code(error.code())
        }
    }
}

/// Parses, loads configuration and runs the command.
pub(crate) fn execute<I, W, L>(args: I, stdout: &mut W, loader: &L) -> Result<(), AppError>
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let cli = Cli::try_parse_from(command_arguments(&args, &split)).map_err(AppError::CliUsage)?;
    let config = loader.load(&split.config_arguments)?;
    telemetry::initialise(&config)?;
    commands::execute(&cli.command, &config, stdout)
}

fn exit_code(code: ErrorCode) -> ExitCode {
    ExitCode::from(code.exit_status())
}

fn report<S: Write>(stream: &mut S, message: &dyn Display) {
    if let Err(error) = writeln!(stream, "{message}") {
        warn!(%error, "failed to write command output");
    }
}

#[cfg(test)]
mod tests;
