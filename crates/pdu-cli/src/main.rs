//! Entry point for the `pdu-library` binary.
//!
//! Delegates to [`pdu_cli::run`], which loads configuration, parses the
//! command and maps failures onto the documented exit codes.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    pdu_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
