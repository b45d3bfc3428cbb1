//! Shared plumbing for the `swapout` and `swapmon` binaries

pub mod logging;
pub mod report;

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;

/// Parse argv, mapping clap's outcomes onto the tools' exit codes
///
/// Help and version exit 0; every usage error exits 1.
pub fn parse_args<P: Parser>() -> Result<P, ExitCode> {
    P::try_parse().map_err(|e| {
        let _ = e.print();
        match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
            _ => ExitCode::FAILURE,
        }
    })
}
