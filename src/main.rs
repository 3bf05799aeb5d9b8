//! # Mirror Hook CLI
//!
//! This is the binary entry point for the `mirror-hook` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Building the logger the library writes to.
//! - Executing the selected command and turning library errors into a
//!   non-zero exit status.
//!
//! All synchronization logic lives in the `mirror_hook` library; the binary
//! feeds it a registry file and a payload read from disk or stdin.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
