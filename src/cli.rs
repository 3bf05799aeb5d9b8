//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use mirror_hook::logging::Logger;

use crate::commands;

/// Mirror Hook - Keep local git mirrors in sync with push notifications
#[derive(Parser, Debug)]
#[command(name = "mirror-hook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "info",
        env = "MIRROR_HOOK_LOG"
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synchronize the mirrors a push notification targets
    Sync(commands::sync::SyncArgs),

    /// Show which mirrors a notification would synchronize, without running git
    Resolve(commands::resolve::ResolveArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let logger = self.logger();
        let result = match self.command {
            Commands::Sync(args) => commands::sync::execute(args, logger.clone()),
            Commands::Resolve(args) => commands::resolve::execute(args, logger.clone()),
            Commands::Completions(args) => commands::completions::execute(args),
        };
        logger.flush();
        result
    }

    /// Log lines go to stderr so stdout stays parseable.
    fn logger(&self) -> Logger {
        let sink = env_logger::Builder::new()
            .parse_filters(&self.log_level)
            .format_timestamp_millis()
            .build();
        Logger::from_log(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_defaults_to_info() {
        let cli = Cli::try_parse_from(["mirror-hook", "completions", "bash"]).unwrap();
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_log_level_is_global() {
        let cli = Cli::try_parse_from([
            "mirror-hook",
            "resolve",
            "--registry",
            "registry.yaml",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
    }
}
