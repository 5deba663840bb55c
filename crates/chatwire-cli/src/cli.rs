//! CLI argument definitions.

use clap::Parser;

use crate::commands::Command;

/// Chat with a streaming completion backend.
#[derive(Parser, Debug)]
#[command(name = "chatwire")]
#[command(author, version = env!("CHATWIRE_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// API base URL
    #[arg(
        long,
        global = true,
        env = "CHATWIRE_BASE_URL",
        default_value = "http://localhost:8000"
    )]
    pub base_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "chatwire",
            "whoami",
            "--json",
            "-vv",
            "--base-url",
            "https://chat.example.com/api",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.base_url, "https://chat.example.com/api");
    }
}
