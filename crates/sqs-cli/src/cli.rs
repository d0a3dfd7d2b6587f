use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sqs_types::StreamState;

#[derive(Parser)]
#[command(
    name = "sqs",
    about = "Stream Query Scope: resolve streams queries against caller permissions",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum StateArg {
    #[default]
    Default,
    Trashed,
    All,
}

impl From<StateArg> for StreamState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Default => StreamState::Default,
            StateArg::Trashed => StreamState::Trashed,
            StateArg::All => StreamState::All,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve a streams query against a fixture
    Resolve(ResolveArgs),
    /// Validate a resolver configuration file
    CheckConfig(CheckConfigArgs),
}

#[derive(Args)]
pub struct ResolveArgs {
    /// TOML fixture with stores, streams and the calling access
    #[arg(short, long)]
    pub fixture: PathBuf,
    /// The streams parameter: a stream id or JSON text. Omit for the default query
    pub query: Option<String>,
    #[arg(long, value_enum, default_value_t = StateArg::Default)]
    pub state: StateArg,
    /// Translate legacy-prefixed ids in and out
    #[arg(long)]
    pub legacy: bool,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resolve() {
        let cli = Cli::try_parse_from(["sqs", "resolve", "-f", "fx.toml", "work"]).unwrap();
        if let Command::Resolve(args) = cli.command {
            assert_eq!(args.fixture, PathBuf::from("fx.toml"));
            assert_eq!(args.query.as_deref(), Some("work"));
            assert!(matches!(args.state, StateArg::Default));
            assert!(!args.legacy);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_resolve_options() {
        let cli = Cli::try_parse_from([
            "sqs",
            "resolve",
            "--fixture",
            "fx.toml",
            "--state",
            "all",
            "--legacy",
            "--format",
            "json",
        ])
        .unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        if let Command::Resolve(args) = cli.command {
            assert!(args.query.is_none());
            assert!(matches!(StreamState::from(args.state), StreamState::All));
            assert!(args.legacy);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_check_config() {
        let cli = Cli::try_parse_from(["sqs", "check-config", "resolver.toml", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::CheckConfig(_)));
    }

    #[test]
    fn resolve_requires_fixture() {
        assert!(Cli::try_parse_from(["sqs", "resolve", "work"]).is_err());
    }
}
