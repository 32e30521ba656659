//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's
//! derive macros. It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Flowherd -- network-flow telemetry pipeline tooling.
///
/// Use `flowherd <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "flowherd", version, about, long_about = None)]
pub struct Cli {
    /// Path to the flowherd.toml configuration file.
    #[arg(short, long, default_value = "flowherd.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check daemon and pipeline branch status.
    Status(StatusArgs),

    /// Run the archive retention sweep (compress and expire old files).
    Sweep(SweepArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- status ----

/// Display daemon liveness and per-branch configuration.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show detailed per-branch settings.
    #[arg(short, long)]
    pub verbose: bool,
}

// ---- sweep ----

/// Run one retention sweep over the archive tree.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Override the archive root from the config file.
    #[arg(long)]
    pub root: Option<PathBuf>,
}

// ---- config ----

/// Manage flowherd configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, pipeline, archive, aggregation, programs).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_status_basic() {
        let cli = Cli::try_parse_from(["flowherd", "status"]).expect("should parse");
        match cli.command {
            Commands::Status(args) => {
                assert!(!args.verbose, "verbose should default to false");
            }
            _ => panic!("expected Status command"),
        }
    }

    #[test]
    fn test_cli_parse_status_verbose() {
        let cli = Cli::try_parse_from(["flowherd", "status", "-v"]).expect("should parse");
        match cli.command {
            Commands::Status(args) => assert!(args.verbose),
            _ => panic!("expected Status command"),
        }
    }

    #[test]
    fn test_cli_parse_sweep_defaults() {
        let cli = Cli::try_parse_from(["flowherd", "sweep"]).expect("should parse");
        match cli.command {
            Commands::Sweep(args) => assert!(args.root.is_none()),
            _ => panic!("expected Sweep command"),
        }
    }

    #[test]
    fn test_cli_parse_sweep_root_override() {
        let cli = Cli::try_parse_from(["flowherd", "sweep", "--root", "/data/flows"])
            .expect("should parse");
        match cli.command {
            Commands::Sweep(args) => {
                assert_eq!(args.root, Some(std::path::PathBuf::from("/data/flows")));
            }
            _ => panic!("expected Sweep command"),
        }
    }

    #[test]
    fn test_cli_parse_config_validate() {
        let cli = Cli::try_parse_from(["flowherd", "config", "validate"]).expect("should parse");
        match cli.command {
            Commands::Config(args) => match args.action {
                ConfigAction::Validate => {}
                _ => panic!("expected Validate action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["flowherd", "config", "show", "--section", "archive"])
            .expect("should parse");
        match cli.command {
            Commands::Config(args) => match args.action {
                ConfigAction::Show { section } => {
                    assert_eq!(section, Some("archive".to_owned()));
                }
                _ => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_custom_config_path() {
        let cli = Cli::try_parse_from(["flowherd", "-c", "/custom/flowherd.toml", "status"])
            .expect("should parse");
        assert_eq!(cli.config, std::path::PathBuf::from("/custom/flowherd.toml"));
    }

    #[test]
    fn test_cli_parse_output_format_json() {
        let cli =
            Cli::try_parse_from(["flowherd", "--output", "json", "status"]).expect("should parse");
        match cli.output {
            OutputFormat::Json => {}
            _ => panic!("expected Json output format"),
        }
    }

    #[test]
    fn test_cli_parse_invalid_command_fails() {
        assert!(Cli::try_parse_from(["flowherd", "frobnicate"]).is_err());
    }

    #[test]
    fn test_cli_parse_missing_command_fails() {
        assert!(Cli::try_parse_from(["flowherd"]).is_err());
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "flowherd");

        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        assert!(subcommands.contains(&"status"));
        assert!(subcommands.contains(&"sweep"));
        assert!(subcommands.contains(&"config"));
    }
}
