//! flowherd CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use flowherd_cli::cli::{Cli, Commands};
use flowherd_cli::commands;
use flowherd_cli::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output on stdout stays parseable.
    let level = cli.log_level.clone().unwrap_or_else(|| "warn".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let writer = OutputWriter::new(cli.output);

    let result = match cli.command {
        Commands::Status(args) => commands::status::execute(args, &cli.config, &writer).await,
        Commands::Sweep(args) => commands::sweep::execute(args, &cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    };

    if let Err(e) = result {
        eprintln!("flowherd: {e}");
        std::process::exit(e.exit_code());
    }
}
