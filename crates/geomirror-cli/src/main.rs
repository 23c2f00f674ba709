//! geomirror - Republish MaxMind GeoLite2 databases
//!
//! Downloads each GeoLite2 edition, packages the `.mmdb` file as an npm
//! package and publishes it, optionally mirroring it to an R2 bucket.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "geomirror")]
#[command(about = "Republish MaxMind GeoLite2 databases as npm packages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file path (default: ./geomirror.toml or ~/.config/geomirror/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Download, package and publish GeoLite2 editions
    Publish(cmd::publish::PublishArgs),
    /// List known editions
    Editions,
    /// Show current configuration
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let progress = geomirror_core::ProgressContext::new();

    // Bars route log lines through MultiProgress on a TTY; plain lines otherwise
    let multi = progress.is_tty().then(|| progress.multi());
    geomirror_core::init_logging(cli.quiet, cli.debug, multi)?;

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Command::Publish(args) => cmd::publish::run(args, &config, &progress),
        Command::Editions => {
            cmd::editions::run(&config);
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            cmd::print_config(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}
