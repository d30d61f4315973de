//! kernelgate command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use kernelgate_core::config::{LogLevel, LoggingConfig};

/// kernelgate - gateway for remote compute kernels
#[derive(Parser, Debug)]
#[command(name = "kernelgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "KERNELGATE_CONFIG", global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the gateway server
    Serve(commands::serve::ServeArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Default `EnvFilter` directives when `RUST_LOG` is unset.
///
/// Each `-v` raises the configured level by one step.
pub fn log_filter(logging: &LoggingConfig, verbose: u8) -> String {
    let level = match verbose {
        0 => logging.level,
        1 => match logging.level {
            LogLevel::Trace | LogLevel::Debug => LogLevel::Trace,
            _ => LogLevel::Debug,
        },
        _ => LogLevel::Trace,
    };
    format!("kernelgate={0},tower_http={0}", level.as_str())
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve(args) => commands::serve::run(args, config_path).await,
        Commands::Config(args) => commands::config::run(args, config_path).await,
        Commands::Version => {
            println!("kernelgate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
