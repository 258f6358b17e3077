// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! QueueDesk - queue ticketing with live display boards.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use queuedesk_config::{ConfigError, QueueDeskConfig};

/// QueueDesk - queue ticketing with live display boards.
#[derive(Parser, Debug)]
#[command(name = "queuedesk", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP/WebSocket server (default).
    Serve,
    /// Validate and print the effective configuration.
    Config,
    /// Open the database and apply pending migrations.
    Migrate,
}

fn load(path: Option<&PathBuf>) -> Result<QueueDeskConfig, Vec<ConfigError>> {
    match path {
        Some(path) => queuedesk_config::load_and_validate_path(path),
        None => queuedesk_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            queuedesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Config => serve::print_config(&config),
        Commands::Migrate => serve::run_migrate(&config).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::parse_from(["queuedesk"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["queuedesk", "migrate", "--config", "/tmp/q.toml"]);
        assert!(matches!(cli.command, Some(Commands::Migrate)));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/q.toml")));
    }
}
