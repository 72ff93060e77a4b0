// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Somnia - dream journal backend.
//!
//! This is the binary entry point for the Somnia service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod serve;
mod shutdown;
mod status;

/// Somnia - dream journal backend.
#[derive(Parser, Debug)]
#[command(name = "somnia", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the background worker and image retry sweep.
    Serve,
    /// Show database statistics.
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match somnia_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            somnia_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Status) => status::run_status(&config).await,
        None => {
            println!("somnia: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
