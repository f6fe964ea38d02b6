// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # linecount
//!
//! Command-line interface for bounded-memory line frequency counting.
//!
//! ## Usage
//! ```bash
//! # Count lines of a file within 10 MiB, spilling to disk as needed
//! linecount count --filename big_file.txt --memory-limit 10M
//!
//! # Ten most frequent lines from stdin, with statistics
//! cat big_file.txt | linecount count --filename - --top 10 --stats
//!
//! # Generate a 100 MB test file of random integers in [0, 3)
//! linecount generate --num-elements 3 --size "100 MB" --filename big_file.txt
//!
//! # Show what the memory oracle sees
//! linecount status
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "linecount",
    about = "Count distinct lines of large inputs within a memory budget",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file; command-line options override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count each distinct line and print `line - count` pairs.
    Count(commands::count::CountArgs),

    /// Write a file of random integers, one per line.
    Generate {
        /// Integers are drawn from [0, num_elements).
        #[arg(short, long, default_value_t = 3)]
        num_elements: u64,

        /// Minimum file size (e.g., "100 MB", "1.5G").
        #[arg(short, long, default_value = "100 MB")]
        size: String,

        /// Output file.
        #[arg(short, long, default_value = "big_file.txt")]
        filename: PathBuf,
    },

    /// Display the memory readings the oracle strategy would use.
    Status {
        /// Print the readings as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Count(args) => commands::count::execute(cli.config.as_deref(), args),
        Commands::Generate {
            num_elements,
            size,
            filename,
        } => commands::generate::execute(num_elements, &size, &filename),
        Commands::Status { json } => commands::status::execute(json),
    }
}
