//! CLI command definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Overrides;

/// Longest monotonic run analysis over numeric streams
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the log level (overridden by RUST_LOG)
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Configuration file layered over the built-in defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Main command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed values through the bounded queue and print one line per batch
    Pipeline {
        /// Input file; stdin when omitted or `-`
        input: Option<PathBuf>,

        /// Bounded queue capacity
        #[arg(long)]
        queue_capacity: Option<usize>,

        /// Maximum items per batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Maximum simultaneous analyses
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Output in JSON format (one object per line)
        #[arg(long)]
        json: bool,
    },

    /// Analyze the whole input as a single streamed sequence
    Stream {
        /// Input file; stdin when omitted or `-`
        input: Option<PathBuf>,

        /// Initial capacity of the growable stream buffer
        #[arg(long)]
        initial_capacity: Option<usize>,

        /// Maximum simultaneous analyses
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

impl Commands {
    /// Flag values that override the loaded configuration.
    #[must_use]
    pub const fn overrides(&self) -> Overrides {
        match *self {
            Self::Pipeline {
                queue_capacity,
                batch_size,
                max_concurrency,
                ..
            } => Overrides {
                queue_capacity,
                batch_size,
                max_concurrency,
                initial_capacity: None,
            },
            Self::Stream {
                initial_capacity,
                max_concurrency,
                ..
            } => Overrides {
                queue_capacity: None,
                batch_size: None,
                max_concurrency,
                initial_capacity,
            },
            Self::Config => Overrides {
                queue_capacity: None,
                batch_size: None,
                max_concurrency: None,
                initial_capacity: None,
            },
        }
    }
}
