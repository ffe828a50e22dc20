//! PAK client library
//!
//! Core functionality for the `pak` CLI tool: subcommand definitions and
//! their handlers.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Subcommand;
use thiserror::Error;

#[derive(Subcommand)]
pub enum Commands {
    /// Show the trailer and index summary of an archive
    Info {
        /// Path to the .pak archive
        archive: PathBuf,
    },

    /// List the files an archive contains
    List {
        /// Path to the .pak archive
        archive: PathBuf,
    },

    /// Extract an archive's files to an output root
    Extract {
        /// Path to the .pak archive
        archive: PathBuf,

        /// Output root directory
        #[arg(short, long, default_value = "out")]
        output: PathBuf,
    },
}

/// Output format selection
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON output
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

/// Client-side failures that carry their own exit codes
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{failed} of {total} files failed to extract")]
    PartialExtraction { failed: usize, total: usize },
}
