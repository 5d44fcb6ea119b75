//! CLI definitions for tag-update.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "tag-update",
    version,
    about = "Apply tag update envelopes to a simulated device",
    infer_subcommands = true,
    after_help = "Examples:\n  tag-update apply --device device.toml --envelope response.json\n  cat response.json | tag-update apply --device device.toml --envelope - --json\n  tag-update check --device device.toml --envelope response.json\n  tag-update tags --device device.toml"
)]
pub struct Cli {
    /// Log each snapshot, write and restore.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify, validate and apply one envelope, restoring on failure when requested.
    Apply {
        /// Device configuration (`device.toml`).
        #[arg(long)]
        device: PathBuf,
        /// Envelope JSON file, or `-` for stdin.
        #[arg(long)]
        envelope: PathBuf,
        /// Envelope id to accept (defaults to `service.expected_id`).
        #[arg(long)]
        expected_id: Option<i64>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Verify and validate an envelope without touching any tag.
    Check {
        /// Device configuration (`device.toml`).
        #[arg(long)]
        device: PathBuf,
        /// Envelope JSON file, or `-` for stdin.
        #[arg(long)]
        envelope: PathBuf,
        /// Envelope id to accept (defaults to `service.expected_id`).
        #[arg(long)]
        expected_id: Option<i64>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the configured tags with their ids, types and values.
    Tags {
        /// Device configuration (`device.toml`).
        #[arg(long)]
        device: PathBuf,
    },
    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
        /// Write the script to a file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}
