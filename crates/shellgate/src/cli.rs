use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for shellgate
#[derive(Parser)]
#[command(name = "shellgate")]
#[command(about = "Session I/O bridge tooling for browser remote shells")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Bridge configuration file (TOML)
    #[arg(long, global = true, env = "SHELLGATE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Strip terminal control sequences from a raw session log
    Strip {
        /// Raw log to clean
        input: PathBuf,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the bytes an on-screen keyboard key sends
    Keys {
        /// Character, or key name with --special (e.g. ArrowUp, F5, Esc)
        value: String,
        #[arg(long)]
        ctrl: bool,
        #[arg(long)]
        alt: bool,
        #[arg(long)]
        shift: bool,
        /// Treat VALUE as a named key
        #[arg(long)]
        special: bool,
    },
    /// Replay recorded inbound frames (one JSON object per line) through a bridge
    Replay {
        /// File of `{"event": ..., "payload": ...}` lines; `connect` opens the channel
        frames: PathBuf,
        /// Record a transcript while replaying
        #[arg(long)]
        record: bool,
        /// Directory for the transcript (default: current directory)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}
