use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs;

use shellgate::{replay_frames, BridgeConfig, Cli, Commands, ConnectionState, ReplayOptions};
use shellgate_terminal::{strip_control_sequences, translate, KeyAction, Modifiers};

fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let config = BridgeConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Strip { input, output } => {
            let raw = fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;
            let clean = strip_control_sequences(&String::from_utf8_lossy(&raw));
            match output {
                Some(path) => {
                    fs::write(&path, clean).with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{} {}", "Wrote".green(), path.display());
                }
                None => print!("{}", clean),
            }
        }
        Commands::Keys {
            value,
            ctrl,
            alt,
            shift,
            special,
        } => {
            let action = if special {
                KeyAction::special(value.as_str())
            } else {
                KeyAction::char(value.as_str()).with_modifiers(Modifiers { shift, ctrl, alt })
            };
            let payload = translate(&action);
            println!("{} {}", value.cyan(), payload.escaped().bold());
        }
        Commands::Replay { frames, record, out } => {
            let input = fs::read_to_string(&frames)
                .with_context(|| format!("Failed to read {}", frames.display()))?;
            let report = replay_frames(config, &input, &ReplayOptions { record, out_dir: out })?;

            println!("{}", "─".repeat(40).dimmed());
            print!("{}", report.screen);
            println!("{}", "─".repeat(40).dimmed());

            let state = match report.state {
                ConnectionState::Connected => report.state.as_str().green(),
                ConnectionState::Connecting => report.state.as_str().yellow(),
                ConnectionState::Error | ConnectionState::Disconnected => report.state.as_str().red(),
            };
            println!("{} {} ({})", "State:".bold(), state, report.status);
            println!(
                "{} {} frames, {} dropped",
                "Input:".bold(),
                report.frames,
                report.dropped
            );
            for event in &report.outbound {
                println!("  {} {}", "→".blue(), serde_json::to_string(&event.to_frame())?);
            }
            if let Some(path) = report.transcript_path {
                println!("{} {}", "Transcript:".bold(), path.display());
            }
        }
    }

    Ok(())
}
