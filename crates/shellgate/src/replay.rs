//! Offline replay of recorded inbound frames through a headless bridge

use anyhow::{Context, Result};
use shellgate_protocol::{ClientEvent, Frame};
use shellgate_terminal::HeadlessSurface;
use std::path::{Path, PathBuf};

use crate::bridge::SessionBridge;
use crate::channel::LoopbackChannel;
use crate::config::BridgeConfig;
use crate::connection::ConnectionState;

/// Pseudo-event that marks the transport connecting
const CONNECT_EVENT: &str = "connect";

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    pub record: bool,
    /// Where to write the transcript when recording
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ReplayReport {
    pub frames: usize,
    /// Frames nobody listened for
    pub dropped: usize,
    pub screen: String,
    pub state: ConnectionState,
    pub status: String,
    pub outbound: Vec<ClientEvent>,
    pub transcript_path: Option<PathBuf>,
}

/// Feed newline-delimited JSON frames to a bridge and report what it ended up showing
pub fn replay_frames(config: BridgeConfig, input: &str, options: &ReplayOptions) -> Result<ReplayReport> {
    let (channel, peer) = LoopbackChannel::pair();
    let surface = HeadlessSurface::new(config.initial_viewport).with_scrollback(config.scrollback);
    let mut bridge = SessionBridge::new(config, channel, surface);

    if options.record {
        bridge.start_log().context("Failed to start transcript")?;
    }

    let mut frames = 0;
    let mut dropped = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let frame = Frame::parse(line).with_context(|| format!("Line {}: not a frame", index + 1))?;
        frames += 1;

        if frame.event == CONNECT_EVENT {
            peer.open();
        } else {
            let delivered = peer
                .send_frame(&frame.event, frame.payload)
                .with_context(|| format!("Line {}: rejected frame", index + 1))?;
            if !delivered {
                dropped += 1;
            }
        }
        bridge.pump();
    }

    // Settle any debounced refit left over from the last frames
    if bridge.refit_pending() {
        bridge.request_fit();
    }

    let mut transcript_path = None;
    if options.record {
        if bridge.transcript().is_recording() {
            bridge.stop_log().context("Failed to stop transcript")?;
        }
        let dir = options.out_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        transcript_path = Some(save(&bridge, &dir)?);
    }

    let report = ReplayReport {
        frames,
        dropped,
        screen: bridge.surface().map(|s| s.contents()).unwrap_or_default(),
        state: bridge.connection_state(),
        status: bridge.view().status.clone(),
        outbound: peer.outbound(),
        transcript_path,
    };
    bridge.shutdown();
    Ok(report)
}

fn save(bridge: &SessionBridge<LoopbackChannel, HeadlessSurface>, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = bridge.save_transcript(dir)?;
    Ok(path)
}
