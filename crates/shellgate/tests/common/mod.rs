#![allow(dead_code)]

use shellgate::{BridgeConfig, LoopbackChannel, LoopbackPeer, SessionBridge};
use shellgate_terminal::HeadlessSurface;

pub type TestBridge = SessionBridge<LoopbackChannel, HeadlessSurface>;

/// Bridge over a loopback channel whose transport has not connected yet
pub fn bridge_with(config: BridgeConfig) -> (TestBridge, LoopbackPeer) {
    let (channel, peer) = LoopbackChannel::pair();
    let surface = HeadlessSurface::new(config.initial_viewport);
    (SessionBridge::new(config, channel, surface), peer)
}

pub fn bridge() -> (TestBridge, LoopbackPeer) {
    bridge_with(BridgeConfig::default())
}

/// Connected bridge with the initial geometry event already drained
pub fn connected() -> (TestBridge, LoopbackPeer) {
    let (mut bridge, peer) = bridge();
    peer.open();
    bridge.pump();
    peer.outbound();
    (bridge, peer)
}
