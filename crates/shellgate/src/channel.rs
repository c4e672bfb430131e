//! The session channel seam and an in-process implementation of it

use serde_json::Value;
use shellgate_protocol::{ClientEvent, Frame, ProtocolError, ServerEvent};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Everything the channel can report to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    /// Transport connected
    Opened,
    Event(ServerEvent),
    /// Transport went away; carries the reason if one was given
    Closed(String),
    TransportError(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel is already open")]
    AlreadyOpen,
    #[error("channel unavailable: {0}")]
    Unavailable(String),
    #[error("channel is closed")]
    Closed,
}

/// Bidirectional named-event transport owned by a single bridge
pub trait EventChannel {
    /// Register for the given inbound event kinds and start delivering signals
    fn open(&mut self, kinds: &[&'static str]) -> Result<UnboundedReceiver<ChannelSignal>, ChannelError>;

    /// Send one event; fire-and-forget
    fn emit(&mut self, event: ClientEvent) -> Result<(), ChannelError>;

    fn set_reconnection(&mut self, enabled: bool);

    /// Detach every listener registered by `open`
    fn unsubscribe_all(&mut self);

    fn close(&mut self);
}

#[derive(Debug)]
struct LoopbackState {
    listener: Option<UnboundedSender<ChannelSignal>>,
    kinds: HashSet<&'static str>,
    outbound: Vec<ClientEvent>,
    reconnection: bool,
    closed: bool,
    refuse_open: Option<String>,
}

fn lock(state: &Mutex<LoopbackState>) -> MutexGuard<'_, LoopbackState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Client end of an in-process channel
#[derive(Debug)]
pub struct LoopbackChannel {
    state: Arc<Mutex<LoopbackState>>,
}

/// Remote end of a [`LoopbackChannel`], used to script the other side of a session
#[derive(Debug, Clone)]
pub struct LoopbackPeer {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackChannel {
    pub fn pair() -> (LoopbackChannel, LoopbackPeer) {
        let state = Arc::new(Mutex::new(LoopbackState {
            listener: None,
            kinds: HashSet::new(),
            outbound: Vec::new(),
            reconnection: true,
            closed: false,
            refuse_open: None,
        }));
        (
            LoopbackChannel {
                state: Arc::clone(&state),
            },
            LoopbackPeer { state },
        )
    }
}

impl EventChannel for LoopbackChannel {
    fn open(&mut self, kinds: &[&'static str]) -> Result<UnboundedReceiver<ChannelSignal>, ChannelError> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(ChannelError::Closed);
        }
        if let Some(reason) = &state.refuse_open {
            return Err(ChannelError::Unavailable(reason.clone()));
        }
        if state.listener.is_some() {
            return Err(ChannelError::AlreadyOpen);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.listener = Some(tx);
        state.kinds = kinds.iter().copied().collect();
        Ok(rx)
    }

    fn emit(&mut self, event: ClientEvent) -> Result<(), ChannelError> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(ChannelError::Closed);
        }
        state.outbound.push(event);
        Ok(())
    }

    fn set_reconnection(&mut self, enabled: bool) {
        lock(&self.state).reconnection = enabled;
    }

    fn unsubscribe_all(&mut self) {
        let mut state = lock(&self.state);
        state.listener = None;
        state.kinds.clear();
    }

    fn close(&mut self) {
        let mut state = lock(&self.state);
        state.closed = true;
        state.listener = None;
    }
}

impl LoopbackPeer {
    /// Make the next `open` fail with `Unavailable(reason)`
    pub fn refuse_open(&self, reason: &str) {
        lock(&self.state).refuse_open = Some(reason.to_string());
    }

    /// Signal that the transport connected
    pub fn open(&self) -> bool {
        self.deliver(ChannelSignal::Opened)
    }

    /// Decode a raw frame and deliver it.
    ///
    /// Returns `Ok(false)` when nobody is listening for that event kind.
    pub fn send_frame(&self, event: &str, payload: Value) -> Result<bool, ProtocolError> {
        let event = ServerEvent::from_frame(Frame::new(event, payload)).map_err(|err| {
            log::warn!("Undecodable frame: {}", err);
            err
        })?;
        Ok(self.send_event(event))
    }

    pub fn send_event(&self, event: ServerEvent) -> bool {
        if !self.is_subscribed(event.name()) {
            log::debug!("Dropping '{}' event: no listener", event.name());
            return false;
        }
        self.deliver(ChannelSignal::Event(event))
    }

    pub fn drop_connection(&self, reason: &str) -> bool {
        self.deliver(ChannelSignal::Closed(reason.to_string()))
    }

    pub fn transport_error(&self, error: &str) -> bool {
        self.deliver(ChannelSignal::TransportError(error.to_string()))
    }

    /// Take everything the client emitted so far
    pub fn outbound(&self) -> Vec<ClientEvent> {
        std::mem::take(&mut lock(&self.state).outbound)
    }

    pub fn is_subscribed(&self, kind: &str) -> bool {
        let state = lock(&self.state);
        state.listener.is_some() && state.kinds.contains(kind)
    }

    pub fn has_listeners(&self) -> bool {
        lock(&self.state).listener.is_some()
    }

    pub fn reconnection_enabled(&self) -> bool {
        lock(&self.state).reconnection
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    fn deliver(&self, signal: ChannelSignal) -> bool {
        let state = lock(&self.state);
        match &state.listener {
            Some(tx) => tx.send(signal).is_ok(),
            None => false,
        }
    }
}
