//! Session I/O bridge
//!
//! [`SessionBridge`] is the only owner of the live channel and terminal
//! surface. Presentation code talks to it through methods (or
//! [`BridgeCommand`]s when driven by [`SessionBridge::run`]) and observes it
//! through the published [`SessionView`].

mod refit;
mod view;

pub use refit::RefitDebounce;
pub use view::SessionView;

use shellgate_protocol::{ClientEvent, ControlAction, ServerEvent, SessionGeometry, TerminalOptions};
use shellgate_terminal::{
    translate, KeyAction, Modifier, ModifierLatch, TerminalSurface, TranscriptError, TranscriptRecorder, Viewport,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::channel::{ChannelSignal, EventChannel};
use crate::config::BridgeConfig;
use crate::connection::{ConnectionEvent, ConnectionMonitor, ConnectionState};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{0} is not permitted by the remote session")]
    NotPermitted(ControlAction),
    #[error("no transcript has been recorded")]
    NothingRecorded,
    #[error("failed to write transcript: {0}")]
    Io(#[from] std::io::Error),
}

/// Requests from the presentation layer, consumed by [`SessionBridge::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCommand {
    /// Raw bytes produced by the terminal surface from a physical key
    TerminalInput(String),
    /// On-screen keyboard key
    Key(KeyAction),
    ToggleModifier(Modifier),
    SetFontSize(u16),
    AdjustFontSize(i32),
    ResetFontSize,
    ViewportResized(Option<Viewport>),
    Fit,
    ToggleLog,
    Reauth,
    ReplayCredentials,
    SendInterrupt,
    ClearScreen,
    Disconnect,
}

pub struct SessionBridge<C: EventChannel, S: TerminalSurface> {
    config: BridgeConfig,
    channel: Option<C>,
    surface: Option<S>,
    inbound: Option<UnboundedReceiver<ChannelSignal>>,
    connection: ConnectionMonitor,
    transcript: TranscriptRecorder,
    latch: ModifierLatch,
    allow_reauth: bool,
    allow_replay: bool,
    geometry: SessionGeometry,
    last_sent: Option<SessionGeometry>,
    refit: RefitDebounce,
    font_size: u16,
    view: SessionView,
    view_tx: watch::Sender<SessionView>,
    torn_down: bool,
}

impl<C: EventChannel, S: TerminalSurface> SessionBridge<C, S> {
    /// Attach the surface, compute the initial geometry and open the channel.
    ///
    /// Never fails: a channel that cannot be opened leaves the bridge in the
    /// `error` state, still safe to query and shut down.
    pub fn new(config: BridgeConfig, mut channel: C, mut surface: S) -> Self {
        let font_size = config.initial_font_size();
        surface.apply_options(&TerminalOptions {
            scrollback: Some(config.scrollback),
            ..TerminalOptions::default()
        });
        surface.set_viewport(config.initial_viewport);
        surface.set_font_size(font_size);
        let geometry = surface.fit();

        let mut connection = ConnectionMonitor::new();
        let inbound = match channel.open(ServerEvent::EVENT_NAMES) {
            Ok(rx) => {
                log::info!(
                    "Session channel opened ({} event kinds, {})",
                    ServerEvent::EVENT_NAMES.len(),
                    geometry
                );
                Some(rx)
            }
            Err(err) => {
                log::warn!("Failed to open session channel: {}", err);
                connection.apply(ConnectionEvent::TransportError(err.to_string()));
                channel.set_reconnection(false);
                None
            }
        };

        let view = SessionView::new(font_size, geometry);
        let (view_tx, _) = watch::channel(view.clone());
        let mut bridge = Self {
            latch: ModifierLatch::new(config.sticky_shift),
            refit: RefitDebounce::new(config.refit_debounce()),
            config,
            channel: Some(channel),
            surface: Some(surface),
            inbound,
            connection,
            transcript: TranscriptRecorder::new(),
            allow_reauth: false,
            allow_replay: false,
            geometry,
            last_sent: None,
            font_size,
            view,
            view_tx,
            torn_down: false,
        };
        if bridge.connection.is_terminal() {
            bridge.view.status_background = Some(bridge.config.error_background.clone());
        }
        bridge.publish();
        bridge
    }

    // ------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------

    /// Handle every signal already queued by the channel; returns how many
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let next = match self.inbound.as_mut() {
                Some(rx) => rx.try_recv(),
                None => break,
            };
            match next {
                Ok(signal) => {
                    self.handle_signal(signal);
                    handled += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.inbound = None;
                    self.handle_signal(ChannelSignal::Closed("transport dropped".to_string()));
                    handled += 1;
                    break;
                }
            }
        }
        handled
    }

    pub fn handle_signal(&mut self, signal: ChannelSignal) {
        if self.torn_down {
            return;
        }
        match signal {
            ChannelSignal::Opened => {
                self.transition(ConnectionEvent::ChannelOpened);
            }
            ChannelSignal::Event(event) => self.handle_event(event),
            ChannelSignal::Closed(reason) => {
                self.view.shutdown_countdown = None;
                self.transition(ConnectionEvent::ChannelClosed(reason));
            }
            ChannelSignal::TransportError(error) => {
                self.transition(ConnectionEvent::TransportError(error));
            }
        }
        self.publish();
    }

    fn handle_event(&mut self, event: ServerEvent) {
        log::trace!("Inbound '{}'", event.name());
        match event {
            ServerEvent::Data(payload) => {
                if let Some(surface) = self.surface.as_mut() {
                    surface.write(payload.as_bytes());
                }
                self.transcript.append(&payload.to_text());
            }
            ServerEvent::Status(text) => {
                let established = self.config.is_established(&text);
                self.transition(ConnectionEvent::Status { text, established });
            }
            ServerEvent::SshError(message) => {
                self.transition(ConnectionEvent::SessionRejected(message));
            }
            ServerEvent::Title(title) => self.view.title = Some(title),
            ServerEvent::Header(text) => {
                let text = text.filter(|t| !t.is_empty());
                let shown = text.is_some();
                self.view.header = text;
                // The banner takes room from the terminal
                if shown {
                    self.refit();
                }
            }
            ServerEvent::Footer(text) => self.view.footer = text.filter(|t| !t.is_empty()),
            ServerEvent::HeaderBackground(color) => self.view.header_background = Some(color),
            ServerEvent::StatusBackground(color) => {
                if !self.connection.is_terminal() {
                    self.view.status_background = Some(color);
                }
            }
            ServerEvent::AllowReauth(allowed) => self.allow_reauth = allowed,
            ServerEvent::AllowReplay(allowed) => self.allow_replay = allowed,
            ServerEvent::Disconnect(reason) => {
                self.view.shutdown_countdown = None;
                self.transition(ConnectionEvent::ChannelClosed(reason));
            }
            ServerEvent::Error(error) => {
                self.transition(ConnectionEvent::TransportError(error));
            }
            ServerEvent::ShutdownCountdown(seconds) => self.view.shutdown_countdown = Some(seconds),
            ServerEvent::SetTerminalOptions(mut options) => {
                let font_size = options.font_size.take();
                if let Some(surface) = self.surface.as_mut() {
                    surface.apply_options(&options);
                }
                match font_size {
                    Some(size) => {
                        self.set_font_size(size);
                    }
                    None => self.schedule_refit(),
                }
            }
            ServerEvent::Menu => log::debug!("Remote requested menu refresh"),
            ServerEvent::Reauth => {
                if let Err(err) = self.reauth() {
                    log::warn!("Ignoring remote reauth request: {}", err);
                }
            }
        }
    }

    fn transition(&mut self, event: ConnectionEvent) -> Option<ConnectionState> {
        let changed = self.connection.apply(event)?;
        match changed {
            ConnectionState::Connected => {
                if self.last_sent.is_none() {
                    self.emit(ClientEvent::Geometry(self.geometry));
                    self.last_sent = Some(self.geometry);
                }
            }
            ConnectionState::Error | ConnectionState::Disconnected => {
                if let Some(channel) = self.channel.as_mut() {
                    channel.set_reconnection(false);
                }
                self.view.status_background = Some(self.config.error_background.clone());
            }
            ConnectionState::Connecting => {}
        }
        Some(changed)
    }

    // ------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------

    /// Forward bytes the terminal surface produced, unmodified
    pub fn terminal_input(&mut self, data: &str) -> bool {
        self.send_data(data.to_string())
    }

    /// Translate an on-screen keyboard key (with the latched modifiers) and send it
    pub fn key_action(&mut self, action: KeyAction) -> bool {
        let action = self.latch.apply(action);
        let payload = translate(&action);
        let sent = self.send_data(payload.into_string());
        self.publish();
        sent
    }

    pub fn toggle_modifier(&mut self, modifier: Modifier) {
        self.latch.toggle(modifier);
        self.publish();
    }

    pub fn send_interrupt(&mut self) -> bool {
        self.send_data(translate(&KeyAction::control("c")).into_string())
    }

    pub fn clear_screen(&mut self) -> bool {
        self.send_data(translate(&KeyAction::control("l")).into_string())
    }

    fn send_data(&mut self, data: String) -> bool {
        if !self.connection.may_accept_input() {
            log::debug!(
                "Dropping {} bytes of input while {}",
                data.len(),
                self.connection.state()
            );
            return false;
        }
        self.transcript.append(&data);
        self.emit(ClientEvent::Data(data));
        true
    }

    fn emit(&mut self, event: ClientEvent) {
        match self.channel.as_mut() {
            Some(channel) => {
                let name = event.name();
                if let Err(err) = channel.emit(event) {
                    log::warn!("Failed to send '{}': {}", name, err);
                }
            }
            None => log::debug!("No channel for '{}'", event.name()),
        }
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    /// Apply a font size now and recompute geometry after the debounce delay
    pub fn set_font_size(&mut self, size: u16) -> u16 {
        self.apply_font_size(i32::from(size))
    }

    pub fn adjust_font_size(&mut self, delta: i32) -> u16 {
        self.apply_font_size(i32::from(self.font_size).saturating_add(delta))
    }

    pub fn reset_font_size(&mut self) -> u16 {
        self.apply_font_size(i32::from(self.config.font_size))
    }

    fn apply_font_size(&mut self, requested: i32) -> u16 {
        let size = self.config.clamp_font_size(requested);
        self.font_size = size;
        if let Some(surface) = self.surface.as_mut() {
            surface.set_font_size(size);
        }
        self.schedule_refit();
        self.publish();
        size
    }

    fn schedule_refit(&mut self) {
        if !self.torn_down {
            self.refit.schedule(Instant::now());
        }
    }

    /// The viewport changed size; refit immediately
    pub fn viewport_resized(&mut self, viewport: Option<Viewport>) -> bool {
        if let (Some(viewport), Some(surface)) = (viewport, self.surface.as_mut()) {
            surface.set_viewport(viewport);
        }
        self.refit()
    }

    pub fn request_fit(&mut self) -> bool {
        self.refit()
    }

    /// Run a pending debounced refit if it is due
    pub fn poll_refit(&mut self) -> bool {
        if self.refit.take_due(Instant::now()) {
            self.refit()
        } else {
            false
        }
    }

    pub fn refit_deadline(&self) -> Option<Instant> {
        self.refit.deadline()
    }

    pub fn refit_pending(&self) -> bool {
        self.refit.is_pending()
    }

    /// Refit the surface; emits `resize` only when connected and the geometry changed
    fn refit(&mut self) -> bool {
        self.refit.cancel();
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        self.geometry = surface.fit();

        let emitted = if self.connection.may_accept_input() && self.last_sent != Some(self.geometry) {
            log::debug!("Geometry now {}", self.geometry);
            self.emit(ClientEvent::Resize(self.geometry));
            self.last_sent = Some(self.geometry);
            true
        } else {
            false
        };
        self.publish();
        emitted
    }

    // ------------------------------------------------------------------
    // Transcript
    // ------------------------------------------------------------------

    /// Label for a new log window: the footer text, else the configured default
    fn log_label(&self) -> String {
        self.view
            .footer
            .clone()
            .unwrap_or_else(|| self.config.default_log_label.clone())
    }

    pub fn start_log(&mut self) -> Result<(), TranscriptError> {
        let label = self.log_label();
        let result = self.transcript.start(&label);
        self.publish();
        result
    }

    pub fn stop_log(&mut self) -> Result<(), TranscriptError> {
        let result = self.transcript.stop().map(|_| ());
        self.publish();
        result
    }

    /// Start or stop logging; returns whether a window is now open
    pub fn toggle_log(&mut self) -> Result<bool, TranscriptError> {
        if self.transcript.is_recording() {
            self.stop_log()?;
        } else {
            self.start_log()?;
        }
        Ok(self.transcript.is_recording())
    }

    pub fn export_transcript(&self) -> Option<String> {
        self.transcript
            .has_content()
            .then(|| self.transcript.export())
    }

    /// File name for the exported transcript, safe to use on disk
    pub fn transcript_file_name(&self) -> Option<String> {
        self.transcript
            .artifact_name(&self.config.transcript_prefix)
            .map(|name| sanitize_file_name(&name))
    }

    pub fn save_transcript(&self, dir: &Path) -> Result<PathBuf, BridgeError> {
        let name = self.transcript_file_name().ok_or(BridgeError::NothingRecorded)?;
        let content = self.export_transcript().ok_or(BridgeError::NothingRecorded)?;
        let path = dir.join(name);
        std::fs::write(&path, content)?;
        log::info!("Transcript written to {}", path.display());
        Ok(path)
    }

    pub fn transcript(&self) -> &TranscriptRecorder {
        &self.transcript
    }

    // ------------------------------------------------------------------
    // Control
    // ------------------------------------------------------------------

    /// Ask the remote for reauthentication; returns the path to navigate to
    pub fn reauth(&mut self) -> Result<String, BridgeError> {
        self.control(ControlAction::Reauth, self.allow_reauth)?;
        let path = self.config.reauth_path.clone();
        self.view.redirect = Some(path.clone());
        self.publish();
        Ok(path)
    }

    pub fn replay_credentials(&mut self) -> Result<(), BridgeError> {
        self.control(ControlAction::ReplayCredentials, self.allow_replay)
    }

    fn control(&mut self, action: ControlAction, permitted: bool) -> Result<(), BridgeError> {
        if !permitted {
            log::warn!("Rejected '{}': not permitted by the remote", action);
            self.view.notice = Some(format!("{} is not permitted", action));
            self.publish();
            return Err(BridgeError::NotPermitted(action));
        }
        self.emit(ClientEvent::Control(action));
        Ok(())
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> &SessionView {
        &self.view
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn may_accept_input(&self) -> bool {
        self.connection.may_accept_input()
    }

    pub fn geometry(&self) -> SessionGeometry {
        self.geometry
    }

    pub fn font_size(&self) -> u16 {
        self.font_size
    }

    /// `None` once the bridge has been shut down
    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn is_shut_down(&self) -> bool {
        self.torn_down
    }

    fn publish(&mut self) {
        let view = &mut self.view;
        view.state = self.connection.state();
        view.status = self.connection.status().to_string();
        view.channel_lost = self.connection.channel_lost();
        view.session_rejected = self.connection.session_rejected();
        view.reconnect_allowed = self.connection.reconnect_allowed() && !self.torn_down;
        view.allow_reauth = self.allow_reauth;
        view.allow_replay = self.allow_replay;
        view.logging = self.transcript.is_recording();
        view.transcript_available = self.transcript.has_content();
        view.font_size = self.font_size;
        view.geometry = self.geometry;
        view.modifiers = self.latch.active();
        self.view_tx.send_replace(view.clone());
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Detach listeners, close the channel and release the surface. Idempotent.
    pub fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.refit.cancel();
        self.latch.clear();
        self.inbound = None;

        if let Some(mut channel) = self.channel.take() {
            channel.unsubscribe_all();
            channel.set_reconnection(false);
            channel.close();
        }
        if let Some(mut surface) = self.surface.take() {
            surface.dispose();
        }
        self.connection.shut_down();
        log::info!("Session bridge shut down ({})", self.connection.state());
        self.publish();
    }

    /// Drive the session until `Disconnect` or until the command sender is dropped.
    ///
    /// Hands the bridge back after teardown so the transcript can still be exported.
    pub async fn run(mut self, mut commands: UnboundedReceiver<BridgeCommand>) -> Self {
        loop {
            let deadline = self.refit.deadline();
            tokio::select! {
                biased;

                // Commands win over inbound traffic
                command = commands.recv() => match command {
                    Some(BridgeCommand::Disconnect) | None => break,
                    Some(command) => self.execute(command),
                },
                _ = refit_due(deadline) => {
                    self.poll_refit();
                }
                signal = next_signal(&mut self.inbound) => match signal {
                    Some(signal) => self.handle_signal(signal),
                    None => {
                        self.inbound = None;
                        self.handle_signal(ChannelSignal::Closed("transport dropped".to_string()));
                    }
                },
            }
        }
        self.shutdown();
        self
    }

    /// Apply one presentation command
    pub fn execute(&mut self, command: BridgeCommand) {
        match command {
            BridgeCommand::TerminalInput(data) => {
                self.terminal_input(&data);
            }
            BridgeCommand::Key(action) => {
                self.key_action(action);
            }
            BridgeCommand::ToggleModifier(modifier) => self.toggle_modifier(modifier),
            BridgeCommand::SetFontSize(size) => {
                self.set_font_size(size);
            }
            BridgeCommand::AdjustFontSize(delta) => {
                self.adjust_font_size(delta);
            }
            BridgeCommand::ResetFontSize => {
                self.reset_font_size();
            }
            BridgeCommand::ViewportResized(viewport) => {
                self.viewport_resized(viewport);
            }
            BridgeCommand::Fit => {
                self.request_fit();
            }
            BridgeCommand::ToggleLog => {
                if let Err(err) = self.toggle_log() {
                    log::warn!("Log toggle failed: {}", err);
                }
            }
            BridgeCommand::Reauth => {
                if let Err(err) = self.reauth() {
                    log::warn!("{}", err);
                }
            }
            BridgeCommand::ReplayCredentials => {
                if let Err(err) = self.replay_credentials() {
                    log::warn!("{}", err);
                }
            }
            BridgeCommand::SendInterrupt => {
                self.send_interrupt();
            }
            BridgeCommand::ClearScreen => {
                self.clear_screen();
            }
            BridgeCommand::Disconnect => self.shutdown(),
        }
    }
}

impl<C: EventChannel, S: TerminalSurface> Drop for SessionBridge<C, S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn next_signal(inbound: &mut Option<UnboundedReceiver<ChannelSignal>>) -> Option<ChannelSignal> {
    match inbound {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn refit_due(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
