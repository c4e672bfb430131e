mod common;

use serde_json::json;
use shellgate::{BridgeConfig, BridgeError, ConnectionState};
use shellgate_protocol::{ClientEvent, ControlAction, DataPayload, ServerEvent, SessionGeometry};
use shellgate_terminal::{KeyAction, Viewport};
use tempfile::TempDir;

#[cfg(test)]
mod bridge_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_established_status_permits_input() {
        let (mut bridge, peer) = common::bridge();
        assert_eq!(bridge.connection_state(), ConnectionState::Connecting);
        assert!(!bridge.terminal_input("id\r"));

        peer.send_frame("status", json!("SSH CONNECTION ESTABLISHED")).unwrap();
        bridge.pump();

        assert_eq!(bridge.connection_state(), ConnectionState::Connected);
        assert!(bridge.may_accept_input());
        assert!(bridge.terminal_input("id\r"));
        assert_eq!(
            peer.outbound(),
            vec![
                ClientEvent::Geometry(SessionGeometry::new(80, 24)),
                ClientEvent::Data("id\r".to_string()),
            ]
        );
    }

    #[test]
    fn test_replay_rejected_without_permission() {
        let (mut bridge, peer) = common::connected();
        peer.send_frame("allowreplay", json!(false)).unwrap();
        bridge.pump();

        let err = bridge.replay_credentials().unwrap_err();
        assert!(matches!(err, BridgeError::NotPermitted(ControlAction::ReplayCredentials)));
        assert!(peer.outbound().is_empty());
        assert!(bridge.view().notice.is_some());
    }

    #[test]
    fn test_permissions_follow_latest_flag() {
        let (mut bridge, peer) = common::connected();
        peer.send_frame("allowreplay", json!(true)).unwrap();
        bridge.pump();
        bridge.replay_credentials().unwrap();
        assert_eq!(
            peer.outbound(),
            vec![ClientEvent::Control(ControlAction::ReplayCredentials)]
        );

        peer.send_frame("allowreplay", json!(false)).unwrap();
        peer.send_frame("allowreauth", json!(false)).unwrap();
        bridge.pump();
        assert!(bridge.replay_credentials().is_err());
        assert!(bridge.reauth().is_err());
        assert!(peer.outbound().is_empty());
        assert_eq!(bridge.view().redirect, None);
    }

    #[test]
    fn test_unchanged_geometry_is_sent_once() {
        let (mut bridge, peer) = common::connected();
        assert!(!bridge.request_fit());
        assert!(!bridge.viewport_resized(Some(Viewport::new(640, 384))));
        assert!(peer.outbound().is_empty());

        assert!(bridge.viewport_resized(Some(Viewport::new(960, 480))));
        assert!(!bridge.viewport_resized(None));
        assert_eq!(
            peer.outbound(),
            vec![ClientEvent::Resize(SessionGeometry::new(120, 30))]
        );
        assert_eq!(bridge.geometry(), SessionGeometry::new(120, 30));
    }

    #[test]
    fn test_geometry_waits_for_connection() {
        let (mut bridge, peer) = common::bridge();
        assert!(!bridge.viewport_resized(Some(Viewport::new(960, 480))));
        assert!(peer.outbound().is_empty());

        peer.open();
        bridge.pump();
        assert_eq!(
            peer.outbound(),
            vec![ClientEvent::Geometry(SessionGeometry::new(120, 30))]
        );
    }

    #[test]
    fn test_rejected_session_stays_rejected() {
        let (mut bridge, peer) = common::connected();
        peer.send_frame("ssherror", json!("Authentication failed")).unwrap();
        peer.send_frame("status", json!("CONNECTION ESTABLISHED")).unwrap();
        peer.send_frame("statusBackground", json!("green")).unwrap();
        peer.open();
        bridge.pump();

        let view = bridge.view();
        assert_eq!(view.state, ConnectionState::Error);
        assert_eq!(view.status, "Authentication failed");
        assert_eq!(view.status_background.as_deref(), Some("red"));
        assert!(view.session_rejected);
        assert!(!view.channel_lost);
        assert!(!view.reconnect_allowed);
        assert!(!peer.reconnection_enabled());
        assert!(!bridge.terminal_input("ls\r"));
        assert!(!bridge.key_action(KeyAction::char("x")));
        assert!(peer.outbound().is_empty());
    }

    #[test]
    fn test_transport_error_disables_reconnection() {
        let (mut bridge, peer) = common::connected();
        peer.send_frame("error", json!({ "code": 1006 })).unwrap();
        bridge.pump();
        assert_eq!(bridge.connection_state(), ConnectionState::Error);
        assert_eq!(bridge.view().status, r#"ERROR: {"code":1006}"#);
        assert!(bridge.view().channel_lost);
        assert!(!peer.reconnection_enabled());
    }

    #[test]
    fn test_transport_error_signal() {
        let (mut bridge, peer) = common::connected();
        peer.transport_error("tls handshake failed");
        bridge.pump();
        assert_eq!(bridge.view().status, "ERROR: tls handshake failed");
        assert!(!bridge.may_accept_input());
    }

    #[test]
    fn test_inbound_presentation_events() {
        let (mut bridge, peer) = common::connected();
        peer.send_frame("title", json!("web01")).unwrap();
        peer.send_frame("footer", json!("ssh://admin@web01:22")).unwrap();
        peer.send_frame("headerBackground", json!("orange")).unwrap();
        peer.send_frame("data", json!("prompt$ ")).unwrap();
        bridge.pump();

        let view = bridge.view();
        assert_eq!(view.title.as_deref(), Some("web01"));
        assert_eq!(view.footer.as_deref(), Some("ssh://admin@web01:22"));
        assert_eq!(view.header_background.as_deref(), Some("orange"));
        assert!(bridge.surface().unwrap().contents().contains("prompt$"));
    }

    #[test]
    fn test_view_is_published_to_subscribers() {
        let (mut bridge, peer) = common::bridge();
        let view = bridge.subscribe();
        assert_eq!(view.borrow().state, ConnectionState::Connecting);

        peer.open();
        bridge.pump();
        assert_eq!(view.borrow().state, ConnectionState::Connected);
        assert!(view.borrow().may_accept_input());
    }

    #[test]
    fn test_transcript_records_both_directions() {
        let dir = TempDir::new().unwrap();
        let (mut bridge, peer) = common::connected();
        peer.send_frame("footer", json!("admin@web01")).unwrap();
        bridge.pump();

        bridge.start_log().unwrap();
        assert!(bridge.start_log().is_err());
        bridge.terminal_input("ls\r");
        peer.send_event(ServerEvent::Data(DataPayload::Binary(
            b"\x1b[32mfile.txt\x1b[0m\r\n".to_vec(),
        )));
        bridge.pump();
        bridge.stop_log().unwrap();
        assert!(bridge.stop_log().is_err());

        let export = bridge.export_transcript().unwrap();
        assert!(export.starts_with("Log Start for admin@web01: "));
        assert!(export.contains("ls\rfile.txt\r\n"));
        assert!(!export.contains('\x1b'));
        assert_eq!(bridge.export_transcript().unwrap(), export);

        let path = bridge.save_transcript(dir.path()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("shellgate-admin_web01-"));
        assert!(name.ends_with(".log"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), export);
    }

    #[test]
    fn test_log_label_defaults_without_footer() {
        let (mut bridge, _peer) = common::connected();
        assert!(bridge.toggle_log().unwrap());
        assert_eq!(bridge.transcript().label(), Some("session"));
        assert!(!bridge.toggle_log().unwrap());
    }

    #[test]
    fn test_nothing_to_save_before_logging() {
        let dir = TempDir::new().unwrap();
        let (bridge, _peer) = common::connected();
        assert!(bridge.export_transcript().is_none());
        assert!(matches!(
            bridge.save_transcript(dir.path()),
            Err(BridgeError::NothingRecorded)
        ));
    }

    #[test]
    fn test_failed_open_still_tears_down() {
        let (channel, peer) = shellgate::LoopbackChannel::pair();
        peer.refuse_open("connection refused");
        let config = BridgeConfig::default();
        let surface = shellgate_terminal::HeadlessSurface::new(config.initial_viewport);
        let mut bridge = shellgate::SessionBridge::new(config, channel, surface);

        assert_eq!(bridge.connection_state(), ConnectionState::Error);
        assert!(bridge.view().status.contains("connection refused"));
        assert!(!peer.reconnection_enabled());

        bridge.shutdown();
        bridge.shutdown();
        assert!(bridge.is_shut_down());
        assert!(peer.is_closed());
        assert_eq!(bridge.connection_state(), ConnectionState::Error);
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let (mut bridge, peer) = common::connected();
        bridge.set_font_size(20);
        assert!(bridge.refit_deadline().is_some());

        bridge.shutdown();
        assert!(bridge.refit_deadline().is_none());
        assert!(bridge.surface().is_none());
        assert!(!peer.has_listeners());
        assert!(peer.is_closed());
        assert!(!peer.reconnection_enabled());
        assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);

        // Late signals are ignored
        assert!(!peer.open());
        assert_eq!(bridge.pump(), 0);
        assert!(!bridge.terminal_input("x"));
    }

    #[test]
    fn test_drop_closes_channel() {
        let (bridge, peer) = common::connected();
        drop(bridge);
        assert!(peer.is_closed());
    }
}
