//! The Mux Protocol Endpoint's wire format (component G, §4.G): a binary
//! frame layout for session-addressed payloads, plus the JSON control
//! message table. Tagged-enum JSON messages use `#[serde(tag = "type",
//! ...)]`; field casing is camelCase (`sessionId`, `driverId`, ...).

use crate::ids::{ClientId, SessionId};
use serde::{Deserialize, Serialize};

/// Shared vs. single-driver viewing mode for a session (§3, §4.E).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Shared,
    SingleDriver,
}

/// Client → server control messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase", deny_unknown_fields)]
pub enum ControlInbound {
    CreateSession {
        cols: u16,
        rows: u16,
    },
    DestroySession {
        session_id: SessionId,
    },
    Resize {
        session_id: SessionId,
        cols: u16,
        rows: u16,
    },
    AttachSession {
        session_id: SessionId,
        cols: u16,
        rows: u16,
    },
    DetachSession {
        session_id: SessionId,
    },
    SetSessionMode {
        session_id: SessionId,
        mode: SessionMode,
    },
    RequestDriver {
        session_id: SessionId,
    },
    ReleaseDriver {
        session_id: SessionId,
    },
}

/// Server → client(s) control messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase", deny_unknown_fields)]
pub enum ControlOutbound {
    WorkspaceSnapshot {
        client_id: ClientId,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        workspace: Option<serde_json::Value>,
        terminal_config: crate::config::TerminalConfig,
    },
    WorkspaceUpdate {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        client_id: Option<ClientId>,
        terminal_config: crate::config::TerminalConfig,
    },
    ClientJoined {
        client_id: ClientId,
    },
    ClientLeft {
        client_id: ClientId,
    },
    SessionCreated {
        session_id: SessionId,
    },
    SessionResized {
        session_id: SessionId,
        cols: u16,
        rows: u16,
    },
    SessionAttached {
        session_id: SessionId,
    },
    DriverChanged {
        session_id: SessionId,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        driver_id: Option<ClientId>,
        mode: SessionMode,
    },
}

/// Legacy (one-transport-per-session) mode's sole control frame shape
/// (§6: "a single control frame shape `{"type":"resize","cols":C,"rows":R}`").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LegacyControl {
    Resize { cols: u16, rows: u16 },
}

/// Binary frame layout (§4.G), all little-endian:
///
/// ```text
/// +--------+--------+--------+--------+-----------------+
/// | sid[0] | sid[1] | sid[2] | sid[3] | payload (0..N)  |
/// +--------+--------+--------+--------+-----------------+
/// ```
///
/// There is no separate frame-type byte: mux-mode frames only ever carry
/// a session-addressed payload, and legacy mode doesn't use this framing
/// at all (it's raw duplex bytes, see §6).
pub const FRAME_HEADER_LEN: usize = 4;

/// Parse a binary frame. Returns `None` if shorter than 4 bytes — this is
/// the *protocol-violation* case in §7 ("binary frame shorter than 4
/// bytes"); callers discard the frame and keep the connection open.
pub fn parse_frame(data: &[u8]) -> Option<(SessionId, &[u8])> {
    if data.len() < FRAME_HEADER_LEN {
        return None;
    }
    let sid = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    Some((SessionId::from_raw(sid), &data[FRAME_HEADER_LEN..]))
}

/// Build a binary frame addressed to `session_id`.
pub fn build_frame(session_id: SessionId, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&session_id.raw().to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trip() {
        let sid = SessionId::from_raw(42);
        let frame = build_frame(sid, b"hello");
        let (parsed_sid, payload) = parse_frame(&frame).unwrap();
        assert_eq!(parsed_sid, sid);
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn frame_empty_payload_round_trips() {
        let sid = SessionId::from_raw(7);
        let frame = build_frame(sid, b"");
        let (parsed_sid, payload) = parse_frame(&frame).unwrap();
        assert_eq!(parsed_sid, sid);
        assert!(payload.is_empty());
    }

    #[test]
    fn frame_too_short_is_rejected() {
        assert!(parse_frame(&[]).is_none());
        assert!(parse_frame(&[1, 2, 3]).is_none());
    }

    #[test]
    fn frame_various_session_ids_round_trip() {
        for raw in [1u32, 255, 65535, u32::MAX] {
            let sid = SessionId::from_raw(raw);
            let frame = build_frame(sid, b"data");
            let (parsed, payload) = parse_frame(&frame).unwrap();
            assert_eq!(parsed.raw(), raw);
            assert_eq!(payload, b"data");
        }
    }

    #[test]
    fn control_inbound_field_casing_matches_scenarios() {
        let json = r#"{"type":"attach_session","sessionId":1,"cols":80,"rows":24}"#;
        let parsed: ControlInbound = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed,
            ControlInbound::AttachSession {
                session_id: SessionId::from_raw(1),
                cols: 80,
                rows: 24,
            }
        );
    }

    #[test]
    fn control_outbound_driver_changed_matches_scenario_6() {
        let msg = ControlOutbound::DriverChanged {
            session_id: SessionId::from_raw(1),
            driver_id: Some(ClientId::from_raw(7)),
            mode: SessionMode::SingleDriver,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "driver_changed");
        assert_eq!(json["sessionId"], 1);
        assert_eq!(json["driverId"], 7);
        assert_eq!(json["mode"], "single_driver");
    }

    #[test]
    fn control_inbound_rejects_unknown_field() {
        let json = r#"{"type":"detach_session","sessionId":1,"bogus":true}"#;
        assert!(serde_json::from_str::<ControlInbound>(json).is_err());
    }

    #[test]
    fn legacy_control_resize_shape() {
        let json = r#"{"type":"resize","cols":100,"rows":40}"#;
        let parsed: LegacyControl = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, LegacyControl::Resize { cols: 100, rows: 40 });
    }
}
