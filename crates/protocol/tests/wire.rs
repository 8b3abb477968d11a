//! Wire format as a browser client sees it.

use protocol::messages::{Elimination, ViewportPayload};
use protocol::{ClientCommand, Envelope, ProtocolError, ServerEvent};

#[test]
fn test_every_inbound_type_decodes() {
    let frames = [
        (r#"{"type":"join","data":{"name":"a"}}"#, "join"),
        (r#"{"type":"gotit","data":{"name":"a","screenWidth":1,"screenHeight":1}}"#, "join"),
        (r#"{"type":"heartbeat-ping"}"#, "heartbeat"),
        (r#"{"type":"windowResized","data":{"screenWidth":800,"screenHeight":600}}"#, "resize"),
        (r#"{"type":"respawn","data":{}}"#, "respawn"),
        (r#"{"type":"disconnect"}"#, "disconnect"),
        (r#"{"type":"move-target","data":{"x":0,"y":0}}"#, "target"),
        (r#"{"type":"fire"}"#, "fire"),
        (r#"{"type":"sprint"}"#, "sprint"),
        (r#"{"type":"split"}"#, "split"),
    ];
    for (text, expected) in frames {
        let kind = match ClientCommand::decode(text).unwrap() {
            ClientCommand::Join(_) => "join",
            ClientCommand::HeartbeatPing => "heartbeat",
            ClientCommand::ViewportResize(_) => "resize",
            ClientCommand::Respawn => "respawn",
            ClientCommand::Disconnect => "disconnect",
            ClientCommand::MoveTarget(_) => "target",
            ClientCommand::Fire => "fire",
            ClientCommand::Sprint => "sprint",
            ClientCommand::Split => "split",
            ClientCommand::Unknown(_) => "unknown",
        };
        assert_eq!(kind, expected, "{text}");
    }
}

#[test]
fn test_resize_payload() {
    let cmd = ClientCommand::decode(
        r#"{"type":"viewport-resize","data":{"screenWidth":1920,"screenHeight":1080}}"#,
    )
    .unwrap();
    assert_eq!(
        cmd,
        ClientCommand::ViewportResize(ViewportPayload {
            screen_width: 1920.0,
            screen_height: 1080.0
        })
    );
}

#[test]
fn test_non_finite_target_rejected() {
    let err = ClientCommand::decode(r#"{"type":"move-target","data":{"x":1e39,"y":0}}"#).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::InvalidPayload { kind: "move-target", .. } | ProtocolError::Malformed(_)
    ));
}

#[test]
fn test_eliminated_event_shape() {
    let text = ServerEvent::Eliminated(Elimination {
        id: 4,
        name: "dave".into(),
        message: "You were destroyed".into(),
    })
    .encode()
    .unwrap();
    let env = Envelope::decode(&text).unwrap();
    assert_eq!(env.kind, "eliminated");
    assert_eq!(env.data["id"], 4);
    assert_eq!(env.data["name"], "dave");
    assert_eq!(env.data["message"], "You were destroyed");
}

#[test]
fn test_peer_disconnected_shape() {
    let text = ServerEvent::PeerDisconnected { id: 2, name: "bob".into() }.encode().unwrap();
    assert_eq!(text, r#"{"type":"peer-disconnected","data":{"id":2,"name":"bob"}}"#);
}
