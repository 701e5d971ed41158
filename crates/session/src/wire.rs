//! JSON wire protocol spoken over the sidecar WebSocket.

use serde::{Deserialize, Serialize};

use warelay_ingest::MessageContent;

/// Commands sent to the sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayCommand {
    /// Start (or resume) the WhatsApp session whose credentials live under
    /// `auth_dir`. A fresh directory triggers the QR login flow.
    Login { auth_dir: String },
    Logout,
    LookupGroup { request_id: String, jid: String },
    LookupContact { request_id: String, jid: String },
}

/// Events emitted by the sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarEvent {
    /// A QR code to scan with the phone during first login.
    Qr { code: String },
    Connected {
        #[serde(default)]
        phone_number: Option<String>,
    },
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    /// An inbound chat message.
    Message {
        id: String,
        chat_jid: String,
        sender_jid: String,
        #[serde(default)]
        is_from_me: bool,
        #[serde(default)]
        push_name: String,
        /// Unix seconds.
        timestamp: i64,
        /// Absent for protocol-level events carrying no content union.
        #[serde(default)]
        content: Option<MessageContent>,
    },
    GroupResult {
        request_id: String,
        found: bool,
        #[serde(default)]
        name: String,
    },
    ContactResult {
        request_id: String,
        found: bool,
        #[serde(default)]
        full_name: String,
        #[serde(default)]
        push_name: String,
    },
    Error { message: String },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn command_tag_spelling() {
        let json = serde_json::to_value(GatewayCommand::LookupGroup {
            request_id: "r1".into(),
            jid: "12036304@g.us".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "lookup_group");
        assert_eq!(json["request_id"], "r1");
        assert_eq!(json["jid"], "12036304@g.us");

        let json = serde_json::to_value(GatewayCommand::Logout).unwrap();
        assert_eq!(json["type"], "logout");
    }

    #[test]
    fn decodes_message_event() {
        let frame = r#"{
            "type": "message",
            "id": "3EB0C431",
            "chat_jid": "5215598765432@s.whatsapp.net",
            "sender_jid": "5215512345678@s.whatsapp.net",
            "push_name": "Bob99",
            "timestamp": 1714566600,
            "content": {"kind": "text", "text": "hi"}
        }"#;
        let event: SidecarEvent = serde_json::from_str(frame).unwrap();
        match event {
            SidecarEvent::Message {
                id,
                is_from_me,
                content,
                ..
            } => {
                assert_eq!(id, "3EB0C431");
                assert!(!is_from_me);
                assert_eq!(content, Some(MessageContent::Text { text: "hi".into() }));
            },
            other => panic!("expected message event, got {other:?}"),
        }
    }

    #[test]
    fn decodes_contentless_message_event() {
        let frame = r#"{
            "type": "message",
            "id": "3EB0C431",
            "chat_jid": "5215598765432@s.whatsapp.net",
            "sender_jid": "5215512345678@s.whatsapp.net",
            "timestamp": 1714566600
        }"#;
        let event: SidecarEvent = serde_json::from_str(frame).unwrap();
        match event {
            SidecarEvent::Message { content, push_name, .. } => {
                assert_eq!(content, None);
                assert_eq!(push_name, "");
            },
            other => panic!("expected message event, got {other:?}"),
        }
    }

    #[test]
    fn decodes_lookup_results() {
        let event: SidecarEvent = serde_json::from_str(
            r#"{"type":"group_result","request_id":"r1","found":true,"name":"Team X"}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            SidecarEvent::GroupResult { found: true, .. }
        ));

        let event: SidecarEvent = serde_json::from_str(
            r#"{"type":"contact_result","request_id":"r2","found":false}"#,
        )
        .unwrap();
        match event {
            SidecarEvent::ContactResult {
                found,
                full_name,
                push_name,
                ..
            } => {
                assert!(!found);
                assert_eq!(full_name, "");
                assert_eq!(push_name, "");
            },
            other => panic!("expected contact result, got {other:?}"),
        }
    }
}
