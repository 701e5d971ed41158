//! Admission gate for inbound events.

use crate::types::MessageEvent;

/// Decide whether an event is eligible for normalization and delivery.
///
/// Rejects status-broadcast "stories" (a reserved sentinel chat, not a real
/// conversation) and events with no content union at all (protocol-level or
/// reaction-only events). Pure predicate, no side effects.
pub fn admit(event: &MessageEvent) -> bool {
    if event.chat.is_status_broadcast() {
        return false;
    }
    event.content.is_some()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::types::{Jid, MessageContent},
        chrono::Utc,
    };

    fn event(chat: &str, content: Option<MessageContent>) -> MessageEvent {
        MessageEvent {
            id: "3EB0".into(),
            chat: Jid::from(chat),
            sender: Jid::from("5215512345678@s.whatsapp.net"),
            is_from_me: false,
            push_name: String::new(),
            timestamp: Utc::now(),
            content,
        }
    }

    #[test]
    fn admits_regular_message() {
        let evt = event(
            "5215598765432@s.whatsapp.net",
            Some(MessageContent::Text { text: "hi".into() }),
        );
        assert!(admit(&evt));
    }

    #[test]
    fn rejects_status_broadcast() {
        let evt = event(
            "status@broadcast",
            Some(MessageContent::Text { text: "story".into() }),
        );
        assert!(!admit(&evt));
    }

    #[test]
    fn rejects_empty_content_union() {
        let evt = event("5215598765432@s.whatsapp.net", None);
        assert!(!admit(&evt));
    }

    #[test]
    fn admits_media_without_caption() {
        let evt = event(
            "12036304@g.us",
            Some(MessageContent::Image { caption: String::new() }),
        );
        assert!(admit(&evt));
    }
}
