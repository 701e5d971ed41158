//! Normalization of inbound events into the stable backend record.

use crate::types::{MessageContent, MessageEvent, MessageType, NormalizedMessage};

/// Build the normalized record for an admitted event. Total, no failure path.
pub fn normalize(event: &MessageEvent, resolved_name: &str) -> NormalizedMessage {
    // The resolver already guarantees a non-empty name; falling back to the
    // push-name hint here only covers callers bypassing it.
    let sender = if resolved_name.is_empty() {
        event.push_name.clone()
    } else {
        resolved_name.to_string()
    };

    NormalizedMessage {
        id: event.id.clone(),
        chat_jid: event.chat.user.clone(),
        sender_jid: event.sender.user.clone(),
        sender,
        content: extract_content(event.content.as_ref()),
        timestamp: event.timestamp.timestamp(),
        is_from_me: event.is_from_me,
        message_type: infer_type(event.content.as_ref()),
    }
}

/// Extract the textual content of a message: plain text, extended-text body,
/// or a media caption; empty for captionless media and unknown kinds.
fn extract_content(content: Option<&MessageContent>) -> String {
    match content {
        Some(
            MessageContent::Text { text } | MessageContent::ExtendedText { text },
        ) => text.clone(),
        Some(
            MessageContent::Image { caption } | MessageContent::Video { caption },
        ) => caption.clone(),
        Some(MessageContent::Audio | MessageContent::Other) | None => String::new(),
    }
}

/// Infer the coarse type tag. Plain text only counts when non-empty; an
/// empty `Text` variant degrades to `unknown`, matching the upstream
/// serializer this record shape was lifted from.
fn infer_type(content: Option<&MessageContent>) -> MessageType {
    match content {
        Some(MessageContent::Text { text }) if !text.is_empty() => MessageType::Text,
        Some(MessageContent::Image { .. }) => MessageType::Image,
        Some(MessageContent::Video { .. }) => MessageType::Video,
        Some(MessageContent::Audio) => MessageType::Audio,
        Some(MessageContent::ExtendedText { .. }) => MessageType::ExtendedText,
        Some(MessageContent::Text { .. } | MessageContent::Other) | None => MessageType::Unknown,
    }
}
