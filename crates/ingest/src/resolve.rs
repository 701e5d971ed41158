//! Sender display-name resolution.

use crate::{
    directory::Directory,
    types::MessageEvent,
};

/// Locale-independent label for messages authored by the local session.
pub const SELF_LABEL: &str = "Me";

/// Prefix for group chats whose name could not be resolved.
const GROUP_FALLBACK_PREFIX: &str = "Group";

/// Resolve a human-readable display name for an event's sender.
///
/// Priority, first match wins: self-label for own messages, group name (or a
/// synthesized `Group <id>` label when the lookup misses), contact full name,
/// contact push name, the event's own push-name hint, and finally the bare
/// sender ID. Total — always returns a non-empty string, and directory
/// misses degrade to the next tier instead of failing.
pub async fn resolve(event: &MessageEvent, directory: &dyn Directory) -> String {
    if event.is_from_me {
        return SELF_LABEL.to_string();
    }

    if event.chat.is_group() {
        if let Some(group) = directory.lookup_group(&event.chat).await
            && !group.name.is_empty()
        {
            return group.name;
        }
        return format!("{GROUP_FALLBACK_PREFIX} {}", event.chat.user);
    }

    if let Some(contact) = directory.lookup_contact(&event.sender).await {
        if !contact.full_name.is_empty() {
            return contact.full_name;
        }
        if !contact.push_name.is_empty() {
            return contact.push_name;
        }
    }

    if !event.push_name.is_empty() {
        return event.push_name.clone();
    }

    event.sender.user.clone()
}
