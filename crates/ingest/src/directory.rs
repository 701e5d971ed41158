//! Read-only contact/group directory capability.

use async_trait::async_trait;

use crate::types::Jid;

/// Group metadata returned by a directory lookup.
#[derive(Debug, Clone)]
pub struct GroupInfo {
    pub name: String,
}

/// Contact metadata returned by a directory lookup.
#[derive(Debug, Clone)]
pub struct ContactInfo {
    /// Name the local user stored for the contact.
    pub full_name: String,
    /// Name the contact declared for themselves.
    pub push_name: String,
}

/// Directory of group and contact metadata, owned by the messaging session.
///
/// Lookups are side-effect-free reads. `None` covers both not-found and
/// transient lookup failure — the resolver degrades to its next priority
/// tier either way, so implementations must never surface errors.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn lookup_group(&self, chat: &Jid) -> Option<GroupInfo>;
    async fn lookup_contact(&self, sender: &Jid) -> Option<ContactInfo>;
}
