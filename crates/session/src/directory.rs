//! Directory lookups answered by the sidecar's session store.

use std::sync::Arc;

use async_trait::async_trait;

use warelay_ingest::{ContactInfo, Directory, GroupInfo, Jid};

use crate::{
    connection::{LookupReply, SidecarHandle},
    wire::GatewayCommand,
};

/// [`Directory`] implementation backed by the sidecar connection. Misses,
/// timeouts, and connection loss all come back as `None`, per the
/// degradation contract of the trait.
pub struct SidecarDirectory {
    handle: Arc<SidecarHandle>,
}

impl SidecarDirectory {
    pub fn new(handle: Arc<SidecarHandle>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl Directory for SidecarDirectory {
    async fn lookup_group(&self, chat: &Jid) -> Option<GroupInfo> {
        let jid = chat.to_string();
        match self
            .handle
            .lookup(move |request_id| GatewayCommand::LookupGroup { request_id, jid })
            .await?
        {
            LookupReply::Group { found: true, name } => Some(GroupInfo { name }),
            _ => None,
        }
    }

    async fn lookup_contact(&self, sender: &Jid) -> Option<ContactInfo> {
        let jid = sender.to_string();
        match self
            .handle
            .lookup(move |request_id| GatewayCommand::LookupContact { request_id, jid })
            .await?
        {
            LookupReply::Contact {
                found: true,
                full_name,
                push_name,
            } => Some(ContactInfo {
                full_name,
                push_name,
            }),
            _ => None,
        }
    }
}
