//! Per-event orchestration: filter → resolve → normalize → deliver.

use std::sync::Arc;

use {
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use warelay_delivery::DeliveryClient;

use crate::{directory::Directory, filter, normalize, resolve, types::MessageEvent};

/// Wires the pipeline stages together. One long-lived instance serves all
/// events; no mutable state is shared between events beyond the delivery
/// client's connection pool.
pub struct Pipeline {
    directory: Arc<dyn Directory>,
    delivery: DeliveryClient,
}

impl Pipeline {
    pub fn new(directory: Arc<dyn Directory>, delivery: DeliveryClient) -> Self {
        Self {
            directory,
            delivery,
        }
    }

    /// Process a single inbound event to completion. Delivery failures are
    /// logged with enough context for operator diagnosis and never propagate;
    /// one bad event must not affect the next.
    pub async fn handle(&self, event: MessageEvent) {
        if !filter::admit(&event) {
            debug!(id = %event.id, chat = %event.chat, "event not admitted, dropping");
            return;
        }

        let sender = resolve::resolve(&event, self.directory.as_ref()).await;
        let message = normalize::normalize(&event, &sender);

        match self.delivery.deliver(&message).await {
            Ok(()) => info!(
                message_type = %message.message_type,
                sender = %message.sender,
                sender_jid = %message.sender_jid,
                "forwarded message to backend"
            ),
            Err(error) => warn!(
                message_type = %message.message_type,
                sender = %message.sender,
                error = %error,
                "failed to deliver message"
            ),
        }
    }

    /// Drain the event channel until the sender side is dropped, spawning one
    /// task per event so a slow delivery never blocks later events.
    ///
    /// There is no backpressure: if events arrive faster than deliveries
    /// complete, in-flight deliveries accumulate without bound.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<MessageEvent>) {
        while let Some(event) = events.recv().await {
            let pipeline = Arc::clone(&self);
            tokio::spawn(async move {
                pipeline.handle(event).await;
            });
        }
        debug!("event channel closed, pipeline stopping");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::{
            directory::{ContactInfo, GroupInfo},
            types::{Jid, MessageContent},
        },
        async_trait::async_trait,
        chrono::{TimeZone, Utc},
        url::Url,
    };

    struct FakeDirectory {
        contact: Option<ContactInfo>,
    }

    #[async_trait]
    impl Directory for FakeDirectory {
        async fn lookup_group(&self, _chat: &Jid) -> Option<GroupInfo> {
            None
        }

        async fn lookup_contact(&self, _sender: &Jid) -> Option<ContactInfo> {
            self.contact.clone()
        }
    }

    fn pipeline(endpoint: &str, contact: Option<ContactInfo>) -> Pipeline {
        let endpoint = Url::parse(endpoint).unwrap();
        Pipeline::new(
            Arc::new(FakeDirectory { contact }),
            DeliveryClient::new(endpoint).unwrap(),
        )
    }

    fn text_event(chat: &str, text: &str) -> MessageEvent {
        MessageEvent {
            id: "3EB0C431".into(),
            chat: Jid::from(chat),
            sender: Jid::from("5215512345678@s.whatsapp.net"),
            is_from_me: false,
            push_name: String::new(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).single().unwrap(),
            content: Some(MessageContent::Text { text: text.into() }),
        }
    }

    #[tokio::test]
    async fn end_to_end_individual_chat() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ingest")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "id": "3EB0C431",
                "chat_jid": "5215598765432",
                "sender_jid": "5215512345678",
                "sender": "Bob99",
                "content": "hi",
                "timestamp": 1714566600,
                "is_from_me": false,
                "message_type": "text",
            })))
            .with_status(200)
            .create_async()
            .await;

        let contact = ContactInfo {
            full_name: String::new(),
            push_name: "Bob99".into(),
        };
        let pipeline = pipeline(&format!("{}/ingest", server.url()), Some(contact));
        pipeline
            .handle(text_event("5215598765432@s.whatsapp.net", "hi"))
            .await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_events_never_reach_backend() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ingest")
            .expect(0)
            .create_async()
            .await;

        let pipeline = pipeline(&format!("{}/ingest", server.url()), None);
        pipeline.handle(text_event("status@broadcast", "story")).await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delivery_failure_does_not_stop_the_pipeline() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ingest")
            .with_status(500)
            .with_body("boom")
            .expect(2)
            .create_async()
            .await;

        let pipeline = pipeline(&format!("{}/ingest", server.url()), None);
        pipeline
            .handle(text_event("5215598765432@s.whatsapp.net", "first"))
            .await;
        pipeline
            .handle(text_event("5215598765432@s.whatsapp.net", "second"))
            .await;

        mock.assert_async().await;
    }
}
