//! Core ingestion pipeline: admission filtering, sender-name resolution,
//! normalization, and per-event orchestration.
//!
//! The session bridge pushes [`MessageEvent`]s onto a channel; the
//! [`Pipeline`] drains it and forwards one [`NormalizedMessage`] per admitted
//! event to the backend via `warelay-delivery`.

pub mod directory;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod resolve;
pub mod types;

pub use {
    directory::{ContactInfo, Directory, GroupInfo},
    pipeline::Pipeline,
    types::{Jid, MessageContent, MessageEvent, MessageType, NormalizedMessage},
};
