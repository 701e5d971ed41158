//! Bridge to the WhatsApp session sidecar.
//!
//! The sidecar (a Node process built on Baileys) owns everything protocol:
//! connection, encryption keys, multi-device pairing, QR login, and the
//! credential store on disk. This crate speaks its JSON-over-WebSocket wire
//! protocol, turns inbound frames into typed [`warelay_ingest::MessageEvent`]s,
//! and answers the pipeline's directory lookups over the same connection.

pub mod connection;
pub mod directory;
pub mod error;
pub mod process;
pub mod wire;

pub use {
    connection::{ConnectionState, DEFAULT_SIDECAR_PORT, SidecarHandle},
    directory::SidecarDirectory,
    error::{Error, Result},
    process::{SidecarProcess, SidecarSettings, find_sidecar_dir, start_sidecar},
};
