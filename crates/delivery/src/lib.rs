//! One-shot HTTP delivery of normalized records to the processing backend.

pub mod client;

pub use client::{DeliveryClient, DeliveryError, Result};
