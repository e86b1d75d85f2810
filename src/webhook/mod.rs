//! Webhook ingestion surface: signature verification, payload parsing, and
//! the HTTP ingress.

pub mod envelope;
pub mod server;
pub mod signature;
