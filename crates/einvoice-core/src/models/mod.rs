//! Data models: the invoice record tree and runtime configuration.

pub mod config;
pub mod invoice;
