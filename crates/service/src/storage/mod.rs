//! Storage abstractions for service layer
//!
//! Reusable file-backed stores for small maps persisted as JSON.

pub mod json_map_store;
