//! Client-side session core for the Dayflow HR backend.
//! - Persists credentials (`token_store`) and talks to the API with automatic
//!   access-token refresh (`http`).
//! - Owns the session lifecycle (`auth`) and the navigation guards derived from it (`guard`).
//! - Polls notifications for the signed-in user (`notifications`).

pub mod errors;
pub mod storage;
pub mod token_store;
pub mod http;
pub mod auth;
pub mod guard;
pub mod notifications;
pub mod runtime;
