//! Session management: phase/snapshot domain, error mapping, the auth
//! endpoint wrapper and the `SessionManager` state machine.

pub mod api;
pub mod domain;
pub mod errors;
pub mod service;

pub use domain::{SessionPhase, SessionSnapshot};
pub use service::SessionManager;
