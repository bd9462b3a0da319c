//! Authenticated HTTP access to the backend.
//!
//! `Transport` performs single requests; `ApiClient` layers bearer tokens and
//! the one-shot refresh on top of it.

pub mod client;
pub mod errors;
pub mod transport;

pub use client::{ApiClient, RequestOptions, SessionExpired};
pub use errors::HttpError;
pub use transport::{ApiRequest, ApiResponse, Method, ReqwestTransport, Transport};
