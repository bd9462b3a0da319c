//! Data model shared by the session core: roles, sessions, backend user
//! payloads and the request/response bodies of the auth endpoints.

pub mod errors;
pub mod role;
pub mod user;
pub mod session;
pub mod auth;
pub mod result;
pub mod notification;

pub use auth::{
    LoginRequest, LoginResponse, PasswordChange, PasswordResetConfirm, PasswordResetRequest, ProfileUpdate, RefreshResponse,
    RegisterInput, TokenPair,
};
pub use notification::Notification;
pub use result::{AuthResult, FailureKind};
pub use role::Role;
pub use session::Session;
pub use user::UserRecord;
