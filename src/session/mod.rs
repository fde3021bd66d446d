//! Session management
//!
//! Owns the API session token and hides expiry from callers.

mod credentials;
mod manager;

pub use credentials::Credentials;
pub use manager::{SessionManager, SessionState};
