//! Authentication Module
//! Mission: Verify credentials and enforce the admin/non-admin split

pub mod gate;
pub mod verifier;

pub use gate::{authorize, Operation};
pub use verifier::CredentialVerifier;

use uuid::Uuid;

/// The authenticated identity for one request, produced by the verifier
/// and threaded explicitly to the authorization gate. Nothing persists
/// across requests; every request re-authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub id: Uuid,
    pub username: String,
    pub admin: bool,
}

/// Authentication and authorization failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Missing or bad credentials. Unknown usernames report the same way
    /// so they cannot be enumerated.
    Unauthorized,
    /// Authenticated but not permitted.
    Forbidden,
    /// Backend failure during the auth decision; details stay in the logs.
    Internal,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Unauthorized => write!(f, "unauthorized"),
            AuthError::Forbidden => write!(f, "forbidden"),
            AuthError::Internal => write!(f, "internal auth failure"),
        }
    }
}

impl std::error::Error for AuthError {}
