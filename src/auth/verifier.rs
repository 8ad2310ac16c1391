//! Credential Verifier
//! Mission: Authenticate Basic credentials against stored bcrypt hashes

use std::sync::Arc;

use tracing::warn;

use crate::auth::{AuthError, AuthIdentity};
use crate::store::{StoreError, UserStore};

/// Checks a presented username/secret pair against stored records.
pub struct CredentialVerifier {
    store: Arc<dyn UserStore>,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Authenticate one request's credentials.
    ///
    /// Unknown usernames and bad secrets both come back as `Unauthorized`
    /// with no further detail. The comparison goes through `bcrypt::verify`,
    /// a salted adaptive hash; plaintext comparison is never performed.
    pub fn authenticate(&self, username: &str, secret: &str) -> Result<AuthIdentity, AuthError> {
        let user = match self.store.get_by_username(username) {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Err(AuthError::Unauthorized),
            Err(e) => {
                warn!("store failure during authentication: {}", e);
                return Err(AuthError::Internal);
            }
        };

        let valid = bcrypt::verify(secret, &user.password_hash).map_err(|e| {
            warn!("failed to verify password hash: {}", e);
            AuthError::Internal
        })?;

        if !valid {
            return Err(AuthError::Unauthorized);
        }

        Ok(AuthIdentity {
            id: user.id,
            username: user.username,
            admin: user.admin.unwrap_or(false),
        })
    }
}
