//! User Account Models
//! Mission: Define the user entity and partial-update semantics

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user account record.
///
/// The password is stored as a bcrypt hash and never serialized back to
/// callers. The admin flag is tri-state: `None` means "unset", which keeps
/// the existing value during partial updates and is omitted from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub admin: Option<bool>,
}

impl User {
    /// Apply a sparse update document: overwrite exactly the fields the
    /// patch marks present, retain everything else.
    ///
    /// The patch's `password` must already be hashed by the caller; stores
    /// never see plaintext credentials.
    pub fn apply_patch(&mut self, patch: &UserPatch) {
        if let Some(username) = &patch.username {
            self.username = username.clone();
        }
        if let Some(password_hash) = &patch.password {
            self.password_hash = password_hash.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(admin) = patch.admin {
            self.admin = Some(admin);
        }
    }
}

/// Partial-update document for a user.
///
/// Every field carries an explicit presence flag: `None` means the caller
/// did not supply the field, not "set it to empty". JSON `null` is treated
/// the same as an absent field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub admin: Option<bool>,
}

impl UserPatch {
    /// True when no field is present. Such a document is rejected as an
    /// empty update instead of silently doing nothing.
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.password.is_none()
            && self.email.is_none()
            && self.admin.is_none()
    }
}

/// The seeded administrator record present in every store at
/// initialization. The password hash is produced by the caller at startup,
/// outside any store lock.
pub fn bootstrap_admin(username: &str, email: &str, password_hash: &str) -> User {
    User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        admin: Some(true),
    }
}
