//! Authorization Gate
//! Mission: Decide whether an authenticated identity may run an operation

use tracing::warn;

use crate::auth::{AuthError, AuthIdentity};
use crate::store::{StoreError, UserStore};

/// Operations subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListUsers,
    GetUser,
    CreateUser,
    PutUser,
    PatchUser,
    DeleteUser,
}

impl Operation {
    pub fn as_str(&self) -> &str {
        match self {
            Operation::ListUsers => "list_users",
            Operation::GetUser => "get_user",
            Operation::CreateUser => "create_user",
            Operation::PutUser => "put_user",
            Operation::PatchUser => "patch_user",
            Operation::DeleteUser => "delete_user",
        }
    }

    /// Listing and fetching are open to any authenticated user; every
    /// mutation requires the admin flag.
    fn admin_only(&self) -> bool {
        !matches!(self, Operation::ListUsers | Operation::GetUser)
    }
}

/// Decide whether `identity` may perform `operation`.
///
/// The admin flag is re-fetched from the store at decision time, within the
/// same request that authenticated the identity; a record deleted between
/// those two steps must not retain admin rights, so `NotFound` is treated
/// as forbidden.
pub fn authorize(
    store: &dyn UserStore,
    identity: &AuthIdentity,
    operation: Operation,
) -> Result<(), AuthError> {
    if !operation.admin_only() {
        return Ok(());
    }

    let user = match store.get_by_id(identity.id) {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(AuthError::Forbidden),
        Err(e) => {
            warn!(
                operation = operation.as_str(),
                "store failure during authorization: {}", e
            );
            return Err(AuthError::Internal);
        }
    };

    if user.admin == Some(true) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}
