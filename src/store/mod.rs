//! User Storage
//! Mission: Own the authoritative user records behind one store contract

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use uuid::Uuid;

use crate::models::User;

/// Typed store failures shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound,
    UsernameExists,
    EmailExists,
    EmptyUpdate,
    Storage(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "user not found"),
            StoreError::UsernameExists => write!(f, "user with this username already exists"),
            StoreError::EmailExists => write!(f, "user with this email already exists"),
            StoreError::EmptyUpdate => write!(f, "empty fields, nothing to update"),
            StoreError::Storage(msg) => write!(f, "storage failure: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Contract shared by the in-memory and SQLite-backed stores.
///
/// Every mutation is atomic with respect to the uniqueness indices: either
/// the record table and the indices change together or neither does. No
/// caller can observe a username index entry pointing at a missing record.
pub trait UserStore: Send + Sync {
    /// Snapshot copy of all records, order unspecified.
    fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Insert a new record, assigning a fresh identifier. The id carried
    /// by `user` is ignored.
    fn create(&self, user: User) -> Result<Uuid, StoreError>;

    fn get_by_id(&self, id: Uuid) -> Result<User, StoreError>;

    fn get_by_username(&self, username: &str) -> Result<User, StoreError>;

    /// Replace the record whose id is embedded in `user`. Callers fetch
    /// and merge first; partial documents never reach the store.
    fn update(&self, user: User) -> Result<(), StoreError>;

    fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}
