//! In-Memory User Store
//! Mission: Concurrency-safe CRUD with uniqueness-constrained indices

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::models::User;
use crate::store::{StoreError, UserStore};

/// Record table plus secondary indices, mutated together under one lock.
#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    usernames: HashMap<String, Uuid>,
    emails: HashMap<String, Uuid>,
}

/// In-memory store guarded by a single reader/writer lock (many concurrent
/// readers or one exclusive writer). Critical sections are pure map
/// updates; password hashing happens in the handlers before any store
/// call, so no request serializes behind slow work here.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    unique_email: bool,
}

impl MemoryStore {
    /// Build a store seeded with the bootstrap administrator.
    ///
    /// When `unique_email` is off, the email index is neither maintained
    /// nor consulted.
    pub fn new(admin: User, unique_email: bool) -> Self {
        let mut tables = Tables::default();
        tables.usernames.insert(admin.username.clone(), admin.id);
        if unique_email {
            tables.emails.insert(admin.email.clone(), admin.id);
        }
        tables.users.insert(admin.id, admin);

        Self {
            tables: RwLock::new(tables),
            unique_email,
        }
    }
}

impl UserStore for MemoryStore {
    fn list(&self) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read();
        Ok(tables.users.values().cloned().collect())
    }

    fn create(&self, mut user: User) -> Result<Uuid, StoreError> {
        let mut tables = self.tables.write();

        if tables.usernames.contains_key(&user.username) {
            return Err(StoreError::UsernameExists);
        }
        if self.unique_email && tables.emails.contains_key(&user.email) {
            return Err(StoreError::EmailExists);
        }

        user.id = Uuid::new_v4();
        tables.usernames.insert(user.username.clone(), user.id);
        if self.unique_email {
            tables.emails.insert(user.email.clone(), user.id);
        }
        let id = user.id;
        tables.users.insert(id, user);

        Ok(id)
    }

    fn get_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        let tables = self.tables.read();
        tables.users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        let tables = self.tables.read();
        let id = tables.usernames.get(username).ok_or(StoreError::NotFound)?;
        tables.users.get(id).cloned().ok_or(StoreError::NotFound)
    }

    fn update(&self, user: User) -> Result<(), StoreError> {
        let mut tables = self.tables.write();

        let old = tables
            .users
            .get(&user.id)
            .cloned()
            .ok_or(StoreError::NotFound)?;

        // All conflict checks happen before any mutation so a rejected
        // update leaves both the indices and the table untouched.
        if old.username != user.username && tables.usernames.contains_key(&user.username) {
            return Err(StoreError::UsernameExists);
        }
        if self.unique_email && old.email != user.email && tables.emails.contains_key(&user.email) {
            return Err(StoreError::EmailExists);
        }

        tables.usernames.remove(&old.username);
        tables.usernames.insert(user.username.clone(), user.id);
        if self.unique_email {
            tables.emails.remove(&old.email);
            tables.emails.insert(user.email.clone(), user.id);
        }
        tables.users.insert(user.id, user);

        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write();

        let user = tables.users.remove(&id).ok_or(StoreError::NotFound)?;
        tables.usernames.remove(&user.username);
        if self.unique_email {
            tables.emails.remove(&user.email);
        }

        Ok(())
    }
}
