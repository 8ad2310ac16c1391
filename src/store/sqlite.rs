//! SQLite User Store
//! Mission: The same store contract over a relational backend

use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use tracing::info;
use uuid::Uuid;

use crate::models::User;
use crate::store::{StoreError, UserStore};

/// SQLite-backed store. Opens one connection per operation against the
/// database path; uniqueness is enforced by the database constraints,
/// which gives the same linearizable contract as the in-memory lock.
pub struct SqliteStore {
    db_path: String,
    unique_email: bool,
}

impl SqliteStore {
    /// Create the store, initialize the schema, and seed the bootstrap
    /// administrator if it is missing.
    pub fn new(db_path: &str, admin: User, unique_email: bool) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
            unique_email,
        };
        store.init_db(admin)?;
        Ok(store)
    }

    /// Initialize database schema. `is_admin` is nullable: NULL carries the
    /// "unset" state of the tri-state admin flag.
    fn init_db(&self, admin: User) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                is_admin INTEGER
            )",
            [],
        )?;

        if self.unique_email {
            conn.execute(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (email)",
                [],
            )?;
        }

        self.seed_admin(&conn, admin)?;

        Ok(())
    }

    fn seed_admin(&self, conn: &Connection, admin: User) -> Result<()> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE username = ?1",
                params![admin.username],
                |row| row.get(0),
            )
            .context("Failed to check for bootstrap admin")?;

        if count == 0 {
            conn.execute(
                "INSERT INTO users (id, username, email, password_hash, is_admin)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    admin.id.to_string(),
                    admin.username,
                    admin.email,
                    admin.password_hash,
                    admin.admin,
                ],
            )
            .context("Failed to insert bootstrap admin")?;

            info!("🔐 Bootstrap admin created (username: {})", admin.username);
        }

        Ok(())
    }

    fn open(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path).map_err(storage_err)?;
        // Concurrent writers wait instead of failing fast with SQLITE_BUSY,
        // so racing creates resolve as one winner plus constraint errors.
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(storage_err)?;
        Ok(conn)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(User {
        id,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        admin: row.get(4)?,
    })
}

fn storage_err(e: rusqlite::Error) -> StoreError {
    StoreError::Storage(e.to_string())
}

fn not_found_err(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => storage_err(other),
    }
}

/// Map UNIQUE-constraint failures onto the typed conflict errors.
fn conflict_err(e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, Some(msg)) = &e {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation {
            if msg.contains("users.username") {
                return StoreError::UsernameExists;
            }
            if msg.contains("users.email") {
                return StoreError::EmailExists;
            }
        }
    }
    storage_err(e)
}

impl UserStore for SqliteStore {
    fn list(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.open()?;

        let mut stmt = conn
            .prepare("SELECT id, username, email, password_hash, is_admin FROM users")
            .map_err(storage_err)?;
        let users = stmt
            .query_map([], row_to_user)
            .map_err(storage_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_err)?;

        Ok(users)
    }

    fn create(&self, mut user: User) -> Result<Uuid, StoreError> {
        user.id = Uuid::new_v4();

        let conn = self.open()?;
        conn.execute(
            "INSERT INTO users (id, username, email, password_hash, is_admin)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.password_hash,
                user.admin,
            ],
        )
        .map_err(conflict_err)?;

        Ok(user.id)
    }

    fn get_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        let conn = self.open()?;
        conn.query_row(
            "SELECT id, username, email, password_hash, is_admin FROM users WHERE id = ?1",
            params![id.to_string()],
            row_to_user,
        )
        .map_err(not_found_err)
    }

    fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        let conn = self.open()?;
        conn.query_row(
            "SELECT id, username, email, password_hash, is_admin FROM users WHERE username = ?1",
            params![username],
            row_to_user,
        )
        .map_err(not_found_err)
    }

    fn update(&self, user: User) -> Result<(), StoreError> {
        let conn = self.open()?;
        let affected = conn
            .execute(
                "UPDATE users SET username = ?1, email = ?2, password_hash = ?3, is_admin = ?4
                 WHERE id = ?5",
                params![
                    user.username,
                    user.email,
                    user.password_hash,
                    user.admin,
                    user.id.to_string(),
                ],
            )
            .map_err(conflict_err)?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self.open()?;
        let affected = conn
            .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])
            .map_err(storage_err)?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
