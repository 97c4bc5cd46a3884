//! User Storage
//! Credential store over the `users` table

use crate::auth::models::User;
use crate::db::Database;
use crate::error::StoreError;
use rusqlite::{ffi, params, OptionalExtension, Row};
use tracing::info;
use uuid::Uuid;

/// Credential store with SQLite backend
#[derive(Clone)]
pub struct UserStore {
    db: Database,
}

impl UserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.db.conn().lock().await;

        let mut stmt = conn.prepare_cached(
            "SELECT id, username, email, password_hash, created_at
             FROM users WHERE email = ?1",
        )?;

        let row = stmt
            .query_row(params![email], row_to_parts)
            .optional()?;

        row.map(user_from_parts).transpose()
    }

    /// Get user by id
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, StoreError> {
        let conn = self.db.conn().lock().await;

        let mut stmt = conn.prepare_cached(
            "SELECT id, username, email, password_hash, created_at
             FROM users WHERE id = ?1",
        )?;

        let row = stmt
            .query_row(params![id.to_string()], row_to_parts)
            .optional()?;

        row.map(user_from_parts).transpose()
    }

    /// Persist a new user. A taken email fails with `DuplicateEmail` and
    /// writes nothing.
    pub async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let conn = self.db.conn().lock().await;

        conn.execute(
            "INSERT INTO users (id, username, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.password_hash,
                user.created_at,
            ],
        )
        .map_err(|e| match e {
            // Only the email index is UNIQUE; a primary key clash reports
            // SQLITE_CONSTRAINT_PRIMARYKEY instead
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                StoreError::DuplicateEmail
            }
            other => StoreError::Sqlite(other),
        })?;

        info!("Stored user: {} ({})", user.username, user.id);
        Ok(())
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        let conn = self.db.conn().lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

type UserParts = (String, String, String, String, String);

fn row_to_parts(row: &Row<'_>) -> rusqlite::Result<UserParts> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn user_from_parts(
    (id, username, email, password_hash, created_at): UserParts,
) -> Result<User, StoreError> {
    let id = Uuid::parse_str(&id)
        .map_err(|e| StoreError::Corrupt(format!("user id {id:?}: {e}")))?;

    Ok(User {
        id,
        username,
        email,
        password_hash,
        created_at,
    })
}
