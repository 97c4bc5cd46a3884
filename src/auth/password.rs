//! Password hashing
//! bcrypt is CPU-bound, so both operations run on the blocking pool.

use anyhow::{Context, Result};
use bcrypt::{hash, verify};

/// Salt and digest of a well-formed bcrypt hash no password is known to match
const PLACEHOLDER_SALT_AND_DIGEST: &str = "R9h/cIPz0gi.URNNX3kh2OPST9/PgBkqquzi.Ss7KIUgO2t0jWMUW";

/// A bcrypt hash at `cost` for checks against accounts that don't exist, so
/// they spend the same work as a real verification.
pub fn placeholder_hash(cost: u32) -> String {
    format!("$2b${cost:02}${PLACEHOLDER_SALT_AND_DIGEST}")
}

/// One-way salted hash of `password` with the given work factor.
pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash(password, cost))
        .await
        .context("Password hashing task failed")?
        .context("Failed to hash password")
}

/// Compare `password` against a stored bcrypt hash.
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .context("Password verification task failed")?
        .context("Failed to verify password")
}
