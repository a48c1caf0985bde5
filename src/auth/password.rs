use crate::error::{Error, Result};

// bcrypt is CPU bound; keep it off the async workers.

pub async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| Error::Internal(format!("hashing task failed: {}", e)))?
        .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))
}

pub async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| Error::Internal(format!("verification task failed: {}", e)))?
        .map_err(|e| Error::Internal(format!("password verification failed: {}", e)))
}
