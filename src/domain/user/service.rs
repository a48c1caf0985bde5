use std::sync::Arc;

use chrono::Utc;

use crate::auth::{hash_password, verify_password, TokenService};
use crate::error::Result;
use crate::store::{Store, StoreError};

use super::errors::UserError;
use super::value_objects::*;

// ============================================================================
// User Service
// ============================================================================
//
// Account management and login. Passwords are checked against the policy
// before hashing; hashes never leave this service.
//
// ============================================================================

pub struct UserService {
    store: Arc<dyn Store>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.store.list_users().await?)
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| UserError::NotFound(id).into())
    }

    pub async fn create_user(&self, input: NewUser) -> Result<User> {
        let email = Email::parse(&input.email)?;
        validate_password(&input.password)?;

        let record = NewUserRecord {
            email,
            password_hash: hash_password(input.password, self.bcrypt_cost).await?,
            role: input.role,
        };

        let user = match self.store.insert_user(&record).await {
            Ok(user) => user,
            Err(StoreError::Duplicate(_)) => return Err(UserError::EmailTaken.into()),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user_id = user.id, email = %user.email, role = %user.role, "User created");
        Ok(user)
    }

    pub async fn update_user(&self, id: i64, patch: UserPatch) -> Result<User> {
        if patch.is_empty() {
            return Err(UserError::NothingToUpdate.into());
        }

        let mut user = self.get_user(id).await?;
        if let Some(email) = patch.email {
            user.email = Email::parse(&email)?;
        }
        if let Some(password) = patch.password {
            validate_password(&password)?;
            user.password_hash = hash_password(password, self.bcrypt_cost).await?;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        user.updated_at = Utc::now();

        match self.store.update_user(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => return Err(UserError::EmailTaken.into()),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = id, role = %user.role, "User updated");
        Ok(user)
    }

    /// Refused while the user is the placer of record of any order.
    pub async fn delete_user(&self, id: i64) -> Result<()> {
        self.get_user(id).await?;

        match self.store.delete_user(id).await {
            Ok(()) => {
                tracing::info!(user_id = id, "User deleted");
                Ok(())
            }
            Err(StoreError::StillReferenced(_)) => Err(UserError::HasOrders(id).into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check credentials and issue a bearer token.
    ///
    /// Unknown email and wrong password fail the same way.
    pub async fn login(&self, credentials: Credentials, tokens: &TokenService) -> Result<String> {
        let email = Email::parse(&credentials.email).map_err(|_| UserError::InvalidCredentials)?;

        let Some(user) = self.store.find_user_by_email(email.as_str()).await? else {
            tracing::warn!(email = %email, "Login with unknown email");
            return Err(UserError::InvalidCredentials.into());
        };

        if !verify_password(credentials.password, user.password_hash.clone()).await? {
            tracing::warn!(user_id = user.id, "Login with wrong password");
            return Err(UserError::InvalidCredentials.into());
        }

        tracing::info!(user_id = user.id, role = %user.role, "User logged in");
        tokens.issue(&user)
    }

    /// Create the bootstrap admin unless the email already exists.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<User> {
        let parsed = Email::parse(email)?;
        if let Some(existing) = self.store.find_user_by_email(parsed.as_str()).await? {
            tracing::debug!(user_id = existing.id, "Admin account already present");
            return Ok(existing);
        }

        self.create_user(NewUser {
            email: email.to_string(),
            password: password.to_string(),
            role: Role::Admin,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use crate::store::MemoryStore;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::new()), 4)
    }

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: "Secret123!".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let users = service();
        let user = users.create_user(new_user(" Greeter@Wacdo.com", Role::Greeter)).await.unwrap();

        assert_eq!(user.email.as_str(), "greeter@wacdo.com");
        assert_ne!(user.password_hash, "Secret123!");
        assert!(user.password_hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let users = service();
        users.create_user(new_user("a@wacdo.com", Role::Greeter)).await.unwrap();

        let err = users.create_user(new_user("A@wacdo.com", Role::Manager)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Email already used.");
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let users = service();
        let mut input = new_user("a@wacdo.com", Role::Greeter);
        input.password = "short".to_string();

        let err = users.create_user(input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_login() {
        let users = service();
        let tokens = TokenService::new("test-secret", 60);
        let user = users.create_user(new_user("picker@wacdo.com", Role::OrderPicker)).await.unwrap();

        let token = users
            .login(
                Credentials { email: "picker@wacdo.com".to_string(), password: "Secret123!".to_string() },
                &tokens,
            )
            .await
            .unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::OrderPicker);

        for (email, password) in [("picker@wacdo.com", "Wrong123!"), ("nobody@wacdo.com", "Secret123!")] {
            let err = users
                .login(Credentials { email: email.to_string(), password: password.to_string() }, &tokens)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::User(UserError::InvalidCredentials)));
        }
    }

    #[tokio::test]
    async fn test_update_user() {
        let users = service();
        let user = users.create_user(new_user("a@wacdo.com", Role::Greeter)).await.unwrap();

        let err = users.update_user(user.id, UserPatch::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "No data to update.");

        let patch = UserPatch { role: Some(Role::Manager), ..Default::default() };
        let updated = users.update_user(user.id, patch).await.unwrap();
        assert_eq!(updated.role, Role::Manager);
        assert_eq!(users.get_user(user.id).await.unwrap().role, Role::Manager);
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let users = service();
        let first = users.ensure_admin("admin@wacdo.com", "Admin1234!").await.unwrap();
        let second = users.ensure_admin("admin@wacdo.com", "Admin1234!").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.role, Role::Admin);
        assert_eq!(users.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let users = service();
        let user = users.create_user(new_user("a@wacdo.com", Role::Greeter)).await.unwrap();

        users.delete_user(user.id).await.unwrap();
        let err = users.get_user(user.id).await.unwrap_err();
        assert_eq!(err.to_string(), "User not found.");
    }
}
