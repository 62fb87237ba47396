//! Authentication service: registration, login, profile lookup.
//!
//! The circulation engine itself performs no credential checks; it
//! trusts the {user_id, role} pair resolved here from the bearer token.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        enums::Role,
        user::{User, UserClaims, UserInfo},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new member account and issue a token for immediate login
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> AppResult<(String, UserInfo)> {
        if self.repository.users.email_exists(email).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(password)?;
        let user = self
            .repository
            .users
            .create(name, email, &password_hash, Role::Member)
            .await?;

        let token = self.issue_token(&user)?;
        Ok((token, user.into()))
    }

    /// Verify credentials and issue a bearer token
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, UserInfo)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        verify_password(password, &user.password_hash)?;

        let token = self.issue_token(&user)?;
        Ok((token, user.into()))
    }

    /// Current user's profile
    pub async fn profile(&self, user_id: i32) -> AppResult<UserInfo> {
        let user = self.repository.users.get_by_id(user_id).await?;
        Ok(user.into())
    }

    fn issue_token(&self, user: &User) -> AppResult<String> {
        UserClaims::new(user, self.config.jwt_expiration_hours).to_token(&self.config.jwt_secret)
    }
}

/// Hash a password with argon2 and a fresh salt
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored argon2 hash
pub fn verify_password(password: &str, hash: &str) -> AppResult<()> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Corrupt password hash: {}", e)))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::Authentication("Invalid email or password".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash).is_ok());
        assert!(verify_password("wrong", &hash).is_err());
    }
}
