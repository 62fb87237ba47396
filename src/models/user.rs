//! User model, JWT claims, and related types

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

use super::enums::Role;

/// User model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Public user representation (no credentials)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserInfo {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

/// Per-user loan statistics shown on the admin user page
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserLoanStats {
    pub total_loans: i64,
    pub active_loans: i64,
    pub overdue_loans: i64,
    pub total_fines: Decimal,
}

/// User with loan statistics
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserWithStats {
    #[serde(flatten)]
    pub user: UserInfo,
    pub statistics: UserLoanStats,
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Role update request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRole {
    pub role: Role,
}

/// JWT claims carried by every authenticated request.
/// The API layer trusts the resolved {user_id, role} pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// User ID
    pub sub: i32,
    pub email: String,
    pub role: Role,
    /// Expiry (seconds since epoch)
    pub exp: i64,
    /// Issued at (seconds since epoch)
    pub iat: i64,
}

impl UserClaims {
    pub fn new(user: &User, expiration_hours: u64) -> Self {
        let now = Utc::now();
        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            exp: (now + Duration::hours(expiration_hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Sign the claims into a bearer token
    pub fn to_token(&self, secret: &str) -> AppResult<String> {
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Validate a bearer token and extract the claims
    pub fn from_token(token: &str, secret: &str) -> AppResult<Self> {
        let data = decode::<UserClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Authentication("Token expired".to_string())
            }
            _ => AppError::Authentication("Invalid token".to_string()),
        })?;
        Ok(data.claims)
    }

    /// Librarian or admin required
    pub fn require_staff(&self) -> AppResult<()> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Insufficient permissions. Required role: librarian or admin".to_string(),
            ))
        }
    }

    /// Admin required
    pub fn require_admin(&self) -> AppResult<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Insufficient permissions. Required role: admin".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: 7,
            name: "Jane Reader".to_string(),
            email: "jane@example.org".to_string(),
            password_hash: "x".to_string(),
            role: Role::Member,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trip() {
        let claims = UserClaims::new(&test_user(), 24);
        let token = claims.to_token("secret").unwrap();
        let decoded = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(decoded.sub, 7);
        assert_eq!(decoded.role, Role::Member);
    }

    #[test]
    fn wrong_secret_rejected() {
        let claims = UserClaims::new(&test_user(), 24);
        let token = claims.to_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn member_is_not_staff() {
        let claims = UserClaims::new(&test_user(), 24);
        assert!(claims.require_staff().is_err());
        assert!(claims.require_admin().is_err());
    }
}
