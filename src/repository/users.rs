//! Users repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::Role,
        user::{User, UserLoanStats},
    },
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by email (login path)
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Create a user account
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// List users, optionally restricted to one role, newest first
    pub async fn list(&self, role: Option<Role>) -> AppResult<Vec<User>> {
        let users = if let Some(role) = role {
            sqlx::query_as::<_, User>(
                "SELECT * FROM users WHERE role = $1 ORDER BY created_at DESC",
            )
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?
        };
        Ok(users)
    }

    /// Per-user loan statistics. Overdue is derived, not read from the
    /// stored status column.
    pub async fn loan_stats(&self, user_id: i32) -> AppResult<UserLoanStats> {
        let stats = sqlx::query_as::<_, UserLoanStats>(
            r#"
            SELECT COUNT(*) AS total_loans,
                   COUNT(*) FILTER (WHERE return_date IS NULL) AS active_loans,
                   COUNT(*) FILTER (WHERE return_date IS NULL AND due_date < CURRENT_DATE) AS overdue_loans,
                   COALESCE(SUM(fine_amount), 0) AS total_fines
            FROM loans
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// Update a user's role
    pub async fn update_role(&self, id: i32, role: Role) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    /// Delete a user. Refused while the user has copies out.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let active_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND return_date IS NULL",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if active_loans > 0 {
            return Err(AppError::Conflict(
                "Cannot delete user with active loans".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }
}
