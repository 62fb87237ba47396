//! User management service (staff/admin surface)

use crate::{
    error::AppResult,
    models::{
        enums::Role,
        user::{UserInfo, UserWithStats},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List users, optionally restricted to one role
    pub async fn list(&self, role: Option<Role>) -> AppResult<Vec<UserInfo>> {
        let users = self.repository.users.list(role).await?;
        Ok(users.into_iter().map(Into::into).collect())
    }

    /// Get a user with their loan statistics
    pub async fn get_with_stats(&self, id: i32) -> AppResult<UserWithStats> {
        let user = self.repository.users.get_by_id(id).await?;
        let statistics = self.repository.users.loan_stats(id).await?;
        Ok(UserWithStats {
            user: user.into(),
            statistics,
        })
    }

    /// Change a user's role
    pub async fn update_role(&self, id: i32, role: Role) -> AppResult<()> {
        self.repository.users.update_role(id, role).await?;
        tracing::info!(user_id = id, role = %role, "User role updated");
        Ok(())
    }

    /// Delete a user account
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }
}
