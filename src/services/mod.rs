//! Business logic services

pub mod auth;
pub mod catalog;
pub mod circulation;
pub mod reports;
pub mod users;

use crate::{
    config::{AuthConfig, LibraryConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub users: users::UsersService,
    pub reports: reports::ReportsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig, library: LibraryConfig) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), auth_config),
            catalog: catalog::CatalogService::new(repository.clone()),
            circulation: circulation::CirculationService::new(repository.clone(), library.clone()),
            users: users::UsersService::new(repository.clone()),
            reports: reports::ReportsService::new(repository, library),
        }
    }
}
