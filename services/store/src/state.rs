//! Application state shared across handlers

use std::sync::Arc;

use sqlx::PgPool;

use crate::jwt::JwtService;
use crate::repositories::{
    BookRepository, PgBookRepository, PgRelationRepository, PgUserRepository, RelationRepository,
    UserRepository,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub books: Arc<dyn BookRepository>,
    pub relations: Arc<dyn RelationRepository>,
    pub users: Arc<dyn UserRepository>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    /// State backed by PostgreSQL repositories sharing one pool
    pub fn postgres(pool: PgPool, jwt_service: JwtService) -> Self {
        Self {
            books: Arc::new(PgBookRepository::new(pool.clone())),
            relations: Arc::new(PgRelationRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool)),
            jwt_service: Arc::new(jwt_service),
        }
    }
}
