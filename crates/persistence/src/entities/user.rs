//! User entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::user::User;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_invited_user: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserEntity> for User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            email: entity.email,
            first_name: entity.first_name,
            last_name: entity.last_name,
            is_invited_user: entity.is_invited_user,
            created_at: entity.created_at,
        }
    }
}
