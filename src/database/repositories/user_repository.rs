use async_trait::async_trait;
use sqlx::{PgPool, Row};
use thiserror::Error;
use uuid::Uuid;

use crate::models::user::{StoreUserRequest, User};

#[derive(Error, Debug)]
pub enum UserRepositoryError {
    #[error("Email already exists: {email}")]
    EmailExists { email: String },
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// User repository trait for data access operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn store(&self, user: StoreUserRequest) -> Result<User, UserRepositoryError>;
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, UserRepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError>;
    async fn exists_by_email(&self, email: &str) -> Result<bool, UserRepositoryError>;
}

/// PostgreSQL implementation of UserRepository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn store(&self, user: StoreUserRequest) -> Result<User, UserRepositoryError> {
        if self.exists_by_email(&user.email).await? {
            return Err(UserRepositoryError::EmailExists { email: user.email });
        }

        let user_id = Uuid::new_v4();
        let now = chrono::Utc::now();

        let query = r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, email, password_hash, role, created_at, updated_at
        "#;

        let user = sqlx::query_as::<_, User>(query)
            .bind(user_id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create user: {}", e);
                UserRepositoryError::DatabaseError(e)
            })?;

        Ok(user)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, UserRepositoryError> {
        let query = r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = $1
        "#;

        let user = sqlx::query_as::<_, User>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(UserRepositoryError::DatabaseError)?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let query = r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = $1
        "#;

        let user = sqlx::query_as::<_, User>(query)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(UserRepositoryError::DatabaseError)?;

        Ok(user)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, UserRepositoryError> {
        let query = "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)";

        let row = sqlx::query(query)
            .bind(email.trim().to_lowercase())
            .fetch_one(&self.pool)
            .await
            .map_err(UserRepositoryError::DatabaseError)?;

        Ok(row.get::<bool, _>(0))
    }
}
