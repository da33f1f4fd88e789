use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    database::repositories::{UserRepository, UserRepositoryError},
    models::user::{StoreUserRequest, User, UserResponse, UserRole},
};

#[derive(Error, Debug)]
pub enum UserServiceError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("User not found")]
    UserNotFound,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Email already exists: {email}")]
    EmailExists { email: String },

    #[error("Repository error: {0}")]
    RepositoryError(#[from] UserRepositoryError),
}

pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    admin_email: Option<String>,
}

impl UserService {
    pub fn new(user_repository: Arc<dyn UserRepository>) -> Self {
        Self {
            user_repository,
            admin_email: None,
        }
    }

    /// Accounts registered with `email` receive the admin role.
    pub fn with_admin_email(mut self, email: Option<String>) -> Self {
        self.admin_email = email.map(|e| e.trim().to_lowercase());
        self
    }

    /// Register a new customer account
    pub async fn register(&self, request: StoreUserRequest) -> Result<UserResponse, UserServiceError> {
        info!("Attempting to register user: {}", request.email);

        request
            .validate()
            .map_err(|e| UserServiceError::ValidationError {
                message: format!("Registration validation failed: {}", e),
            })?;

        if self.user_repository.exists_by_email(&request.email).await? {
            return Err(UserServiceError::EmailExists {
                email: request.email.clone(),
            });
        }

        let request = if self.admin_email.as_deref() == Some(request.email.as_str()) {
            info!("Granting admin role to {}", request.email);
            request.with_role(UserRole::Admin)
        } else {
            request
        };

        let user = self
            .user_repository
            .store(request)
            .await
            .map_err(|e| match e {
                UserRepositoryError::EmailExists { email } => UserServiceError::EmailExists { email },
                other => {
                    error!("Failed to create user in repository: {}", other);
                    UserServiceError::RepositoryError(other)
                }
            })?;

        info!("Successfully registered user with ID: {}", user.id);
        Ok(user.to_response())
    }

    /// Authenticate user with email and password
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserResponse, UserServiceError> {
        info!("Authentication attempt for user: {}", email);

        if email.trim().is_empty() || password.is_empty() {
            warn!("Authentication failed: empty credentials");
            return Err(UserServiceError::AuthenticationFailed);
        }

        let user: User = self
            .user_repository
            .find_by_email(email)
            .await?
            .ok_or(UserServiceError::UserNotFound)?;

        if !user.verify_password(password) {
            warn!("Authentication failed: invalid password for user {}", email);
            return Err(UserServiceError::AuthenticationFailed);
        }

        info!("Successfully authenticated user: {}", user.email);
        Ok(user.to_response())
    }

    pub async fn get_profile(&self, user_id: &Uuid) -> Result<UserResponse, UserServiceError> {
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(UserServiceError::UserNotFound)?;

        Ok(user.to_response())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Mock repository for testing
    #[derive(Default)]
    pub(crate) struct MockUserRepository {
        users: Mutex<HashMap<Uuid, User>>,
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn store(&self, request: StoreUserRequest) -> Result<User, UserRepositoryError> {
            let now = chrono::Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                name: request.name,
                email: request.email,
                password_hash: request.password_hash,
                role: request.role,
                created_at: now,
                updated_at: now,
            };

            self.users.lock().unwrap().insert(user.id, user.clone());
            Ok(user)
        }

        async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, UserRepositoryError> {
            Ok(self.users.lock().unwrap().get(id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
            let email = email.trim().to_lowercase();
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|user| user.email == email)
                .cloned())
        }

        async fn exists_by_email(&self, email: &str) -> Result<bool, UserRepositoryError> {
            Ok(self.find_by_email(email).await?.is_some())
        }
    }

    fn request(email: &str) -> StoreUserRequest {
        StoreUserRequest::new(
            "Neha Singh".to_string(),
            email.to_string(),
            "password123".to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_user_registration_success() {
        let service = UserService::new(Arc::new(MockUserRepository::default()));

        let user = service.register(request("neha@example.com")).await.unwrap();

        assert_eq!(user.name, "Neha Singh");
        assert_eq!(user.email, "neha@example.com");
        assert_eq!(user.role, UserRole::Customer);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let service = UserService::new(Arc::new(MockUserRepository::default()));
        service.register(request("neha@example.com")).await.unwrap();

        let result = service.register(request("NEHA@example.com")).await;

        assert!(matches!(result, Err(UserServiceError::EmailExists { .. })));
    }

    #[tokio::test]
    async fn test_admin_email_gets_admin_role() {
        let service = UserService::new(Arc::new(MockUserRepository::default()))
            .with_admin_email(Some("Owner@Example.com".to_string()));

        let admin = service.register(request("owner@example.com")).await.unwrap();
        let customer = service.register(request("guest@example.com")).await.unwrap();

        assert!(admin.is_admin());
        assert!(!customer.is_admin());
    }

    #[tokio::test]
    async fn test_user_authentication_success() {
        let service = UserService::new(Arc::new(MockUserRepository::default()));
        service.register(request("neha@example.com")).await.unwrap();

        let user = service.authenticate("neha@example.com", "password123").await.unwrap();
        assert_eq!(user.email, "neha@example.com");

        let wrong = service.authenticate("neha@example.com", "password999").await;
        assert!(matches!(wrong, Err(UserServiceError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_authentication_unknown_user() {
        let service = UserService::new(Arc::new(MockUserRepository::default()));

        let result = service.authenticate("nobody@example.com", "password123").await;
        assert!(matches!(result, Err(UserServiceError::UserNotFound)));
    }
}
