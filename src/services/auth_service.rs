use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    models::user::{UserResponse, UserRole},
    services::{UserService, UserServiceError},
};

#[derive(Error, Debug)]
pub enum AuthServiceError {
    #[error("Authentication failed: invalid credentials")]
    AuthenticationFailed,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session expired")]
    SessionExpired,

    #[error("Admin privileges required")]
    AdminRequired,

    #[error("User service error: {0}")]
    UserServiceError(#[from] UserServiceError),

    #[error("Token creation failed: {0}")]
    TokenCreationFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub token: String,
    pub refresh_token: String,
    pub created_at: DateTime<Utc>,
    /// Expiry of the refresh token; the session is dead after this.
    pub expires_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

struct IssuedTokens {
    token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

// Configuration for AuthService
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_dir: PathBuf,
    pub token_expiry_hours: i64,
    pub refresh_token_expiry_days: i64,
}

impl AuthConfig {
    pub fn new(jwt_secret: &str, session_dir: &Path) -> Self {
        Self {
            jwt_secret: jwt_secret.to_string(),
            session_dir: session_dir.to_path_buf(),
            token_expiry_hours: 24,
            refresh_token_expiry_days: 30,
        }
    }
}

pub struct AuthService {
    user_service: Arc<UserService>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_file_path: PathBuf,
    token_expiry_duration: Duration,
    refresh_token_expiry_duration: Duration,
}

impl AuthService {
    pub fn new(user_service: Arc<UserService>, config: AuthConfig) -> Result<Self, AuthServiceError> {
        if !config.session_dir.exists() {
            fs::create_dir_all(&config.session_dir).context("Failed to create session directory")?;
        }

        Ok(Self {
            user_service,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            session_file_path: config.session_dir.join("session.json"),
            token_expiry_duration: Duration::hours(config.token_expiry_hours),
            refresh_token_expiry_duration: Duration::days(config.refresh_token_expiry_days),
        })
    }

    /// Login with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthServiceError> {
        info!("Login attempt for user: {}", email);

        let user = self
            .user_service
            .authenticate(email, password)
            .await
            .map_err(|e| match e {
                UserServiceError::AuthenticationFailed => AuthServiceError::AuthenticationFailed,
                UserServiceError::UserNotFound => AuthServiceError::AuthenticationFailed,
                other => AuthServiceError::UserServiceError(other),
            })?;

        let issued = self.generate_tokens(&user.id, &user.email, user.role)?;

        let now = Utc::now();
        let session = Session {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            token: issued.token.clone(),
            refresh_token: issued.refresh_token.clone(),
            created_at: now,
            expires_at: issued.expires_at,
            last_accessed: now,
        };
        self.save_session(&session)?;

        info!("User {} logged in successfully", user.email);

        Ok(LoginResponse {
            user,
            token: issued.token,
            refresh_token: issued.refresh_token,
            expires_at: issued.expires_at,
        })
    }

    /// Logout and clear session
    pub async fn logout(&self) -> Result<(), AuthServiceError> {
        if self.session_file_path.exists() {
            fs::remove_file(&self.session_file_path).context("Failed to remove session file")?;
            info!("Session cleared successfully");
        }

        Ok(())
    }

    /// Validate token and return fresh user information
    pub async fn validate_token(&self, token: &str) -> Result<UserResponse, AuthServiceError> {
        let claims = self.decode_token(token)?.claims;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthServiceError::InvalidToken)?;
        let user = self.user_service.get_profile(&user_id).await?;

        debug!("Token validated successfully for user: {}", user.email);
        Ok(user)
    }

    /// Replace the stored access token using the stored refresh token.
    pub async fn refresh_session(&self) -> Result<UserResponse, AuthServiceError> {
        let mut session = self.load_session()?;

        if session.expires_at <= Utc::now() {
            warn!("Refresh token expired for user: {}", session.email);
            self.logout().await?;
            return Err(AuthServiceError::SessionExpired);
        }

        let claims = self.decode_token(&session.refresh_token)?.claims;
        if claims.sub != session.user_id.to_string() {
            warn!("Refresh token does not belong to the stored session");
            return Err(AuthServiceError::InvalidToken);
        }

        let user = self.user_service.get_profile(&session.user_id).await?;
        let issued = self.generate_tokens(&user.id, &user.email, user.role)?;

        session.email = user.email.clone();
        session.role = user.role;
        session.token = issued.token;
        session.refresh_token = issued.refresh_token;
        session.expires_at = issued.expires_at;
        session.last_accessed = Utc::now();
        self.save_session(&session)?;

        info!("Token refreshed successfully for user: {}", session.email);
        Ok(user)
    }

    /// Get current session if exists and valid
    pub async fn get_current_session(&self) -> Result<Option<UserResponse>, AuthServiceError> {
        if !self.session_file_path.exists() {
            return Ok(None);
        }

        let session = match self.load_session() {
            Ok(session) => session,
            Err(e) => {
                debug!("Failed to load session: {}", e);
                return Ok(None);
            }
        };

        if session.expires_at <= Utc::now() {
            debug!("Session expired, clearing it");
            self.logout().await?;
            return Ok(None);
        }

        match self.validate_token(&session.token).await {
            Ok(user) => {
                let mut updated_session = session;
                updated_session.last_accessed = Utc::now();
                self.save_session(&updated_session)?;
                Ok(Some(user))
            }
            Err(AuthServiceError::InvalidToken) => match self.refresh_session().await {
                Ok(user) => Ok(Some(user)),
                Err(e) => {
                    debug!("Could not refresh session ({}), clearing it", e);
                    self.logout().await?;
                    Ok(None)
                }
            },
            Err(e) => {
                debug!("Invalid session ({}), clearing it", e);
                self.logout().await?;
                Ok(None)
            }
        }
    }

    pub async fn get_current_user(&self) -> Result<UserResponse, AuthServiceError> {
        self.get_current_session()
            .await?
            .ok_or(AuthServiceError::SessionNotFound)
    }

    /// Current user, provided they hold the admin role.
    pub async fn require_admin(&self) -> Result<UserResponse, AuthServiceError> {
        let user = self.get_current_user().await?;
        if !user.is_admin() {
            warn!("User {} attempted an admin operation", user.email);
            return Err(AuthServiceError::AdminRequired);
        }
        Ok(user)
    }

    fn generate_tokens(&self, user_id: &Uuid, email: &str, role: UserRole) -> Result<IssuedTokens, AuthServiceError> {
        let now = Utc::now();
        let refresh_expires_at = now + self.refresh_token_expiry_duration;

        let sign = |expires_at: DateTime<Utc>| {
            let claims = Claims {
                sub: user_id.to_string(),
                email: email.to_string(),
                role,
                iat: now.timestamp(),
                exp: expires_at.timestamp(),
                jti: Uuid::new_v4().to_string(),
            };
            encode(&Header::default(), &claims, &self.encoding_key)
                .map_err(|e| AuthServiceError::TokenCreationFailed(e.to_string()))
        };

        Ok(IssuedTokens {
            token: sign(now + self.token_expiry_duration)?,
            refresh_token: sign(refresh_expires_at)?,
            expires_at: refresh_expires_at,
        })
    }

    fn decode_token(&self, token: &str) -> Result<TokenData<Claims>, AuthServiceError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!("Token decode failed: {}", e);
            AuthServiceError::InvalidToken
        })
    }

    /// Save session to file readable only by the owner
    fn save_session(&self, session: &Session) -> Result<(), AuthServiceError> {
        let json_data = serde_json::to_string_pretty(session)?;

        let mut file = fs::File::create(&self.session_file_path)?;
        file.write_all(json_data.as_bytes())?;
        file.flush()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = file.metadata()?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.session_file_path, perms)?;
        }

        debug!("Session saved successfully");
        Ok(())
    }

    fn load_session(&self) -> Result<Session, AuthServiceError> {
        if !self.session_file_path.exists() {
            return Err(AuthServiceError::SessionNotFound);
        }

        let json_data = fs::read_to_string(&self.session_file_path)?;
        let session: Session = serde_json::from_str(&json_data)?;

        debug!("Session loaded successfully for user: {}", session.email);
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::StoreUserRequest;
    use crate::services::user_service::tests::MockUserRepository;
    use tempfile::TempDir;

    fn auth_service(user_service: Arc<UserService>, dir: &TempDir) -> AuthService {
        AuthService::new(user_service, AuthConfig::new("test-secret", dir.path())).unwrap()
    }

    async fn registered_user_service(admin_email: Option<&str>) -> Arc<UserService> {
        let user_service = Arc::new(
            UserService::new(Arc::new(MockUserRepository::default()))
                .with_admin_email(admin_email.map(str::to_string)),
        );
        let request = StoreUserRequest::new(
            "Amit Kumar".to_string(),
            "amit@example.com".to_string(),
            "password123".to_string(),
        )
        .unwrap();
        user_service.register(request).await.unwrap();
        user_service
    }

    #[tokio::test]
    async fn test_login_success() {
        let temp_dir = TempDir::new().unwrap();
        let auth = auth_service(registered_user_service(None).await, &temp_dir);

        let response = auth.login("amit@example.com", "password123").await.unwrap();

        assert_eq!(response.user.email, "amit@example.com");
        assert!(!response.token.is_empty());
        assert!(!response.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn test_login_failure() {
        let temp_dir = TempDir::new().unwrap();
        let auth = auth_service(registered_user_service(None).await, &temp_dir);

        let unknown = auth.login("nobody@example.com", "password123").await;
        assert!(matches!(unknown, Err(AuthServiceError::AuthenticationFailed)));

        let wrong_password = auth.login("amit@example.com", "password999").await;
        assert!(matches!(wrong_password, Err(AuthServiceError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_token_validation() {
        let temp_dir = TempDir::new().unwrap();
        let auth = auth_service(registered_user_service(None).await, &temp_dir);

        let response = auth.login("amit@example.com", "password123").await.unwrap();

        let user = auth.validate_token(&response.token).await.unwrap();
        assert_eq!(user.email, "amit@example.com");
        assert!(matches!(
            auth.validate_token("not-a-token").await,
            Err(AuthServiceError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_session_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let user_service = registered_user_service(None).await;

        auth_service(user_service.clone(), &temp_dir)
            .login("amit@example.com", "password123")
            .await
            .unwrap();

        let restarted = auth_service(user_service, &temp_dir);
        let current = restarted.get_current_session().await.unwrap();
        assert_eq!(current.map(|u| u.email), Some("amit@example.com".to_string()));
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let temp_dir = TempDir::new().unwrap();
        let auth = auth_service(registered_user_service(None).await, &temp_dir);
        auth.login("amit@example.com", "password123").await.unwrap();

        auth.logout().await.unwrap();

        assert!(auth.get_current_session().await.unwrap().is_none());
        assert!(matches!(
            auth.get_current_user().await,
            Err(AuthServiceError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_refresh_session_issues_new_tokens() {
        let temp_dir = TempDir::new().unwrap();
        let auth = auth_service(registered_user_service(None).await, &temp_dir);
        let response = auth.login("amit@example.com", "password123").await.unwrap();

        let user = auth.refresh_session().await.unwrap();
        let session = auth.load_session().unwrap();

        assert_eq!(user.email, "amit@example.com");
        assert_ne!(session.refresh_token, response.refresh_token);
    }

    #[tokio::test]
    async fn test_require_admin() {
        let customer_dir = TempDir::new().unwrap();
        let customer_auth = auth_service(registered_user_service(None).await, &customer_dir);
        customer_auth.login("amit@example.com", "password123").await.unwrap();
        assert!(matches!(
            customer_auth.require_admin().await,
            Err(AuthServiceError::AdminRequired)
        ));

        let admin_dir = TempDir::new().unwrap();
        let admin_auth = auth_service(registered_user_service(Some("amit@example.com")).await, &admin_dir);
        admin_auth.login("amit@example.com", "password123").await.unwrap();
        assert!(admin_auth.require_admin().await.unwrap().is_admin());
    }
}
