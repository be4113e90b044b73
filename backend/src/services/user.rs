//! User service for registration, login and token refresh
//!
//! Password hashing and verification run on the blocking thread pool.

use crate::auth::{JwtService, PasswordService, TokenKind};
use crate::error::ApiError;
use crate::repositories::UserRepository;
use babylog_shared::types::{AuthTokens, RegisterRequest, UserProfile};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// User service for authentication operations
pub struct UserService;

impl UserService {
    pub async fn register(
        pool: &PgPool,
        jwt_service: &JwtService,
        req: &RegisterRequest,
    ) -> Result<AuthTokens, ApiError> {
        req.validate()?;

        let email = req.email.trim().to_lowercase();
        if UserRepository::email_exists(pool, &email)
            .await
            .map_err(ApiError::Internal)?
        {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }

        let password_hash = PasswordService::hash_async(req.password.clone())
            .await
            .map_err(ApiError::Internal)?;

        let user = UserRepository::create(pool, &email, &password_hash, req.display_name.trim())
            .await
            .map_err(ApiError::Internal)?;

        info!(user_id = %user.id, "user registered");
        Self::issue_tokens(jwt_service, user.id)
    }

    pub async fn login(
        pool: &PgPool,
        jwt_service: &JwtService,
        email: &str,
        password: &str,
    ) -> Result<AuthTokens, ApiError> {
        let email = email.trim().to_lowercase();
        let user = UserRepository::find_by_email(pool, &email)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

        let valid = PasswordService::verify_async(password.to_string(), user.password_hash.clone())
            .await
            .map_err(ApiError::Internal)?;

        if !valid {
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }

        Self::issue_tokens(jwt_service, user.id)
    }

    /// Exchange a refresh token for a fresh token pair
    pub async fn refresh_token(
        pool: &PgPool,
        jwt_service: &JwtService,
        refresh_token: &str,
    ) -> Result<AuthTokens, ApiError> {
        let claims = jwt_service
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid refresh token: {}", e)))?;

        UserRepository::find_by_id(pool, claims.sub)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

        Self::issue_tokens(jwt_service, claims.sub)
    }

    pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<UserProfile, ApiError> {
        let user = UserRepository::find_by_id(pool, user_id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Ok(UserProfile {
            id: user.id.to_string(),
            email: user.email,
            display_name: user.display_name,
            created_at: user.created_at,
        })
    }

    fn issue_tokens(jwt_service: &JwtService, user_id: Uuid) -> Result<AuthTokens, ApiError> {
        Ok(AuthTokens {
            access_token: jwt_service
                .issue(user_id, TokenKind::Access)
                .map_err(ApiError::Internal)?,
            refresh_token: jwt_service
                .issue(user_id, TokenKind::Refresh)
                .map_err(ApiError::Internal)?,
            token_type: "Bearer".to_string(),
            expires_in: jwt_service.access_token_expiry_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_pair_verifies_by_kind() {
        let jwt = JwtService::new("unit-test-secret-unit-test-secret", 60, 600);
        let user_id = Uuid::new_v4();
        let tokens = UserService::issue_tokens(&jwt, user_id).unwrap();

        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.expires_in, 60);
        assert_eq!(
            jwt.verify(&tokens.access_token, TokenKind::Access).unwrap().sub,
            user_id
        );
        assert!(jwt.verify(&tokens.refresh_token, TokenKind::Access).is_err());
    }
}
