//! Authentication manager implementation.

use super::{
    errors::{AuthError, AuthResult},
    models::{AccessTokenClaims, LoginRequest, RegisterRequest, Role, SessionTokens, User, UserId},
};
use crate::db::{text_column, unique_violation};
use crate::validation::FieldErrors;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::sync::Arc;
use uuid::Uuid;

/// Columns selected whenever a [`User`] is loaded.
pub(crate) const USER_COLUMNS: &str =
    "id, email, username, role, first_name, last_name, phone, is_active, created_at, last_login";

pub(crate) fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        role: text_column(row, "role")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone: row.try_get("phone")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        last_login: row.try_get("last_login")?,
    })
}

/// Authentication manager
#[derive(Clone)]
pub struct AuthManager {
    pool: Arc<PgPool>,
    pepper: String,
    jwt_secret: String,
    access_token_duration: Duration,
    refresh_token_duration: Duration,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `pepper` - Server-side pepper for password hashing
    /// * `jwt_secret` - Secret key for JWT signing
    pub fn new(pool: Arc<PgPool>, pepper: String, jwt_secret: String) -> Self {
        Self {
            pool,
            pepper,
            jwt_secret,
            access_token_duration: Duration::minutes(15),
            refresh_token_duration: Duration::days(7),
        }
    }

    /// Override the access and refresh token lifetimes.
    pub fn with_token_durations(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_token_duration = access;
        self.refresh_token_duration = refresh;
        self
    }

    /// Self-service account creation.
    ///
    /// Any role except administrator may be chosen; the role profile is
    /// created in the same transaction as the user.
    ///
    /// # Errors
    ///
    /// * `AuthError::RoleNotSelfAssignable` - administrator requested
    /// * `AuthError::Validation` - malformed or duplicate email/username, short password
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<User> {
        if request.role() == Role::Administrator {
            return Err(AuthError::RoleNotSelfAssignable(Role::Administrator));
        }
        self.create_user(request).await
    }

    /// Create an account of any role together with its role profile.
    ///
    /// This is the only code path that inserts users. The user row and the
    /// profile row are written in one transaction, so either both exist or
    /// neither does.
    pub async fn create_user(&self, request: RegisterRequest) -> AuthResult<User> {
        validate_registration(&request).into_result()?;

        let role = request.role();
        let password_hash = self.hash_password(&request.password)?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "INSERT INTO users (email, username, password_hash, role, first_name, last_name, phone)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(request.email.trim())
        .bind(request.username.trim())
        .bind(&password_hash)
        .bind(role.as_str())
        .bind(request.first_name.as_deref().unwrap_or_default())
        .bind(request.last_name.as_deref().unwrap_or_default())
        .bind(&request.phone)
        .fetch_one(&mut *tx)
        .await
        .map_err(user_conflict)?;

        let user = user_from_row(&row)?;

        match role {
            Role::Organizer => {
                sqlx::query("INSERT INTO organizers (user_id, organization_name) VALUES ($1, $2)")
                    .bind(user.id)
                    .bind(request.organization_name.as_deref().unwrap_or_default())
                    .execute(&mut *tx)
                    .await?;
            }
            other => {
                let sql = format!("INSERT INTO {} (user_id) VALUES ($1)", other.profile_table());
                sqlx::query(&sql).bind(user.id).execute(&mut *tx).await?;
            }
        }

        tx.commit().await?;

        log::info!("Created {} account {} ({})", role, user.id, user.username);
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - no account with that email
    /// * `AuthError::InvalidPassword` - incorrect password
    /// * `AuthError::AccountDisabled` - account deactivated
    pub async fn login(&self, request: LoginRequest) -> AuthResult<(User, SessionTokens)> {
        let mut errors = FieldErrors::new();
        if request.email.trim().is_empty() {
            errors.add("email", "This field is required.");
        }
        if request.password.is_empty() {
            errors.add("password", "This field is required.");
        }
        errors.into_result()?;

        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(request.email.trim())
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(AuthError::UserNotFound)?;

        let password_hash: String = row.try_get("password_hash")?;
        self.verify_password(&request.password, &password_hash)?;

        let mut user = user_from_row(&row)?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let now = Utc::now();
        sqlx::query("UPDATE users SET last_login = $1 WHERE id = $2")
            .bind(now)
            .bind(user.id)
            .execute(self.pool.as_ref())
            .await?;
        user.last_login = Some(now);

        let tokens = self.create_session(&user).await?;
        Ok((user, tokens))
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The presented token is consumed by a single `DELETE … RETURNING`, so of
    /// two concurrent refreshes with the same token only one succeeds.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidRefreshToken` - unknown or already used token
    /// * `AuthError::SessionExpired` - token past its expiry
    pub async fn refresh_token(&self, refresh_token: &str) -> AuthResult<(User, SessionTokens)> {
        let row = sqlx::query(
            "DELETE FROM sessions WHERE token_hash = $1 RETURNING user_id, expires_at",
        )
        .bind(hash_token(refresh_token))
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(AuthError::InvalidRefreshToken)?;

        let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
        if expires_at < Utc::now() {
            return Err(AuthError::SessionExpired);
        }

        let user_id: UserId = row.try_get("user_id")?;
        let user = self.get_user(user_id).await?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let tokens = self.create_session(&user).await?;
        Ok((user, tokens))
    }

    /// Invalidate a refresh token. Unknown tokens are ignored.
    pub async fn logout(&self, refresh_token: &str) -> AuthResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(hash_token(refresh_token))
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    /// Drop every refresh token of a user.
    pub async fn revoke_sessions(&self, user_id: UserId) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected())
    }

    /// Load a user by ID.
    pub async fn get_user(&self, user_id: UserId) -> AuthResult<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(user_from_row(&row)?)
    }

    /// Verify an access token
    ///
    /// # Returns
    ///
    /// * `AuthResult<AccessTokenClaims>` - Decoded claims or error
    pub fn verify_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let token_data = decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    /// Sign an access token for the given identity.
    pub fn issue_access_token(
        &self,
        user_id: UserId,
        username: &str,
        role: Role,
    ) -> AuthResult<String> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user_id,
            username: username.to_string(),
            role,
            exp: (now + self.access_token_duration).timestamp(),
            iat: now.timestamp(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?)
    }

    async fn create_session(&self, user: &User) -> AuthResult<SessionTokens> {
        let access_token = self.issue_access_token(user.id, &user.username, user.role)?;
        let refresh_token = Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(hash_token(&refresh_token))
            .bind(user.id)
            .bind(Utc::now() + self.refresh_token_duration)
            .execute(self.pool.as_ref())
            .await?;

        Ok(SessionTokens {
            access_token,
            refresh_token,
        })
    }

    /// Hash password with Argon2id + pepper
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);

        Ok(Argon2::default()
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<()> {
        let peppered = format!("{}{}", password, self.pepper);
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidPassword)?;

        Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidPassword)
    }
}

/// Refresh tokens are stored only as their SHA-256 digest.
fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn user_conflict(err: sqlx::Error) -> AuthError {
    match unique_violation(&err).as_deref() {
        Some("users_email_key") => {
            FieldErrors::single("email", "A user with this email already exists.").into()
        }
        Some("users_username_key") => {
            FieldErrors::single("username", "A user with that username already exists.").into()
        }
        _ => err.into(),
    }
}

/// Field checks for a new account.
pub fn validate_registration(request: &RegisterRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let email = request.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            if email.len() > 254 {
                errors.add("email", "Ensure this field has no more than 254 characters.");
            }
        }
        _ => errors.add("email", "Enter a valid email address."),
    }

    let username = request.username.trim();
    let len = username.chars().count();
    if !(3..=150).contains(&len) {
        errors.add("username", "Username must be 3-150 characters.");
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "_.-@+".contains(c))
    {
        errors.add(
            "username",
            "Username may only contain letters, digits and @/./+/-/_ characters.",
        );
    }

    if request.password.chars().count() < 8 {
        errors.add("password", "Password must be at least 8 characters.");
    }

    if let Some(name) = &request.organization_name {
        if name.chars().count() > 100 {
            errors.add(
                "organization_name",
                "Ensure this field has no more than 100 characters.",
            );
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            role: None,
            first_name: None,
            last_name: None,
            phone: None,
            organization_name: None,
        }
    }

    fn manager() -> AuthManager {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/smartsport_unit")
            .unwrap();
        AuthManager::new(
            Arc::new(pool),
            "unit_test_pepper".to_string(),
            "unit_test_secret_that_is_long_enough".to_string(),
        )
    }

    #[test]
    fn test_valid_registration_has_no_errors() {
        let errors = validate_registration(&request("ana@example.com", "ana_22", "longenough"));
        assert!(errors.is_empty(), "{errors}");
    }

    #[test]
    fn test_email_without_at_sign_is_rejected() {
        let errors = validate_registration(&request("ana.example.com", "ana", "longenough"));
        assert!(errors.contains("email"));
    }

    #[test]
    fn test_short_username_and_password_are_rejected() {
        let errors = validate_registration(&request("a@b.c", "ab", "short"));
        assert!(errors.contains("username"));
        assert!(errors.contains("password"));
    }

    #[test]
    fn test_username_charset() {
        let errors = validate_registration(&request("a@b.c", "bad name!", "longenough"));
        assert!(errors.contains("username"));
    }

    #[tokio::test]
    async fn test_access_token_roundtrip_keeps_role() {
        let auth = manager();
        let token = auth.issue_access_token(42, "ref", Role::Referee).unwrap();
        let claims = auth.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::Referee);
        assert_eq!(claims.actor().role, Role::Referee);
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let auth = manager();
        let other = AuthManager::new(
            Arc::new(
                sqlx::postgres::PgPoolOptions::new()
                    .connect_lazy("postgres://localhost/smartsport_unit")
                    .unwrap(),
            ),
            "unit_test_pepper".to_string(),
            "a_completely_different_signing_secret".to_string(),
        );
        let token = other.issue_access_token(1, "x", Role::Player).unwrap();
        assert!(matches!(
            auth.verify_access_token(&token),
            Err(AuthError::JwtError(_))
        ));
    }

    #[tokio::test]
    async fn test_password_hash_verifies_with_same_pepper_only() {
        let auth = manager();
        let hash = auth.hash_password("CorrectHorse9").unwrap();
        assert!(auth.verify_password("CorrectHorse9", &hash).is_ok());
        assert!(matches!(
            auth.verify_password("WrongHorse9", &hash),
            Err(AuthError::InvalidPassword)
        ));
    }

    #[tokio::test]
    async fn test_self_registration_refuses_administrator_before_touching_database() {
        let auth = manager();
        let mut req = request("root@example.com", "root", "longenough");
        req.role = Some(Role::Administrator);
        assert!(matches!(
            auth.register(req).await,
            Err(AuthError::RoleNotSelfAssignable(Role::Administrator))
        ));
    }

    #[tokio::test]
    async fn test_invalid_registration_fails_before_touching_database() {
        let auth = manager();
        let result = auth.register(request("nope", "x", "y")).await;
        match result {
            Err(AuthError::Validation(errors)) => {
                assert!(errors.contains("email"));
                assert!(errors.contains("username"));
                assert!(errors.contains("password"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_refresh_tokens_are_stored_hashed() {
        let digest = hash_token("abc");
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, "abc");
        assert_eq!(digest, hash_token("abc"));
    }

    #[test]
    fn test_database_errors_are_sanitized() {
        let err = AuthError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.client_message(), "Internal server error");
    }
}
