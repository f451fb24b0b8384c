use std::sync::LazyLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    routing::{get, post, put},
    Router,
};
use regex::Regex;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{db, ApiError, AppResult, AppState};

mod clients;
mod google;
mod login;
mod logout;
mod register;
mod reset;
mod update;

pub use clients::Clients;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register::register))
        .route("/verify-email/{id}", post(register::verify_email))
        .route("/login", post(login::login))
        .route("/forgot-password", post(reset::forgot_password))
        .route("/reset-password", put(reset::reset_password))
        .route("/google-login", get(google::google_login))
        .route("/google-callback", get(google::google_callback))
        .route("/update", put(update::update_picture))
        .route("/logout", get(logout::logout))
}

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9_.]+$").unwrap());
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

pub(crate) fn validate_username(username: &str) -> Result<(), &'static str> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err("Username must contain only lowercase letters, underscores, dots, and numbers")
    }
}

pub(crate) fn validate_email(email: &str) -> Result<(), &'static str> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err("Invalid email address")
    }
}

pub(crate) fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() >= 8 {
        Ok(())
    } else {
        Err("Password must be at least 8 characters long")
    }
}

/// Argon2 for passwords and for the OTP/reset tokens that go out by mail.
pub(crate) fn hash_secret(secret: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("hashing failed: {e}"))?;
    Ok(hash.to_string())
}

pub(crate) fn verify_secret(secret: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(secret.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// First sign-in through Google lands here; the account starts verified and
/// without a password.
pub(crate) async fn create_oauth_user(
    db_pool: &SqlitePool,
    email: &str,
    name: &str,
    picture: &str,
) -> AppResult<String> {
    let id = Uuid::now_v7();
    let username = "user".to_owned() + &id.simple().to_string();

    sqlx::query(
        "INSERT INTO users (id,username,name,email,password,picture,bio,followers,followings,verified,created_at)
         VALUES (?,?,?,?,NULL,?,'','[]','[]',1,?)",
    )
    .bind(id.to_string())
    .bind(username)
    .bind(name)
    .bind(email)
    .bind(picture)
    .bind(db::now_iso())
    .execute(db_pool)
    .await?;

    Ok(id.to_string())
}

pub(crate) async fn find_by_login(
    db_pool: &SqlitePool,
    email_or_username: &str,
) -> AppResult<Option<db::UserRow>> {
    Ok(
        sqlx::query_as::<_, db::UserRow>("SELECT * FROM users WHERE email=? OR username=?")
            .bind(email_or_username)
            .bind(email_or_username)
            .fetch_optional(db_pool)
            .await?,
    )
}

pub(crate) fn unique_violation(err: sqlx::Error, message: &str) -> ApiError {
    match err.as_database_error() {
        Some(dbe) if dbe.is_unique_violation() => ApiError::Conflict(message.to_owned()),
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_charset() {
        assert!(validate_username("ada.lovelace_1").is_ok());
        assert!(validate_username("Ada").is_err());
        assert!(validate_username("ada lovelace").is_err());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn password_length() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
    }

    #[test]
    fn hash_verify_roundtrip() {
        let hash = hash_secret("hunter22").unwrap();
        assert!(verify_secret("hunter22", &hash));
        assert!(!verify_secret("hunter23", &hash));
        assert!(!verify_secret("hunter22", "not a phc string"));
    }
}
