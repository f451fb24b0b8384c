use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Query, State},
    Json,
};
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{config::Config, db, services::Mailer, ApiError, AppResult, AppState};

use super::{hash_secret, verify_secret};

#[derive(Deserialize)]
pub(crate) struct ForgotBody {
    email: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn forgot_password(
    State(db_pool): State<SqlitePool>,
    State(mailer): State<Mailer>,
    State(config): State<Arc<Config>>,
    Json(ForgotBody { email }): Json<ForgotBody>,
) -> AppResult<Json<Value>> {
    let user: Option<db::UserRow> = sqlx::query_as("SELECT * FROM users WHERE email=?")
        .bind(&email)
        .fetch_optional(&db_pool)
        .await?;
    let Some(user) = user else {
        return Err(ApiError::NotFound("User not found".to_owned()));
    };

    // One outstanding token per user; a second request is refused until the
    // first is consumed.
    let pending: Option<(String,)> =
        sqlx::query_as("SELECT token_hash FROM reset_tokens WHERE user_id=?")
            .bind(&user.id)
            .fetch_optional(&db_pool)
            .await?;
    if pending.is_some() {
        return Err(ApiError::Validation("After one hour you can try!".to_owned()));
    }

    let raw: [u8; 20] = rand::rng().random();
    let token: String = raw.iter().map(|b| format!("{b:02x}")).collect();

    sqlx::query("INSERT INTO reset_tokens (user_id,token_hash,created_at) VALUES (?,?,?)")
        .bind(&user.id)
        .bind(hash_secret(&token)?)
        .bind(db::now_iso())
        .execute(&db_pool)
        .await?;

    let link = format!("{}/reset-password/?token={token}&id={}", config.frontend_url, user.id);
    mailer.send(&user.email, "Reset Token", &link).await?;

    Ok(Json(json!({ "message": "Check your email to reset password" })))
}

#[derive(Deserialize)]
pub(crate) struct ResetQuery {
    token: Option<String>,
    id: Option<Uuid>,
}

#[derive(Deserialize)]
pub(crate) struct ResetBody {
    password: String,
}

fn validate_reset_password(password: &str) -> Result<(), Vec<&'static str>> {
    let mut errors = Vec::new();
    if password.len() < 8 {
        errors.push("Password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| "!@#$%^&*(),.?\":{}|<>".contains(c)) {
        errors.push("Password must contain at least one symbol");
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[debug_handler(state = AppState)]
pub(crate) async fn reset_password(
    Query(ResetQuery { token, id }): Query<ResetQuery>,
    State(db_pool): State<SqlitePool>,
    State(mailer): State<Mailer>,
    Json(ResetBody { password }): Json<ResetBody>,
) -> AppResult<Json<Value>> {
    let (Some(token), Some(id)) = (token, id) else {
        return Err(ApiError::Validation("Invalid request".to_owned()));
    };
    let id = id.to_string();

    let Some(user) = db::load_user(&db_pool, &id).await? else {
        return Err(ApiError::NotFound("User not found".to_owned()));
    };

    let stored: Option<(String,)> =
        sqlx::query_as("SELECT token_hash FROM reset_tokens WHERE user_id=?")
            .bind(&id)
            .fetch_optional(&db_pool)
            .await?;
    let Some((token_hash,)) = stored else {
        return Err(ApiError::NotFound("Reset token is not found".to_owned()));
    };
    if !verify_secret(&token, &token_hash) {
        return Err(ApiError::Validation("Token is not valid".to_owned()));
    }

    if let Err(errors) = validate_reset_password(&password) {
        return Err(ApiError::Validation(errors.join("; ")));
    }

    sqlx::query("UPDATE users SET password=? WHERE id=?")
        .bind(hash_secret(&password)?)
        .bind(&id)
        .execute(&db_pool)
        .await?;
    sqlx::query("DELETE FROM reset_tokens WHERE user_id=?")
        .bind(&id)
        .execute(&db_pool)
        .await?;

    mailer
        .send(&user.email, "Your password reset successfully", "Now you can sign in with your new password")
        .await?;

    Ok(Json(json!({ "message": "Password has been reset" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_password_rules() {
        assert!(validate_reset_password("Str0ng!pass").is_ok());
        assert!(validate_reset_password("weak").is_err());
        assert!(validate_reset_password("nouppercase1!").is_err());
        assert!(validate_reset_password("NoSymbolHere1").is_err());
    }
}
