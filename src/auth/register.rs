use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::{
    db,
    services::{Mailer, MediaStore},
    session, ApiError, AppResult, AppState,
};

use super::{hash_secret, validate_email, validate_password, validate_username, verify_secret};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterBody {
    username: String,
    email: String,
    password: String,
    picture: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    State(mailer): State<Mailer>,
    State(media): State<MediaStore>,
    Json(RegisterBody { username, email, password, picture }): Json<RegisterBody>,
) -> AppResult<Json<Value>> {
    let errors: Vec<&str> = [
        validate_username(&username),
        validate_email(&email),
        validate_password(&password),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors.join("; ")));
    }

    let same_username: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE username=?")
        .bind(&username)
        .fetch_optional(&db_pool)
        .await?;
    if same_username.is_some() {
        return Err(ApiError::Conflict("User Name Already Exists!".to_owned()));
    }

    let same_email: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email=?")
        .bind(&email)
        .fetch_optional(&db_pool)
        .await?;
    if same_email.is_some() {
        return Err(ApiError::Conflict("User Already Exists!".to_owned()));
    }

    let picture_url = match picture {
        Some(data) => media.put("profile", data.into_bytes()).await?,
        None => String::new(),
    };

    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO users (id,username,name,email,password,picture,bio,followers,followings,verified,created_at)
         VALUES (?,?,'',?,?,?,'','[]','[]',0,?)",
    )
    .bind(id.to_string())
    .bind(&username)
    .bind(&email)
    .bind(hash_secret(&password)?)
    .bind(&picture_url)
    .bind(db::now_iso())
    .execute(&db_pool)
    .await?;

    let otp = rand::rng().random_range(100_000..1_000_000).to_string();
    sqlx::query("INSERT INTO verification_tokens (user_id,token_hash,created_at) VALUES (?,?,?)")
        .bind(id.to_string())
        .bind(hash_secret(&otp)?)
        .bind(db::now_iso())
        .execute(&db_pool)
        .await?;

    mailer
        .send(&email, "Verify your email using OTP", &format!("Your OTP code {otp}"))
        .await?;

    info!("registered @{username}");

    Ok(Json(json!({
        "status": "pending",
        "message": "Please check your email",
        "user": id.to_string(),
    })))
}

#[derive(Deserialize)]
pub(crate) struct VerifyBody {
    otp: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn verify_email(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    State(mailer): State<Mailer>,
    session: Session,
    Json(VerifyBody { otp }): Json<VerifyBody>,
) -> AppResult<Json<Value>> {
    let id = id.to_string();

    let Some(user) = db::load_user(&db_pool, &id).await? else {
        return Err(ApiError::NotFound("User not found".to_owned()));
    };
    if user.verified {
        return Err(ApiError::Validation("User already verified".to_owned()));
    }

    let token: Option<(String,)> =
        sqlx::query_as("SELECT token_hash FROM verification_tokens WHERE user_id=?")
            .bind(&id)
            .fetch_optional(&db_pool)
            .await?;
    let Some((token_hash,)) = token else {
        return Err(ApiError::NotFound("Sorry token not found".to_owned()));
    };
    if !verify_secret(&otp, &token_hash) {
        return Err(ApiError::Validation("Token is not valid".to_owned()));
    }

    sqlx::query("UPDATE users SET verified=1 WHERE id=?")
        .bind(&id)
        .execute(&db_pool)
        .await?;
    sqlx::query("DELETE FROM verification_tokens WHERE user_id=?")
        .bind(&id)
        .execute(&db_pool)
        .await?;

    session::sign_in(&session, &id).await?;

    mailer
        .send(&user.email, "Successfully verified your email", "Now you can sign in")
        .await?;

    let mut user = user;
    user.verified = true;
    Ok(Json(json!({ "user": user.view() })))
}
