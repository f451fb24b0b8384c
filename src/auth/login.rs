use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;

use crate::{session, ApiError, AppResult};

use super::{find_by_login, verify_secret};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginBody {
    email_or_username: String,
    password: String,
}

#[debug_handler]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(LoginBody { email_or_username, password }): Json<LoginBody>,
) -> AppResult<Json<Value>> {
    let Some(user) = find_by_login(&db_pool, &email_or_username).await? else {
        return Err(ApiError::NotFound("User does not exist".to_owned()));
    };

    // OAuth-only accounts have no password to check against.
    let valid = user
        .password
        .as_deref()
        .is_some_and(|hash| verify_secret(&password, hash));
    if !valid {
        return Err(ApiError::Unauthorized("Invalid Password".to_owned()));
    }

    session::sign_in(&session, &user.id).await?;
    info!("welcome @{}", user.username);

    Ok(Json(json!({ "user": user.view() })))
}
