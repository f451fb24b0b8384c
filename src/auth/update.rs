use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{db, services::MediaStore, session, ApiError, AppResult, AppState};

#[derive(Deserialize)]
pub(crate) struct UpdatePictureBody {
    picture: String,
}

/// Replaces the signed-in user's profile picture with a freshly stored copy.
#[debug_handler(state = AppState)]
pub(crate) async fn update_picture(
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    session: Session,
    Json(UpdatePictureBody { picture }): Json<UpdatePictureBody>,
) -> AppResult<Json<Value>> {
    let user_id = session::require_user(&session).await?;

    let url = media.put("profile", picture.into_bytes()).await?;
    sqlx::query("UPDATE users SET picture=? WHERE id=?")
        .bind(&url)
        .bind(&user_id)
        .execute(&db_pool)
        .await?;

    let Some(user) = db::load_user(&db_pool, &user_id).await? else {
        return Err(ApiError::NotFound("User not found".to_owned()));
    };
    Ok(Json(json!({ "user": user.view() })))
}
