use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{db, notify, session, ApiError, AppResult};

use super::feed::{posts_by_authors, PostView};

/// Toggles the caller's like on a post. Only the absent -> present edge
/// notifies the author; unliking is silent.
pub async fn toggle_like(pool: &SqlitePool, post_id: &str, user_id: &str) -> AppResult<Vec<PostView>> {
    let Some(post) = db::load_post(pool, post_id).await? else {
        return Err(ApiError::NotFound("Post does not exist".to_owned()));
    };

    let mut likes = post.likes();
    if likes.remove(user_id).is_none() {
        likes.insert(user_id.to_owned(), true);
        notify::push(pool, notify::Kind::Like, &post.author, user_id, Some(&post.id), "Liked your post")
            .await?;
    }

    sqlx::query("UPDATE posts SET likes=? WHERE id=?")
        .bind(serde_json::to_string(&likes)?)
        .bind(post_id)
        .execute(pool)
        .await?;

    // The whole author timeline goes back, not just the touched post.
    posts_by_authors(pool, &[post.author]).await
}

#[debug_handler]
pub(crate) async fn like_post(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Vec<PostView>>> {
    let user_id = session::require_user(&session).await?;
    Ok(Json(toggle_like(&db_pool, &id.to_string(), &user_id).await?))
}
