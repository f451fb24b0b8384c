pub mod comment;
pub mod feed;
pub mod like;
pub mod new;

use axum::{
    debug_handler,
    extract::{Path, State},
    routing::{delete, get, patch, post},
    Json, Router,
};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{db, session, ApiError, AppResult, AppState};

use self::feed::PostView;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(feed::get_feed).post(new::new_post))
        .route("/{id}/posts", get(feed::get_user_posts))
        .route("/{id}/like", patch(like::like_post))
        .route("/{id}/comment", post(comment::post_comment))
        .route("/{id}", delete(delete_post_handler))
}

/// Soft delete: the record stays put, flagged invisible to every read path.
/// Only the author may do it.
pub async fn delete_post(pool: &SqlitePool, post_id: &str, caller: &str) -> AppResult<Vec<PostView>> {
    let Some(post) = db::load_post(pool, post_id).await? else {
        return Err(ApiError::NotFound("Post does not exist".to_owned()));
    };
    if post.author != caller {
        return Err(ApiError::Unauthorized("Only the author can delete a post".to_owned()));
    }

    sqlx::query("UPDATE posts SET is_deleted=1 WHERE id=?")
        .bind(post_id)
        .execute(pool)
        .await?;

    feed::visible_posts(pool).await
}

#[debug_handler]
async fn delete_post_handler(
    Path(post_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Vec<PostView>>> {
    let caller = session::require_user(&session).await?;
    Ok(Json(delete_post(&db_pool, &post_id.to_string(), &caller).await?))
}
