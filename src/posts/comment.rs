use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    db::{self, StoredComment},
    notify, session, ApiError, AppResult,
};

use super::feed::{hydrated_post, PostView};

/// Prepends a comment so the stored array reads most-recent-first, and always
/// notifies the post's author.
pub async fn add_comment(
    pool: &SqlitePool,
    post_id: &str,
    user_id: &str,
    text: &str,
) -> AppResult<PostView> {
    let Some(post) = db::load_post(pool, post_id).await? else {
        return Err(ApiError::NotFound("Post does not exist".to_owned()));
    };

    let mut comments = post.comments();
    comments.insert(
        0,
        StoredComment {
            text: text.to_owned(),
            author: user_id.to_owned(),
            created_at: db::now_iso(),
            is_deleted: false,
        },
    );

    notify::push(
        pool,
        notify::Kind::Comment,
        &post.author,
        user_id,
        Some(&post.id),
        "commented on your post",
    )
    .await?;

    sqlx::query("UPDATE posts SET comments=? WHERE id=?")
        .bind(serde_json::to_string(&comments)?)
        .bind(post_id)
        .execute(pool)
        .await?;

    hydrated_post(pool, post_id).await
}

#[derive(Deserialize)]
pub(crate) struct CommentBody {
    comment: String,
}

#[debug_handler]
pub(crate) async fn post_comment(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(CommentBody { comment }): Json<CommentBody>,
) -> AppResult<Json<PostView>> {
    let user_id = session::require_user(&session).await?;
    Ok(Json(add_comment(&db_pool, &id.to_string(), &user_id, &comment).await?))
}
