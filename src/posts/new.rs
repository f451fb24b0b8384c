use axum::{debug_handler, extract::State, http::StatusCode, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{db, services::MediaStore, session, AppResult, AppState};

use super::feed::{hydrated_post, PostView};

pub async fn create_post(
    pool: &SqlitePool,
    media: &MediaStore,
    author: &str,
    content: Option<String>,
    picture: Option<String>,
) -> AppResult<PostView> {
    let image = match picture {
        Some(data) => Some(media.put("posts", data.into_bytes()).await?),
        None => None,
    };

    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO posts (id,author,content,image,likes,comments,is_deleted,created_at)
         VALUES (?,?,?,?,'{}','[]',0,?)",
    )
    .bind(id.to_string())
    .bind(author)
    .bind(&content)
    .bind(&image)
    .bind(db::now_iso())
    .execute(pool)
    .await?;

    hydrated_post(pool, &id.to_string()).await
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub(crate) struct NewPostBody {
    description: Option<String>,
    picture: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn new_post(
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    session: Session,
    Json(NewPostBody { description, picture }): Json<NewPostBody>,
) -> AppResult<(StatusCode, Json<PostView>)> {
    let author = session::require_user(&session).await?;
    let view = create_post(&db_pool, &media, &author, description, picture).await?;
    Ok((StatusCode::CREATED, Json(view)))
}
