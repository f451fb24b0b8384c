use std::collections::{BTreeMap, BTreeSet, HashMap};

use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    db::{self, PostRow, ProfileCard},
    session, ApiError, AppResult,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub author: ProfileCard,
    pub content: Option<String>,
    pub image: Option<String>,
    pub likes: BTreeMap<String, bool>,
    pub comments: Vec<CommentView>,
    pub is_deleted: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub text: String,
    pub author: ProfileCard,
    pub created_at: String,
    pub is_deleted: bool,
}

fn card_for(by_id: &HashMap<String, ProfileCard>, id: &str) -> ProfileCard {
    by_id.get(id).cloned().unwrap_or(ProfileCard {
        id: id.to_owned(),
        username: String::new(),
        name: String::new(),
        picture: String::new(),
    })
}

/// Expands post and comment author ids into profile projections with a
/// single lookup for the whole batch.
async fn hydrate_posts(pool: &SqlitePool, rows: Vec<PostRow>) -> AppResult<Vec<PostView>> {
    let mut wanted = BTreeSet::new();
    for row in &rows {
        wanted.insert(row.author.clone());
        for comment in row.comments() {
            wanted.insert(comment.author);
        }
    }
    let wanted: Vec<String> = wanted.into_iter().collect();

    let cards = db::hydrate_profiles(pool, &wanted).await?;
    let by_id: HashMap<String, ProfileCard> =
        cards.into_iter().map(|c| (c.id.clone(), c)).collect();

    Ok(rows
        .into_iter()
        .map(|row| {
            let comments = row
                .comments()
                .into_iter()
                .map(|c| CommentView {
                    author: card_for(&by_id, &c.author),
                    text: c.text,
                    created_at: c.created_at,
                    is_deleted: c.is_deleted,
                })
                .collect();
            PostView {
                author: card_for(&by_id, &row.author),
                likes: row.likes(),
                comments,
                id: row.id,
                content: row.content,
                image: row.image,
                is_deleted: row.is_deleted,
                created_at: row.created_at,
            }
        })
        .collect())
}

/// Non-deleted posts by the given authors, newest first. Descending creation
/// time is a contract here, not an accident of store order.
pub async fn posts_by_authors(pool: &SqlitePool, authors: &[String]) -> AppResult<Vec<PostView>> {
    if authors.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM posts WHERE is_deleted = 0 AND author IN (");
    let mut sep = qb.separated(", ");
    for author in authors {
        sep.push_bind(author);
    }
    qb.push(") ORDER BY created_at DESC");

    let rows: Vec<PostRow> = qb.build_query_as().fetch_all(pool).await?;
    hydrate_posts(pool, rows).await
}

/// Home feed: everything the user follows, plus the user's own posts.
pub async fn feed(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<PostView>> {
    let Some(user) = db::load_user(pool, user_id).await? else {
        return Err(ApiError::NotFound("User does not exist".to_owned()));
    };

    let mut authors = user.followings();
    authors.push(user.id);
    posts_by_authors(pool, &authors).await
}

pub async fn user_posts(pool: &SqlitePool, author: &str) -> AppResult<Vec<PostView>> {
    posts_by_authors(pool, &[author.to_owned()]).await
}

/// Every non-deleted post, newest first.
pub async fn visible_posts(pool: &SqlitePool) -> AppResult<Vec<PostView>> {
    let rows: Vec<PostRow> =
        sqlx::query_as("SELECT * FROM posts WHERE is_deleted = 0 ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
    hydrate_posts(pool, rows).await
}

pub async fn hydrated_post(pool: &SqlitePool, post_id: &str) -> AppResult<PostView> {
    let Some(row) = db::load_post(pool, post_id).await? else {
        return Err(ApiError::NotFound("Post does not exist".to_owned()));
    };
    if row.is_deleted {
        return Err(ApiError::NotFound("Post does not exist".to_owned()));
    }

    let mut views = hydrate_posts(pool, vec![row]).await?;
    views.pop().ok_or_else(|| ApiError::NotFound("Post does not exist".to_owned()))
}

#[debug_handler]
pub(crate) async fn get_feed(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Vec<PostView>>> {
    let user_id = session::require_user(&session).await?;
    Ok(Json(feed(&db_pool, &user_id).await?))
}

#[debug_handler]
pub(crate) async fn get_user_posts(
    Path(user_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Vec<PostView>>> {
    session::require_user(&session).await?;
    Ok(Json(user_posts(&db_pool, &user_id.to_string()).await?))
}
