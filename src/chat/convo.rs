use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, SqlitePool};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{db, session, AppResult};

#[derive(Debug, Clone, FromRow)]
pub struct ConversationRow {
    pub id: String,
    pub member_a: String,
    pub member_b: String,
    pub created_at: String,
}

impl ConversationRow {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.member_a == user_id || self.member_b == user_id
    }

    pub fn view(&self) -> ConversationView {
        ConversationView {
            id: self.id.clone(),
            members: [self.member_a.clone(), self.member_b.clone()],
            created_at: self.created_at.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: String,
    pub members: [String; 2],
    pub created_at: String,
}

pub async fn load(pool: &SqlitePool, id: &str) -> AppResult<Option<ConversationRow>> {
    Ok(sqlx::query_as("SELECT * FROM conversations WHERE id=?")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

/// One conversation per unordered pair. Held up only by this pre-check:
/// two racing creates for a fresh pair can still slip through and leave a
/// duplicate behind.
pub async fn get_or_create(pool: &SqlitePool, a: &str, b: &str) -> AppResult<ConversationView> {
    let existing: Option<ConversationRow> = sqlx::query_as(
        "SELECT * FROM conversations WHERE (member_a=? AND member_b=?) OR (member_a=? AND member_b=?)",
    )
    .bind(a)
    .bind(b)
    .bind(b)
    .bind(a)
    .fetch_optional(pool)
    .await?;

    if let Some(convo) = existing {
        return Ok(convo.view());
    }

    let id = Uuid::now_v7();
    let created_at = db::now_iso();
    sqlx::query("INSERT INTO conversations (id,member_a,member_b,created_at) VALUES (?,?,?,?)")
        .bind(id.to_string())
        .bind(a)
        .bind(b)
        .bind(&created_at)
        .execute(pool)
        .await?;

    Ok(ConversationView {
        id: id.to_string(),
        members: [a.to_owned(), b.to_owned()],
        created_at,
    })
}

pub async fn for_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<ConversationView>> {
    let rows: Vec<ConversationRow> =
        sqlx::query_as("SELECT * FROM conversations WHERE member_a=? OR member_b=?")
            .bind(user_id)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
    Ok(rows.iter().map(ConversationRow::view).collect())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewConversationBody {
    friend_id: Uuid,
}

#[debug_handler]
pub(crate) async fn create_conversation(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(NewConversationBody { friend_id }): Json<NewConversationBody>,
) -> AppResult<Json<ConversationView>> {
    let user_id = session::require_user(&session).await?;
    Ok(Json(get_or_create(&db_pool, &user_id, &friend_id.to_string()).await?))
}

#[debug_handler]
pub(crate) async fn get_conversations(
    Path(user_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Vec<ConversationView>>> {
    session::require_user(&session).await?;
    Ok(Json(for_user(&db_pool, &user_id.to_string()).await?))
}
