use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, SqlitePool};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{db, session, ApiError, AppResult};

use super::convo;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    pub created_at: String,
}

/// Appends to a conversation the sender actually belongs to; anyone else is
/// turned away before the write.
pub async fn post_message(
    pool: &SqlitePool,
    conversation_id: &str,
    sender_id: &str,
    text: &str,
) -> AppResult<MessageRow> {
    let Some(convo) = convo::load(pool, conversation_id).await? else {
        return Err(ApiError::NotFound("Conversation does not exist".to_owned()));
    };
    if !convo.has_member(sender_id) {
        return Err(ApiError::Unauthorized("Sender is not a conversation member".to_owned()));
    }

    let message = MessageRow {
        id: Uuid::now_v7().to_string(),
        conversation_id: conversation_id.to_owned(),
        sender_id: sender_id.to_owned(),
        text: text.to_owned(),
        created_at: db::now_iso(),
    };

    sqlx::query("INSERT INTO messages (id,conversation_id,sender_id,text,created_at) VALUES (?,?,?,?,?)")
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.sender_id)
        .bind(&message.text)
        .bind(&message.created_at)
        .execute(pool)
        .await?;

    Ok(message)
}

/// Conversation transcript, oldest first.
pub async fn for_conversation(pool: &SqlitePool, conversation_id: &str) -> AppResult<Vec<MessageRow>> {
    Ok(
        sqlx::query_as("SELECT * FROM messages WHERE conversation_id=? ORDER BY created_at ASC")
            .bind(conversation_id)
            .fetch_all(pool)
            .await?,
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewMessageBody {
    conversation_id: Uuid,
    text: String,
}

#[debug_handler]
pub(crate) async fn create_message(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(NewMessageBody { conversation_id, text }): Json<NewMessageBody>,
) -> AppResult<Json<MessageRow>> {
    let sender_id = session::require_user(&session).await?;
    Ok(Json(post_message(&db_pool, &conversation_id.to_string(), &sender_id, &text).await?))
}

#[debug_handler]
pub(crate) async fn get_messages(
    Path(conversation_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Vec<MessageRow>>> {
    session::require_user(&session).await?;
    Ok(Json(for_conversation(&db_pool, &conversation_id.to_string()).await?))
}
