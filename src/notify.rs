//! Append-only notification log. Records are never mutated after insert and
//! carry no read/unread state; actor and related post are joined in at read
//! time.

use serde::Serialize;
use sqlx::{prelude::FromRow, SqlitePool};
use uuid::Uuid;

use crate::{db, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Follow,
    Like,
    Comment,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Follow => "follow",
            Kind::Like => "like",
            Kind::Comment => "comment",
        }
    }
}

pub async fn push<'e, E>(
    ex: E,
    kind: Kind,
    recipient: &str,
    actor: &str,
    post_id: Option<&str>,
    content: &str,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO notifications (id,kind,user_id,friend_id,post_id,content,created_at) VALUES (?,?,?,?,?,?,?)",
    )
    .bind(Uuid::now_v7().to_string())
    .bind(kind.as_str())
    .bind(recipient)
    .bind(actor)
    .bind(post_id)
    .bind(content)
    .bind(db::now_iso())
    .execute(ex)
    .await?;
    Ok(())
}

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: String,
    kind: String,
    friend_id: String,
    post_id: Option<String>,
    content: String,
    created_at: String,
    friend_username: Option<String>,
    friend_picture: Option<String>,
    post_image: Option<String>,
    post_content: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: String,
    pub kind: String,
    pub friend: ActorRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<PostRef>,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorRef {
    pub id: String,
    pub username: String,
    pub picture: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRef {
    pub id: String,
    pub image: Option<String>,
    pub content: Option<String>,
}

/// Recipient's notifications, newest first, actor and related post hydrated.
pub async fn for_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<NotificationView>> {
    let rows: Vec<NotificationRow> = sqlx::query_as(
        "SELECT n.id, n.kind, n.friend_id, n.post_id, n.content, n.created_at,
                u.username AS friend_username, u.picture AS friend_picture,
                p.image AS post_image, p.content AS post_content
         FROM notifications n
         LEFT JOIN users u ON u.id = n.friend_id
         LEFT JOIN posts p ON p.id = n.post_id
         WHERE n.user_id = ?
         ORDER BY n.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| NotificationView {
            id: row.id,
            kind: row.kind,
            friend: ActorRef {
                id: row.friend_id,
                username: row.friend_username.unwrap_or_default(),
                picture: row.friend_picture.unwrap_or_default(),
            },
            post: row.post_id.map(|id| PostRef {
                id,
                image: row.post_image,
                content: row.post_content,
            }),
            content: row.content,
            created_at: row.created_at,
        })
        .collect())
}
