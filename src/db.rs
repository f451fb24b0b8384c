use std::collections::{BTreeMap, HashMap};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::AppResult;

/// Fixed-width RFC 3339 so TEXT comparison sorts chronologically.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL UNIQUE,
    password TEXT,
    picture TEXT NOT NULL DEFAULT '',
    bio TEXT NOT NULL DEFAULT '',
    followers TEXT NOT NULL DEFAULT '[]',
    followings TEXT NOT NULL DEFAULT '[]',
    verified INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    author TEXT NOT NULL,
    content TEXT,
    image TEXT,
    likes TEXT NOT NULL DEFAULT '{}',
    comments TEXT NOT NULL DEFAULT '[]',
    is_deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    user_id TEXT NOT NULL,
    friend_id TEXT NOT NULL,
    post_id TEXT,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    member_a TEXT NOT NULL,
    member_b TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    sender_id TEXT NOT NULL,
    text TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS verification_tokens (
    user_id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS reset_tokens (
    user_id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);
";

pub async fn init(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

/// A user record. The follow graph is denormalized onto both sides as JSON
/// arrays of user ids; membership is checked before every append, nothing
/// structural prevents duplicates.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub picture: String,
    pub bio: String,
    pub followers: String,
    pub followings: String,
    pub verified: bool,
    pub created_at: String,
}

impl UserRow {
    pub fn followers(&self) -> Vec<String> {
        serde_json::from_str(&self.followers).unwrap_or_default()
    }

    pub fn followings(&self) -> Vec<String> {
        serde_json::from_str(&self.followings).unwrap_or_default()
    }

    /// Response projection, password stripped.
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            username: self.username.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            picture: self.picture.clone(),
            bio: self.bio.clone(),
            followers: self.followers(),
            followings: self.followings(),
            verified: self.verified,
            created_at: self.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub picture: String,
    pub bio: String,
    pub followers: Vec<String>,
    pub followings: Vec<String>,
    pub verified: bool,
    pub created_at: String,
}

pub async fn load_user<'e, E>(ex: E, id: &str) -> Result<Option<UserRow>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id=?")
        .bind(id)
        .fetch_optional(ex)
        .await
}

#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: String,
    pub author: String,
    pub content: Option<String>,
    pub image: Option<String>,
    pub likes: String,
    pub comments: String,
    pub is_deleted: bool,
    pub created_at: String,
}

/// Comment as embedded in the post record. Prepended on write so the array
/// reads most-recent-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredComment {
    pub text: String,
    pub author: String,
    pub created_at: String,
    pub is_deleted: bool,
}

impl PostRow {
    pub fn likes(&self) -> BTreeMap<String, bool> {
        serde_json::from_str(&self.likes).unwrap_or_default()
    }

    pub fn comments(&self) -> Vec<StoredComment> {
        serde_json::from_str(&self.comments).unwrap_or_default()
    }
}

pub async fn load_post<'e, E>(ex: E, id: &str) -> Result<Option<PostRow>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, PostRow>("SELECT * FROM posts WHERE id=?")
        .bind(id)
        .fetch_optional(ex)
        .await
}

/// Lightweight profile projection used wherever a bare user id gets hydrated
/// into a response payload.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCard {
    pub id: String,
    pub username: String,
    pub name: String,
    pub picture: String,
}

/// Hydrates a set of user ids in one query, preserving the input order.
/// Ids that resolve to nothing are skipped.
pub async fn hydrate_profiles(pool: &SqlitePool, ids: &[String]) -> AppResult<Vec<ProfileCard>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb =
        QueryBuilder::<Sqlite>::new("SELECT id, username, name, picture FROM users WHERE id IN (");
    let mut sep = qb.separated(", ");
    for id in ids {
        sep.push_bind(id);
    }
    qb.push(")");

    let cards: Vec<ProfileCard> = qb.build_query_as().fetch_all(pool).await?;
    let mut by_id: HashMap<String, ProfileCard> =
        cards.into_iter().map(|c| (c.id.clone(), c)).collect();

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_row(followers: &str, followings: &str) -> UserRow {
        UserRow {
            id: "u1".to_owned(),
            username: "ada".to_owned(),
            name: String::new(),
            email: "ada@example.com".to_owned(),
            password: None,
            picture: String::new(),
            bio: String::new(),
            followers: followers.to_owned(),
            followings: followings.to_owned(),
            verified: false,
            created_at: now_iso(),
        }
    }

    #[test]
    fn follow_arrays_parse() {
        let user = user_row(r#"["a","b"]"#, "[]");
        assert_eq!(user.followers(), vec!["a".to_owned(), "b".to_owned()]);
        assert!(user.followings().is_empty());
    }

    #[test]
    fn corrupt_follow_arrays_read_empty() {
        let user = user_row("not json", "{}");
        assert!(user.followers().is_empty());
        assert!(user.followings().is_empty());
    }

    #[test]
    fn view_strips_password() {
        let mut user = user_row("[]", "[]");
        user.password = Some("secret-hash".to_owned());
        let rendered = serde_json::to_string(&user.view()).unwrap();
        assert!(!rendered.contains("secret-hash"));
        assert!(!rendered.contains("password"));
    }

    #[test]
    fn now_iso_is_fixed_width() {
        let a = now_iso();
        let b = now_iso();
        assert_eq!(a.len(), b.len());
    }
}
