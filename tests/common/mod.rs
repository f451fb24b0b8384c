#![allow(dead_code)]

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

use ripple::db;

/// Fresh in-memory database per test. One connection, because every
/// `sqlite::memory:` connection is its own database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init(&pool).await.unwrap();
    pool
}

pub async fn mk_user(pool: &SqlitePool, username: &str) -> String {
    let id = Uuid::now_v7().to_string();
    sqlx::query(
        "INSERT INTO users (id,username,name,email,password,picture,bio,followers,followings,verified,created_at)
         VALUES (?,?,'',?,NULL,'','','[]','[]',1,?)",
    )
    .bind(&id)
    .bind(username)
    .bind(format!("{username}@example.com"))
    .bind(db::now_iso())
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn mk_post(pool: &SqlitePool, author: &str, content: &str) -> String {
    let id = Uuid::now_v7().to_string();
    sqlx::query(
        "INSERT INTO posts (id,author,content,image,likes,comments,is_deleted,created_at)
         VALUES (?,?,?,NULL,'{}','[]',0,?)",
    )
    .bind(&id)
    .bind(author)
    .bind(content)
    .bind(db::now_iso())
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn notification_count(pool: &SqlitePool, recipient: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id=?")
        .bind(recipient)
        .fetch_one(pool)
        .await
        .unwrap();
    count
}
