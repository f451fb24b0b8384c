use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    db::{self, ProfileCard, UserRow, UserView},
    notify, session, ApiError, AppResult,
};

use super::suggestions_for;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendLists {
    pub followings: Vec<ProfileCard>,
    pub followers: Vec<ProfileCard>,
    pub suggestions: Vec<ProfileCard>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowOutcome {
    #[serde(flatten)]
    pub lists: FriendLists,
    pub updated_user: UserView,
}

enum EdgeOp {
    Add { notify: bool },
    Remove,
}

/// Records the edge on both sides and tells the target about it.
pub async fn follow(pool: &SqlitePool, user_id: &str, friend_id: &str) -> AppResult<FollowOutcome> {
    mutate(pool, user_id, friend_id, EdgeOp::Add { notify: true }).await
}

/// Same mutation as `follow`, but reciprocating an existing follow should
/// not spam the other side with another notification.
pub async fn follow_back(pool: &SqlitePool, user_id: &str, friend_id: &str) -> AppResult<FollowOutcome> {
    mutate(pool, user_id, friend_id, EdgeOp::Add { notify: false }).await
}

pub async fn unfollow(pool: &SqlitePool, user_id: &str, friend_id: &str) -> AppResult<FollowOutcome> {
    mutate(pool, user_id, friend_id, EdgeOp::Remove).await
}

/// Both sides of the denormalized graph change inside one transaction, so
/// two interleaved requests for the same pair cannot double-append or leave
/// the edge half-applied.
async fn mutate(pool: &SqlitePool, user_id: &str, friend_id: &str, op: EdgeOp) -> AppResult<FollowOutcome> {
    let mut tx = pool.begin().await?;

    let Some(friend) = db::load_user(&mut *tx, friend_id).await? else {
        return Err(ApiError::NotFound("User does not exist".to_owned()));
    };
    let Some(user) = db::load_user(&mut *tx, user_id).await? else {
        return Err(ApiError::NotFound("User does not exist".to_owned()));
    };

    match op {
        EdgeOp::Add { notify } => {
            let mut followers = friend.followers();
            if !followers.iter().any(|id| id == user_id) {
                followers.push(user_id.to_owned());
                save_followers(&mut tx, friend_id, &followers).await?;
                if notify {
                    notify::push(
                        &mut *tx,
                        notify::Kind::Follow,
                        friend_id,
                        user_id,
                        None,
                        "Started Following You",
                    )
                    .await?;
                }
            }

            let mut followings = user.followings();
            if !followings.iter().any(|id| id == friend_id) {
                followings.push(friend_id.to_owned());
                save_followings(&mut tx, user_id, &followings).await?;
            }
        }
        EdgeOp::Remove => {
            let mut followers = friend.followers();
            if followers.iter().any(|id| id == user_id) {
                followers.retain(|id| id != user_id);
                save_followers(&mut tx, friend_id, &followers).await?;
            }

            let mut followings = user.followings();
            if followings.iter().any(|id| id == friend_id) {
                followings.retain(|id| id != friend_id);
                save_followings(&mut tx, user_id, &followings).await?;
            }
        }
    }

    tx.commit().await?;

    let Some(user) = db::load_user(pool, user_id).await? else {
        return Err(ApiError::NotFound("User does not exist".to_owned()));
    };
    let lists = friend_lists(pool, &user).await?;
    Ok(FollowOutcome { lists, updated_user: user.view() })
}

async fn save_followers(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: &str,
    followers: &[String],
) -> AppResult<()> {
    sqlx::query("UPDATE users SET followers=? WHERE id=?")
        .bind(serde_json::to_string(followers)?)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn save_followings(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: &str,
    followings: &[String],
) -> AppResult<()> {
    sqlx::query("UPDATE users SET followings=? WHERE id=?")
        .bind(serde_json::to_string(followings)?)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Hydrated projections of both follow arrays plus the suggestion set, each
/// resolved with one batched query.
pub async fn friend_lists(pool: &SqlitePool, user: &UserRow) -> AppResult<FriendLists> {
    let followings = db::hydrate_profiles(pool, &user.followings()).await?;
    let followers = db::hydrate_profiles(pool, &user.followers()).await?;
    let suggestions = suggestions_for(pool, user).await?;
    Ok(FriendLists { followings, followers, suggestions })
}

#[debug_handler]
pub(crate) async fn follow_friend(
    Path((id, friend_id)): Path<(Uuid, Uuid)>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<FollowOutcome>> {
    require_acting_user(&session, &id).await?;
    Ok(Json(follow(&db_pool, &id.to_string(), &friend_id.to_string()).await?))
}

#[debug_handler]
pub(crate) async fn unfollow_friend(
    Path((id, friend_id)): Path<(Uuid, Uuid)>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<FollowOutcome>> {
    require_acting_user(&session, &id).await?;
    Ok(Json(unfollow(&db_pool, &id.to_string(), &friend_id.to_string()).await?))
}

#[debug_handler]
pub(crate) async fn follow_back_friend(
    Path((id, friend_id)): Path<(Uuid, Uuid)>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<FollowOutcome>> {
    require_acting_user(&session, &id).await?;
    Ok(Json(follow_back(&db_pool, &id.to_string(), &friend_id.to_string()).await?))
}

pub(crate) async fn require_acting_user(session: &Session, id: &Uuid) -> AppResult<()> {
    let acting = session::require_user(session).await?;
    if acting != id.to_string() {
        return Err(ApiError::Unauthorized("Cannot act for another user".to_owned()));
    }
    Ok(())
}
