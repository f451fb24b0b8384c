pub mod follow;

use axum::{
    debug_handler,
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    db::{self, ProfileCard, UserRow},
    notify, ApiError, AppResult, AppState,
};

use self::follow::require_acting_user;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_users))
        .route("/{id}", get(get_user).put(update_user))
        .route("/{id}/followers", get(get_follower_counts))
        .route("/{id}/followings", get(get_friends))
        .route("/{id}/suggestions", get(get_suggestions))
        .route("/{id}/notifications", get(get_notifications))
        .route("/{id}/{friend_id}/follow", patch(follow::follow_friend))
        .route("/{id}/{friend_id}/unfollow", patch(follow::unfollow_friend))
        .route("/{id}/{friend_id}/followback", patch(follow::follow_back_friend))
}

/// Everyone not already followed and not the user themselves. Scans the whole
/// user collection; fine at this scale, a pagination candidate beyond it.
pub async fn suggestions_for(pool: &SqlitePool, user: &UserRow) -> AppResult<Vec<ProfileCard>> {
    let mut excluded = user.followings();
    excluded.push(user.id.clone());

    let mut qb =
        QueryBuilder::<Sqlite>::new("SELECT id, username, name, picture FROM users WHERE id NOT IN (");
    let mut sep = qb.separated(", ");
    for id in &excluded {
        sep.push_bind(id);
    }
    qb.push(")");

    Ok(qb.build_query_as().fetch_all(pool).await?)
}

/// The two counts come from the opposite side of the denormalization: how
/// many users carry `id` in their followers / followings arrays.
pub async fn reverse_counts(pool: &SqlitePool, id: &str) -> AppResult<(i64, i64)> {
    let (following_count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM users, json_each(users.followers) WHERE json_each.value = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    let (followers_count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM users, json_each(users.followings) WHERE json_each.value = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok((following_count, followers_count))
}

#[debug_handler]
async fn get_users(State(db_pool): State<SqlitePool>) -> AppResult<Json<Value>> {
    let users: Vec<UserRow> = sqlx::query_as("SELECT * FROM users").fetch_all(&db_pool).await?;
    Ok(Json(json!(users.iter().map(UserRow::view).collect::<Vec<_>>())))
}

#[debug_handler]
async fn get_user(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Value>> {
    let id = id.to_string();
    let Some(user) = db::load_user(&db_pool, &id).await? else {
        return Err(ApiError::NotFound("User does not exist".to_owned()));
    };
    let (following_count, followers_count) = reverse_counts(&db_pool, &id).await?;

    Ok(Json(json!({
        "user": user.view(),
        "followingCount": following_count,
        "followersCount": followers_count,
    })))
}

#[debug_handler]
async fn get_follower_counts(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Value>> {
    let id = id.to_string();
    if db::load_user(&db_pool, &id).await?.is_none() {
        return Err(ApiError::NotFound("User does not exist".to_owned()));
    }
    let (following_count, followers_count) = reverse_counts(&db_pool, &id).await?;

    Ok(Json(json!({
        "followingCount": following_count,
        "followersCount": followers_count,
    })))
}

#[debug_handler]
async fn get_friends(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<follow::FriendLists>> {
    let Some(user) = db::load_user(&db_pool, &id.to_string()).await? else {
        return Err(ApiError::NotFound("User does not exist".to_owned()));
    };
    Ok(Json(follow::friend_lists(&db_pool, &user).await?))
}

#[debug_handler]
async fn get_suggestions(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<ProfileCard>>> {
    let Some(user) = db::load_user(&db_pool, &id.to_string()).await? else {
        return Err(ApiError::NotFound("User does not exist".to_owned()));
    };
    Ok(Json(suggestions_for(&db_pool, &user).await?))
}

#[debug_handler]
async fn get_notifications(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<Vec<notify::NotificationView>>> {
    Ok(Json(notify::for_user(&db_pool, &id.to_string()).await?))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct UpdateUserBody {
    name: Option<String>,
    username: Option<String>,
    email: Option<String>,
    bio: Option<String>,
    old_password: Option<String>,
    new_password: Option<String>,
    confirm_password: Option<String>,
}

/// Blank fields keep their current value; a password change requires the old
/// password and a matching confirmation.
#[debug_handler]
async fn update_user(
    Path(id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(body): Json<UpdateUserBody>,
) -> AppResult<Json<Value>> {
    require_acting_user(&session, &id).await?;
    let id = id.to_string();

    let Some(user) = db::load_user(&db_pool, &id).await? else {
        return Err(ApiError::NotFound("User does not exist".to_owned()));
    };

    let pick = |new: Option<String>, old: &str| -> String {
        match new.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => v.to_owned(),
            _ => old.to_owned(),
        }
    };
    let username = pick(body.username, &user.username);
    let name = pick(body.name, &user.name);
    let bio = pick(body.bio, &user.bio);
    let email = pick(body.email, &user.email);

    if username != user.username {
        crate::auth::validate_username(&username).map_err(|e| ApiError::Validation(e.to_owned()))?;
    }
    if email != user.email {
        crate::auth::validate_email(&email).map_err(|e| ApiError::Validation(e.to_owned()))?;
    }

    let mut password = user.password.clone();
    if let Some(old_password) = body.old_password.filter(|p| !p.is_empty()) {
        let matches = user
            .password
            .as_deref()
            .is_some_and(|hash| crate::auth::verify_secret(&old_password, hash));
        if !matches {
            return Err(ApiError::Validation("Invalid Old Password".to_owned()));
        }

        let (Some(new_password), Some(confirm_password)) = (body.new_password, body.confirm_password)
        else {
            return Err(ApiError::Validation("New password and confirmation required".to_owned()));
        };
        if new_password != confirm_password {
            return Err(ApiError::Validation("New password and confirmation do not match".to_owned()));
        }
        crate::auth::validate_password(&new_password).map_err(|e| ApiError::Validation(e.to_owned()))?;

        password = Some(crate::auth::hash_secret(&new_password)?);
    }

    sqlx::query("UPDATE users SET username=?, name=?, bio=?, email=?, password=? WHERE id=?")
        .bind(&username)
        .bind(&name)
        .bind(&bio)
        .bind(&email)
        .bind(&password)
        .bind(&id)
        .execute(&db_pool)
        .await
        .map_err(|e| crate::auth::unique_violation(e, "Email or Username Already Exists!"))?;

    let Some(updated) = db::load_user(&db_pool, &id).await? else {
        return Err(ApiError::NotFound("User does not exist".to_owned()));
    };
    Ok(Json(json!(updated.view())))
}
