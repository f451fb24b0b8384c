use tower_sessions::Session;

use crate::{ApiError, AppResult};

pub const USER_ID: &str = "user_id";
pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";

/// Resolves the signed-in user or rejects the request.
pub async fn require_user(session: &Session) -> AppResult<String> {
    session
        .get::<String>(USER_ID)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Not signed in".to_owned()))
}

pub async fn sign_in(session: &Session, user_id: &str) -> AppResult<()> {
    session.insert(USER_ID, user_id.to_owned()).await?;
    Ok(())
}
