use axum::{
    debug_handler,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, Scope, TokenResponse};
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;

use crate::{
    session::{self, CSRF_STATE, PKCE_VERIFIER, RETURN_URL},
    ApiError, AppResult, AppState, GetField,
};

use super::{create_oauth_user, Clients};

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) return_url: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn google_login(
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Response> {
    let client = clients.get_client()?;

    let (pkce_code_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (authorize_url, csrf_state) = client.authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new("openid".to_string()))
        .add_scope(Scope::new("email".to_string()))
        .add_scope(Scope::new("profile".to_string()))
        .set_pkce_challenge(pkce_code_challenge)
        .url();

    session.insert(CSRF_STATE, csrf_state.secret()).await?;
    session.insert(PKCE_VERIFIER, pkce_verifier.secret()).await?;
    if let Some(return_url) = return_url {
        session.insert(RETURN_URL, return_url).await?;
    }

    Ok(Redirect::to(authorize_url.as_str()).into_response())
}

#[derive(Deserialize)]
pub(crate) struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn google_callback(
    Query(CallbackQuery { state, code }): Query<CallbackQuery>,
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let state = CsrfToken::new(state.ok_or(ApiError::Validation("OAuth: without state".to_owned()))?);
    let code = AuthorizationCode::new(code.ok_or(ApiError::Validation("OAuth: without code".to_owned()))?);

    let Some(stored_state) = session.get::<String>(CSRF_STATE).await? else {
        return Err(ApiError::Validation("no csrf_state".to_owned()));
    };
    if state.secret().as_str() != stored_state.as_str() {
        return Err(ApiError::Validation("csrf tokens don't match".to_owned()));
    }

    let Some(pkce_verifier) = session.get::<String>(PKCE_VERIFIER).await? else {
        return Err(ApiError::Validation("no pkce_verifier".to_owned()));
    };

    let client = clients.get_client()?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let access_token = token_result.access_token().secret();
    let body: serde_json::Value = http_client
        .get("https://www.googleapis.com/oauth2/v2/userinfo")
        .bearer_auth(access_token)
        .send()
        .await?
        .json()
        .await?;

    let email = body.get_str_field("email")?;
    let name = body.get("name").and_then(Value::as_str).unwrap_or("").to_owned();
    let picture = body.get("picture").and_then(Value::as_str).unwrap_or("").to_owned();

    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email=?")
        .bind(&email)
        .fetch_optional(&db_pool)
        .await?;
    let user_id = match existing {
        Some((id,)) => id,
        None => create_oauth_user(&db_pool, &email, &name, &picture).await?,
    };

    session::sign_in(&session, &user_id).await?;
    info!("welcome u/{user_id}");

    let return_url: String = session.get(RETURN_URL).await?.unwrap_or("/".to_string());
    Ok(Redirect::to(return_url.as_str()))
}
