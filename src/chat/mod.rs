pub mod convo;
pub mod msg;
pub mod presence;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Route spelling kept for compatibility with existing clients.
        .route("/converstations", post(convo::create_conversation))
        .route("/converstations/{user_id}", get(convo::get_conversations))
        .route("/messages", post(msg::create_message))
        .route("/messages/{conversation_id}", get(msg::get_messages))
        .route("/ws", get(ws::chat_ws))
}
