pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod notify;
pub mod posts;
pub mod services;
pub mod session;
pub mod users;

use std::sync::Arc;

use axum::extract::FromRef;
use serde_json::Value;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

pub use error::{ApiError, AppResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<config::Config>,
    pub clients: auth::Clients,
    pub presence: chat::presence::Presence,
    pub tx: broadcast::Sender<chat::ws::WsEvent>,
    pub mailer: services::Mailer,
    pub media: services::MediaStore,
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> AppResult<String>;
    fn get_obj_field(&self, field: &str) -> AppResult<&Value>;
}

impl GetField for serde_json::Value {
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(
            self.get(field)
            .ok_or(format!("expected {field} in {self}"))?
            .as_str()
            .ok_or(format!("expected {field} in {self} to be string"))?
            .to_owned()
        )
    }

    fn get_obj_field(&self, field: &str) -> AppResult<&Value> {
        self.get(field)
        .ok_or(format!("expected {field} in {self}").into())
    }
}
