use std::sync::Arc;

use axum::{http::Method, http::header::CONTENT_TYPE, Router};
use ripple::{auth, chat, config::Config, db, posts, services, users, AppState};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::{
    net::TcpListener,
    signal::{
        self,
        unix::{signal, SignalKind},
    },
    sync::broadcast,
};
use tower_http::cors::{Any, CorsLayer};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(2)));

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(&config.database_url)
        .await
        .unwrap();
    db::init(&db_pool).await.unwrap();

    let clients = auth::Clients::load(config.oauth_secret_path.as_deref(), &config.oauth_redirect_url);
    let mailer = services::Mailer::from_config(&config);
    let media = services::MediaStore::from_config(&config);
    let bind_addr = config.bind_addr.clone();

    let app_state = AppState {
        db_pool,
        config: Arc::new(config),
        clients,
        presence: chat::presence::Presence::default(),
        tx: broadcast::channel(256).0,
        mailer,
        media,
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(Any);

    let app = Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/posts", posts::router())
        .merge(chat::router())
        .layer(cors)
        .with_state(app_state)
        .layer(session_layer);

    let listener = TcpListener::bind(&bind_addr).await.unwrap();
    info!("listening on {bind_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
