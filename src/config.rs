use std::{env, fmt::Display, str::FromStr};

use tracing::info;

pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    /// Base URL of the web client, used in password-reset links.
    pub frontend_url: String,
    pub oauth_secret_path: Option<String>,
    pub oauth_redirect_url: String,
    pub mail_endpoint: Option<String>,
    pub mail_from: String,
    pub media_endpoint: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        dotenv::dotenv().ok();

        Self {
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:8080"),
            database_url: try_load("DATABASE_URL", "sqlite::memory:"),
            frontend_url: try_load("FRONTEND_URL", "http://localhost:3000"),
            oauth_secret_path: env::var("OAUTH_SECRET_PATH").ok(),
            oauth_redirect_url: try_load(
                "OAUTH_REDIRECT_URL",
                "http://localhost:8080/auth/google-callback",
            ),
            mail_endpoint: env::var("MAIL_ENDPOINT").ok(),
            mail_from: try_load("MAIL_FROM", "no-reply@ripple.local"),
            media_endpoint: env::var("MEDIA_ENDPOINT").ok(),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| format!("invalid {key} value: {e}"))
        .expect("environment misconfigured")
}
