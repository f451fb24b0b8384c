//! External collaborators. Mail delivery and image storage are opaque async
//! calls against services this process does not own; both either succeed or
//! fail the whole request.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{config::Config, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct Mail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

/// Email-delivery collaborator. Without an endpoint configured, mail is
/// logged instead of delivered (dev mode).
#[derive(Clone)]
pub enum Mailer {
    Http { client: reqwest::Client, endpoint: String, from: String },
    Log { from: String },
}

impl Mailer {
    pub fn from_config(config: &Config) -> Self {
        match &config.mail_endpoint {
            Some(endpoint) => Mailer::Http {
                client: reqwest::Client::new(),
                endpoint: endpoint.clone(),
                from: config.mail_from.clone(),
            },
            None => Mailer::Log { from: config.mail_from.clone() },
        }
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        match self {
            Mailer::Http { client, endpoint, from } => {
                client
                    .post(endpoint)
                    .json(&Mail {
                        to: to.to_owned(),
                        from: from.clone(),
                        subject: subject.to_owned(),
                        body: body.to_owned(),
                    })
                    .send()
                    .await?
                    .error_for_status()
                    .map_err(anyhow::Error::from)?;
            }
            Mailer::Log { from } => {
                info!("mail from {from} to {to}: {subject}");
            }
        }
        Ok(())
    }
}

/// Object-storage collaborator; hands back a durable URL for uploaded bytes.
#[derive(Clone)]
pub enum MediaStore {
    Http { client: reqwest::Client, endpoint: String },
    Local,
}

impl MediaStore {
    pub fn from_config(config: &Config) -> Self {
        match &config.media_endpoint {
            Some(endpoint) => MediaStore::Http {
                client: reqwest::Client::new(),
                endpoint: endpoint.clone(),
            },
            None => MediaStore::Local,
        }
    }

    pub async fn put(&self, folder: &str, bytes: Vec<u8>) -> AppResult<String> {
        let name = Uuid::now_v7();
        match self {
            MediaStore::Http { client, endpoint } => {
                let url = format!("{endpoint}/{folder}/{name}");
                client
                    .put(&url)
                    .body(bytes)
                    .send()
                    .await?
                    .error_for_status()
                    .map_err(anyhow::Error::from)?;
                Ok(url)
            }
            MediaStore::Local => Ok(format!("/assets/{folder}/{name}")),
        }
    }
}
