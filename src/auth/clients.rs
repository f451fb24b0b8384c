use std::fs;

use oauth2::{basic::BasicClient, AuthUrl, Client, ClientId, ClientSecret, RedirectUrl, TokenUrl};
use serde_json::Value;
use tracing::warn;

use crate::{AppResult, GetField};

type HappyClient = Client<oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>, oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardTokenIntrospectionResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardRevocableToken, oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>, oauth2::EndpointSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointSet>;

#[derive(Clone)]
pub struct Clients {
    google_client: Option<HappyClient>,
}

impl Clients {
    /// Reads the OAuth secret file if one is configured; a missing or broken
    /// file leaves every provider disabled rather than failing startup.
    pub fn load(path: Option<&str>, redirect_url: &str) -> Clients {
        let Some(path) = path else {
            return Clients { google_client: None };
        };

        let json = fs::read_to_string(path)
            .map_err(|e| warn!("OAuth secrets unreadable at {path}: {e}"))
            .ok()
            .and_then(|raw| {
                serde_json::from_str::<Value>(&raw)
                    .map_err(|e| warn!("OAuth secrets at {path} are not JSON: {e}"))
                    .ok()
            });

        match json.map(|json| Clients::from_json(json, redirect_url)) {
            Some(Ok(clients)) => clients,
            Some(Err(e)) => {
                warn!("OAuth secrets rejected: {e}");
                Clients { google_client: None }
            }
            None => Clients { google_client: None },
        }
    }

    pub fn from_json(json: Value, redirect_url: &str) -> AppResult<Clients> {
        let google_client = 'a: {
            let json = json.get("google");
            let Some(json) = json else {
                break 'a None;
            };
            let client_id = ClientId::new(json.get_str_field("client_id")?);
            let client_secret = ClientSecret::new(json.get_str_field("client_secret")?);

            let auth_url = AuthUrl::new("https://accounts.google.com/o/oauth2/auth".to_string())
                .map_err(anyhow::Error::from)?;
            let token_url = TokenUrl::new("https://oauth2.googleapis.com/token".to_string())
                .map_err(anyhow::Error::from)?;
            let redirect_url =
                RedirectUrl::new(redirect_url.to_owned()).map_err(anyhow::Error::from)?;

            Some(
                BasicClient::new(client_id)
                .set_client_secret(client_secret)
                .set_auth_uri(auth_url)
                .set_token_uri(token_url)
                .set_redirect_uri(redirect_url)
            )
        };

        Ok(Clients { google_client })
    }

    pub fn get_client(&self) -> AppResult<HappyClient> {
        self.google_client
            .clone()
            .ok_or("OAuth provider google keys not supplied".into())
    }
}
