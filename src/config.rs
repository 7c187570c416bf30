//! Environment configuration

use crate::credentials::ClientCredentials;
use std::env;

/// Runtime configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Public base URL used to build OAuth redirect targets.
    /// Falls back to the local listen address.
    pub base_url: String,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .expect("PORT must be a valid number");
        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://localhost:{}", port));

        Self {
            host,
            port,
            base_url,
            google_client_id: env::var("GOOGLE_CLIENT_ID").ok(),
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET").ok(),
        }
    }

    /// OAuth callback URL registered with the Google Cloud project
    pub fn callback_url(&self) -> String {
        format!("{}/api/auth/callback", self.base_url)
    }

    /// Default OAuth application credentials, when both are configured
    pub fn default_credentials(&self) -> Option<ClientCredentials> {
        match (&self.google_client_id, &self.google_client_secret) {
            (Some(id), Some(secret)) => Some(ClientCredentials {
                client_id: id.clone(),
                client_secret: secret.clone(),
            }),
            _ => None,
        }
    }
}
