//! OAuth application credential resolution
//!
//! Google client id/secret pairs can arrive from several carriers
//! (query parameters, cookies, headers, environment defaults). Each
//! call site builds an ordered list of sources; the first source
//! providing both values wins.

use crate::error::{AppError, Result};
use tracing::info;

/// Minimum plausible client secret length
const MIN_SECRET_LEN: usize = 10;

/// A resolved OAuth application credential pair
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// One prioritized credential source
#[derive(Debug)]
pub struct CredentialSource {
    label: &'static str,
    credentials: Option<ClientCredentials>,
}

impl CredentialSource {
    /// A source yields credentials only when it carries both values
    pub fn new(label: &'static str, client_id: Option<String>, client_secret: Option<String>) -> Self {
        let credentials = match (client_id, client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(ClientCredentials {
                    client_id: id,
                    client_secret: secret,
                })
            }
            _ => None,
        };
        Self { label, credentials }
    }

    pub fn from_pair(label: &'static str, credentials: Option<ClientCredentials>) -> Self {
        Self { label, credentials }
    }
}

/// Try each source in order, short-circuiting at the first that
/// yields a complete pair; the winner is validated before use.
pub fn resolve(sources: Vec<CredentialSource>) -> Result<ClientCredentials> {
    for source in sources {
        if let Some(credentials) = source.credentials {
            info!("Using Google credentials from {}", source.label);
            return validate(credentials);
        }
    }
    Err(AppError::CredentialsMissing)
}

/// Reject credentials that cannot possibly be a Google OAuth pair
pub fn validate(credentials: ClientCredentials) -> Result<ClientCredentials> {
    if !credentials.client_id.contains("googleusercontent.com") {
        return Err(AppError::InvalidCredentialFormat(
            "Client ID must contain googleusercontent.com".to_string(),
        ));
    }

    if credentials.client_secret.len() < MIN_SECRET_LEN {
        return Err(AppError::InvalidCredentialFormat(
            "Client Secret is too short".to_string(),
        ));
    }

    Ok(credentials)
}
