//! Google OAuth2 client
//!
//! Thin client over Google's OAuth endpoints: consent-screen URL
//! generation, authorization-code exchange, token refresh and
//! validation, and the user profile lookup.

use crate::credentials::ClientCredentials;
use crate::error::{AppError, Result};
use crate::google::types::{OAuthErrorBody, TokenSet, UserInfo};
use crate::session::SessionTokens;
use reqwest::Client;
use url::Url;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Scopes requested at sign-in: read-only Search Console access plus
/// the user identity shown in the header bar
pub const SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/webmasters.readonly",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// Google OAuth2 endpoint client
pub struct OAuthClient {
    http: Client,
}

impl OAuthClient {
    pub fn new() -> Self {
        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Consent-screen URL for the initiating redirect.
    /// `access_type=offline` + `prompt=consent` so Google issues a
    /// refresh token on every grant.
    pub fn authorization_url(&self, credentials: &ClientCredentials, redirect_uri: &str) -> String {
        let mut url = Url::parse(AUTH_URL).expect("static URL must parse");
        url.query_pairs_mut()
            .append_pair("client_id", &credentials.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        url.to_string()
    }

    /// Exchange an authorization code for a token set
    pub async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        redirect_uri: &str,
        code: &str,
    ) -> Result<TokenSet> {
        let params = [
            ("code", code),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let response = self.http.post(TOKEN_URL).form(&params).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "token exchange failed: {}",
                oauth_error_text(response).await
            )));
        }

        Ok(response.json().await?)
    }

    /// Exchange a refresh token for a fresh access token
    pub async fn refresh(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenSet> {
        let params = [
            ("refresh_token", refresh_token),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self.http.post(TOKEN_URL).form(&params).send().await?;

        if !response.status().is_success() {
            return Err(AppError::TokenRefreshFailed(
                oauth_error_text(response).await,
            ));
        }

        Ok(response.json().await?)
    }

    /// Check an access token against the tokeninfo endpoint.
    /// Any failure (expired, revoked, network) reports invalid and
    /// lets the caller fall back to a refresh.
    pub async fn validate_access_token(&self, access_token: &str) -> bool {
        let request = self
            .http
            .get(TOKENINFO_URL)
            .query(&[("access_token", access_token)]);

        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Fetch the signed-in user's profile
    pub async fn user_info(&self, access_token: &str) -> Result<UserInfo> {
        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "userinfo lookup failed: {}",
                oauth_error_text(response).await
            )));
        }

        Ok(response.json().await?)
    }
}

impl Default for OAuthClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a usable bearer token from session-held tokens.
///
/// Validates the stored access token first; on failure falls back to
/// the refresh token (using the process-default application
/// credentials). The refreshed token is used for the current request
/// only; cookie rotation is the caller's concern.
pub async fn authorized_access_token(
    oauth: &OAuthClient,
    tokens: &SessionTokens,
    default_credentials: Option<&ClientCredentials>,
) -> Result<String> {
    let access_token = tokens
        .access_token
        .as_ref()
        .ok_or(AppError::NotAuthenticated)?;

    if oauth.validate_access_token(access_token).await {
        return Ok(access_token.clone());
    }

    let refresh_token = tokens.refresh_token.as_ref().ok_or_else(|| {
        AppError::TokenRefreshFailed("no refresh token in session".to_string())
    })?;

    let credentials = default_credentials.ok_or(AppError::CredentialsMissing)?;

    tracing::info!("Access token invalid, refreshing");
    let token_set = oauth.refresh(credentials, refresh_token).await?;
    Ok(token_set.access_token)
}

async fn oauth_error_text(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<OAuthErrorBody>().await {
        Ok(body) => body.error_description.unwrap_or(body.error),
        Err(_) => format!("HTTP {}", status),
    }
}
