//! Session cookie handling
//!
//! The browser session is carried entirely in cookies: the OAuth
//! access token, the refresh token, and a snapshot of the signed-in
//! user. Handlers extract an explicit session context from the request
//! headers and pass it down; nothing reads ambient state.

use crate::google::types::UserInfo;
use axum::http::header::{HeaderMap, COOKIE};
use std::collections::HashMap;

pub const SESSION_TOKEN_COOKIE: &str = "session_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const USER_SESSION_COOKIE: &str = "user_session";
pub const CLIENT_ID_COOKIE: &str = "google_client_id";
pub const CLIENT_SECRET_COOKIE: &str = "google_client_secret";

/// Cookie lifetimes (seconds)
pub const SESSION_TOKEN_MAX_AGE: u64 = 60 * 60 * 24 * 7;
pub const REFRESH_TOKEN_MAX_AGE: u64 = 60 * 60 * 24 * 30;
pub const USER_SESSION_MAX_AGE: u64 = 60 * 60 * 24 * 7;

/// OAuth tokens held by the caller's session
#[derive(Debug, Clone, Default)]
pub struct SessionTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SessionTokens {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let cookies = parse_cookies(headers);
        Self {
            access_token: cookies.get(SESSION_TOKEN_COOKIE).cloned(),
            refresh_token: cookies.get(REFRESH_TOKEN_COOKIE).cloned(),
        }
    }
}

/// Parse the Cookie header(s) into name -> decoded value
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for value in headers.get_all(COOKIE) {
        let Ok(value) = value.to_str() else { continue };
        for part in value.split(';') {
            let Some((name, raw)) = part.trim().split_once('=') else {
                continue;
            };
            let decoded = urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            cookies.insert(name.to_string(), decoded);
        }
    }

    cookies
}

/// Signed-in user snapshot from the session cookie, if present
pub fn session_user(headers: &HeaderMap) -> Option<UserInfo> {
    let cookies = parse_cookies(headers);
    let raw = cookies.get(USER_SESSION_COOKIE)?;
    serde_json::from_str(raw).ok()
}

/// Build a Set-Cookie value for a session artifact
pub fn build_cookie(name: &str, value: &str, max_age: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name,
        urlencoding::encode(value),
        max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build a Set-Cookie value that expires a session artifact
pub fn expire_cookie(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_parse_cookies() {
        let headers = headers_with_cookie("session_token=abc; refresh_token=def; other=1");
        let cookies = parse_cookies(&headers);
        assert_eq!(cookies.get("session_token").unwrap(), "abc");
        assert_eq!(cookies.get("refresh_token").unwrap(), "def");
        assert_eq!(cookies.get("other").unwrap(), "1");
    }

    #[test]
    fn test_session_tokens_from_headers() {
        let headers = headers_with_cookie("session_token=tok-1; refresh_token=ref-1");
        let tokens = SessionTokens::from_headers(&headers);
        assert_eq!(tokens.access_token.as_deref(), Some("tok-1"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("ref-1"));
    }

    #[test]
    fn test_user_session_json_round_trip() {
        let user = UserInfo {
            email: Some("dev@example.com".to_string()),
            name: Some("Dev User".to_string()),
            picture: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        let cookie = build_cookie(USER_SESSION_COOKIE, &json, USER_SESSION_MAX_AGE, false);
        let value = cookie.split(';').next().unwrap();

        let headers = headers_with_cookie(value);
        let parsed = session_user(&headers).unwrap();
        assert_eq!(parsed.email.as_deref(), Some("dev@example.com"));
        assert_eq!(parsed.name.as_deref(), Some("Dev User"));
    }

    #[test]
    fn test_build_cookie_attributes() {
        let cookie = build_cookie("session_token", "abc", 604800, true);
        assert!(cookie.starts_with("session_token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn test_expire_cookie() {
        assert!(expire_cookie("session_token").contains("Max-Age=0"));
    }
}
