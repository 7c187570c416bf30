//! HTTP endpoint handlers
//!
//! Provides handlers for:
//! - The Google OAuth sign-in flow (/api/auth/*)
//! - Search Console proxy endpoints (/api/search-console/*)
//! - The streaming and batch keyword ranking jobs

use crate::credentials::{self, ClientCredentials, CredentialSource};
use crate::daterange;
use crate::error::{AppError, Result};
use crate::google::oauth::authorized_access_token;
use crate::http::types::*;
use crate::services::ranking_service::{RankingJob, RankingService, RateLimitConfig};
use crate::services::sink::{CollectSink, StreamSink};
use crate::session::{self, SessionTokens};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Json, Query, State};
use axum::http::header::{HeaderMap, HeaderValue, CONTENT_TYPE, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use futures_util::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const CLIENT_ID_HEADER: &str = "x-google-client-id";
const CLIENT_SECRET_HEADER: &str = "x-google-client-secret";

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

// ============================================================================
// Health Check
// ============================================================================

/// Health check endpoint - GET /health or GET /
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Rankscope API is running".to_string(),
    })
}

// ============================================================================
// OAuth Flow
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AuthInitQuery {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Start the OAuth flow - GET /api/auth/google
///
/// Credential priority for this path: query parameters (form submit) >
/// cookies (client-side storage) > headers (API calls) > environment.
pub async fn auth_google(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuthInitQuery>,
    headers: HeaderMap,
) -> Result<Redirect> {
    let cookies = session::parse_cookies(&headers);

    let credentials = credentials::resolve(vec![
        CredentialSource::new("query parameters", query.client_id, query.client_secret),
        CredentialSource::new(
            "cookies",
            cookies.get(session::CLIENT_ID_COOKIE).cloned(),
            cookies.get(session::CLIENT_SECRET_COOKIE).cloned(),
        ),
        CredentialSource::new(
            "request headers",
            header_string(&headers, CLIENT_ID_HEADER),
            header_string(&headers, CLIENT_SECRET_HEADER),
        ),
        CredentialSource::from_pair("environment variables", state.config.default_credentials()),
    ])?;

    let callback_url = state.config.callback_url();
    info!("OAuth callback URL: {}", callback_url);

    let auth_url = state.oauth.authorization_url(&credentials, &callback_url);
    Ok(Redirect::temporary(&auth_url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// OAuth callback - GET /api/auth/callback
///
/// Every failure path redirects back to the app root with an error
/// tag rather than rendering an error page.
pub async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
) -> Response {
    let base_url = state.config.base_url.clone();

    if let Some(oauth_error) = query.error {
        error!("OAuth error from provider: {}", oauth_error);
        return Redirect::temporary(&format!("{}?error=auth_failed", base_url)).into_response();
    }

    let Some(code) = query.code else {
        return Redirect::temporary(&format!("{}?error=no_code", base_url)).into_response();
    };

    match establish_session(&state, &headers, &code).await {
        Ok(response) => response,
        Err(err) => {
            error!("OAuth callback failed: {}", err);
            Redirect::temporary(&format!("{}?error=callback_failed", base_url)).into_response()
        }
    }
}

/// Exchange the authorization code, look up the user, and set the
/// session cookies on a redirect back to the app root
async fn establish_session(state: &AppState, headers: &HeaderMap, code: &str) -> Result<Response> {
    let cookies = session::parse_cookies(headers);

    // Callback path: cookies > environment; query/header carriers do
    // not survive the provider round trip
    let credentials = credentials::resolve(vec![
        CredentialSource::new(
            "cookies",
            cookies.get(session::CLIENT_ID_COOKIE).cloned(),
            cookies.get(session::CLIENT_SECRET_COOKIE).cloned(),
        ),
        CredentialSource::from_pair("environment variables", state.config.default_credentials()),
    ])?;

    let tokens = state
        .oauth
        .exchange_code(&credentials, &state.config.callback_url(), code)
        .await?;
    let user = state.oauth.user_info(&tokens.access_token).await?;

    info!("User {} signed in", user.email.as_deref().unwrap_or("<unknown>"));

    let secure = state.config.base_url.starts_with("https://");
    let user_json = serde_json::to_string(&user)?;

    let mut response = Redirect::temporary(&state.config.base_url).into_response();
    append_cookie(
        &mut response,
        session::build_cookie(
            session::SESSION_TOKEN_COOKIE,
            &tokens.access_token,
            session::SESSION_TOKEN_MAX_AGE,
            secure,
        ),
    )?;
    append_cookie(
        &mut response,
        session::build_cookie(
            session::REFRESH_TOKEN_COOKIE,
            tokens.refresh_token.as_deref().unwrap_or_default(),
            session::REFRESH_TOKEN_MAX_AGE,
            secure,
        ),
    )?;
    append_cookie(
        &mut response,
        session::build_cookie(
            session::USER_SESSION_COOKIE,
            &user_json,
            session::USER_SESSION_MAX_AGE,
            secure,
        ),
    )?;

    Ok(response)
}

fn append_cookie(response: &mut Response, cookie: String) -> Result<()> {
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::Internal(format!("invalid cookie value: {}", e)))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(())
}

/// Session status - GET /api/auth/status
pub async fn auth_status(headers: HeaderMap) -> Json<AuthStatusResponse> {
    let tokens = SessionTokens::from_headers(&headers);

    if tokens.access_token.is_none() {
        return Json(AuthStatusResponse {
            authenticated: false,
            user: None,
        });
    }

    match session::session_user(&headers) {
        Some(user) => Json(AuthStatusResponse {
            authenticated: true,
            user: Some(user),
        }),
        None => Json(AuthStatusResponse {
            authenticated: false,
            user: None,
        }),
    }
}

/// Sign out - POST /api/auth/logout
pub async fn auth_logout() -> Result<Response> {
    let mut response = Json(LogoutResponse { success: true }).into_response();
    for name in [
        session::SESSION_TOKEN_COOKIE,
        session::REFRESH_TOKEN_COOKIE,
        session::USER_SESSION_COOKIE,
    ] {
        append_cookie(&mut response, session::expire_cookie(name))?;
    }
    Ok(response)
}

/// Credential sanity check - POST /api/test-credentials
///
/// Validates the pair's format and previews the authorization URL it
/// would produce; nothing is sent to Google.
pub async fn test_credentials(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TestCredentialsRequest>,
) -> Response {
    let (Some(client_id), Some(client_secret)) = (request.client_id, request.client_secret) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(TestCredentialsResponse::failed(
                "Missing Client ID or Client Secret".to_string(),
            )),
        )
            .into_response();
    };

    match credentials::validate(ClientCredentials {
        client_id,
        client_secret,
    }) {
        Ok(credentials) => {
            let auth_url = state
                .oauth
                .authorization_url(&credentials, &state.config.callback_url());
            let preview: String = auth_url.chars().take(100).collect();
            Json(TestCredentialsResponse::ok(format!("{}...", preview))).into_response()
        }
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(TestCredentialsResponse::failed(err.to_string())),
        )
            .into_response(),
    }
}

// ============================================================================
// Search Console
// ============================================================================

/// Verified sites for the signed-in account - GET /api/search-console/sites
pub async fn list_sites(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SitesResponse>> {
    let tokens = SessionTokens::from_headers(&headers);
    let access_token = authorized_access_token(
        &state.oauth,
        &tokens,
        state.config.default_credentials().as_ref(),
    )
    .await?;

    let sites = state.search_console.list_sites(&access_token).await?;
    Ok(Json(SitesResponse { sites }))
}

/// Validate the submission and resolve everything the job needs.
/// Runs before any response bytes are produced, so failures here
/// surface as ordinary JSON error responses.
async fn prepare_job(
    state: &AppState,
    headers: &HeaderMap,
    request: SearchRequest,
) -> Result<(RankingJob, String)> {
    let params = request.validate()?;

    let range = daterange::resolve(
        &params.date_range,
        params.custom_start_date.as_deref(),
        params.custom_end_date.as_deref(),
        chrono::Local::now().date_naive(),
    )?;

    let tokens = SessionTokens::from_headers(headers);
    let access_token = authorized_access_token(
        &state.oauth,
        &tokens,
        state.config.default_credentials().as_ref(),
    )
    .await?;

    let job = RankingJob {
        site_url: params.site,
        keywords: params.keywords,
        range,
        search_type: params.search_type,
        country: params.country,
    };

    Ok((job, access_token))
}

/// Streaming ranking job - POST /api/search-console/search
///
/// The response is a chunked sequence of newline-terminated JSON
/// messages, one per keyword plus a final summary, flushed as they
/// are produced so the client renders progress while the job runs.
pub async fn search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SearchRequest>,
) -> Result<Response> {
    let (job, access_token) = prepare_job(&state, &headers, request).await?;

    info!(
        "Streaming search: {} keywords for {}",
        job.keywords.len(),
        job.site_url
    );

    let (tx, rx) = mpsc::channel::<String>(64);
    let api = state.search_console.clone();
    let cancel = CancellationToken::new();

    tokio::spawn(async move {
        let mut sink = StreamSink::new(tx);
        RankingService::run_job(
            api.as_ref(),
            &access_token,
            &job,
            &RateLimitConfig::default(),
            &mut sink,
            &cancel,
        )
        .await;
    });

    let body_stream = ReceiverStream::new(rx).map(Ok::<String, std::convert::Infallible>);

    let response = Response::builder()
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff")
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(response)
}

/// Non-streaming ranking job - POST /api/search-console/search/batch
///
/// Same pipeline, collected into a single JSON response. Suitable for
/// small jobs; large ones should use the streaming endpoint.
pub async fn search_batch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SearchRequest>,
) -> Result<Json<BatchSearchResponse>> {
    let (job, access_token) = prepare_job(&state, &headers, request).await?;

    info!(
        "Batch search: {} keywords for {}",
        job.keywords.len(),
        job.site_url
    );

    let mut sink = CollectSink::new();
    RankingService::run_job(
        state.search_console.as_ref(),
        &access_token,
        &job,
        &RateLimitConfig::default(),
        &mut sink,
        &CancellationToken::new(),
    )
    .await;

    Ok(Json(BatchSearchResponse {
        results: sink.into_results(),
    }))
}
