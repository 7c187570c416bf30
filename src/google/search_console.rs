//! Search Console API client
//!
//! The `SearchConsole` trait is the seam the ranking pipeline runs
//! against; tests drive the pipeline with a mock implementation.

use crate::error::{AppError, Result};
use crate::google::types::{SearchAnalyticsRequest, SearchAnalyticsResponse, SitesListResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const BASE_URL: &str = "https://searchconsole.googleapis.com/webmasters/v3";

/// Search Console operations used by the application
#[async_trait]
pub trait SearchConsole: Send + Sync {
    /// Site URLs visible to the authenticated account
    async fn list_sites(&self, access_token: &str) -> Result<Vec<String>>;

    /// One Search Analytics query scoped to a single site
    async fn query(
        &self,
        access_token: &str,
        site_url: &str,
        request: &SearchAnalyticsRequest,
    ) -> Result<SearchAnalyticsResponse>;
}

/// HTTP implementation against the live API
pub struct SearchConsoleClient {
    http: Client,
}

impl SearchConsoleClient {
    pub fn new() -> Self {
        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

impl Default for SearchConsoleClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchConsole for SearchConsoleClient {
    async fn list_sites(&self, access_token: &str) -> Result<Vec<String>> {
        let response = self
            .http
            .get(format!("{}/sites", BASE_URL))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Query(api_error_text(response).await));
        }

        let body: SitesListResponse = response.json().await?;
        let sites = body
            .site_entry
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| entry.site_url)
            .collect();

        Ok(sites)
    }

    async fn query(
        &self,
        access_token: &str,
        site_url: &str,
        request: &SearchAnalyticsRequest,
    ) -> Result<SearchAnalyticsResponse> {
        // Site URLs are full URLs (or sc-domain: properties) and must
        // be encoded as a single path segment
        let url = format!(
            "{}/sites/{}/searchAnalytics/query",
            BASE_URL,
            urlencoding::encode(site_url)
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Query(api_error_text(response).await));
        }

        Ok(response.json().await?)
    }
}

/// Extract the human-readable message from a Google API error body
async fn api_error_text(response: reqwest::Response) -> String {
    #[derive(Deserialize)]
    struct ApiErrorBody {
        error: ApiErrorDetail,
    }

    #[derive(Deserialize)]
    struct ApiErrorDetail {
        message: String,
    }

    let status = response.status();
    match response.json::<ApiErrorBody>().await {
        Ok(body) => body.error.message,
        Err(_) => format!("HTTP {}", status),
    }
}
