//! HTTP request and response types

use crate::error::{AppError, Result};
use crate::google::types::UserInfo;
use crate::services::ranking_service::{KeywordResult, SearchType, MAX_KEYWORDS_PER_JOB};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Search
// ============================================================================

/// Job submission body.
///
/// Fields are lenient on purpose: presence and shape are validated in
/// `validate()` so a malformed body gets the documented 400 rather
/// than a deserializer rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub keywords: Option<Value>,
    #[serde(default)]
    pub date_range: Option<String>,
    #[serde(default)]
    pub custom_start_date: Option<String>,
    #[serde(default)]
    pub custom_end_date: Option<String>,
    #[serde(default)]
    pub search_type: Option<SearchType>,
    #[serde(default)]
    pub country: Option<String>,
}

/// A validated job submission
#[derive(Debug)]
pub struct ValidatedSearch {
    pub site: String,
    pub keywords: Vec<String>,
    pub date_range: String,
    pub custom_start_date: Option<String>,
    pub custom_end_date: Option<String>,
    pub search_type: SearchType,
    pub country: Option<String>,
}

impl SearchRequest {
    pub fn validate(self) -> Result<ValidatedSearch> {
        let missing = || AppError::Validation("Missing required parameters".to_string());

        let site = self.site.filter(|s| !s.trim().is_empty()).ok_or_else(missing)?;

        let keywords = match self.keywords {
            Some(Value::Array(items)) => items,
            _ => return Err(missing()),
        };

        // Keywords are trimmed; empty entries are dropped
        let keywords: Vec<String> = keywords
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect();

        if keywords.is_empty() {
            return Err(missing());
        }
        if keywords.len() > MAX_KEYWORDS_PER_JOB {
            return Err(AppError::Validation(format!(
                "Too many keywords: maximum {} per job",
                MAX_KEYWORDS_PER_JOB
            )));
        }

        Ok(ValidatedSearch {
            site,
            keywords,
            date_range: self.date_range.unwrap_or_default(),
            custom_start_date: self.custom_start_date,
            custom_end_date: self.custom_end_date,
            search_type: self.search_type.unwrap_or_default(),
            country: self.country,
        })
    }
}

/// Non-streaming search response
#[derive(Debug, Serialize)]
pub struct BatchSearchResponse {
    pub results: Vec<KeywordResult>,
}

/// Sites listing response
#[derive(Debug, Serialize)]
pub struct SitesResponse {
    pub sites: Vec<String>,
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCredentialsRequest {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCredentialsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_url_preview: Option<String>,
}

impl TestCredentialsResponse {
    pub fn ok(auth_url_preview: String) -> Self {
        Self {
            success: true,
            message: Some("Credentials format appears valid".to_string()),
            error: None,
            auth_url_preview: Some(auth_url_preview),
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error),
            auth_url_preview: None,
        }
    }
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}
