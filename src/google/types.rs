//! Google API wire types
//!
//! Request and response shapes for the OAuth2 token endpoints and the
//! Search Console Search Analytics API. Field names mirror the JSON
//! the APIs actually speak.

use serde::{Deserialize, Serialize};

// ============================================================================
// OAuth2
// ============================================================================

/// Token set returned by the OAuth token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Error body returned by Google's OAuth endpoints
#[derive(Debug, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Authenticated user's profile snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

// ============================================================================
// Search Analytics
// ============================================================================

/// One dimension filter (`query equals <keyword>`)
#[derive(Debug, Clone, Serialize)]
pub struct DimensionFilter {
    pub dimension: String,
    pub operator: String,
    pub expression: String,
}

impl DimensionFilter {
    pub fn equals(dimension: &str, expression: &str) -> Self {
        Self {
            dimension: dimension.to_string(),
            operator: "equals".to_string(),
            expression: expression.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionFilterGroup {
    pub filters: Vec<DimensionFilter>,
}

/// Search Analytics query request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalyticsRequest {
    pub start_date: String,
    pub end_date: String,
    pub dimensions: Vec<String>,
    pub dimension_filter_groups: Vec<DimensionFilterGroup>,
    pub row_limit: u32,
    #[serde(rename = "type")]
    pub search_type: String,
}

/// One row of the query response; `keys` carries the date dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRow {
    pub keys: Vec<String>,
    #[serde(default)]
    pub clicks: f64,
    #[serde(default)]
    pub impressions: f64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: Option<f64>,
}

impl ApiRow {
    /// Date key of this row, when present
    pub fn date(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }
}

/// Search Analytics query response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalyticsResponse {
    #[serde(default)]
    pub rows: Option<Vec<ApiRow>>,
    #[serde(default)]
    pub response_aggregation_type: Option<String>,
}

impl SearchAnalyticsResponse {
    pub fn rows(&self) -> &[ApiRow] {
        self.rows.as_deref().unwrap_or(&[])
    }
}

/// Entry in the sites listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteEntry {
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub permission_level: Option<String>,
}

/// Sites listing response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitesListResponse {
    #[serde(default)]
    pub site_entry: Option<Vec<SiteEntry>>,
}
