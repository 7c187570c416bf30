//! Keyword ranking service
//!
//! The core pipeline: one Search Analytics query per keyword, strictly
//! sequential, with fixed per-request and per-batch delays so a job
//! stays inside the API quota. Each per-keyword outcome (success or
//! failure) is pushed into a `ResultSink` as soon as it is known; a
//! failed keyword never aborts the job.

use crate::daterange::ResolvedDateRange;
use crate::google::types::{
    DimensionFilter, DimensionFilterGroup, SearchAnalyticsRequest, SearchAnalyticsResponse,
};
use crate::google::SearchConsole;
use crate::metrics::{self, KeywordMetrics};
use crate::services::sink::ResultSink;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Hard cap on keywords per job
pub const MAX_KEYWORDS_PER_JOB: usize = 1000;

/// Row ceiling per query; high enough to capture a full per-day series
const QUERY_ROW_LIMIT: u32 = 25000;

/// Rate limiting configuration
///
/// The Search Console API allows 1,200 queries per minute (20 QPS).
/// The per-request delay targets ~14 req/s, comfortably below that;
/// the longer pause between batches defends against burst-quota
/// windows distinct from the sustained per-second limit.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub delay_between_requests: Duration,
    pub batch_size: usize,
    pub delay_between_batches: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            delay_between_requests: Duration::from_millis(70),
            batch_size: 50,
            delay_between_batches: Duration::from_millis(2000),
        }
    }
}

/// Search type dimension accepted by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Web,
    Image,
    Video,
    News,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Web => "web",
            SearchType::Image => "image",
            SearchType::Video => "video",
            SearchType::News => "news",
        }
    }
}

/// Parameters of one ranking job
#[derive(Debug, Clone)]
pub struct RankingJob {
    pub site_url: String,
    pub keywords: Vec<String>,
    pub range: ResolvedDateRange,
    pub search_type: SearchType,
    pub country: Option<String>,
}

/// Progress counters; monotonically non-decreasing over a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub processed: usize,
    pub total: usize,
    pub percentage: u32,
    pub success: usize,
    pub errors: usize,
}

impl JobProgress {
    fn new(total: usize) -> Self {
        Self {
            processed: 0,
            total,
            percentage: 0,
            success: 0,
            errors: 0,
        }
    }

    fn record(&mut self, success: bool) {
        self.processed += 1;
        if success {
            self.success += 1;
        } else {
            self.errors += 1;
        }
        self.percentage = ((self.processed as f64 / self.total as f64) * 100.0).round() as u32;
    }
}

/// Final completion summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub total: usize,
    pub success: usize,
    pub errors: usize,
}

/// Outcome for one keyword; produced exactly once per submitted keyword
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordResult {
    pub keyword: String,
    pub data: Option<SearchAnalyticsResponse>,
    #[serde(flatten)]
    pub metrics: KeywordMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl KeywordResult {
    fn success(keyword: &str, data: SearchAnalyticsResponse, metrics: KeywordMetrics) -> Self {
        Self {
            keyword: keyword.to_string(),
            data: Some(data),
            metrics,
            error: None,
        }
    }

    fn failure(keyword: &str, message: String) -> Self {
        Self {
            keyword: keyword.to_string(),
            data: None,
            metrics: KeywordMetrics::zero(),
            error: Some(message),
        }
    }
}

/// How a job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(JobSummary),
    Cancelled,
}

/// Keyword ranking pipeline
pub struct RankingService;

impl RankingService {
    /// Run one job to completion, pushing every outcome into `sink`.
    ///
    /// The cancellation token is checked at every suspension point; a
    /// closed sink (streaming client gone) also cancels the job so the
    /// remaining keywords are not queried pointlessly.
    pub async fn run_job(
        api: &dyn SearchConsole,
        access_token: &str,
        job: &RankingJob,
        config: &RateLimitConfig,
        sink: &mut dyn ResultSink,
        cancel: &CancellationToken,
    ) -> JobOutcome {
        let job_id = Uuid::new_v4();
        let total = job.keywords.len();
        let total_batches = total.div_ceil(config.batch_size).max(1);
        let mut progress = JobProgress::new(total);

        info!(
            "[job {}] Starting: {} keywords for {} ({} batches)",
            job_id, total, job.site_url, total_batches
        );

        for (batch_index, batch) in job.keywords.chunks(config.batch_size).enumerate() {
            info!(
                "[job {}] Processing batch {}/{} ({} keywords)",
                job_id,
                batch_index + 1,
                total_batches,
                batch.len()
            );

            for keyword in batch {
                if cancel.is_cancelled() {
                    info!("[job {}] Cancelled after {} keywords", job_id, progress.processed);
                    return JobOutcome::Cancelled;
                }

                let request = build_query_request(job, keyword);
                let result = match api.query(access_token, &job.site_url, &request).await {
                    Ok(data) => {
                        let metrics = metrics::aggregate(data.rows(), &job.range);
                        progress.record(true);
                        KeywordResult::success(keyword, data, metrics)
                    }
                    Err(err) => {
                        warn!("[job {}] Query failed for \"{}\": {}", job_id, keyword, err);
                        progress.record(false);
                        KeywordResult::failure(keyword, err.to_string())
                    }
                };

                if sink.keyword_result(&result, &progress).await.is_err() {
                    warn!("[job {}] Output sink closed, cancelling", job_id);
                    cancel.cancel();
                    return JobOutcome::Cancelled;
                }

                // The fixed pause after every keyword (success or
                // failure) is the primary quota protection
                if !sleep_unless_cancelled(config.delay_between_requests, cancel).await {
                    info!("[job {}] Cancelled during request delay", job_id);
                    return JobOutcome::Cancelled;
                }
            }

            let is_last_batch = (batch_index + 1) * config.batch_size >= total;
            if !is_last_batch {
                info!(
                    "[job {}] Batch {} complete, waiting {}ms before next batch",
                    job_id,
                    batch_index + 1,
                    config.delay_between_batches.as_millis()
                );
                if !sleep_unless_cancelled(config.delay_between_batches, cancel).await {
                    info!("[job {}] Cancelled during batch delay", job_id);
                    return JobOutcome::Cancelled;
                }
            }
        }

        let summary = JobSummary {
            total,
            success: progress.success,
            errors: progress.errors,
        };

        if sink.complete(&summary).await.is_err() {
            warn!("[job {}] Output sink closed before completion message", job_id);
            cancel.cancel();
            return JobOutcome::Cancelled;
        }

        info!(
            "[job {}] Completed. Success: {}, Errors: {}",
            job_id, summary.success, summary.errors
        );

        JobOutcome::Completed(summary)
    }
}

/// One query per keyword: date-dimensioned, `equals` filter on the
/// query dimension, plus an `equals` country filter when supplied
fn build_query_request(job: &RankingJob, keyword: &str) -> SearchAnalyticsRequest {
    let mut filters = vec![DimensionFilter::equals("query", keyword)];
    if let Some(country) = &job.country {
        filters.push(DimensionFilter::equals("country", country));
    }

    SearchAnalyticsRequest {
        start_date: job.range.start_str(),
        end_date: job.range.end_str(),
        dimensions: vec!["date".to_string()],
        dimension_filter_groups: vec![DimensionFilterGroup { filters }],
        row_limit: QUERY_ROW_LIMIT,
        search_type: job.search_type.as_str().to_string(),
    }
}

/// Returns false when the token fired before the delay elapsed
async fn sleep_unless_cancelled(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::google::types::ApiRow;
    use crate::services::sink::CollectSink;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock API: per-keyword canned responses, call order recorded
    struct MockSearchConsole {
        responses: HashMap<String, std::result::Result<SearchAnalyticsResponse, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockSearchConsole {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_rows(mut self, keyword: &str, rows: Vec<ApiRow>) -> Self {
            self.responses.insert(
                keyword.to_string(),
                Ok(SearchAnalyticsResponse {
                    rows: Some(rows),
                    response_aggregation_type: None,
                }),
            );
            self
        }

        fn with_error(mut self, keyword: &str, message: &str) -> Self {
            self.responses
                .insert(keyword.to_string(), Err(message.to_string()));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchConsole for MockSearchConsole {
        async fn list_sites(&self, _access_token: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn query(
            &self,
            _access_token: &str,
            _site_url: &str,
            request: &SearchAnalyticsRequest,
        ) -> Result<SearchAnalyticsResponse> {
            let keyword = request.dimension_filter_groups[0].filters[0]
                .expression
                .clone();
            self.calls.lock().unwrap().push(keyword.clone());

            match self.responses.get(&keyword) {
                Some(Ok(response)) => Ok(response.clone()),
                Some(Err(message)) => Err(AppError::Query(message.clone())),
                None => Ok(SearchAnalyticsResponse {
                    rows: None,
                    response_aggregation_type: None,
                }),
            }
        }
    }

    fn test_range() -> ResolvedDateRange {
        ResolvedDateRange {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        }
    }

    fn test_job(keywords: Vec<&str>) -> RankingJob {
        RankingJob {
            site_url: "https://example.com".to_string(),
            keywords: keywords.into_iter().map(String::from).collect(),
            range: test_range(),
            search_type: SearchType::Web,
            country: None,
        }
    }

    fn zero_delay_config() -> RateLimitConfig {
        RateLimitConfig {
            delay_between_requests: Duration::ZERO,
            batch_size: 50,
            delay_between_batches: Duration::ZERO,
        }
    }

    fn row(date: &str, clicks: f64, impressions: f64, position: f64) -> ApiRow {
        ApiRow {
            keys: vec![date.to_string()],
            clicks,
            impressions,
            ctr: clicks / impressions,
            position: Some(position),
        }
    }

    #[tokio::test]
    async fn test_results_follow_input_order_and_errors_do_not_abort() {
        let api = MockSearchConsole::new()
            .with_rows("alpha", vec![row("2024-01-01", 3.0, 30.0, 2.0)])
            .with_error("beta", "Quota exceeded")
            .with_rows("gamma", vec![row("2024-01-02", 1.0, 10.0, 5.0)]);

        let job = test_job(vec!["alpha", "beta", "gamma"]);
        let mut sink = CollectSink::new();
        let cancel = CancellationToken::new();

        let outcome = RankingService::run_job(
            &api,
            "token",
            &job,
            &zero_delay_config(),
            &mut sink,
            &cancel,
        )
        .await;

        assert_eq!(api.calls(), vec!["alpha", "beta", "gamma"]);

        let results = sink.into_results();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].keyword, "alpha");
        assert!(results[0].error.is_none());
        assert_eq!(results[0].metrics.clicks, 3.0);

        // The failing keyword yields a zeroed result with the error
        // message, and the following keyword is still processed
        assert_eq!(results[1].keyword, "beta");
        assert_eq!(results[1].metrics.clicks, 0.0);
        assert!(results[1].metrics.daily_data.is_empty());
        assert_eq!(
            results[1].error.as_deref(),
            Some("Search Console query failed: Quota exceeded")
        );
        assert_eq!(results[2].keyword, "gamma");

        assert_eq!(
            outcome,
            JobOutcome::Completed(JobSummary {
                total: 3,
                success: 2,
                errors: 1,
            })
        );
    }

    /// Records every progress snapshot it is handed
    struct ProgressSink {
        seen: Vec<JobProgress>,
    }

    #[async_trait]
    impl ResultSink for ProgressSink {
        async fn keyword_result(
            &mut self,
            _result: &KeywordResult,
            progress: &JobProgress,
        ) -> Result<()> {
            self.seen.push(*progress);
            Ok(())
        }

        async fn complete(&mut self, _summary: &JobSummary) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_ends_at_100() {
        let api = MockSearchConsole::new();
        let job = test_job(vec!["a", "b", "c", "d"]);
        let mut sink = ProgressSink { seen: Vec::new() };
        let cancel = CancellationToken::new();

        RankingService::run_job(&api, "token", &job, &zero_delay_config(), &mut sink, &cancel)
            .await;

        let percentages: Vec<u32> = sink.seen.iter().map(|p| p.percentage).collect();
        assert_eq!(percentages, vec![25, 50, 75, 100]);
        assert!(percentages.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(sink.seen.last().unwrap().processed, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delays_with_batching() {
        // 120 keywords, batch size 50: three batches, so exactly two
        // inter-batch delays (after batch 1 and batch 2)
        let api = MockSearchConsole::new();
        let keywords: Vec<String> = (0..120).map(|i| format!("kw-{}", i)).collect();
        let job = RankingJob {
            site_url: "https://example.com".to_string(),
            keywords,
            range: test_range(),
            search_type: SearchType::Web,
            country: None,
        };
        let config = RateLimitConfig::default();
        let mut sink = CollectSink::new();
        let cancel = CancellationToken::new();

        let started = tokio::time::Instant::now();
        let outcome =
            RankingService::run_job(&api, "token", &job, &config, &mut sink, &cancel).await;
        let elapsed = started.elapsed();

        let expected = config.delay_between_requests * 120 + config.delay_between_batches * 2;
        assert_eq!(elapsed, expected);
        assert!(matches!(outcome, JobOutcome::Completed(_)));
        assert_eq!(sink.into_results().len(), 120);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_the_job() {
        let api = MockSearchConsole::new();
        let job = test_job(vec!["a", "b", "c"]);
        let mut sink = CollectSink::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = RankingService::run_job(
            &api,
            "token",
            &job,
            &zero_delay_config(),
            &mut sink,
            &cancel,
        )
        .await;

        assert_eq!(outcome, JobOutcome::Cancelled);
        assert!(api.calls().is_empty());
        assert!(sink.into_results().is_empty());
    }

    #[tokio::test]
    async fn test_country_filter_is_added_when_supplied() {
        let mut job = test_job(vec!["kw"]);
        job.country = Some("vnm".to_string());

        let request = build_query_request(&job, "kw");
        let filters = &request.dimension_filter_groups[0].filters;
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[1].dimension, "country");
        assert_eq!(filters[1].expression, "vnm");

        job.country = None;
        let request = build_query_request(&job, "kw");
        assert_eq!(request.dimension_filter_groups[0].filters.len(), 1);
    }

    #[test]
    fn test_keyword_result_wire_shape() {
        let result = KeywordResult::failure("rust", "boom".to_string());
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["keyword"], "rust");
        assert_eq!(json["clicks"], 0.0);
        assert_eq!(json["impressions"], 0.0);
        assert_eq!(json["avgPosition"], 0.0);
        assert_eq!(json["ctr"], 0.0);
        assert_eq!(json["dailyData"], serde_json::json!([]));
        assert_eq!(json["error"], "boom");
        assert_eq!(json["data"], serde_json::Value::Null);

        // Successful results omit the error field entirely
        let ok = KeywordResult::success(
            "rust",
            SearchAnalyticsResponse {
                rows: None,
                response_aggregation_type: None,
            },
            KeywordMetrics::zero(),
        );
        let json = serde_json::to_value(&ok).unwrap();
        assert!(json.get("error").is_none());
    }
}
