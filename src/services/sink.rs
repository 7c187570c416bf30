//! Job output sinks
//!
//! One scheduler serves both response modes: `StreamSink` emits each
//! outcome as a newline-terminated JSON line flushed to the client
//! while the job is still running; `CollectSink` accumulates results
//! for the single-response batch variant.

use crate::error::{AppError, Result};
use crate::services::ranking_service::{JobProgress, JobSummary, KeywordResult};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

/// Receives per-keyword outcomes and the final summary, in order
#[async_trait]
pub trait ResultSink: Send {
    async fn keyword_result(&mut self, result: &KeywordResult, progress: &JobProgress)
        -> Result<()>;

    async fn complete(&mut self, summary: &JobSummary) -> Result<()>;
}

/// One line of the streaming response
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamMessage<'a> {
    Result {
        data: &'a KeywordResult,
        progress: &'a JobProgress,
    },
    Complete {
        summary: &'a JobSummary,
    },
}

/// Streams JSON lines into an mpsc channel drained by the HTTP
/// response body. A send error means the client is gone.
pub struct StreamSink {
    tx: mpsc::Sender<String>,
}

impl StreamSink {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    async fn send(&self, message: StreamMessage<'_>) -> Result<()> {
        let mut line = serde_json::to_string(&message)?;
        line.push('\n');
        self.tx
            .send(line)
            .await
            .map_err(|_| AppError::Internal("streaming client disconnected".to_string()))
    }
}

#[async_trait]
impl ResultSink for StreamSink {
    async fn keyword_result(
        &mut self,
        result: &KeywordResult,
        progress: &JobProgress,
    ) -> Result<()> {
        self.send(StreamMessage::Result {
            data: result,
            progress,
        })
        .await
    }

    async fn complete(&mut self, summary: &JobSummary) -> Result<()> {
        self.send(StreamMessage::Complete { summary }).await
    }
}

/// Collects every result in memory for the non-streaming variant
#[derive(Default)]
pub struct CollectSink {
    results: Vec<KeywordResult>,
    summary: Option<JobSummary>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_results(self) -> Vec<KeywordResult> {
        self.results
    }

    pub fn summary(&self) -> Option<JobSummary> {
        self.summary
    }
}

#[async_trait]
impl ResultSink for CollectSink {
    async fn keyword_result(
        &mut self,
        result: &KeywordResult,
        _progress: &JobProgress,
    ) -> Result<()> {
        self.results.push(result.clone());
        Ok(())
    }

    async fn complete(&mut self, summary: &JobSummary) -> Result<()> {
        self.summary = Some(*summary);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daterange::ResolvedDateRange;
    use crate::google::types::{ApiRow, SearchAnalyticsRequest, SearchAnalyticsResponse};
    use crate::google::SearchConsole;
    use crate::services::ranking_service::{
        JobOutcome, RankingJob, RankingService, RateLimitConfig, SearchType,
    };
    use chrono::NaiveDate;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    /// Succeeds with two days of data for "a", fails for everything else
    struct TwoKeywordApi;

    #[async_trait]
    impl SearchConsole for TwoKeywordApi {
        async fn list_sites(&self, _access_token: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn query(
            &self,
            _access_token: &str,
            _site_url: &str,
            request: &SearchAnalyticsRequest,
        ) -> Result<SearchAnalyticsResponse> {
            let keyword = &request.dimension_filter_groups[0].filters[0].expression;
            if keyword == "a" {
                Ok(SearchAnalyticsResponse {
                    rows: Some(vec![
                        ApiRow {
                            keys: vec!["2024-01-01".to_string()],
                            clicks: 5.0,
                            impressions: 100.0,
                            ctr: 0.05,
                            position: Some(3.0),
                        },
                        ApiRow {
                            keys: vec!["2024-01-02".to_string()],
                            clicks: 2.0,
                            impressions: 40.0,
                            ctr: 0.05,
                            position: Some(4.0),
                        },
                    ]),
                    response_aggregation_type: None,
                })
            } else {
                Err(AppError::Query("backend error".to_string()))
            }
        }
    }

    fn seven_day_job() -> RankingJob {
        RankingJob {
            site_url: "https://example.com".to_string(),
            keywords: vec!["a".to_string(), "b".to_string()],
            range: ResolvedDateRange {
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            },
            search_type: SearchType::Web,
            country: None,
        }
    }

    #[tokio::test]
    async fn test_streamed_job_emits_results_then_completion() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut sink = StreamSink::new(tx);
        let config = RateLimitConfig {
            delay_between_requests: Duration::ZERO,
            batch_size: 50,
            delay_between_batches: Duration::ZERO,
        };
        let cancel = CancellationToken::new();

        let outcome = RankingService::run_job(
            &TwoKeywordApi,
            "token",
            &seven_day_job(),
            &config,
            &mut sink,
            &cancel,
        )
        .await;
        drop(sink);

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }

        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.ends_with('\n')));

        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["type"], "result");
        assert_eq!(first["data"]["keyword"], "a");
        assert_eq!(first["data"]["clicks"], 7.0);
        assert_eq!(first["data"]["avgPosition"], 3.5);
        // Gap-filled series spans the whole 7-day range
        assert_eq!(first["data"]["dailyData"].as_array().unwrap().len(), 7);
        assert_eq!(first["progress"]["processed"], 1);
        assert_eq!(first["progress"]["percentage"], 50);

        let second: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second["type"], "result");
        assert_eq!(second["data"]["keyword"], "b");
        assert_eq!(second["data"]["clicks"], 0.0);
        assert_eq!(
            second["data"]["error"],
            "Search Console query failed: backend error"
        );
        assert_eq!(second["progress"]["errors"], 1);

        let last: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
        assert_eq!(last["type"], "complete");
        assert_eq!(last["summary"]["total"], 2);
        assert_eq!(last["summary"]["success"], 1);
        assert_eq!(last["summary"]["errors"], 1);

        assert!(matches!(outcome, JobOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn test_dropped_receiver_cancels_the_job() {
        let (tx, rx) = mpsc::channel(16);
        drop(rx);
        let mut sink = StreamSink::new(tx);
        let config = RateLimitConfig {
            delay_between_requests: Duration::ZERO,
            batch_size: 50,
            delay_between_batches: Duration::ZERO,
        };
        let cancel = CancellationToken::new();

        let outcome = RankingService::run_job(
            &TwoKeywordApi,
            "token",
            &seven_day_job(),
            &config,
            &mut sink,
            &cancel,
        )
        .await;

        assert_eq!(outcome, JobOutcome::Cancelled);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_collect_sink_gathers_everything() {
        let mut sink = CollectSink::new();
        let config = RateLimitConfig {
            delay_between_requests: Duration::ZERO,
            batch_size: 50,
            delay_between_batches: Duration::ZERO,
        };
        let cancel = CancellationToken::new();

        RankingService::run_job(
            &TwoKeywordApi,
            "token",
            &seven_day_job(),
            &config,
            &mut sink,
            &cancel,
        )
        .await;

        assert_eq!(
            sink.summary(),
            Some(crate::services::ranking_service::JobSummary {
                total: 2,
                success: 1,
                errors: 1,
            })
        );
        let results = sink.into_results();
        assert_eq!(results.len(), 2);
        assert!(results[0].error.is_none());
        assert!(results[1].error.is_some());
    }
}
