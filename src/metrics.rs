//! Keyword metric aggregation
//!
//! Turns the raw per-date rows returned for one keyword into summary
//! totals plus a complete daily series covering the queried range.
//! Days the API returned no row for are zero-filled; an entirely empty
//! row set yields zero totals and an empty series.

use crate::daterange::ResolvedDateRange;
use crate::google::types::ApiRow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metrics for a single calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetric {
    pub date: String,
    pub clicks: f64,
    pub impressions: f64,
    pub avg_position: f64,
    pub ctr: f64,
}

impl DailyMetric {
    fn zero(date: String) -> Self {
        Self {
            date,
            clicks: 0.0,
            impressions: 0.0,
            avg_position: 0.0,
            ctr: 0.0,
        }
    }
}

/// Aggregated metrics for one keyword over the whole range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordMetrics {
    pub clicks: f64,
    pub impressions: f64,
    pub avg_position: f64,
    pub ctr: f64,
    pub daily_data: Vec<DailyMetric>,
}

impl KeywordMetrics {
    pub fn zero() -> Self {
        Self {
            clicks: 0.0,
            impressions: 0.0,
            avg_position: 0.0,
            ctr: 0.0,
            daily_data: Vec::new(),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregate the raw rows for one keyword.
///
/// Average position is the arithmetic mean over rows with a positive
/// position; rows without one are excluded from both numerator and
/// count, not treated as zero.
pub fn aggregate(rows: &[ApiRow], range: &ResolvedDateRange) -> KeywordMetrics {
    if rows.is_empty() {
        return KeywordMetrics::zero();
    }

    let mut total_clicks = 0.0;
    let mut total_impressions = 0.0;
    let mut total_position = 0.0;
    let mut position_count = 0u32;

    let mut daily_map: HashMap<String, DailyMetric> = HashMap::new();

    for row in rows {
        let Some(date) = row.date() else {
            continue;
        };

        total_clicks += row.clicks;
        total_impressions += row.impressions;
        if let Some(position) = row.position {
            if position > 0.0 {
                total_position += position;
                position_count += 1;
            }
        }

        let ctr = if row.impressions > 0.0 {
            (row.clicks / row.impressions * 10000.0).round() / 100.0
        } else {
            0.0
        };

        daily_map.insert(
            date.to_string(),
            DailyMetric {
                date: date.to_string(),
                clicks: row.clicks,
                impressions: row.impressions,
                avg_position: row.position.map(round1).unwrap_or(0.0),
                ctr,
            },
        );
    }

    // Walk every calendar day in the range so the series has no gaps
    let mut daily_data = Vec::new();
    let mut day = range.start_date;
    while day <= range.end_date {
        let date_str = day.format("%Y-%m-%d").to_string();
        daily_data.push(
            daily_map
                .remove(&date_str)
                .unwrap_or_else(|| DailyMetric::zero(date_str)),
        );
        let Some(next) = day.succ_opt() else { break };
        day = next;
    }

    let avg_position = if position_count > 0 {
        total_position / position_count as f64
    } else {
        0.0
    };
    let ctr = if total_impressions > 0.0 {
        total_clicks / total_impressions * 100.0
    } else {
        0.0
    };

    KeywordMetrics {
        clicks: total_clicks,
        impressions: total_impressions,
        avg_position: round1(avg_position),
        ctr: round2(ctr),
        daily_data,
    }
}
