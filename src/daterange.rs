//! Date range resolution
//!
//! Maps the symbolic range selector from the search form ("7", "30",
//! "90", "this_month", "last_month", "custom") to concrete calendar
//! bounds. Pure: the caller supplies "today".

use crate::error::{AppError, Result};
use chrono::{Datelike, Days, NaiveDate};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Concrete inclusive date bounds for one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ResolvedDateRange {
    pub fn start_str(&self) -> String {
        self.start_date.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end_date.format(DATE_FORMAT).to_string()
    }
}

fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| AppError::InvalidRange(format!("invalid date: {}", value)))
}

/// Resolve a range selector against the given current date.
///
/// A "custom" selector without both bounds is rejected before any
/// external call is made.
pub fn resolve(
    date_range: &str,
    custom_start: Option<&str>,
    custom_end: Option<&str>,
    today: NaiveDate,
) -> Result<ResolvedDateRange> {
    match date_range {
        "this_month" => Ok(ResolvedDateRange {
            start_date: first_day_of_month(today),
            end_date: today,
        }),
        "last_month" => {
            let this_month_start = first_day_of_month(today);
            let last_month_end = this_month_start
                .pred_opt()
                .ok_or_else(|| AppError::InvalidRange("date out of range".to_string()))?;
            Ok(ResolvedDateRange {
                start_date: first_day_of_month(last_month_end),
                end_date: last_month_end,
            })
        }
        "custom" => match (custom_start, custom_end) {
            (Some(start), Some(end)) => Ok(ResolvedDateRange {
                start_date: parse_iso_date(start)?,
                end_date: parse_iso_date(end)?,
            }),
            _ => Err(AppError::InvalidRange(
                "Custom date range requires start and end dates".to_string(),
            )),
        },
        days => {
            let days: u64 = days.parse().map_err(|_| {
                AppError::InvalidRange(format!("unknown date range: {}", date_range))
            })?;
            let start_date = today
                .checked_sub_days(Days::new(days))
                .ok_or_else(|| AppError::InvalidRange("date out of range".to_string()))?;
            Ok(ResolvedDateRange {
                start_date,
                end_date: today,
            })
        }
    }
}

fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    // with_day(1) cannot fail for an already-valid date
    date.with_day(1).unwrap()
}
