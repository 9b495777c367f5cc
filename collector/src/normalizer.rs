//! # Metric Normalizer
//!
//! Turns one [`FetchResult`] into canonical metrics:
//!
//! - `<ns>_status_code` and `<ns>_response_time_seconds`, always.
//! - One metric per numeric field present in the payload, on success only.
//! - `<ns>_plan_expiration_seconds`, derived from the payload's reset date in
//!   the account's time zone and clamped at zero. An unparsable date drops this
//!   metric alone.

use crate::{
    metrics::{
        metric_name,
        CanonicalMetric,
        PLAN_EXPIRATION_SECONDS,
        RESPONSE_TIME_SECONDS,
        STATUS_CODE,
    },
    source::{
        FetchResult,
        SourceKind,
    },
};
use chrono::{
    DateTime,
    NaiveDate,
    NaiveDateTime,
    NaiveTime,
    TimeZone,
    Utc,
};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateFormat {
    Timestamp(&'static str),
    Date(&'static str),
}

/// Accepted reset-date formats, tried in order.
const RESET_DATE_FORMATS: [DateFormat; 2] = [
    DateFormat::Timestamp("%Y-%m-%d %H:%M:%S"),
    DateFormat::Date("%Y-%m-%d"),
];

impl DateFormat {
    fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        match self {
            DateFormat::Timestamp(format) => NaiveDateTime::parse_from_str(raw, format).ok(),
            DateFormat::Date(format) => NaiveDate::parse_from_str(raw, format)
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN)),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DateParseError {
    #[error("reset date {0:?} matches none of the accepted formats")]
    Unrecognized(String),
    #[error("reset date {date:?} does not exist in time zone {zone}")]
    NonexistentLocalTime { date: String, zone: Tz },
}

/// Parses a reset date as local time in `time_zone`.
pub fn parse_reset_date(raw: &str, time_zone: Tz) -> Result<DateTime<Tz>, DateParseError> {
    let raw = raw.trim();
    let naive = RESET_DATE_FORMATS
        .iter()
        .find_map(|format| format.parse(raw))
        .ok_or_else(|| DateParseError::Unrecognized(raw.to_string()))?;

    time_zone
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| DateParseError::NonexistentLocalTime {
            date: raw.to_string(),
            zone: time_zone,
        })
}

/// Seconds from `now` until `reset`, never negative.
pub fn expiration_countdown(reset: DateTime<Tz>, now: DateTime<Utc>) -> f64 {
    let now = now.with_timezone(&reset.timezone());
    let remaining = reset.signed_duration_since(now);
    (remaining.num_milliseconds() as f64 / 1000.0).max(0.0)
}

#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    namespace: &'static str,
}

impl Normalizer {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            namespace: kind.namespace(),
        }
    }

    pub fn normalize(&self, result: &FetchResult, time_zone: Tz, now: DateTime<Utc>) -> Vec<CanonicalMetric> {
        let account = result.account_name.as_str();
        let mut metrics = vec![
            CanonicalMetric::new(self.name(STATUS_CODE), account, f64::from(result.status_code)),
            CanonicalMetric::new(self.name(RESPONSE_TIME_SECONDS), account, result.latency.as_secs_f64()),
        ];

        if let Some(error) = &result.error {
            warn!(
                account,
                status = result.status_code,
                latency_ms = result.latency.as_millis() as u64,
                "Failed to get metrics: {error}"
            );
            return metrics;
        }
        let Some(payload) = &result.payload else {
            return metrics;
        };

        for reading in payload.readings() {
            let metric = reading
                .labels
                .into_iter()
                .fold(CanonicalMetric::new(self.name(reading.name), account, reading.value), |metric, (key, value)| {
                    metric.with_label(key, value)
                });
            metrics.push(metric);
        }

        let Some(raw_date) = payload.reset_date() else {
            return metrics;
        };
        match parse_reset_date(raw_date, time_zone) {
            Ok(reset) => {
                if let Some(name) = payload.reset_timestamp_metric() {
                    metrics.push(CanonicalMetric::new(self.name(name), account, reset.timestamp() as f64));
                }
                metrics.push(CanonicalMetric::new(
                    self.name(PLAN_EXPIRATION_SECONDS),
                    account,
                    expiration_countdown(reset, now),
                ));
            }
            Err(e) => warn!(account, %time_zone, "Failed to parse plan reset date: {e}"),
        }

        metrics
    }

    fn name(&self, name: &str) -> String {
        metric_name(self.namespace, name)
    }
}
