//! Source-agnostic metric representation handed to the exposition layer.

use serde::Serialize;
use std::collections::BTreeMap;

/// Label carried by every metric to identify the account it belongs to.
pub const ACCOUNT_LABEL: &str = "account_name";

pub const STATUS_CODE: &str = "status_code";
pub const RESPONSE_TIME_SECONDS: &str = "response_time_seconds";
pub const PLAN_EXPIRATION_SECONDS: &str = "plan_expiration_seconds";

pub type Labels = BTreeMap<String, String>;

/// Fully qualified metric name, e.g. `sendgrid` + `status_code`.
pub fn metric_name(namespace: &str, name: &str) -> String {
    format!("{namespace}_{name}")
}

/// A (name, label set, value) triple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalMetric {
    pub name: String,
    pub labels: Labels,
    pub value: f64,
}

impl CanonicalMetric {
    pub fn new(name: impl Into<String>, account: &str, value: f64) -> Self {
        Self {
            name: name.into(),
            labels: Labels::from([(ACCOUNT_LABEL.to_string(), account.to_string())]),
            value,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn account(&self) -> Option<&str> {
        self.labels.get(ACCOUNT_LABEL).map(String::as_str)
    }
}

/// Static description of a metric an exporter may emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    pub name: String,
    pub help: String,
    pub labels: Vec<String>,
}

impl MetricDesc {
    /// A descriptor labelled only by account name.
    pub fn new(namespace: &str, name: &str, help: impl Into<String>) -> Self {
        Self {
            name: metric_name(namespace, name),
            help: help.into(),
            labels: vec![ACCOUNT_LABEL.to_string()],
        }
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels.extend(labels.iter().map(|label| label.to_string()));
        self
    }

    /// Label values in descriptor order, or `None` if the label keys of the
    /// metric do not match the schema exactly.
    pub fn label_values<'a>(&self, metric: &'a CanonicalMetric) -> Option<Vec<&'a str>> {
        if metric.labels.len() != self.labels.len() {
            return None;
        }
        self.labels
            .iter()
            .map(|label| metric.labels.get(label).map(String::as_str))
            .collect()
    }
}

/// Every metric produced by one scrape of one exporter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    metrics: Vec<CanonicalMetric>,
}

impl Snapshot {
    /// Appends one account's metrics. Metrics are never retracted.
    pub fn merge(&mut self, metrics: impl IntoIterator<Item = CanonicalMetric>) {
        self.metrics.extend(metrics);
    }

    pub fn metrics(&self) -> &[CanonicalMetric] {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a CanonicalMetric> + 'a {
        self.metrics.iter().filter(move |metric| metric.name == name)
    }

    /// Value of the named metric for one account, if present.
    pub fn value(&self, name: &str, account: &str) -> Option<f64> {
        self.by_name(name)
            .find(|metric| metric.account() == Some(account))
            .map(|metric| metric.value)
    }

    pub fn accounts(&self) -> Vec<&str> {
        let mut accounts: Vec<_> = self.metrics.iter().filter_map(CanonicalMetric::account).collect();
        accounts.sort_unstable();
        accounts.dedup();
        accounts
    }
}
