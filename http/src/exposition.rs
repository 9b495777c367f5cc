//! Renders snapshots in the Prometheus text format.
//!
//! A fresh registry is built for every scrape, so series of accounts that
//! disappear from a snapshot disappear from the output too.

use crate::error::AppError;
use prometheus::{
    Encoder,
    GaugeVec,
    Opts,
    Registry,
    TextEncoder,
};
use rtsl_exporter_collector::{
    MetricDesc,
    Snapshot,
};
use std::collections::HashMap;

/// What one collector described and produced during a scrape.
#[derive(Debug, Clone, Default)]
pub struct Scrape {
    pub descs: Vec<MetricDesc>,
    pub snapshot: Snapshot,
}

/// Encoded exposition body with its content type.
#[derive(Debug)]
pub struct Rendered {
    pub content_type: String,
    pub body: Vec<u8>,
}

pub fn render(scrapes: &[Scrape]) -> Result<Rendered, AppError> {
    let registry = Registry::new();
    let mut gauges = HashMap::new();

    for desc in scrapes.iter().flat_map(|scrape| &scrape.descs) {
        let labels: Vec<&str> = desc.labels.iter().map(String::as_str).collect();
        let opts = Opts::new(desc.name.as_str(), desc.help.as_str());
        let gauge = GaugeVec::new(opts, &labels).map_err(AppError::Registry)?;
        registry.register(Box::new(gauge.clone())).map_err(AppError::Registry)?;
        gauges.insert(desc.name.as_str(), (desc, gauge));
    }

    for metric in scrapes.iter().flat_map(|scrape| scrape.snapshot.metrics()) {
        let Some((desc, gauge)) = gauges.get(metric.name.as_str()) else {
            warn!(metric = %metric.name, "Dropping undescribed metric");
            continue;
        };
        let Some(values) = desc.label_values(metric) else {
            warn!(metric = %metric.name, labels = ?metric.labels, "Dropping metric with unexpected labels");
            continue;
        };
        match gauge.get_metric_with_label_values(&values) {
            Ok(child) => child.set(metric.value),
            Err(e) => warn!(metric = %metric.name, "Dropping metric: {e}"),
        }
    }

    let encoder = TextEncoder::new();
    let mut body = Vec::new();
    encoder
        .encode(&registry.gather(), &mut body)
        .map_err(AppError::Encode)?;

    Ok(Rendered {
        content_type: encoder.format_type().to_string(),
        body,
    })
}
