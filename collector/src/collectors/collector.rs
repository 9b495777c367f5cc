use super::orchestrator::CollectError;
use crate::metrics::{
    MetricDesc,
    Snapshot,
};
use std::{
    future::Future,
    pin::Pin,
};

/// Something the exposition layer can scrape.
pub trait Collector: Send + Sync {
    /// Every metric this collector may emit. Constant for the collector's lifetime.
    fn describe(&self) -> Vec<MetricDesc>;

    /// Gather one fresh snapshot.
    fn collect(&self) -> Pin<Box<dyn Future<Output = Result<Snapshot, CollectError>> + Send + '_>>;

    /// Get the name of this collector
    fn name(&self) -> &'static str;
}
