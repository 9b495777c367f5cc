use super::{
    collector::Collector,
    orchestrator::{
        CollectError,
        Orchestrator,
    },
};
use crate::{
    metrics::{
        MetricDesc,
        Snapshot,
        RESPONSE_TIME_SECONDS,
        STATUS_CODE,
    },
    source::SourceKind,
};
use std::{
    future::Future,
    pin::Pin,
};

/// One source, all its accounts, and the descriptors of everything it emits.
pub struct Exporter {
    orchestrator: Orchestrator,
    descs: Vec<MetricDesc>,
}

impl Exporter {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let client = orchestrator.client();
        let ns = client.kind().namespace();
        let mut descs = vec![
            MetricDesc::new(ns, STATUS_CODE, "HTTP status code of the last request to the upstream API, 0 if none."),
            MetricDesc::new(
                ns,
                RESPONSE_TIME_SECONDS,
                "Response time of the last request to the upstream API, in seconds.",
            ),
        ];
        descs.extend(client.source().value_descs());
        Self { orchestrator, descs }
    }

    pub fn kind(&self) -> SourceKind {
        self.orchestrator.kind()
    }
}

impl Collector for Exporter {
    fn describe(&self) -> Vec<MetricDesc> {
        self.descs.clone()
    }

    fn collect(&self) -> Pin<Box<dyn Future<Output = Result<Snapshot, CollectError>> + Send + '_>> {
        Box::pin(self.orchestrator.collect())
    }

    fn name(&self) -> &'static str {
        self.kind().namespace()
    }
}
