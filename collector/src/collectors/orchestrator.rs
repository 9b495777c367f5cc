use crate::{
    account::{
        Account,
        AccountRegistry,
    },
    metrics::Snapshot,
    normalizer::Normalizer,
    source::{
        SourceClient,
        SourceKind,
    },
};
use chrono::Utc;
use chrono_tz::Tz;
use futures::future::join_all;
use std::{
    sync::Arc,
    time::Instant,
};
use tokio::{
    sync::Mutex,
    task::JoinError,
};
use tracing::Instrument;

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// A unit of work panicked. This is a bug, not an upstream failure.
    #[error("collection task for {source_kind} failed: {error}")]
    Join {
        source_kind: SourceKind,
        #[source]
        error: JoinError,
    },
}

/// Fans out one fetch per account, normalises each result and merges it into
/// a shared snapshot.
///
/// The snapshot lock is only taken to merge an account's finished metrics, so
/// the upstream calls of all accounts overlap. Overlapping scrapes are not
/// serialised against each other; each builds its own snapshot.
pub struct Orchestrator {
    client: Arc<SourceClient>,
    registry: Arc<AccountRegistry>,
    normalizer: Normalizer,
}

impl Orchestrator {
    pub fn new(client: SourceClient, registry: AccountRegistry) -> Self {
        let normalizer = Normalizer::new(client.kind());
        Self {
            client: Arc::new(client),
            registry: Arc::new(registry),
            normalizer,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.client.kind()
    }

    pub fn client(&self) -> &SourceClient {
        &self.client
    }

    /// Returns once every account has settled. There is no overall deadline
    /// beyond the per-request timeout of the client.
    #[instrument(level = "debug", skip(self), fields(source = %self.kind()))]
    pub async fn collect(&self) -> Result<Snapshot, CollectError> {
        let kind = self.kind();
        let start = Instant::now();
        let snapshot = Arc::new(Mutex::new(Snapshot::default()));

        let handles: Vec<_> = self
            .registry
            .names()
            .map(|name| {
                let name = name.to_string();
                let client = Arc::clone(&self.client);
                let registry = Arc::clone(&self.registry);
                let snapshot = Arc::clone(&snapshot);
                let normalizer = self.normalizer;
                let span = debug_span!("account", source = %kind, account = %name);

                tokio::spawn(
                    async move {
                        let result = client.fetch(&registry, &name).await;
                        if result.is_success() {
                            debug!(
                                status = result.status_code,
                                latency_ms = result.latency.as_millis() as u64,
                                "fetched"
                            );
                        }
                        let time_zone = registry.get(&name).map(Account::time_zone).unwrap_or(Tz::UTC);
                        let metrics = normalizer.normalize(&result, time_zone, Utc::now());
                        snapshot.lock().await.merge(metrics);
                    }
                    .instrument(span),
                )
            })
            .collect();

        let accounts = handles.len();
        let mut failure = None;
        for joined in join_all(handles).await {
            if let Err(error) = joined {
                error!(source = %kind, "Collection task failed: {error}");
                failure.get_or_insert(CollectError::Join {
                    source_kind: kind,
                    error,
                });
            }
        }
        if let Some(failure) = failure {
            return Err(failure);
        }

        let snapshot = std::mem::take(&mut *snapshot.lock().await);
        debug!(
            source = %kind,
            accounts,
            metrics = snapshot.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Collection finished"
        );
        Ok(snapshot)
    }
}
