use crate::{
    error::AppError,
    exposition::{
        render,
        Scrape,
    },
};
use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::future::join_all;
use rtsl_exporter_collector::Collector;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub collectors: Arc<Vec<Arc<dyn Collector>>>,
}

pub fn create_router(collectors: Vec<Arc<dyn Collector>>) -> Router {
    let state = AppState {
        collectors: Arc::new(collectors),
    };

    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "OK"
}

/// Collects every exporter concurrently. A collector that fails is logged and
/// left out; the others are still rendered.
async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let scrapes = join_all(state.collectors.iter().map(|collector| async move {
        match collector.collect().await {
            Ok(snapshot) => Some(Scrape {
                descs: collector.describe(),
                snapshot,
            }),
            Err(e) => {
                error!(collector = collector.name(), "Collection failed: {e}");
                None
            }
        }
    }))
    .await;
    let scrapes: Vec<_> = scrapes.into_iter().flatten().collect();

    let rendered = render(&scrapes)?;
    Ok(([(CONTENT_TYPE, rendered.content_type)], rendered.body))
}
