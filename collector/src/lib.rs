//! # RTSL Exporter Collector
//!
//! Polls third-party service accounts and turns their answers into
//! Prometheus-ready metrics.
//!
//! ## Architecture
//!
//! - **`account`**: accounts, credentials and the registry they live in
//! - **`source`**: one client per upstream API (SendGrid, AlphaSMS, DHIS2)
//! - **`normalizer`**: raw payload to canonical metrics, reset-date countdowns
//! - **`collectors`**: concurrent per-account fan-out and the `Collector` trait
//!   the exposition layer scrapes
//! - **`metrics`**: the canonical metric model
//!
//! Every scrape issues exactly one request per account. An account that fails
//! still reports its status code and response time; other accounts are never
//! affected.

#[macro_use]
extern crate tracing;

pub mod account;
pub mod collectors;
pub mod metrics;
pub mod normalizer;
pub mod source;

pub use account::{
    Account,
    AccountRegistry,
    Credential,
    RegistryError,
};
pub use collectors::*;
pub use metrics::{
    CanonicalMetric,
    MetricDesc,
    Snapshot,
};
pub use source::{
    AlphaSms,
    Dhis2,
    SendGrid,
    Source,
    SourceClient,
    SourceKind,
};
