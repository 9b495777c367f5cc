//! # Source Clients
//!
//! A [`Source`] knows how one upstream API is addressed and what its payload
//! looks like. [`SourceClient`] wraps a source with the parts every upstream
//! shares: credential lookup, the timed request and status/decode handling.
//!
//! ## Contract
//!
//! - At most one outbound request per [`SourceClient::fetch`], never retried.
//! - Latency is measured around the network call and is kept when the call
//!   fails. Pre-flight failures (unknown account, missing credential) report a
//!   zero latency and a zero status code.
//! - Non-2xx responses carry their real status code *and* an error.
//! - Decode failures keep the status code and latency already observed.

pub mod alphasms;
pub mod dhis2;
pub mod sendgrid;

pub use alphasms::{
    AlphaSms,
    AlphaSmsBalance,
};
pub use dhis2::{
    Dhis2,
    Dhis2Info,
};
pub use sendgrid::{
    SendGrid,
    SendGridCredits,
};

use crate::{
    account::{
        Account,
        AccountRegistry,
        Credential,
    },
    metrics::MetricDesc,
};
use reqwest::{
    Client as HttpClient,
    RequestBuilder,
    Response,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::time::{
    Duration,
    Instant,
};
use strum::{
    Display,
    EnumString,
};

/// Upper bound, in bytes, on how much of an error body is read and logged.
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SourceKind {
    SendGrid,
    AlphaSms,
    Dhis2,
}

impl SourceKind {
    /// Metric namespace of the source; also its configuration key.
    pub fn namespace(&self) -> &'static str {
        match self {
            SourceKind::SendGrid => "sendgrid",
            SourceKind::AlphaSms => "alphasms",
            SourceKind::Dhis2 => "dhis2",
        }
    }
}

/// A value copied from the upstream payload, before namespacing.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub name: &'static str,
    pub value: f64,
    pub labels: Vec<(&'static str, String)>,
}

impl Reading {
    pub fn new(name: &'static str, value: f64) -> Self {
        Self {
            name,
            value,
            labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.labels.push((key, value.into()));
        self
    }
}

/// Decoded upstream payload, one variant per source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    SendGrid(SendGridCredits),
    AlphaSms(AlphaSmsBalance),
    Dhis2(Dhis2Info),
}

impl RawPayload {
    /// Numeric fields present in the payload. Absent fields yield nothing.
    pub fn readings(&self) -> Vec<Reading> {
        match self {
            RawPayload::SendGrid(credits) => credits.readings(),
            RawPayload::AlphaSms(balance) => balance.readings(),
            RawPayload::Dhis2(info) => info.readings(),
        }
    }

    /// Raw reset-date string the expiration countdown is derived from.
    pub fn reset_date(&self) -> Option<&str> {
        match self {
            RawPayload::SendGrid(credits) => credits.next_reset.as_deref(),
            RawPayload::AlphaSms(balance) => balance.validity(),
            RawPayload::Dhis2(_) => None,
        }
    }

    /// Some sources also publish the reset date itself as a Unix timestamp.
    pub fn reset_timestamp_metric(&self) -> Option<&'static str> {
        match self {
            RawPayload::AlphaSms(_) => Some(alphasms::VALIDITY_TIMESTAMP),
            RawPayload::SendGrid(_) | RawPayload::Dhis2(_) => None,
        }
    }
}

/// One upstream API.
pub trait Source: Send + Sync + 'static {
    fn kind(&self) -> SourceKind;

    fn default_timeout(&self) -> Duration;

    /// Builds the single GET request for an account, credential attached.
    fn request(&self, http: &HttpClient, account: &Account, credential: &Credential)
        -> Result<RequestBuilder, FetchError>;

    fn decode(&self, body: &[u8]) -> Result<RawPayload, serde_json::Error>;

    /// Descriptors of every value and derived metric the source can emit.
    fn value_descs(&self) -> Vec<MetricDesc>;
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("account {0:?} not found")]
    AccountNotFound(String),
    #[error("no credential configured for account {0:?}")]
    MissingCredential(String),
    #[error("{kind} does not accept {scheme} credentials")]
    UnsupportedCredential { kind: SourceKind, scheme: &'static str },
    #[error("no endpoint configured for account {0:?}")]
    MissingEndpoint(String),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected status code {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// True when the request never reached the network.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            FetchError::AccountNotFound(_)
                | FetchError::MissingCredential(_)
                | FetchError::UnsupportedCredential { .. }
                | FetchError::MissingEndpoint(_)
        )
    }
}

/// Outcome of one fetch for one account during one scrape.
#[derive(Debug)]
pub struct FetchResult {
    pub account_name: String,
    pub payload: Option<RawPayload>,
    /// 0 when no HTTP exchange happened.
    pub status_code: u16,
    pub latency: Duration,
    pub error: Option<FetchError>,
}

impl FetchResult {
    fn preflight(account_name: &str, error: FetchError) -> Self {
        Self::failed(account_name, 0, Duration::ZERO, error)
    }

    fn failed(account_name: &str, status_code: u16, latency: Duration, error: FetchError) -> Self {
        Self {
            account_name: account_name.to_string(),
            payload: None,
            status_code,
            latency,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.payload.is_some()
    }
}

/// Performs authenticated, timed fetches for every account of one source.
pub struct SourceClient {
    source: Box<dyn Source>,
    http: HttpClient,
    timeout: Duration,
}

impl SourceClient {
    pub fn new(source: impl Source) -> Self {
        let timeout = source.default_timeout();
        Self {
            source: Box::new(source),
            http: HttpClient::new(),
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn source(&self) -> &dyn Source {
        self.source.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn fetch(&self, registry: &AccountRegistry, account_name: &str) -> FetchResult {
        let Some(account) = registry.get(account_name) else {
            return FetchResult::preflight(account_name, FetchError::AccountNotFound(account_name.to_string()));
        };
        let Some(credential) = account.credential() else {
            return FetchResult::preflight(account_name, FetchError::MissingCredential(account_name.to_string()));
        };
        let request = match self.source.request(&self.http, account, credential) {
            Ok(request) => request.timeout(self.timeout),
            Err(e) => return FetchResult::preflight(account_name, e),
        };

        let start = Instant::now();
        let response = request.send().await;
        let latency = start.elapsed();

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                return FetchResult::failed(account_name, 0, latency, FetchError::Transport(e.without_url()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            let error = FetchError::Status {
                status: status.as_u16(),
                body,
            };
            return FetchResult::failed(account_name, status.as_u16(), latency, error);
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                let error = FetchError::Body(e.without_url());
                return FetchResult::failed(account_name, status.as_u16(), latency, error);
            }
        };

        match self.source.decode(&body) {
            Ok(payload) => FetchResult {
                account_name: account_name.to_string(),
                payload: Some(payload),
                status_code: status.as_u16(),
                latency,
                error: None,
            },
            Err(e) => FetchResult::failed(account_name, status.as_u16(), latency, FetchError::Decode(e)),
        }
    }
}

/// Reads at most `ERROR_BODY_LIMIT` bytes of an error response.
async fn read_error_body(mut response: Response) -> String {
    let mut body = Vec::with_capacity(ERROR_BODY_LIMIT);
    while body.len() < ERROR_BODY_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    body.truncate(ERROR_BODY_LIMIT);
    String::from_utf8_lossy(&body).into_owned()
}
