//! SendGrid email credits (`GET /v3/user/credits`, bearer token).

use super::{
    FetchError,
    RawPayload,
    Reading,
    Source,
    SourceKind,
};
use crate::{
    account::{
        Account,
        Credential,
    },
    metrics::{
        MetricDesc,
        PLAN_EXPIRATION_SECONDS,
    },
};
use reqwest::{
    Client as HttpClient,
    RequestBuilder,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com";
const CREDITS_PATH: &str = "/v3/user/credits";
const TIMEOUT: Duration = Duration::from_secs(10);

const EMAIL_LIMIT: &str = "email_limit_count";
const EMAIL_REMAINING: &str = "email_remaining_count";
const EMAIL_USED: &str = "email_used_count";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SendGridCredits {
    pub total: Option<f64>,
    #[serde(rename = "remain")]
    pub remaining: Option<f64>,
    pub used: Option<f64>,
    pub next_reset: Option<String>,
}

impl SendGridCredits {
    pub(super) fn readings(&self) -> Vec<Reading> {
        [
            (EMAIL_LIMIT, self.total),
            (EMAIL_REMAINING, self.remaining),
            (EMAIL_USED, self.used),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| Reading::new(name, value)))
        .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SendGrid {
    base_url: String,
}

impl Default for SendGrid {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }
}

impl SendGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Source for SendGrid {
    fn kind(&self) -> SourceKind {
        SourceKind::SendGrid
    }

    fn default_timeout(&self) -> Duration {
        TIMEOUT
    }

    fn request(
        &self,
        http: &HttpClient,
        _account: &Account,
        credential: &Credential,
    ) -> Result<RequestBuilder, FetchError> {
        let Credential::Token(api_key) = credential else {
            return Err(FetchError::UnsupportedCredential {
                kind: self.kind(),
                scheme: credential.scheme(),
            });
        };
        let url = format!("{}{CREDITS_PATH}", self.base_url.trim_end_matches('/'));
        Ok(http.get(url).bearer_auth(api_key.expose()))
    }

    fn decode(&self, body: &[u8]) -> Result<RawPayload, serde_json::Error> {
        serde_json::from_slice(body).map(RawPayload::SendGrid)
    }

    fn value_descs(&self) -> Vec<MetricDesc> {
        let ns = self.kind().namespace();
        vec![
            MetricDesc::new(ns, EMAIL_LIMIT, "The total email limit for the account."),
            MetricDesc::new(ns, EMAIL_REMAINING, "The number of emails remaining for the account."),
            MetricDesc::new(ns, EMAIL_USED, "The number of emails used for the account."),
            MetricDesc::new(ns, PLAN_EXPIRATION_SECONDS, "The time until the plan expires, in seconds."),
        ]
    }
}
