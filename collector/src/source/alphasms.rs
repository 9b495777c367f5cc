//! AlphaSMS balance (`GET /user/balance?api_key=...`).
//!
//! The API answers `200` even for API-level failures and reports them in the
//! `error` field; `data` is then missing or not an object.

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
    Deserializer,
    Serialize,
};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.sms.net.bd";
const BALANCE_PATH: &str = "/user/balance";
const TIMEOUT: Duration = Duration::from_secs(10);

const BALANCE_AMOUNT: &str = "user_balance_amount";
const BALANCE_ERROR: &str = "user_balance_error";
pub(super) const VALIDITY_TIMESTAMP: &str = "user_balance_validity";

/// Balance is documented as a string but some deployments send a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Amount::Number(value) => Some(*value),
            Amount::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BalanceData {
    pub balance: Option<Amount>,
    pub validity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlphaSmsBalance {
    pub error: Option<i64>,
    pub msg: Option<String>,
    #[serde(default, deserialize_with = "lenient_data")]
    pub data: Option<BalanceData>,
}

fn lenient_data<'de, D>(deserializer: D) -> Result<Option<BalanceData>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

impl AlphaSmsBalance {
    pub fn validity(&self) -> Option<&str> {
        self.data.as_ref()?.validity.as_deref()
    }

    pub(super) fn readings(&self) -> Vec<Reading> {
        let mut readings = Vec::new();
        if let Some(balance) = self.data.as_ref().and_then(|data| data.balance.as_ref()) {
            match balance.as_f64() {
                Some(value) => readings.push(Reading::new(BALANCE_AMOUNT, value)),
                None => warn!(?balance, "Balance is not a number, skipping"),
            }
        }
        if let Some(error) = self.error {
            if error != 0 {
                debug!(error, msg = ?self.msg, "AlphaSMS reported an API error");
            }
            readings.push(Reading::new(BALANCE_ERROR, error as f64));
        }
        readings
    }
}

#[derive(Debug, Clone)]
pub struct AlphaSms {
    base_url: String,
}

impl Default for AlphaSms {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }
}

impl AlphaSms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Source for AlphaSms {
    fn kind(&self) -> SourceKind {
        SourceKind::AlphaSms
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
        let url = format!("{}{BALANCE_PATH}", self.base_url.trim_end_matches('/'));
        Ok(http.get(url).query(&[("api_key", api_key.expose())]))
    }

    fn decode(&self, body: &[u8]) -> Result<RawPayload, serde_json::Error> {
        serde_json::from_slice(body).map(RawPayload::AlphaSms)
    }

    fn value_descs(&self) -> Vec<MetricDesc> {
        let ns = self.kind().namespace();
        vec![
            MetricDesc::new(ns, BALANCE_AMOUNT, "The current balance amount."),
            MetricDesc::new(ns, BALANCE_ERROR, "The error code reported by the balance API."),
            MetricDesc::new(ns, VALIDITY_TIMESTAMP, "Validity date of the balance amount, as a Unix timestamp."),
            MetricDesc::new(ns, PLAN_EXPIRATION_SECONDS, "The time until the balance expires, in seconds."),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        account::AccountRegistry,
        source::SourceClient,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_balance_and_validity() {
        let payload = AlphaSms::new()
            .decode(br#"{"error":0,"msg":"Success","data":{"balance":"1532.45","validity":"2025-01-31 00:00:00"}}"#)
            .unwrap();

        assert_eq!(
            payload.readings(),
            vec![Reading::new(BALANCE_AMOUNT, 1532.45), Reading::new(BALANCE_ERROR, 0.0)]
        );
        assert_eq!(payload.reset_date(), Some("2025-01-31 00:00:00"));
        assert_eq!(payload.reset_timestamp_metric(), Some(VALIDITY_TIMESTAMP));
    }

    #[test]
    fn api_error_without_data_keeps_error_code() {
        let payload = AlphaSms::new()
            .decode(br#"{"error":405,"msg":"Authorization Failed","data":[]}"#)
            .unwrap();

        assert_eq!(payload.readings(), vec![Reading::new(BALANCE_ERROR, 405.0)]);
        assert_eq!(payload.reset_date(), None);
    }

    #[test]
    fn unparsable_balance_skips_only_that_reading() {
        let payload = AlphaSms::new()
            .decode(br#"{"error":0,"data":{"balance":"n/a","validity":"2025-01-31 00:00:00"}}"#)
            .unwrap();

        assert_eq!(payload.readings(), vec![Reading::new(BALANCE_ERROR, 0.0)]);
        assert!(payload.reset_date().is_some());
    }

    #[tokio::test]
    async fn transport_errors_do_not_expose_the_api_key() {
        // Bind and drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let registry = AccountRegistry::new([Account::new("default", Credential::token("TOPSECRETKEY"))]).unwrap();
        let client = SourceClient::new(AlphaSms::with_base_url(format!("http://{address}")));
        let result = client.fetch(&registry, "default").await;

        let error = result.error.unwrap();
        assert!(matches!(error, FetchError::Transport(_)));
        assert!(!format!("{error}").contains("TOPSECRETKEY"));
    }

    #[test]
    fn numeric_balance_is_accepted() {
        let payload = AlphaSms::new().decode(br#"{"data":{"balance":12.5}}"#).unwrap();
        assert_eq!(payload.readings(), vec![Reading::new(BALANCE_AMOUNT, 12.5)]);
    }
}
