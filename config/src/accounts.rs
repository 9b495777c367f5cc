use rtsl_exporter_collector::source::dhis2::account_name_for;
use serde::{
    Deserialize,
    Deserializer,
};
use std::{
    fmt,
    net::SocketAddr,
    time::Duration,
};
use url::Url;

/// Name of the account built from the legacy top-level `alphasms_api_key`.
pub const DEFAULT_ALPHASMS_ACCOUNT: &str = "default";

/// An account authenticated by a single API key.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ApiKeyAccount {
    pub account_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub time_zone: Option<String>,
}

impl fmt::Debug for ApiKeyAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAccount")
            .field("account_name", &self.account_name)
            .field("api_key", &"***")
            .field("time_zone", &self.time_zone)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Dhis2Endpoint {
    pub base_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Overrides the name derived from `base_url`.
    #[serde(default)]
    pub name: Option<String>,
}

impl Dhis2Endpoint {
    pub fn account_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => account_name_for(&self.base_url),
        }
    }

    pub(crate) fn parsed_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }
}

impl fmt::Debug for Dhis2Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dhis2Endpoint")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("name", &self.name)
            .finish()
    }
}

/// Per-source overrides, keyed by source under `sources`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SourceOverride {
    /// Ignored for DHIS2, whose base URL is per endpoint.
    #[serde(default)]
    pub base_url: Option<Url>,
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub timeout: Option<Duration>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SourceOverrides {
    #[serde(default)]
    pub sendgrid: SourceOverride,
    #[serde(default)]
    pub alphasms: SourceOverride,
    #[serde(default)]
    pub dhis2: SourceOverride,
}

/// Accepts humantime strings such as `5s` or `1m 30s`.
pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom))
        .transpose()
}

/// Accepts `HOST:PORT`, or a bare `:PORT` which listens on all interfaces.
pub(crate) fn deserialize_listen_address<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    let address = match raw.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => raw.to_string(),
    };
    address
        .parse()
        .map_err(|e| serde::de::Error::custom(format!("invalid listen address {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dhis2_name_defaults_to_the_sanitised_url() {
        let endpoint: Dhis2Endpoint =
            serde_yml::from_str("base_url: https://dhis2.simple-bd.org\nusername: admin\npassword: district").unwrap();
        assert_eq!(endpoint.account_name(), "dhis2_simple_bd_org");

        let named = Dhis2Endpoint {
            name: Some("bangladesh".to_string()),
            ..endpoint
        };
        assert_eq!(named.account_name(), "bangladesh");
    }

    #[test]
    fn secrets_are_not_debug_printed() {
        let account: ApiKeyAccount = serde_yml::from_str("account_name: ops\napi_key: SG.very-secret").unwrap();
        assert!(!format!("{account:?}").contains("very-secret"));

        let endpoint: Dhis2Endpoint =
            serde_yml::from_str("base_url: https://play.dhis2.org\nusername: admin\npassword: district").unwrap();
        assert!(!format!("{endpoint:?}").contains("district"));
    }

    #[test]
    fn timeouts_use_humantime() {
        let source: SourceOverride = serde_yml::from_str("timeout: 1m 30s").unwrap();
        assert_eq!(source.timeout, Some(Duration::from_secs(90)));

        let invalid = serde_yml::from_str::<SourceOverride>("timeout: soon");
        assert!(invalid.is_err());
    }
}
