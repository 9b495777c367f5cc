//! # Account Registry
//!
//! Accounts are the unit of fan-out: every scrape issues exactly one upstream
//! request per account. The registry is built once from configuration and is
//! shared read-only between concurrent scrapes.

use chrono_tz::Tz;
use std::{
    collections::BTreeMap,
    fmt,
};

/// An opaque credential value. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// API key, sent as a bearer token or a query parameter depending on the source.
    Token(Secret),
    /// HTTP basic auth.
    Basic { username: String, password: Secret },
}

impl Credential {
    /// Returns `None` for an empty token so that an unset key surfaces as a
    /// missing credential at fetch time instead of a request with no auth.
    pub fn token(value: impl Into<String>) -> Option<Self> {
        let secret = Secret::new(value);
        (!secret.is_empty()).then_some(Self::Token(secret))
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Option<Self> {
        let username = username.into();
        if username.trim().is_empty() {
            return None;
        }
        Some(Self::Basic {
            username,
            password: Secret::new(password),
        })
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Credential::Token(_) => "token",
            Credential::Basic { .. } => "basic",
        }
    }
}

/// One independently credentialed identity polled by a source.
#[derive(Debug, Clone)]
pub struct Account {
    name: String,
    credential: Option<Credential>,
    endpoint: Option<String>,
    time_zone_name: Option<String>,
    time_zone: Tz,
}

impl Account {
    pub fn new(name: impl Into<String>, credential: Option<Credential>) -> Self {
        Self {
            name: name.into(),
            credential,
            endpoint: None,
            time_zone_name: None,
            time_zone: Tz::UTC,
        }
    }

    /// Per-account base URL, for sources where every account lives on its own host.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Resolves the IANA zone name once. Empty or unknown names fall back to UTC.
    pub fn with_time_zone(mut self, time_zone: Option<&str>) -> Self {
        self.time_zone = resolve_time_zone(&self.name, time_zone);
        self.time_zone_name = time_zone.map(str::to_string);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// The zone name as configured, before resolution.
    pub fn time_zone_name(&self) -> Option<&str> {
        self.time_zone_name.as_deref()
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }
}

fn resolve_time_zone(account: &str, name: Option<&str>) -> Tz {
    match name.map(str::trim) {
        None | Some("") => Tz::UTC,
        Some(name) => name.parse::<Tz>().unwrap_or_else(|e| {
            warn!(account, time_zone = name, "Unknown time zone, falling back to UTC: {e}");
            Tz::UTC
        }),
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("account names must not be empty")]
    EmptyName,
    #[error("account {0:?} is configured more than once")]
    DuplicateAccount(String),
}

/// Immutable mapping from account name to account.
#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    accounts: BTreeMap<String, Account>,
}

impl AccountRegistry {
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for account in accounts {
            if account.name().trim().is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if map.contains_key(account.name()) {
                return Err(RegistryError::DuplicateAccount(account.name().to_string()));
            }
            map.insert(account.name().to_string(), account);
        }
        Ok(Self { accounts: map })
    }

    pub fn get(&self, name: &str) -> Option<&Account> {
        self.accounts.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.accounts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_or_empty_time_zone_resolves_to_utc() {
        let unknown = Account::new("a", None).with_time_zone(Some("Mars/Olympus_Mons"));
        assert_eq!(unknown.time_zone(), Tz::UTC);
        assert_eq!(unknown.time_zone_name(), Some("Mars/Olympus_Mons"));

        let empty = Account::new("b", None).with_time_zone(Some("  "));
        assert_eq!(empty.time_zone(), Tz::UTC);

        let dhaka = Account::new("c", None).with_time_zone(Some("Asia/Dhaka"));
        assert_eq!(dhaka.time_zone(), Tz::Asia__Dhaka);
    }

    #[test]
    fn empty_credentials_are_treated_as_missing() {
        assert_eq!(Credential::token("   "), None);
        assert_eq!(Credential::basic("", "secret"), None);
        assert!(matches!(Credential::token("SG.key"), Some(Credential::Token(_))));
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let credential = Credential::token("SG.very-secret").unwrap();
        assert!(!format!("{credential:?}").contains("very-secret"));
    }

    #[test]
    fn registry_rejects_duplicate_and_empty_names() {
        let duplicate = AccountRegistry::new([Account::new("ops", None), Account::new("ops", None)]);
        assert_eq!(duplicate.unwrap_err(), RegistryError::DuplicateAccount("ops".to_string()));

        let empty = AccountRegistry::new([Account::new("", None)]);
        assert_eq!(empty.unwrap_err(), RegistryError::EmptyName);
    }

    #[test]
    fn registry_lookup() {
        let registry = AccountRegistry::new([Account::new("b", None), Account::new("a", None)]).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["a", "b"]);
        assert!(registry.get("a").is_some());
        assert!(registry.get("missing").is_none());
    }
}
