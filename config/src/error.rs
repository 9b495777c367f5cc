use rtsl_exporter_collector::SourceKind;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("no accounts configured; set sendgrid_accounts, alphasms_api_key, alphasms_accounts or dhis2_endpoints")]
    NoAccounts,
    #[error("{source_kind} account names must not be empty")]
    EmptyAccountName { source_kind: SourceKind },
    #[error("{source_kind} account {name:?} is configured more than once")]
    DuplicateAccount { source_kind: SourceKind, name: String },
    #[error("DHIS2 endpoint {base_url:?} is not a valid http(s) URL: {reason}")]
    InvalidEndpoint { base_url: String, reason: String },
}
