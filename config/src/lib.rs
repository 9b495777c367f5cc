//! Configuration of the exporter.
//!
//! Layers, in increasing priority: built-in defaults, the YAML file,
//! `RTSL_EXPORTER__*` environment variables and the command line.

#[macro_use]
extern crate tracing;

mod accounts;
mod app_config;
mod args;
mod error;

pub use accounts::{
    ApiKeyAccount,
    Dhis2Endpoint,
    SourceOverride,
    SourceOverrides,
    DEFAULT_ALPHASMS_ACCOUNT,
};
use app_config::AppConfig;
pub use app_config::get_config_dir;
pub use args::Args;
pub use error::ConfigError;
use rtsl_exporter_collector::SourceKind;
use serde::Deserialize;
use std::{
    collections::HashSet,
    net::SocketAddr,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

const CONFIG_FILE: &str = "config.yaml";
const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub app_config: AppConfig,
    #[serde(deserialize_with = "accounts::deserialize_listen_address")]
    pub listen_address: SocketAddr,
    /// Applies to every source without its own `sources.<kind>.timeout`.
    #[serde(default, deserialize_with = "accounts::deserialize_duration")]
    pub request_timeout: Option<Duration>,
    #[serde(default)]
    pub sendgrid_accounts: Vec<ApiKeyAccount>,
    /// Single AlphaSMS key, exposed as the account `default`.
    #[serde(default)]
    pub alphasms_api_key: Option<String>,
    #[serde(default)]
    pub alphasms_accounts: Vec<ApiKeyAccount>,
    #[serde(default)]
    pub dhis2_endpoints: Vec<Dhis2Endpoint>,
    #[serde(default)]
    pub sources: SourceOverrides,
}

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl Config {
    pub fn new(args: &Args) -> Result<Self, ConfigError> {
        let config_dir = get_config_dir();
        let file = config_file(args, &config_dir);
        debug!(path = %file.display(), required = args.config.is_some(), "Loading configuration");

        let builder = config::Config::builder()
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml))
            .add_source(
                config::File::from(file)
                    .format(config::FileFormat::Yaml)
                    .required(args.config.is_some()),
            )
            .add_source(
                config::Environment::with_prefix(app_config::PROJECT_NAME.as_str())
                    .prefix_separator("__")
                    .separator("__"),
            )
            .add_source(args.clone());

        let cfg: Self = builder.build()?.try_deserialize()?;
        Ok(cfg)
    }

    pub fn config_dir(&self) -> &Path {
        &self.app_config.config_dir
    }

    /// Accounts from `alphasms_accounts`, preceded by the legacy `alphasms_api_key` if set.
    pub fn alphasms_accounts(&self) -> Vec<ApiKeyAccount> {
        let legacy = self.alphasms_api_key.as_ref().map(|api_key| ApiKeyAccount {
            account_name: DEFAULT_ALPHASMS_ACCOUNT.to_string(),
            api_key: api_key.clone(),
            time_zone: None,
        });
        legacy.into_iter().chain(self.alphasms_accounts.iter().cloned()).collect()
    }

    pub fn source(&self, kind: SourceKind) -> &SourceOverride {
        match kind {
            SourceKind::SendGrid => &self.sources.sendgrid,
            SourceKind::AlphaSms => &self.sources.alphasms,
            SourceKind::Dhis2 => &self.sources.dhis2,
        }
    }

    /// `None` keeps the source's own default.
    pub fn timeout_for(&self, kind: SourceKind) -> Option<Duration> {
        self.source(kind).timeout.or(self.request_timeout)
    }

    pub fn account_names(&self, kind: SourceKind) -> Vec<String> {
        match kind {
            SourceKind::SendGrid => self.sendgrid_accounts.iter().map(|a| a.account_name.clone()).collect(),
            SourceKind::AlphaSms => self.alphasms_accounts().into_iter().map(|a| a.account_name).collect(),
            SourceKind::Dhis2 => self.dhis2_endpoints.iter().map(Dhis2Endpoint::account_name).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sendgrid_accounts.is_empty() && self.alphasms_accounts().is_empty() && self.dhis2_endpoints.is_empty() {
            return Err(ConfigError::NoAccounts);
        }

        for endpoint in &self.dhis2_endpoints {
            let invalid = |reason: String| ConfigError::InvalidEndpoint {
                base_url: endpoint.base_url.clone(),
                reason,
            };
            let url = endpoint.parsed_url().map_err(|e| invalid(e.to_string()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
            }
        }

        for kind in [SourceKind::SendGrid, SourceKind::AlphaSms, SourceKind::Dhis2] {
            let mut seen = HashSet::new();
            for name in self.account_names(kind) {
                if name.trim().is_empty() {
                    return Err(ConfigError::EmptyAccountName { source_kind: kind });
                }
                if !seen.insert(name.clone()) {
                    return Err(ConfigError::DuplicateAccount { source_kind: kind, name });
                }
            }
        }

        Ok(())
    }
}

fn config_file(args: &Args, config_dir: &Path) -> PathBuf {
    if let Some(path) = &args.config {
        return path.clone();
    }
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        local
    } else {
        config_dir.join(CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn from_yaml(yaml: &str) -> Config {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.child("exporter.yaml");
        std::fs::write(&path, yaml).unwrap();
        Config::new(&Args {
            config: Some(path),
            ..Args::default()
        })
        .unwrap()
    }

    const FULL: &str = r#"
alphasms_api_key: alpha-key
request_timeout: 5s
sendgrid_accounts:
  - account_name: ops
    api_key: SG.ops
    time_zone: America/Los_Angeles
  - account_name: marketing
    api_key: SG.marketing
dhis2_endpoints:
  - base_url: https://dhis2.simple-bd.org
    username: admin
    password: district
sources:
  sendgrid:
    base_url: http://localhost:9000
  dhis2:
    timeout: 2s
"#;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.listen_address, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.request_timeout, None);
        assert!(config.sendgrid_accounts.is_empty());
        assert!(matches!(config.validate(), Err(ConfigError::NoAccounts)));
    }

    #[test]
    fn loads_yaml_file() {
        let config = from_yaml(FULL);

        assert_eq!(config.listen_address, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.sendgrid_accounts.len(), 2);
        assert_eq!(config.sendgrid_accounts[0].time_zone.as_deref(), Some("America/Los_Angeles"));
        assert_eq!(config.account_names(SourceKind::AlphaSms), ["default"]);
        assert_eq!(config.account_names(SourceKind::Dhis2), ["dhis2_simple_bd_org"]);
        assert_eq!(
            config.source(SourceKind::SendGrid).base_url.as_ref().map(url::Url::as_str),
            Some("http://localhost:9000/")
        );
        assert_eq!(config.timeout_for(SourceKind::SendGrid), Some(Duration::from_secs(5)));
        assert_eq!(config.timeout_for(SourceKind::Dhis2), Some(Duration::from_secs(2)));
        config.validate().unwrap();
    }

    #[test]
    fn command_line_overrides_the_file() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.child("exporter.yaml");
        std::fs::write(&path, "listen_address: 0.0.0.0:9000\nalphasms_api_key: key").unwrap();

        let config = Config::new(&Args {
            config: Some(path),
            listen: Some("127.0.0.1:9100".to_string()),
            verbose: false,
        })
        .unwrap();
        assert_eq!(config.listen_address, "127.0.0.1:9100".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn bare_port_listens_on_all_interfaces() {
        let config = from_yaml("listen_address: \":9000\"\nalphasms_api_key: key");
        assert_eq!(config.listen_address, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());

        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.child("exporter.yaml");
        std::fs::write(&path, "alphasms_api_key: key").unwrap();
        let config = Config::new(&Args {
            config: Some(path),
            listen: Some(":9100".to_string()),
            verbose: false,
        })
        .unwrap();
        assert_eq!(config.listen_address, "0.0.0.0:9100".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn malformed_listen_address_is_rejected() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.child("exporter.yaml");
        std::fs::write(&path, "listen_address: localhost\nalphasms_api_key: key").unwrap();
        let result = Config::new(&Args {
            config: Some(path),
            ..Args::default()
        });
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let result = Config::new(&Args {
            config: Some(PathBuf::from("/nonexistent/rtsl-exporter.yaml")),
            ..Args::default()
        });
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn legacy_alphasms_key_comes_first() {
        let config = from_yaml(concat!(
            "alphasms_api_key: legacy\n",
            "alphasms_accounts:\n",
            "  - account_name: backup\n",
            "    api_key: other\n",
            "    time_zone: Asia/Dhaka",
        ));
        let accounts = config.alphasms_accounts();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].account_name, DEFAULT_ALPHASMS_ACCOUNT);
        assert_eq!(accounts[0].api_key, "legacy");
        assert_eq!(accounts[1].time_zone.as_deref(), Some("Asia/Dhaka"));
    }

    #[test]
    fn duplicate_names_are_rejected_per_source() {
        let config = from_yaml(
            "alphasms_api_key: legacy\nalphasms_accounts:\n  - account_name: default\n    api_key: other",
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateAccount { source_kind: SourceKind::AlphaSms, .. })
        ));

        let config = from_yaml(
            "dhis2_endpoints:\n  - base_url: https://play.dhis2.org\n  - base_url: https://play.dhis2.org/\n",
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateAccount { source_kind: SourceKind::Dhis2, .. })
        ));

        // The same name under different sources is fine.
        let config = from_yaml(
            "sendgrid_accounts:\n  - account_name: default\n    api_key: SG.key\nalphasms_api_key: legacy",
        );
        config.validate().unwrap();
    }

    #[test]
    fn invalid_dhis2_urls_are_rejected() {
        let config = from_yaml("dhis2_endpoints:\n  - base_url: not a url\n");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidEndpoint { .. })));

        let config = from_yaml("dhis2_endpoints:\n  - base_url: ftp://dhis2.example.org\n");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidEndpoint { .. })));
    }
}
