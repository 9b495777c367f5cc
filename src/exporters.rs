//! Builds one exporter per configured source.

use eyre::Context as _;
use rtsl_exporter_collector::{
    Account,
    AccountRegistry,
    AlphaSms,
    Collector,
    Credential,
    Dhis2,
    Exporter,
    Orchestrator,
    SendGrid,
    Source,
    SourceClient,
    SourceKind,
};
use rtsl_exporter_config::{
    ApiKeyAccount,
    Config,
};
use std::sync::Arc;

/// Sources without accounts get no exporter.
pub fn build_exporters(config: &Config) -> eyre::Result<Vec<Arc<dyn Collector>>> {
    let sendgrid = match &config.source(SourceKind::SendGrid).base_url {
        Some(url) => SendGrid::with_base_url(url.as_str()),
        None => SendGrid::new(),
    };
    let alphasms = match &config.source(SourceKind::AlphaSms).base_url {
        Some(url) => AlphaSms::with_base_url(url.as_str()),
        None => AlphaSms::new(),
    };

    let sources = [
        (client(config, sendgrid), api_key_accounts(&config.sendgrid_accounts)),
        (client(config, alphasms), api_key_accounts(&config.alphasms_accounts())),
        (client(config, Dhis2::new()), dhis2_accounts(config)),
    ];

    let mut exporters: Vec<Arc<dyn Collector>> = Vec::new();
    for (client, accounts) in sources {
        let kind = client.kind();
        if accounts.is_empty() {
            debug!(source = %kind, "No accounts configured, skipping");
            continue;
        }
        let registry =
            AccountRegistry::new(accounts).wrap_err_with(|| format!("Invalid {kind} account configuration"))?;
        info!(
            source = %kind,
            accounts = registry.len(),
            timeout_ms = client.timeout().as_millis() as u64,
            "Exporter ready"
        );
        exporters.push(Arc::new(Exporter::new(Orchestrator::new(client, registry))));
    }
    Ok(exporters)
}

fn client(config: &Config, source: impl Source) -> SourceClient {
    let client = SourceClient::new(source);
    match config.timeout_for(client.kind()) {
        Some(timeout) => client.with_timeout(timeout),
        None => client,
    }
}

fn api_key_accounts(accounts: &[ApiKeyAccount]) -> Vec<Account> {
    accounts
        .iter()
        .map(|account| {
            Account::new(&account.account_name, Credential::token(&account.api_key))
                .with_time_zone(account.time_zone.as_deref())
        })
        .collect()
}

fn dhis2_accounts(config: &Config) -> Vec<Account> {
    config
        .dhis2_endpoints
        .iter()
        .map(|endpoint| {
            Account::new(endpoint.account_name(), Credential::basic(&endpoint.username, &endpoint.password))
                .with_endpoint(&endpoint.base_url)
        })
        .collect()
}
