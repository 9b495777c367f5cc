use crate::exporters::build_exporters;
use color_eyre::Result;
use eyre::Context as _;
use rtsl_exporter_config::{
    Args,
    Config,
};
use rtsl_exporter_http::{
    create_router,
    serve,
    shutdown_signal,
};
use tokio::net::TcpListener;

pub struct App {
    config: Config,
}

impl App {
    /// Loads and validates the configuration. Invalid configuration is the
    /// only fatal error of the exporter.
    pub fn new(args: Args) -> Result<Self> {
        let config = Config::new(&args).wrap_err("Failed to load configuration")?;
        config.validate().wrap_err("Invalid configuration")?;
        debug!(config_dir = %config.config_dir().display(), "Configuration loaded");
        Ok(Self { config })
    }

    pub async fn run(self) -> Result<()> {
        let collectors = build_exporters(&self.config)?;
        let address = self.config.listen_address;
        let listener = TcpListener::bind(address)
            .await
            .wrap_err_with(|| format!("Failed to listen on {address}"))?;

        serve(listener, create_router(collectors), shutdown_signal()).await?;
        info!("Bye bye");
        Ok(())
    }
}
