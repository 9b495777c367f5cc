use clap::Parser;
use std::path::PathBuf;

/// Prometheus exporter for SendGrid, AlphaSMS and DHIS2 accounts
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// Configuration file. Defaults to `./config.yaml`, then the config directory.
    #[clap(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address the metrics endpoint listens on, e.g. `0.0.0.0:8080` or `:8080`.
    #[clap(long, value_name = "ADDR", env = "RTSL_EXPORTER_LISTEN")]
    pub listen: Option<String>,

    /// Log at debug level for the exporter crates.
    #[clap(long = "verbose", action)]
    pub verbose: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(listen) = &self.listen {
                cache.insert("listen_address".to_string(), listen.clone().into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();

    format!(
        "{}
Authors: {author}

Config directory: {config_dir_path}",
        clap::crate_version!()
    )
}
