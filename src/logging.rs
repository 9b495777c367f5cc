use eyre::Context as _;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

const DEFAULT_DIRECTIVES: &str = "info";
const VERBOSE_DIRECTIVES: &str = "info,rtsl_exporter=debug,rtsl_exporter_collector=debug,rtsl_exporter_http=debug";

/// `RUST_LOG` wins when set; otherwise `info`, or debug for the exporter
/// crates with `verbose`.
pub fn init_logging(verbose: bool) -> eyre::Result<()> {
    let fallback = if verbose { VERBOSE_DIRECTIVES } else { DEFAULT_DIRECTIVES };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(filter))
        .with(tracing_error::ErrorLayer::default())
        .try_init()
        .wrap_err("Failed to initialize tracing subscriber")
}
