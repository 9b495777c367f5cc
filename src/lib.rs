#[macro_use]
extern crate tracing;

mod app;
pub mod exporters;
mod logging;

pub use app::App;
pub use logging::init_logging;
pub use rtsl_exporter_config::{
    Args,
    Config,
};

pub fn init_errors() -> color_eyre::Result<()> {
    color_eyre::install()
}
