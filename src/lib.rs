#[macro_use]
extern crate tracing;

mod app;
mod logging;
pub mod server;

pub use app::App;
pub use logging::init_logging;

/// Installs the `color-eyre` panic and error report handlers.
pub fn init_errors() -> color_eyre::Result<()> {
    color_eyre::install()
}
