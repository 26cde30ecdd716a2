use brigade_exporter_config::Config;
use eyre::{
    Context as _,
    Result,
};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
    Registry,
};

/// JSON logs on stdout, or human readable ones in development mode.
///
/// `RUST_LOG` takes precedence over the `--debug` flag.
pub fn init_logging(config: &Config) -> Result<()> {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = if config.development {
        fmt::layer().boxed()
    } else {
        fmt::layer().json().with_current_span(true).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .with(tracing_error::ErrorLayer::default())
        .try_init()
        .context("Failed to initialize tracing subscriber")
}
