use brigade_exporter::{
    init_errors,
    init_logging,
    App,
};
use brigade_exporter_config::{
    Args,
    Config,
};
use clap::Parser;
use color_eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    let config = Config::new(Args::parse())?;
    init_logging(&config)?;

    App::new(config)?.run().await
}
