use crate::server;
use axum::Router;
use brigade_exporter_collector::Orchestrator;
use brigade_exporter_config::Config;
use brigade_exporter_service::{
    Brigade,
    FakeStore,
    HttpStore,
    Store,
};
use eyre::{
    Context as _,
    Result,
};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct App {
    config: Config,
    orchestrator: Arc<Orchestrator>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let store: Arc<dyn Store> = if config.fake {
            warn!("using fake Brigade data, nothing is read from the API server");
            Arc::new(FakeStore::default())
        } else {
            Arc::new(HttpStore::new(config.api_url.clone(), config.request_timeout)?)
        };
        let service = Arc::new(Brigade::new(store));
        let orchestrator = Arc::new(Orchestrator::new(config.exporter_config(), service)?);

        Ok(Self { config, orchestrator })
    }

    pub fn router(&self) -> Router {
        server::create_router(Arc::clone(&self.orchestrator), &self.config.metrics_path)
    }

    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.listen_addr)
            .await
            .wrap_err_with(|| format!("Failed to listen on {}", self.config.listen_addr))?;

        info!(
            addr = %self.config.listen_addr,
            metrics_path = %self.config.metrics_path,
            api_url = %self.config.api_url,
            collect_timeout = ?self.config.collect_timeout,
            request_timeout = ?self.config.request_timeout,
            "listening"
        );

        server::serve(listener, self.router(), server::shutdown_signal()).await?;
        info!("shutdown complete");
        Ok(())
    }
}
