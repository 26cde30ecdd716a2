use axum::{
    extract::State,
    http::{
        header,
        StatusCode,
    },
    response::{
        Html,
        IntoResponse,
        Response,
    },
    routing::get,
    Router,
};
use brigade_exporter_collector::{
    encode_text,
    Orchestrator,
    Sample,
    TEXT_CONTENT_TYPE,
};
use eyre::{
    Context as _,
    Result,
};
use futures::StreamExt as _;
use std::{
    future::Future,
    sync::Arc,
};
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub metrics_path: Arc<str>,
}

pub fn create_router(orchestrator: Arc<Orchestrator>, metrics_path: &str) -> Router {
    let state = AppState {
        orchestrator,
        metrics_path: metrics_path.into(),
    };

    Router::new()
        .route(metrics_path, get(metrics))
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Runs one collection cycle per scrape.
async fn metrics(State(state): State<AppState>) -> Response {
    let samples: Vec<Sample> = state.orchestrator.run_cycle().collect().await;
    trace!(samples = samples.len(), "serving scrape");
    match encode_text(&samples) {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body).into_response(),
        Err(err) => {
            error!("Failed to render scrape: {err:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let path = &state.metrics_path;
    Html(format!(
        "<html>\n\
         <head><title>Brigade exporter</title></head>\n\
         <body>\n\
         <h1>Brigade exporter</h1>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n"
    ))
}

async fn healthz() -> &'static str {
    "ok"
}

pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}

/// Resolves on the first SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
