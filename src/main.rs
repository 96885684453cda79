mod routes;
mod logger;
mod config;
mod response;
mod error;
mod models;
mod middleware;
mod state;
mod handler;
mod service;
mod pipeline;

use anyhow::Context;
use log::info;
use tokio::signal;

use crate::config::settings::Settings;
use crate::logger::logger::setup_logger;
use crate::pipeline::face_pipeline::face_pipeline::FacePipeline;
use crate::routes::root::{root_routes, RouterState};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::new().context("failed to load settings")?;

    // Setup logger
    setup_logger(settings.logger.as_ref());
    let addr = format!("0.0.0.0:{}", settings.server.http_port);

    // Setup pipeline
    let face_pipeline = FacePipeline::from_settings(&settings);
    let health = face_pipeline.health();
    info!(
        "completed initializing pipeline (detector: {}, recognition: {})",
        health.backend, health.recognition_available
    );

    // Init server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("starting {} on {}", settings.app.name, settings.server);

    let router_state = RouterState::new(face_pipeline);
    axum::serve(listener, root_routes(router_state, &settings.server))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("api server failed")?;

    info!("api server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::error!("failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
